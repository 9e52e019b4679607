//! Askama template definitions.

use askama::Template;

/// Site-wide values shared by every page
#[derive(Debug, Clone)]
pub struct SiteMeta {
    pub title: String,
    pub description: String,
    pub author: String,
    pub base_url: String,
}

/// A link to an entry page
#[derive(Debug, Clone)]
pub struct EntryLink {
    pub url: String,
    pub title: String,
    pub date: String,
}

/// A link to a topic page, with its entry count
#[derive(Debug, Clone)]
pub struct TopicLink {
    pub url: String,
    pub name: String,
    pub count: usize,
}

/// An entry summary for list pages
#[derive(Debug, Clone)]
pub struct EntryCard {
    pub url: String,
    pub title: String,
    pub date: String,
    pub preview: String,
    pub topics: Vec<TopicLink>,
}

/// Entry page template
#[derive(Template)]
#[template(path = "entry.html")]
pub struct EntryTemplate {
    pub site: SiteMeta,

    pub title: String,
    pub created: String,
    /// Only set when modified on a different day than created
    pub modified: Option<String>,
    pub topics: Vec<TopicLink>,

    /// Rendered HTML body
    pub content: String,
    pub source: Option<String>,

    // Navigation in corpus order (prev is newer)
    pub prev: Option<EntryLink>,
    pub next: Option<EntryLink>,
    pub related: Vec<EntryLink>,
}

/// Topic page template
#[derive(Template)]
#[template(path = "topic.html")]
pub struct TopicTemplate {
    pub site: SiteMeta,
    pub name: String,
    pub entries: Vec<EntryCard>,
}

/// Home page template
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub site: SiteMeta,
    pub cloud: Vec<TopicLink>,
    pub entries: Vec<EntryCard>,
    pub total_entries: usize,
}

/// Corpus statistics page template
#[derive(Template)]
#[template(path = "stats.html")]
pub struct StatsTemplate {
    pub site: SiteMeta,
    pub total_entries: usize,
    pub total_topics: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub topics: Vec<TopicLink>,
}

/// 404 error page template
#[derive(Template)]
#[template(path = "404.html")]
pub struct NotFoundTemplate {
    pub site: SiteMeta,
}
