//! Rendering a store snapshot into the static site.

use crate::feed::generate_atom;
use crate::output::StagedOutput;
use crate::templates::{
    EntryCard, EntryLink, EntryTemplate, IndexTemplate, NotFoundTemplate, SiteMeta, StatsTemplate,
    TopicLink, TopicTemplate,
};
use crate::RenderError;
use askama::Template;
use std::collections::HashMap;
use tilnet_core::markdown::{html_to_text, truncate_on_word};
use tilnet_core::search::build_search_index;
use tilnet_core::{Config, Entry, Snapshot, Topic};

/// Characters of plain text shown in list previews
pub const PREVIEW_LENGTH: usize = 200;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// What a render pass wrote
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub entry_pages: usize,
    pub topic_pages: usize,
    pub feed_entries: usize,
    pub search_records: usize,
}

pub struct SiteRenderer<'a> {
    config: &'a Config,
    base_url: String,
}

impl<'a> SiteRenderer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            base_url: config.normalized_base_url(),
        }
    }

    /// Write every page, the feed and the search index into `output`
    pub fn render(
        &self,
        snapshot: &Snapshot,
        output: &StagedOutput,
    ) -> Result<RenderSummary, RenderError> {
        let counts: HashMap<&str, usize> = snapshot
            .topic_cloud()
            .iter()
            .map(|tc| (tc.topic.key.as_str(), tc.count))
            .collect();
        let mut summary = RenderSummary::default();

        for (idx, entry) in snapshot.entries().iter().enumerate() {
            self.render_entry(snapshot, &counts, idx, entry, output)?;
            summary.entry_pages += 1;
        }

        for tc in snapshot.topic_cloud() {
            self.render_topic(snapshot, &counts, &tc.topic, output)?;
            summary.topic_pages += 1;
        }

        self.render_index(snapshot, &counts, output)?;
        self.render_stats(snapshot, output)?;
        self.render_page(
            "404.html",
            &NotFoundTemplate { site: self.site() },
            output,
        )?;

        let feed: Vec<&Entry> = snapshot
            .entries()
            .iter()
            .take(self.config.feed_entries)
            .collect();
        output.write("feed.atom", generate_atom(self.config, &feed, &self.base_url))?;
        summary.feed_entries = feed.len();

        let index = build_search_index(snapshot.entries(), &snapshot.entry_topics(), &self.base_url);
        output.write("search.json", index.to_json()?)?;
        summary.search_records = index.metadata.count;

        tracing::info!(
            "Rendered {} entry pages and {} topic pages",
            summary.entry_pages,
            summary.topic_pages
        );
        Ok(summary)
    }

    fn render_entry(
        &self,
        snapshot: &Snapshot,
        counts: &HashMap<&str, usize>,
        idx: usize,
        entry: &Entry,
        output: &StagedOutput,
    ) -> Result<(), RenderError> {
        let entries = snapshot.entries();
        let prev = idx.checked_sub(1).and_then(|i| entries.get(i));
        let next = entries.get(idx + 1);

        let page = EntryTemplate {
            site: self.site(),
            title: entry.title.clone(),
            created: entry.created.format(DATE_FORMAT).to_string(),
            modified: entry
                .was_modified()
                .then(|| entry.modified.format(DATE_FORMAT).to_string()),
            topics: self.topic_links(snapshot.topics_for(&entry.slug), counts),
            content: entry.html.clone(),
            source: entry.source.clone(),
            prev: prev.map(|e| self.entry_link(e)),
            next: next.map(|e| self.entry_link(e)),
            related: snapshot
                .related_for(&entry.slug)
                .into_iter()
                .take(self.config.related_entries)
                .map(|e| self.entry_link(e))
                .collect(),
        };

        self.render_page(&entry.output_rel_path(), &page, output)?;
        tracing::debug!("Rendered: {}", entry.slug);
        Ok(())
    }

    fn render_topic(
        &self,
        snapshot: &Snapshot,
        counts: &HashMap<&str, usize>,
        topic: &Topic,
        output: &StagedOutput,
    ) -> Result<(), RenderError> {
        let page = TopicTemplate {
            site: self.site(),
            name: topic.name.clone(),
            entries: snapshot
                .entries_for_topic(&topic.key)
                .into_iter()
                .map(|e| self.entry_card(snapshot, counts, e))
                .collect(),
        };
        self.render_page(&topic.output_rel_path(), &page, output)
    }

    fn render_index(
        &self,
        snapshot: &Snapshot,
        counts: &HashMap<&str, usize>,
        output: &StagedOutput,
    ) -> Result<(), RenderError> {
        let page = IndexTemplate {
            site: self.site(),
            cloud: self.cloud(snapshot),
            entries: snapshot
                .entries()
                .iter()
                .take(self.config.home_entries)
                .map(|e| self.entry_card(snapshot, counts, e))
                .collect(),
            total_entries: snapshot.entries().len(),
        };
        self.render_page("index.html", &page, output)
    }

    fn render_stats(&self, snapshot: &Snapshot, output: &StagedOutput) -> Result<(), RenderError> {
        let stats = snapshot.stats();
        let page = StatsTemplate {
            site: self.site(),
            total_entries: stats.entries,
            total_topics: stats.topics,
            first_date: stats
                .first_created
                .map(|d| d.format(DATE_FORMAT).to_string()),
            last_date: stats
                .last_created
                .map(|d| d.format(DATE_FORMAT).to_string()),
            topics: self.cloud(snapshot),
        };
        self.render_page("stats/index.html", &page, output)
    }

    fn render_page<T: Template>(
        &self,
        rel_path: &str,
        page: &T,
        output: &StagedOutput,
    ) -> Result<(), RenderError> {
        let html = page.render().map_err(|source| RenderError::Template {
            page: rel_path.to_string(),
            source,
        })?;
        output.write(rel_path, html)
    }

    fn site(&self) -> SiteMeta {
        SiteMeta {
            title: self.config.site.title.clone(),
            description: self.config.site.description.clone(),
            author: self.config.site.author.clone(),
            base_url: self.base_url.clone(),
        }
    }

    fn cloud(&self, snapshot: &Snapshot) -> Vec<TopicLink> {
        snapshot
            .topic_cloud()
            .iter()
            .map(|tc| TopicLink {
                url: tc.topic.url(&self.base_url),
                name: tc.topic.name.clone(),
                count: tc.count,
            })
            .collect()
    }

    fn topic_links(&self, topics: &[Topic], counts: &HashMap<&str, usize>) -> Vec<TopicLink> {
        topics
            .iter()
            .map(|t| TopicLink {
                url: t.url(&self.base_url),
                name: t.name.clone(),
                count: counts.get(t.key.as_str()).copied().unwrap_or(0),
            })
            .collect()
    }

    fn entry_link(&self, entry: &Entry) -> EntryLink {
        EntryLink {
            url: entry.url(&self.base_url),
            title: entry.title.clone(),
            date: entry.created.format(DATE_FORMAT).to_string(),
        }
    }

    fn entry_card(
        &self,
        snapshot: &Snapshot,
        counts: &HashMap<&str, usize>,
        entry: &Entry,
    ) -> EntryCard {
        EntryCard {
            url: entry.url(&self.base_url),
            title: entry.title.clone(),
            date: entry.created.format(DATE_FORMAT).to_string(),
            preview: preview(&entry.html),
            topics: self.topic_links(snapshot.topics_for(&entry.slug), counts),
        }
    }
}

/// Plain-text preview of rendered HTML, cut on a word boundary
pub fn preview(html: &str) -> String {
    truncate_on_word(&html_to_text(html), PREVIEW_LENGTH)
}
