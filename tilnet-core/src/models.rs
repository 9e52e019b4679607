//! Content model structs for entries, topics and diagnostics.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Timestamp layout used in the database and in rendered pages.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Typed front-matter metadata.
///
/// Every field is optional; the fallback chains live in
/// [`crate::content::EntryDraft`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub topics: Vec<String>,
    pub created: Option<NaiveDateTime>,
    pub modified: Option<NaiveDateTime>,
    pub slug: Option<String>,
    pub source: Option<String>,
}

/// A single published note
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// URL slug (e.g., "git-rebase-tricks")
    pub slug: String,

    /// Display title
    pub title: String,

    /// Markdown body without front matter
    pub raw_body: String,

    /// Rendered HTML with cross-references resolved
    pub html: String,

    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,

    /// Optional URL the note was learned from
    pub source: Option<String>,

    /// Path of the markdown file relative to the content root
    pub source_path: String,

    /// Fingerprint of the source bytes and link context
    pub source_hash: String,
}

impl Entry {
    /// URL of the entry page including the base path
    pub fn url(&self, base_url: &str) -> String {
        format!("{}til/{}/", base_url, self.slug)
    }

    /// Relative output path (no leading slash)
    pub fn output_rel_path(&self) -> String {
        format!("til/{}/index.html", self.slug)
    }

    pub fn created_date(&self) -> NaiveDate {
        self.created.date()
    }

    /// True when the modification date falls on a different day than creation
    pub fn was_modified(&self) -> bool {
        self.modified.date() != self.created.date()
    }
}

/// A topic label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    /// Case-normalized key used for deduplication
    pub key: String,

    /// Display name (casing of the first occurrence)
    pub name: String,

    /// URL slug, unique across topics
    pub slug: String,
}

impl Topic {
    pub fn url(&self, base_url: &str) -> String {
        format!("{}topic/{}/", base_url, self.slug)
    }

    pub fn output_rel_path(&self) -> String {
        format!("topic/{}/index.html", self.slug)
    }
}

/// A topic together with the number of entries referencing it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: Topic,
    pub count: usize,
}

/// Corpus-wide statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteStats {
    pub entries: usize,
    pub topics: usize,
    pub first_created: Option<NaiveDateTime>,
    pub last_created: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Info,
    Warning,
    Error,
}

/// A problem found while ingesting the content tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    pub source_path: Option<String>,
    pub slug: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: DiagnosticSeverity, code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity,
            source_path: None,
            slug: None,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, code, message)
    }

    pub fn info(code: &str, message: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Info, code, message)
    }

    pub fn with_source(mut self, source_path: &str) -> Self {
        self.source_path = Some(source_path.to_string());
        self
    }

    pub fn with_slug(mut self, slug: &str) -> Self {
        self.slug = Some(slug.to_string());
        self
    }
}

/// Normalize a topic key (trimmed, lowercase)
pub fn topic_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap()
    }

    fn entry() -> Entry {
        Entry {
            slug: "git-rebase".into(),
            title: "Git Rebase".into(),
            raw_body: String::new(),
            html: String::new(),
            created: ts("2024-01-01 09:00:00"),
            modified: ts("2024-01-01 18:00:00"),
            source: None,
            source_path: "git/rebase.md".into(),
            source_hash: String::new(),
        }
    }

    #[test]
    fn test_entry_url() {
        let e = entry();
        assert_eq!(e.url("/"), "/til/git-rebase/");
        assert_eq!(e.url("/blog/"), "/blog/til/git-rebase/");
        assert_eq!(e.output_rel_path(), "til/git-rebase/index.html");
    }

    #[test]
    fn test_was_modified_compares_dates_only() {
        let same_day = entry();
        assert!(!same_day.was_modified());

        let later = Entry {
            modified: ts("2024-02-03 08:00:00"),
            ..entry()
        };
        assert!(later.was_modified());
    }

    #[test]
    fn test_topic_key() {
        assert_eq!(topic_key("  Python "), "python");
        assert_eq!(topic_key("SQL"), "sql");
    }
}
