//! JSON search index consumed by the client-side search page.

use crate::markdown::{html_to_text, truncate_on_word};
use crate::models::{Entry, Topic};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Characters of plain text kept per record
pub const CONTENT_LIMIT: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Position in the index (stable only within a build)
    pub id: usize,
    pub title: String,
    pub content: String,
    pub topics: Vec<String>,
    pub url: String,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchIndex {
    pub entries: Vec<SearchRecord>,
    pub metadata: SearchMetadata,
}

impl SearchIndex {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Build one record per entry; `topics` is aligned with `entries`
pub fn build_search_index(entries: &[Entry], topics: &[Vec<Topic>], base_url: &str) -> SearchIndex {
    let records: Vec<SearchRecord> = entries
        .iter()
        .enumerate()
        .map(|(id, entry)| SearchRecord {
            id,
            title: entry.title.clone(),
            content: truncate_on_word(&html_to_text(&entry.html), CONTENT_LIMIT),
            topics: topics
                .get(id)
                .map(|ts| ts.iter().map(|t| t.name.clone()).collect())
                .unwrap_or_default(),
            url: entry.url(base_url),
            created: entry.created,
            modified: entry.modified,
        })
        .collect();

    SearchIndex {
        metadata: SearchMetadata {
            count: records.len(),
        },
        entries: records,
    }
}
