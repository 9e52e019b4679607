//! # tilnet-core
//!
//! Core library for the tilnet "Today I Learned" publisher.
//!
//! This crate parses markdown notes with front matter, builds the content
//! model (slugs, topics, cross-references), persists it in SQLite and emits
//! the JSON search index.

pub mod config;
pub mod content;
pub mod frontmatter;
pub mod ingest;
pub mod markdown;
pub mod models;
pub mod search;
pub mod slug;
pub mod store;

pub use config::Config;
pub use content::{EntryDraft, SourceFile};
pub use ingest::{IngestError, IngestReport, Ingestor};
pub use markdown::{LinkTargets, MarkdownProcessor};
pub use models::{
    Diagnostic, DiagnosticSeverity, Entry, FrontMatter, SiteStats, Topic, TopicCount,
};
pub use search::{build_search_index, SearchIndex, SearchRecord};
pub use slug::slugify;
pub use store::{Snapshot, Store, StoreError, UpsertOutcome};
