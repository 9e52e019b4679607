//! Turning parsed source files into entries.
//!
//! A [`SourceFile`] is read from disk, its front matter split off, and the
//! result resolved into an [`EntryDraft`] carrying the final title, slug,
//! topics and timestamps. Drafts are rendered to [`Entry`] values only once
//! every title in the corpus is known, so that cross-references resolve.

use crate::markdown::{LinkReport, LinkTargets, MarkdownProcessor};
use crate::models::{topic_key, Entry, FrontMatter, TIMESTAMP_FORMAT};
use crate::slug::{slugify, title_from_stem};
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A markdown file read from the content tree
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the content root, with `/` separators
    pub rel_path: String,
    pub content: String,
    /// File modification time in UTC, whole seconds
    pub modified: NaiveDateTime,
}

impl SourceFile {
    pub fn read(root: &Path, path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mtime = std::fs::metadata(path)?.modified()?;
        let modified = DateTime::<Utc>::from(mtime).naive_utc();

        Ok(Self {
            path: path.to_path_buf(),
            rel_path: relative_path(root, path),
            content,
            modified: modified.with_nanosecond(0).unwrap_or(modified),
        })
    }

    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
    }

    /// blake3 of the raw file contents
    pub fn content_hash(&self) -> String {
        blake3::hash(self.content.as_bytes()).to_hex().to_string()
    }
}

pub(crate) fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Entry metadata resolved from a source file, before markdown rendering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryDraft {
    pub slug: String,
    pub title: String,
    /// Display names, deduplicated case-insensitively, in front-matter order
    pub topics: Vec<String>,
    pub body: String,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
    pub source: Option<String>,
    pub source_path: String,
    pub content_hash: String,
}

impl EntryDraft {
    /// Apply the title, slug, topic and timestamp fallback chains
    pub fn from_source(source: &SourceFile, frontmatter: FrontMatter, body: String) -> Self {
        let title = frontmatter
            .title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| first_heading(&body))
            .unwrap_or_else(|| title_from_stem(source.stem()));

        let slug = [frontmatter.slug.as_deref(), Some(title.as_str()), Some(source.stem())]
            .into_iter()
            .flatten()
            .map(slugify)
            .find(|s| !s.is_empty())
            .unwrap_or_else(|| "untitled".to_string());

        let created = frontmatter.created.unwrap_or(source.modified);
        let modified = frontmatter.modified.unwrap_or(created);

        Self {
            slug,
            title,
            topics: normalize_topics(&frontmatter.topics),
            body,
            created,
            modified,
            source: frontmatter.source.filter(|s| !s.trim().is_empty()),
            source_path: source.rel_path.clone(),
            content_hash: source.content_hash(),
        }
    }

    /// Fingerprint of everything that feeds into the stored entry.
    ///
    /// Resolved timestamps are included, so touching a file whose dates come
    /// from its mtime changes the fingerprint.
    pub fn fingerprint(&self, targets: &LinkTargets, base_url: &str) -> String {
        let created = self.created.format(TIMESTAMP_FORMAT).to_string();
        let modified = self.modified.format(TIMESTAMP_FORMAT).to_string();

        let mut hasher = blake3::Hasher::new();
        for part in [
            self.content_hash.as_str(),
            self.source_path.as_str(),
            created.as_str(),
            modified.as_str(),
            base_url,
            targets.digest().as_str(),
        ] {
            hasher.update(part.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Render a draft's markdown with cross-references resolved against `targets`
pub fn render_entry(
    processor: &MarkdownProcessor,
    draft: &EntryDraft,
    targets: &LinkTargets,
    base_url: &str,
) -> (Entry, LinkReport) {
    let rendered = processor.convert(&draft.body, targets, base_url);

    let entry = Entry {
        slug: draft.slug.clone(),
        title: draft.title.clone(),
        raw_body: draft.body.clone(),
        html: rendered.html,
        created: draft.created,
        modified: draft.modified,
        source: draft.source.clone(),
        source_path: draft.source_path.clone(),
        source_hash: draft.fingerprint(targets, base_url),
    };

    (entry, rendered.links)
}

/// Trim, drop empties, and dedupe case-insensitively keeping the first casing
pub fn normalize_topics(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(topic_key(t)))
        .map(str::to_string)
        .collect()
}

/// Text of the first level-1 ATX heading outside fenced code
pub fn first_heading(body: &str) -> Option<String> {
    let mut fence: Option<&str> = None;

    for line in body.lines() {
        let trimmed = line.trim_start();
        let indent = line.len() - trimmed.len();

        if let Some(marker) = fence {
            if trimmed.starts_with(marker) {
                fence = None;
            }
            continue;
        }
        if indent <= 3 {
            if trimmed.starts_with("```") {
                fence = Some("```");
                continue;
            }
            if trimmed.starts_with("~~~") {
                fence = Some("~~~");
                continue;
            }
        }
        if indent > 3 {
            continue;
        }

        let level = trimmed.chars().take_while(|&c| c == '#').count();
        if level != 1 {
            continue;
        }
        let rest = &trimmed[1..];
        if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
            continue;
        }

        let text = rest.trim().trim_end_matches('#').trim_end();
        if !text.is_empty() {
            return Some(text.to_string());
        }
    }

    None
}
