//! Cross-reference transformation for `[[Target Title]]` and
//! `[[Target Title|display text]]` syntax.
//!
//! Targets are matched against entry titles exactly (case-sensitive).
//! A matching reference becomes a link to the entry page; anything else is
//! rendered as emphasized text so the site never carries a dead href.

use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use std::collections::HashMap;

/// Known entry titles and the slugs they resolve to
#[derive(Debug, Clone, Default)]
pub struct LinkTargets {
    by_title: HashMap<String, String>,
}

impl LinkTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a title. A later registration of the same title wins.
    pub fn insert(&mut self, title: &str, slug: &str) {
        self.by_title.insert(title.to_string(), slug.to_string());
    }

    pub fn resolve(&self, title: &str) -> Option<&str> {
        self.by_title.get(title).map(String::as_str)
    }

    /// Stable digest of every (title, slug) pair.
    ///
    /// Folded into entry fingerprints so that adding or renaming an entry
    /// re-renders the notes that may reference it.
    pub fn digest(&self) -> String {
        let mut pairs: Vec<_> = self.by_title.iter().collect();
        pairs.sort();

        let mut hasher = blake3::Hasher::new();
        for (title, slug) in pairs {
            hasher.update(title.as_bytes());
            hasher.update(&[0]);
            hasher.update(slug.as_bytes());
            hasher.update(&[0]);
        }
        hasher.finalize().to_hex().to_string()
    }
}

/// Result of a wikilink pass
#[derive(Debug, Default)]
pub struct LinkReport {
    /// Slugs of entries this body links to
    pub resolved: Vec<String>,
    /// Target titles that matched no entry
    pub unresolved: Vec<String>,
}

/// Transformer for wikilink syntax
pub struct WikilinkTransformer<'a> {
    targets: &'a LinkTargets,
    base_url: &'a str,
}

impl<'a> WikilinkTransformer<'a> {
    pub fn new(targets: &'a LinkTargets, base_url: &'a str) -> Self {
        Self { targets, base_url }
    }

    /// Transform events, converting `[[wikilinks]]` to links or emphasis
    pub fn transform(&self, events: Vec<Event<'_>>) -> (Vec<Event<'static>>, LinkReport) {
        let mut result = Vec::with_capacity(events.len());
        let mut report = LinkReport::default();
        let mut in_code_block = false;
        let mut pending_text = String::new();

        for event in events {
            match event {
                Event::Text(text) if !in_code_block => {
                    // pulldown-cmark splits "[[" into several text events
                    pending_text.push_str(&text);
                    continue;
                }
                other => {
                    self.flush(&mut pending_text, &mut result, &mut report);
                    match &other {
                        Event::Start(Tag::CodeBlock(_)) => in_code_block = true,
                        Event::End(TagEnd::CodeBlock) => in_code_block = false,
                        _ => {}
                    }
                    result.push(other.into_static());
                }
            }
        }
        self.flush(&mut pending_text, &mut result, &mut report);

        (result, report)
    }

    fn flush(
        &self,
        pending: &mut String,
        result: &mut Vec<Event<'static>>,
        report: &mut LinkReport,
    ) {
        if pending.is_empty() {
            return;
        }
        let text = std::mem::take(pending);
        if text.contains("[[") && text.contains("]]") {
            self.process_wikilinks(&text, result, report);
        } else {
            result.push(Event::Text(CowStr::from(text)));
        }
    }

    fn process_wikilinks(
        &self,
        text: &str,
        events: &mut Vec<Event<'static>>,
        report: &mut LinkReport,
    ) {
        let mut remaining = text;

        while let Some(start) = remaining.find("[[") {
            let Some(len) = remaining[start + 2..].find("]]") else {
                break;
            };

            if start > 0 {
                events.push(Event::Text(CowStr::from(remaining[..start].to_string())));
            }

            let inner = &remaining[start + 2..start + 2 + len];
            self.push_reference(inner, events, report);
            remaining = &remaining[start + 2 + len + 2..];
        }

        if !remaining.is_empty() {
            events.push(Event::Text(CowStr::from(remaining.to_string())));
        }
    }

    fn push_reference(
        &self,
        inner: &str,
        events: &mut Vec<Event<'static>>,
        report: &mut LinkReport,
    ) {
        let (target, display) = match inner.split_once('|') {
            Some((target, display)) => (target.trim(), display.trim()),
            None => (inner.trim(), inner.trim()),
        };

        match self.targets.resolve(target) {
            Some(slug) => {
                events.push(Event::Start(Tag::Link {
                    link_type: LinkType::Inline,
                    dest_url: CowStr::from(format!("{}til/{}/", self.base_url, slug)),
                    title: CowStr::Borrowed(""),
                    id: CowStr::Borrowed(""),
                }));
                events.push(Event::Text(CowStr::from(display.to_string())));
                events.push(Event::End(TagEnd::Link));
                report.resolved.push(slug.to_string());
            }
            None => {
                events.push(Event::Start(Tag::Emphasis));
                events.push(Event::Text(CowStr::from(display.to_string())));
                events.push(Event::End(TagEnd::Emphasis));
                report.unresolved.push(target.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> LinkTargets {
        let mut targets = LinkTargets::new();
        targets.insert("Rust Safety", "rust-safety");
        targets
    }

    fn link_href(events: &[Event<'_>]) -> Option<String> {
        events.iter().find_map(|event| match event {
            Event::Start(Tag::Link { dest_url, .. }) => Some(dest_url.to_string()),
            _ => None,
        })
    }

    #[test]
    fn test_existing_title_becomes_link() {
        let targets = targets();
        let transformer = WikilinkTransformer::new(&targets, "/");
        let events = vec![Event::Text(CowStr::Borrowed("Check out [[Rust Safety]]"))];

        let (result, report) = transformer.transform(events);

        assert_eq!(report.resolved, vec!["rust-safety"]);
        assert_eq!(link_href(&result).as_deref(), Some("/til/rust-safety/"));
    }

    #[test]
    fn test_match_is_case_sensitive() {
        let targets = targets();
        let transformer = WikilinkTransformer::new(&targets, "/");
        let events = vec![Event::Text(CowStr::Borrowed("See [[rust safety]]"))];

        let (result, report) = transformer.transform(events);

        assert!(link_href(&result).is_none());
        assert_eq!(report.unresolved, vec!["rust safety"]);
        assert!(result
            .iter()
            .any(|e| matches!(e, Event::Start(Tag::Emphasis))));
    }

    #[test]
    fn test_display_text_after_pipe() {
        let targets = targets();
        let transformer = WikilinkTransformer::new(&targets, "/notes/");
        let events = vec![Event::Text(CowStr::Borrowed(
            "See [[Rust Safety|this guide]]",
        ))];

        let (result, _) = transformer.transform(events);

        assert_eq!(link_href(&result).as_deref(), Some("/notes/til/rust-safety/"));
        assert!(result
            .iter()
            .any(|e| matches!(e, Event::Text(t) if t.as_ref() == "this guide")));
    }

    #[test]
    fn test_split_text_events_are_merged() {
        let targets = targets();
        let transformer = WikilinkTransformer::new(&targets, "/");
        let events = vec![
            Event::Text(CowStr::Borrowed("[")),
            Event::Text(CowStr::Borrowed("[Rust Safety")),
            Event::Text(CowStr::Borrowed("]")),
            Event::Text(CowStr::Borrowed("]")),
        ];

        let (_, report) = transformer.transform(events);
        assert_eq!(report.resolved, vec!["rust-safety"]);
    }

    #[test]
    fn test_code_blocks_are_untouched() {
        let targets = targets();
        let transformer = WikilinkTransformer::new(&targets, "/");
        let events = vec![
            Event::Start(Tag::CodeBlock(pulldown_cmark::CodeBlockKind::Indented)),
            Event::Text(CowStr::Borrowed("[[Rust Safety]]")),
            Event::End(TagEnd::CodeBlock),
        ];

        let (result, report) = transformer.transform(events);
        assert!(report.resolved.is_empty());
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn test_unclosed_reference_is_literal() {
        let targets = targets();
        let transformer = WikilinkTransformer::new(&targets, "/");
        let events = vec![Event::Text(CowStr::Borrowed("a [[b]] c [[d"))];

        let (result, report) = transformer.transform(events);
        assert_eq!(report.unresolved, vec!["b"]);
        assert!(matches!(result.last(), Some(Event::Text(t)) if t.as_ref() == " c [[d"));
    }

    #[test]
    fn test_digest_changes_with_targets() {
        let a = targets();
        let mut b = targets();
        assert_eq!(a.digest(), b.digest());
        b.insert("Ownership", "ownership");
        assert_ne!(a.digest(), b.digest());
    }
}
