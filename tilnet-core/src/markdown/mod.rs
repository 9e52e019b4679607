//! Markdown processing pipeline with cross-reference and highlighting passes.

pub mod highlight;
pub mod wikilinks;

use crate::slug::slugify;
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;

pub use highlight::HighlightTransformer;
pub use wikilinks::{LinkReport, LinkTargets, WikilinkTransformer};

/// Output of a markdown conversion
#[derive(Debug, Default)]
pub struct RenderedMarkdown {
    pub html: String,
    pub links: LinkReport,
}

/// Markdown processor with custom extensions
pub struct MarkdownProcessor {
    options: Options,
}

impl MarkdownProcessor {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        Self { options }
    }

    /// Convert markdown to HTML, resolving `[[cross references]]` against `targets`
    pub fn convert(
        &self,
        markdown: &str,
        targets: &LinkTargets,
        base_url: &str,
    ) -> RenderedMarkdown {
        if markdown.trim().is_empty() {
            return RenderedMarkdown::default();
        }

        let events: Vec<Event> = Parser::new_ext(markdown, self.options).collect();

        let (events, links) = WikilinkTransformer::new(targets, base_url).transform(events);
        let events = attach_heading_ids(events);
        let events = HighlightTransformer::new().transform(events);

        let mut html_output = String::new();
        html::push_html(&mut html_output, events.into_iter());

        RenderedMarkdown {
            html: html_output,
            links,
        }
    }

    /// Resolve `[[cross references]]` against `targets` without producing HTML
    pub fn scan_links(&self, markdown: &str, targets: &LinkTargets) -> LinkReport {
        if markdown.trim().is_empty() {
            return LinkReport::default();
        }

        let events: Vec<Event> = Parser::new_ext(markdown, self.options).collect();
        let (_, links) = WikilinkTransformer::new(targets, "/").transform(events);
        links
    }

    /// Convert markdown to HTML without any known cross-reference targets
    pub fn convert_simple(&self, markdown: &str) -> String {
        self.convert(markdown, &LinkTargets::new(), "/").html
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// Give every heading without an explicit `{#id}` a slug id, unique within the page
fn attach_heading_ids(events: Vec<Event<'static>>) -> Vec<Event<'static>> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(events.len());
    let mut open: Option<(usize, String)> = None;

    for event in events {
        match &event {
            Event::Start(Tag::Heading { id, .. }) => {
                if let Some(id) = id {
                    seen.entry(id.to_string()).or_insert(1);
                } else {
                    open = Some((result.len(), String::new()));
                }
            }
            Event::Text(text) | Event::Code(text) => {
                if let Some((_, title)) = open.as_mut() {
                    title.push_str(text);
                }
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((start, title)) = open.take() {
                    let id = unique_id(&mut seen, &title);
                    if let Event::Start(Tag::Heading { id: slot, .. }) = &mut result[start] {
                        *slot = Some(CowStr::from(id));
                    }
                }
            }
            _ => {}
        }
        result.push(event);
    }

    result
}

fn unique_id(seen: &mut HashMap<String, usize>, title: &str) -> String {
    let base = match slugify(title) {
        s if s.is_empty() => "section".to_string(),
        s => s,
    };
    let count = seen.entry(base.clone()).or_insert(0);
    *count += 1;
    if *count == 1 {
        base
    } else {
        format!("{}-{}", base, *count - 1)
    }
}

pub(crate) fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Strip tags from rendered HTML and collapse whitespace
pub fn html_to_text(html: &str) -> String {
    let mut result = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                result.push(' ');
            }
            '>' if in_tag => {
                in_tag = false;
                result.push(' ');
            }
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }

    result
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cut `text` to at most `max_chars` characters, preferring a word boundary
pub fn truncate_on_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();
    // Only break on a space in the last 30% of the window
    let min_break = max_chars * 7 / 10;
    match truncated.rfind(' ') {
        Some(pos) if truncated[..pos].chars().count() > min_break => {
            format!("{}...", &truncated[..pos])
        }
        _ => format!("{}...", truncated),
    }
}
