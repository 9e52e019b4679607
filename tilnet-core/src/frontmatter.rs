//! Front-matter parsing from markdown files.

use crate::models::FrontMatter;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

const DELIMITER: &str = "---";

/// Raised when a front-matter block is present but cannot be used.
#[derive(Error, Debug)]
pub enum FrontmatterError {
    #[error("Invalid YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Front matter block is never closed")]
    Unterminated,

    #[error("Front matter is not a key/value mapping")]
    NotAMapping,

    #[error("Invalid date in `{field}`: {value}")]
    InvalidDate { field: &'static str, value: String },
}

/// Wire shape of the YAML block before dates are checked
#[derive(Debug, Default, Deserialize)]
struct RawFrontMatter {
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    topics: Option<OneOrMany>,

    #[serde(default, alias = "date")]
    created: Option<serde_yaml::Value>,

    #[serde(default, alias = "updated")]
    modified: Option<serde_yaml::Value>,

    #[serde(default)]
    slug: Option<String>,

    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Parse front matter from markdown content
///
/// Returns a tuple of (front matter, markdown body).
/// If no front matter is present, returns default front matter with the full content as body.
///
/// # Example
///
/// ```
/// use tilnet_core::frontmatter::parse_frontmatter;
///
/// let content = "---\ntitle: My Note\ntopics: [rust]\n---\nHello\n";
///
/// let (fm, body) = parse_frontmatter(content).unwrap();
/// assert_eq!(fm.title.as_deref(), Some("My Note"));
/// assert_eq!(fm.topics, vec!["rust"]);
/// assert_eq!(body, "Hello\n");
/// ```
pub fn parse_frontmatter(content: &str) -> Result<(FrontMatter, String), FrontmatterError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let Some((yaml, body)) = split_block(content)? else {
        return Ok((FrontMatter::default(), content.to_string()));
    };

    if yaml.trim().is_empty() {
        return Ok((FrontMatter::default(), body.to_string()));
    }

    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    if !value.is_mapping() {
        return Err(FrontmatterError::NotAMapping);
    }
    let raw: RawFrontMatter = serde_yaml::from_value(value)?;

    let created = raw
        .created
        .map(|v| parse_timestamp("created", &v))
        .transpose()?;
    let modified = raw
        .modified
        .map(|v| parse_timestamp("modified", &v))
        .transpose()?;

    let frontmatter = FrontMatter {
        title: raw.title,
        topics: raw.topics.map(OneOrMany::into_vec).unwrap_or_default(),
        created,
        modified,
        slug: raw.slug,
        source: raw.source,
    };

    Ok((frontmatter, body.to_string()))
}

/// Split `---` delimited metadata from the body.
///
/// `Ok(None)` means the file has no front-matter block at all.
fn split_block(content: &str) -> Result<Option<(&str, &str)>, FrontmatterError> {
    let mut lines = content.split_inclusive('\n');

    match lines.next() {
        Some(first) if is_delimiter(first) => {}
        _ => return Ok(None),
    }

    let yaml_start = content
        .split_inclusive('\n')
        .next()
        .map(str::len)
        .unwrap_or(0);
    let mut offset = yaml_start;

    for line in lines {
        if is_delimiter(line) {
            let yaml = &content[yaml_start..offset];
            let body = &content[offset + line.len()..];
            return Ok(Some((yaml, body)));
        }
        offset += line.len();
    }

    Err(FrontmatterError::Unterminated)
}

fn is_delimiter(line: &str) -> bool {
    line.trim_end() == DELIMITER
}

fn parse_timestamp(
    field: &'static str,
    value: &serde_yaml::Value,
) -> Result<NaiveDateTime, FrontmatterError> {
    let invalid = |value: String| FrontmatterError::InvalidDate { field, value };

    let serde_yaml::Value::String(raw) = value else {
        return Err(invalid(format!("{:?}", value)));
    };
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }

    for layout in [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, layout) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| invalid(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_frontmatter() {
        let content = r#"---
title: Test Note
topics:
  - rust
  - sqlite
created: 2024-01-01
modified: 2024-02-03 10:30:00
slug: custom-slug
source: https://example.com/post
---

# Hello

Body text."#;

        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Test Note"));
        assert_eq!(fm.topics, vec!["rust", "sqlite"]);
        assert_eq!(
            fm.created.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-01-01 00:00:00"
        );
        assert_eq!(
            fm.modified.unwrap().format("%Y-%m-%d %H:%M:%S").to_string(),
            "2024-02-03 10:30:00"
        );
        assert_eq!(fm.slug.as_deref(), Some("custom-slug"));
        assert_eq!(fm.source.as_deref(), Some("https://example.com/post"));
        assert!(body.contains("# Hello"));
        assert!(body.contains("Body text."));
    }

    #[test]
    fn test_parse_no_frontmatter() {
        let content = "# Just Content\n\nNo front matter here.";
        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, content);
    }

    #[test]
    fn test_empty_block_is_default() {
        let (fm, body) = parse_frontmatter("---\n---\nbody").unwrap();
        assert_eq!(fm, FrontMatter::default());
        assert_eq!(body, "body");
    }

    #[test]
    fn test_single_topic_string() {
        let (fm, _) = parse_frontmatter("---\ntopics: python\n---\n").unwrap();
        assert_eq!(fm.topics, vec!["python"]);
    }

    #[test]
    fn test_date_and_updated_aliases() {
        let content = "---\ndate: 2023-05-06\nupdated: 2023-05-07T08:09:10\n---\n";
        let (fm, _) = parse_frontmatter(content).unwrap();
        assert_eq!(fm.created.unwrap().date().to_string(), "2023-05-06");
        assert_eq!(fm.modified.unwrap().to_string(), "2023-05-07 08:09:10");
    }

    #[test]
    fn test_rfc3339_converted_to_utc() {
        let content = "---\ncreated: 2024-01-01T12:00:00+02:00\n---\n";
        let (fm, _) = parse_frontmatter(content).unwrap();
        assert_eq!(fm.created.unwrap().to_string(), "2024-01-01 10:00:00");
    }

    #[test]
    fn test_crlf_delimiters() {
        let content = "---\r\ntitle: Windows\r\n---\r\nbody\r\n";
        let (fm, body) = parse_frontmatter(content).unwrap();
        assert_eq!(fm.title.as_deref(), Some("Windows"));
        assert_eq!(body, "body\r\n");
    }

    #[test]
    fn test_invalid_yaml() {
        let content = "---\ntitle: Test\ninvalid yaml: [unclosed\n---\n\nContent.";
        assert!(matches!(
            parse_frontmatter(content),
            Err(FrontmatterError::YamlError(_))
        ));
    }

    #[test]
    fn test_non_mapping_block_is_malformed() {
        assert!(matches!(
            parse_frontmatter("---\njust a sentence\n---\nbody"),
            Err(FrontmatterError::NotAMapping)
        ));
        assert!(matches!(
            parse_frontmatter("---\n- a\n- b\n---\nbody"),
            Err(FrontmatterError::NotAMapping)
        ));
    }

    #[test]
    fn test_unterminated_block() {
        let result = parse_frontmatter("---\ntitle: Open\nbody without closing");
        assert!(matches!(result, Err(FrontmatterError::Unterminated)));
    }

    #[test]
    fn test_invalid_date() {
        let result = parse_frontmatter("---\ncreated: yesterday\n---\n");
        match result {
            Err(FrontmatterError::InvalidDate { field, value }) => {
                assert_eq!(field, "created");
                assert_eq!(value, "yesterday");
            }
            other => panic!("expected InvalidDate, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let (fm, _) = parse_frontmatter("---\ntitle: T\ntags: [x]\ndraft: true\n---\n").unwrap();
        assert_eq!(fm.title.as_deref(), Some("T"));
        assert!(fm.topics.is_empty());
    }
}
