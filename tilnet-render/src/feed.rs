//! Atom feed generation.

use chrono::NaiveDateTime;
use tilnet_core::{Config, Entry};

/// Render the Atom feed for `entries`, which must already be newest first.
///
/// `<updated>` is the newest modification time in the feed so the output
/// depends only on content.
pub fn generate_atom(config: &Config, entries: &[&Entry], base_url: &str) -> String {
    let site_root = absolute_url(&config.site.url, base_url, "");
    let updated = entries
        .iter()
        .map(|e| e.modified)
        .max()
        .map(atom_timestamp)
        .unwrap_or_else(|| "1970-01-01T00:00:00Z".to_string());

    let mut items = String::new();
    for entry in entries {
        let link = absolute_url(&config.site.url, base_url, &format!("til/{}/", entry.slug));
        items.push_str("  <entry>\n");
        items.push_str(&format!("    <title>{}</title>\n", escape_xml(&entry.title)));
        items.push_str(&format!("    <link href=\"{}\"/>\n", escape_xml(&link)));
        items.push_str(&format!("    <id>{}</id>\n", escape_xml(&link)));
        items.push_str(&format!(
            "    <published>{}</published>\n",
            atom_timestamp(entry.created)
        ));
        items.push_str(&format!(
            "    <updated>{}</updated>\n",
            atom_timestamp(entry.modified)
        ));
        items.push_str(&format!(
            "    <content type=\"html\">{}</content>\n",
            escape_xml(&entry.html)
        ));
        items.push_str("  </entry>\n");
    }

    let author = if config.site.author.is_empty() {
        String::new()
    } else {
        format!(
            "  <author><name>{}</name></author>\n",
            escape_xml(&config.site.author)
        )
    };

    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>{title}</title>
  <subtitle>{subtitle}</subtitle>
  <link href="{self_link}" rel="self"/>
  <link href="{root}"/>
  <id>{root}</id>
  <updated>{updated}</updated>
{author}{items}</feed>
"#,
        title = escape_xml(&config.site.title),
        subtitle = escape_xml(&config.site.description),
        self_link = escape_xml(&absolute_url(&config.site.url, base_url, "feed.atom")),
        root = escape_xml(&site_root),
        updated = updated,
        author = author,
        items = items,
    )
}

fn atom_timestamp(ts: NaiveDateTime) -> String {
    ts.and_utc().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Join the configured site URL, base path and a relative path
pub fn absolute_url(site_url: &str, base_url: &str, rel: &str) -> String {
    let root = site_url.trim_end_matches('/');
    let base = base_url.trim_matches('/');
    let rel = rel.trim_start_matches('/');

    let mut url = root.to_string();
    if !base.is_empty() {
        url.push('/');
        url.push_str(base);
    }
    url.push('/');
    url.push_str(rel);
    url
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
