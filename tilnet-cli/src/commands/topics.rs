//! Topics command implementation.

use super::{load_config, open_store};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct TopicRow<'a> {
    name: &'a str,
    slug: &'a str,
    count: usize,
}

/// Print the topic cloud from the database
pub fn list_topics(config_path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let cloud = store.topic_cloud().context("Failed to query topics")?;

    if json {
        let rows: Vec<TopicRow> = cloud
            .iter()
            .map(|tc| TopicRow {
                name: &tc.topic.name,
                slug: &tc.topic.slug,
                count: tc.count,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else if cloud.is_empty() {
        println!("No topics yet");
    } else {
        for tc in &cloud {
            println!("{} ({})", tc.topic.name, tc.count);
        }
    }

    Ok(())
}
