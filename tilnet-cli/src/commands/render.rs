//! Render command implementation.

use super::{load_config, open_store};
use anyhow::{Context, Result};
use include_dir::{include_dir, Dir};
use std::fs;
use std::path::Path;
use tilnet_core::{Config, Store};
use tilnet_render::{RenderSummary, SiteRenderer, StagedOutput};
use walkdir::WalkDir;

// Embed default assets so they are available after cargo install
static STATIC_ASSETS: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/static");

const STATIC_PREFIX: &str = "static";

/// Render the site from the current database
pub fn render_site(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let store = open_store(&config)?;
    let summary = render_from_store(&config, &store)?;

    println!(
        "✓ Rendered {} entries and {} topics to {:?}",
        summary.entry_pages,
        summary.topic_pages,
        config.output_dir()
    );
    Ok(())
}

/// Render every page into a staging directory and swap it into place
pub(crate) fn render_from_store(config: &Config, store: &Store) -> Result<RenderSummary> {
    let snapshot = store
        .snapshot(config.related_entries)
        .context("Failed to read database")?;

    let output_dir = config.output_dir();
    let output = StagedOutput::new(&output_dir).context("Failed to create staging directory")?;

    let summary = SiteRenderer::new(config)
        .render(&snapshot, &output)
        .context("Failed to render site")?;
    copy_assets(config, &output)?;

    output
        .commit()
        .with_context(|| format!("Failed to replace {:?}", output_dir))?;

    tracing::info!("✓ Output written to {:?}", output_dir);
    Ok(summary)
}

/// Embedded defaults first, then the project's static directory on top
fn copy_assets(config: &Config, output: &StagedOutput) -> Result<()> {
    for file in STATIC_ASSETS.files() {
        let rel = format!("{}/{}", STATIC_PREFIX, file.path().to_string_lossy());
        output
            .write(&rel, file.contents())
            .with_context(|| format!("Failed to write embedded asset {}", rel))?;
    }

    let static_dir = config.static_dir();
    if !static_dir.is_dir() {
        return Ok(());
    }

    for entry in WalkDir::new(&static_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let relative = entry
            .path()
            .strip_prefix(&static_dir)
            .unwrap_or(entry.path())
            .to_string_lossy()
            .replace('\\', "/");
        let contents = fs::read(entry.path())
            .with_context(|| format!("Failed to read {:?}", entry.path()))?;
        output
            .write(&format!("{}/{}", STATIC_PREFIX, relative), contents)
            .with_context(|| format!("Failed to copy {:?}", entry.path()))?;
    }

    Ok(())
}
