//! Build command implementation.

use super::ingest::run_ingest;
use super::render::render_from_store;
use super::{load_config, open_store};
use anyhow::Result;
use std::path::Path;

/// Ingest the content tree, then render the site
pub fn build_site(config_path: &Path, full: bool) -> Result<()> {
    let config = load_config(config_path)?;
    tracing::info!("Building site: {}", config.site.title);

    let mut store = open_store(&config)?;
    let report = run_ingest(&config, &mut store, full)?;
    let summary = render_from_store(&config, &store)?;

    println!(
        "✓ Built {} entries and {} topics ({} skipped, {} removed)",
        summary.entry_pages, summary.topic_pages, report.skipped, report.removed
    );
    Ok(())
}
