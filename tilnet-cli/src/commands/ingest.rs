//! Ingest command implementation.

use super::{load_config, open_store};
use anyhow::{Context, Result};
use std::path::Path;
use tilnet_core::{Config, IngestReport, Ingestor, Store};

/// Load the content tree into the database
pub fn ingest_content(config_path: &Path, full: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let mut store = open_store(&config)?;
    let report = run_ingest(&config, &mut store, full)?;

    println!(
        "✓ {} entries ({} new, {} updated, {} unchanged, {} removed, {} skipped)",
        report.entries(),
        report.inserted,
        report.updated,
        report.unchanged,
        report.removed,
        report.skipped
    );
    Ok(())
}

pub(crate) fn run_ingest(config: &Config, store: &mut Store, full: bool) -> Result<IngestReport> {
    let report = Ingestor::new(config)
        .full(full)
        .run(store)
        .context("Failed to ingest content")?;

    for diag in &report.diagnostics {
        let source = diag.source_path.as_deref().unwrap_or("-");
        match diag.severity {
            tilnet_core::DiagnosticSeverity::Info => {
                tracing::debug!("{} {}: {}", diag.code, source, diag.message)
            }
            _ => tracing::warn!("{} {}: {}", diag.code, source, diag.message),
        }
    }

    Ok(report)
}
