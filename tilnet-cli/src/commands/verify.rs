//! Verify the content tree and emit diagnostics.

use super::load_config;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tilnet_core::{Diagnostic, DiagnosticSeverity, Ingestor};

#[derive(Serialize)]
struct VerificationSummary<'a> {
    files: usize,
    entries: usize,
    errors: usize,
    warnings: usize,
    infos: usize,
    diagnostics: &'a [Diagnostic],
}

/// Parse every note without writing the database or output and surface diagnostics.
pub fn verify_site(config_path: &Path, json: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let report = Ingestor::new(&config)
        .verify()
        .context("Failed to verify content")?;

    let diagnostics = &report.diagnostics;
    let count = |severity| diagnostics.iter().filter(|d| d.severity == severity).count();

    let summary = VerificationSummary {
        files: report.discovered,
        entries: report.discovered - report.skipped,
        errors: count(DiagnosticSeverity::Error),
        warnings: count(DiagnosticSeverity::Warning),
        infos: count(DiagnosticSeverity::Info),
        diagnostics,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "Verification complete: {} entries, {} errors, {} warnings, {} info",
            summary.entries, summary.errors, summary.warnings, summary.infos
        );
        for diag in diagnostics {
            let slug = diag
                .slug
                .as_deref()
                .map(|s| format!(" [{}]", s))
                .unwrap_or_default();
            let source = diag
                .source_path
                .as_deref()
                .map(|s| format!(" ({})", s))
                .unwrap_or_default();
            println!(
                "- {:?} {}{}{}: {}",
                diag.severity, diag.code, slug, source, diag.message
            );
        }
    }

    Ok(())
}
