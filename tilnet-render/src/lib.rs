//! # tilnet-render
//!
//! Static site rendering for tilnet.
//!
//! Pages are rendered with Askama templates from a store [`Snapshot`] into a
//! [`StagedOutput`], which only replaces the live output directory once every
//! page has been written.
//!
//! [`Snapshot`]: tilnet_core::Snapshot

pub mod feed;
pub mod output;
pub mod site;
pub mod templates;

use std::path::{Path, PathBuf};
use thiserror::Error;

pub use output::StagedOutput;
pub use site::{RenderSummary, SiteRenderer};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Failed to render {page}: {source}")]
    Template {
        page: String,
        #[source]
        source: askama::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize search index: {0}")]
    Json(#[from] serde_json::Error),
}

impl RenderError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
