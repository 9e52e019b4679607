//! CLI command implementations.

pub mod build;
pub mod ingest;
pub mod init;
pub mod render;
pub mod topics;
pub mod verify;

pub use build::build_site;
pub use ingest::ingest_content;
pub use init::init_project;
pub use render::render_site;
pub use topics::list_topics;
pub use verify::verify_site;

use anyhow::{Context, Result};
use std::path::Path;
use tilnet_core::{Config, Store};

pub(crate) fn load_config(config_path: &Path) -> Result<Config> {
    tracing::debug!("Loading config from {:?}", config_path);
    Config::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))
}

pub(crate) fn open_store(config: &Config) -> Result<Store> {
    let path = config.database_path();
    Store::open(&path).with_context(|| format!("Failed to open database {:?}", path))
}
