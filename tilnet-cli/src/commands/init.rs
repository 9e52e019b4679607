//! Init command implementation.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tilnet_core::config::CONFIG_FILE_NAME;

const DEFAULT_CONFIG: &str = include_str!("../../../tilnet.yml.example");

/// Initialize a new tilnet project
pub fn init_project(path: Option<&Path>) -> Result<()> {
    let root = path.unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(root).with_context(|| format!("Failed to create {:?}", root))?;

    write_config(root)?;
    scaffold_content(root)?;

    println!("✓ tilnet initialized in {:?}", root);
    println!("  - Edit {} to customize site metadata", CONFIG_FILE_NAME);
    println!("  - Write notes in content/, then run `tilnet build`");
    Ok(())
}

fn write_config(root: &Path) -> Result<()> {
    let config_path = root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        println!("{} already exists at {:?}", CONFIG_FILE_NAME, config_path);
        return Ok(());
    }

    fs::write(&config_path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {:?}", config_path))?;
    println!("Created {:?}", config_path);
    Ok(())
}

fn scaffold_content(root: &Path) -> Result<()> {
    let content = root.join("content");
    let drafts = content.join("drafts");
    let static_dir = root.join("static");

    for dir in [&content, &drafts, &static_dir] {
        fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }

    let sample = content.join("welcome.md");
    if !sample.exists() {
        fs::write(&sample, SAMPLE_NOTE)
            .with_context(|| format!("Failed to write {:?}", sample))?;
        println!("Created {:?}", sample);
    }

    Ok(())
}

const SAMPLE_NOTE: &str = r#"---
title: Welcome to tilnet
created: 2025-01-01
topics: [tilnet, meta]
---

Each markdown file under `content/` becomes one entry. Edit `tilnet.yml` to
update site metadata, then run:

```bash
tilnet build
```

Tag entries with `topics` in the front matter and cross-reference them with
`[[Welcome to tilnet]]`. Files under `content/drafts/` are ignored.
"#;
