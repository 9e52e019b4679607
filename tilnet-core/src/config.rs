//! Configuration parsing and management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "tilnet.yml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Invalid ignore pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Main configuration struct matching the tilnet.yml schema
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub site: SiteConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Number of entries listed on the home page
    #[serde(default = "default_page_size")]
    pub home_entries: usize,

    /// Number of entries in the Atom feed
    #[serde(default = "default_page_size")]
    pub feed_entries: usize,

    /// Related entries shown on each entry page
    #[serde(default = "default_related")]
    pub related_entries: usize,

    /// Regexes matched against content-relative paths
    #[serde(default)]
    pub ignore_patterns: Vec<String>,

    /// Treat slug collisions as fatal
    #[serde(default)]
    pub strict_slugs: bool,

    /// Delete stored entries whose source file has disappeared
    #[serde(default = "default_true")]
    pub prune_missing: bool,

    // Path to the config file, for relative path resolution
    #[serde(skip)]
    config_path: Option<PathBuf>,
}

fn default_base_url() -> String {
    String::from("/")
}

fn default_page_size() -> usize {
    20
}

fn default_related() -> usize {
    5
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    pub title: String,

    #[serde(default)]
    pub author: String,

    #[serde(default)]
    pub description: String,

    /// Absolute site URL used for feed ids and links
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_content_dir")]
    pub content: PathBuf,

    #[serde(default = "default_output_dir")]
    pub output: PathBuf,

    #[serde(default = "default_database")]
    pub database: PathBuf,

    #[serde(default = "default_static_dir", rename = "static")]
    pub static_dir: PathBuf,
}

fn default_content_dir() -> PathBuf {
    PathBuf::from("content")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("_site")
}

fn default_database() -> PathBuf {
    PathBuf::from("til.db")
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            content: default_content_dir(),
            output: default_output_dir(),
            database: default_database(),
            static_dir: default_static_dir(),
        }
    }
}

impl Config {
    /// Build a config with defaults for everything except the site title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            site: SiteConfig {
                title: title.into(),
                author: String::new(),
                description: String::new(),
                url: String::new(),
            },
            paths: PathsConfig::default(),
            base_url: default_base_url(),
            home_entries: default_page_size(),
            feed_entries: default_page_size(),
            related_entries: default_related(),
            ignore_patterns: Vec::new(),
            strict_slugs: false,
            prune_missing: true,
            config_path: None,
        }
    }

    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&contents)?;

        config.config_path = Some(path.to_path_buf());
        config.compile_ignore_patterns()?;

        Ok(config)
    }

    /// Anchor relative paths at `root` instead of the config file location
    pub fn with_root(mut self, root: &Path) -> Self {
        self.config_path = Some(root.join(CONFIG_FILE_NAME));
        self
    }

    pub fn content_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.content)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.output)
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve_path(&self.paths.database)
    }

    pub fn static_dir(&self) -> PathBuf {
        self.resolve_path(&self.paths.static_dir)
    }

    /// Resolve a path relative to the config file location
    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match self.config_path.as_deref().and_then(Path::parent) {
            Some(parent) => parent.join(path),
            None => path.to_path_buf(),
        }
    }

    /// Compile `ignore_patterns`, failing on the first invalid regex
    pub fn compile_ignore_patterns(&self) -> Result<Vec<regex::Regex>, ConfigError> {
        self.ignore_patterns
            .iter()
            .map(|pattern| {
                regex::Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect()
    }

    /// Normalized base URL with leading and trailing slash ("/foo/" or "/")
    pub fn normalized_base_url(&self) -> String {
        normalize_base_url(&self.base_url)
    }
}

/// Ensure base URLs have a leading and trailing slash
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "/".to_string();
    }

    let mut s = trimmed.to_string();
    if !s.starts_with('/') {
        s.insert(0, '/');
    }
    if !s.ends_with('/') {
        s.push('/');
    }

    while s.contains("//") {
        s = s.replace("//", "/");
    }

    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: Config = serde_yaml::from_str("site:\n  title: My TIL\n").unwrap();
        assert_eq!(config.site.title, "My TIL");
        assert_eq!(config.paths.content, PathBuf::from("content"));
        assert_eq!(config.paths.output, PathBuf::from("_site"));
        assert_eq!(config.paths.database, PathBuf::from("til.db"));
        assert_eq!(config.home_entries, 20);
        assert_eq!(config.feed_entries, 20);
        assert_eq!(config.related_entries, 5);
        assert!(config.prune_missing);
        assert!(!config.strict_slugs);
    }

    #[test]
    fn test_paths_resolve_relative_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            "site:\n  title: T\npaths:\n  content: notes\n  static: assets\n",
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.content_dir(), dir.path().join("notes"));
        assert_eq!(config.static_dir(), dir.path().join("assets"));
        assert_eq!(config.output_dir(), dir.path().join("_site"));
    }

    #[test]
    fn test_invalid_ignore_pattern_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "site:\n  title: T\nignore_patterns: ['(']\n").unwrap();

        assert!(matches!(
            Config::from_file(&path),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_missing_title_is_an_error() {
        let result: Result<Config, _> = serde_yaml::from_str("paths:\n  content: x\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url(""), "/");
        assert_eq!(normalize_base_url("blog"), "/blog/");
        assert_eq!(normalize_base_url("/blog//notes"), "/blog/notes/");
        assert_eq!(normalize_base_url("/"), "/");
    }
}
