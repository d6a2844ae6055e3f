//! Configuration loading and validation.
//!
//! Handles loading configuration from YAML files with environment variable
//! interpolation, and validates the partitioning constraints before any
//! generation I/O happens.

mod vars;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use snafu::prelude::*;
use url::Url;

use crate::error::{
    BatchExceedsSitemapCapSnafu, ConfigError, EnvInterpolationSnafu, InvalidBaseUrlSnafu,
    MaxPerSitemapTooSmallSnafu, MissingBaseUrlSnafu, MissingDocumentRootSnafu, ReadFileSnafu,
    YamlParseSnafu, ZeroBatchSizeSnafu,
};

/// Default number of records fetched per batch.
pub const DEFAULT_BATCH_SIZE: u64 = 1001;

/// Default entry cap per sitemap file, per the sitemaps.org protocol.
pub const DEFAULT_MAX_PER_SITEMAP: u64 = 50_000;

/// Main configuration for a generation run.
///
/// Immutable once a [`Generator`](crate::Generator) is constructed from it;
/// there are no mutable global defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Absolute base URL all entry locations are joined onto.
    pub base_url: String,

    /// Local directory the web path is served from.
    pub document_root: PathBuf,

    /// Web path under the document root where sitemaps are published
    /// (default: "sitemaps").
    #[serde(default = "default_path")]
    pub path: String,

    /// Number of records fetched per batch (default: 1001).
    #[serde(default = "default_batch_size")]
    pub batch_size: u64,

    /// Maximum entries per sitemap file (default: 50000).
    #[serde(default = "default_max_per_sitemap")]
    pub max_per_sitemap: u64,

    /// Whether output files are gzip compressed (default: true).
    #[serde(default = "default_gzip")]
    pub gzip: bool,

    /// Indentation width in spaces for the XML output (default: 2).
    #[serde(default = "default_indent")]
    pub indent: usize,

    /// Partial update mode: keep already-published files and only
    /// regenerate from the resume point onward (default: false).
    #[serde(default)]
    pub partial_update: bool,

    /// Sources defined in the config file, consumed by the CLI binary.
    /// Library callers typically register sources programmatically instead.
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
}

/// A file-backed source declared in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    /// Source name, used in output filenames (`sitemap_<name>.xml`).
    pub name: String,

    /// Web path segment joined between the base URL and each location.
    pub path: String,

    /// Text file with one location per line.
    pub urls_file: PathBuf,
}

fn default_path() -> String {
    "sitemaps".to_string()
}

fn default_batch_size() -> u64 {
    DEFAULT_BATCH_SIZE
}

fn default_max_per_sitemap() -> u64 {
    DEFAULT_MAX_PER_SITEMAP
}

fn default_gzip() -> bool {
    true
}

fn default_indent() -> usize {
    2
}

impl Config {
    /// Create a configuration with defaults for everything but the two
    /// required options.
    pub fn new(base_url: impl Into<String>, document_root: impl Into<PathBuf>) -> Self {
        Self {
            base_url: base_url.into(),
            document_root: document_root.into(),
            path: default_path(),
            batch_size: default_batch_size(),
            max_per_sitemap: default_max_per_sitemap(),
            gzip: default_gzip(),
            indent: default_indent(),
            partial_update: false,
            sources: Vec::new(),
        }
    }

    /// Load configuration from a YAML file.
    ///
    /// Environment variables are interpolated before parsing and the result
    /// is validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).context(ReadFileSnafu)?;

        let result = vars::interpolate(&content);
        ensure!(
            result.is_ok(),
            EnvInterpolationSnafu {
                message: result.errors.join("\n"),
            }
        );

        let config: Config = serde_yaml::from_str(&result.text).context(YamlParseSnafu)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the partitioning constraints.
    ///
    /// `batch_size <= max_per_sitemap` is the precondition the partition
    /// layout depends on; violating it is a configuration error, never a
    /// runtime one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(!self.base_url.trim().is_empty(), MissingBaseUrlSnafu);
        ensure!(
            !self.document_root.as_os_str().is_empty(),
            MissingDocumentRootSnafu
        );
        ensure!(self.batch_size >= 1, ZeroBatchSizeSnafu);
        ensure!(
            self.max_per_sitemap >= 2,
            MaxPerSitemapTooSmallSnafu {
                value: self.max_per_sitemap,
            }
        );
        ensure!(
            self.batch_size <= self.max_per_sitemap,
            BatchExceedsSitemapCapSnafu {
                batch_size: self.batch_size,
                max_per_sitemap: self.max_per_sitemap,
            }
        );
        self.parse_base_url()?;
        Ok(())
    }

    /// Parse the configured base URL.
    pub fn parse_base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).context(InvalidBaseUrlSnafu {
            url: self.base_url.clone(),
        })
    }

    /// Local directory sitemap files are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.document_root
            .join(self.path.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yaml_parsing_with_defaults() {
        let yaml = r#"
base_url: "https://example.com"
document_root: "/var/www"
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.max_per_sitemap, DEFAULT_MAX_PER_SITEMAP);
        assert_eq!(config.path, "sitemaps");
        assert!(config.gzip);
        assert!(!config.partial_update);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_parsing_with_sources() {
        let yaml = r#"
base_url: "https://example.com"
document_root: "./public"
path: "maps"
batch_size: 500
max_per_sitemap: 1000
gzip: false
sources:
  - name: pages
    path: pages
    urls_file: ./pages.txt
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.path, "maps");
        assert_eq!(config.batch_size, 500);
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].name, "pages");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_batch_size_must_fit_in_one_file() {
        let mut config = Config::new("https://example.com", "/var/www");
        config.batch_size = 100;
        config.max_per_sitemap = 50;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BatchExceedsSitemapCap { .. })
        ));
    }

    #[test]
    fn test_max_per_sitemap_minimum() {
        let mut config = Config::new("https://example.com", "/var/www");
        config.batch_size = 1;
        config.max_per_sitemap = 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MaxPerSitemapTooSmall { value: 1 })
        ));
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let config = Config::new("  ", "/var/www");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingBaseUrl)
        ));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let config = Config::new("not a url", "/var/www");
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_output_dir_strips_leading_slash() {
        let mut config = Config::new("https://example.com", "/var/www");
        config.path = "/sitemaps".to_string();
        assert_eq!(config.output_dir(), PathBuf::from("/var/www/sitemaps"));
    }
}
