//! Error types for bigsitemap using snafu.
//!
//! This module defines structured error types with context selectors for
//! all error conditions in the codebase.

use std::path::PathBuf;

use snafu::prelude::*;

// ============ Config Errors ============

/// Errors raised during configuration parsing and validation.
///
/// All of these are fatal and surface before any generation I/O happens.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ConfigError {
    /// Base URL is missing.
    #[snafu(display("Base URL must be set with the `base_url` option"))]
    MissingBaseUrl,

    /// Base URL does not parse as an absolute URL.
    #[snafu(display("Invalid base URL {url:?}"))]
    InvalidBaseUrl { url: String, source: url::ParseError },

    /// Document root is missing.
    #[snafu(display("Document root must be set with the `document_root` option"))]
    MissingDocumentRoot,

    /// Batch size of zero makes no progress.
    #[snafu(display("`batch_size` must be at least 1"))]
    ZeroBatchSize,

    /// Per-file cap below the minimum that allows rotation.
    #[snafu(display("`max_per_sitemap` must be at least 2, got {value}"))]
    MaxPerSitemapTooSmall { value: u64 },

    /// A batch must always fit into a single sitemap file.
    #[snafu(display(
        "`batch_size` ({batch_size}) must not exceed `max_per_sitemap` ({max_per_sitemap})"
    ))]
    BatchExceedsSitemapCap { batch_size: u64, max_per_sitemap: u64 },

    /// A source was registered without a location accessor.
    #[snafu(display("Source {name:?} must provide a location accessor"))]
    MissingLocationAccessor { name: String },

    /// Partial update requires an ordering key to resume from.
    #[snafu(display(
        "Source {name:?} enables partial update but provides no ordering-key accessor"
    ))]
    MissingOrderingAccessor { name: String },

    /// Environment variable interpolation failed.
    #[snafu(display("Environment variable interpolation failed:\n{message}"))]
    EnvInterpolation { message: String },

    /// Failed to parse YAML configuration.
    #[snafu(display("Failed to parse YAML configuration"))]
    YamlParse { source: serde_yaml::Error },

    /// Failed to read configuration file.
    #[snafu(display("Failed to read configuration file"))]
    ReadFile { source: std::io::Error },
}

// ============ Source Errors ============

/// Errors reported by data-source collaborators.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum SourceError {
    /// The count query against the backing collection failed.
    #[snafu(display("Count query failed for source {name:?}: {message}"))]
    Count { name: String, message: String },

    /// A batched fetch against the backing collection failed.
    #[snafu(display("Fetch failed for source {name:?} at offset {offset}: {message}"))]
    Fetch {
        name: String,
        offset: u64,
        message: String,
    },

    /// Failed to read a URL list file.
    #[snafu(display("Failed to read URL list {path:?}"))]
    UrlList {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ============ Writer Errors ============

/// Errors that can occur while writing or sealing sitemap documents.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WriterError {
    /// Failed to create the temporary output file.
    #[snafu(display("Failed to create temporary file {path:?}"))]
    CreateTemp {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Write to an open document failed.
    #[snafu(display("Failed to write to {path:?}"))]
    WriteDocument {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Finishing the gzip stream failed.
    #[snafu(display("Failed to finish gzip stream for {path:?}"))]
    FinishGzip {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Removing the previously published file failed.
    #[snafu(display("Failed to remove existing file {path:?}"))]
    RemoveExisting {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Renaming the sealed temp file into place failed.
    #[snafu(display("Failed to replace {to:?} with {from:?}"))]
    Replace {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

// ============ Lock Errors ============

/// Errors that can occur while acquiring the run lock.
///
/// Lock contention is not an error; `LockFile::acquire` reports it as
/// `Ok(None)` so overlapping scheduled runs no-op.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum LockError {
    /// Creating the lock file failed for a reason other than contention.
    #[snafu(display("Failed to create lock file {path:?}"))]
    CreateLock {
        path: PathBuf,
        source: std::io::Error,
    },
}

// ============ Generator Error (top-level) ============

/// Top-level generation errors that aggregate all error types.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum GeneratorError {
    /// Configuration error.
    #[snafu(display("Configuration error"))]
    Config { source: ConfigError },

    /// Lock acquisition error.
    #[snafu(display("Lock error"))]
    Lock { source: LockError },

    /// Data source error.
    #[snafu(display("Source error"))]
    Source { source: SourceError },

    /// Document writer error.
    #[snafu(display("Writer error"))]
    Writer { source: WriterError },

    /// Failed to create the output directory.
    #[snafu(display("Failed to prepare output directory {path:?}"))]
    PrepareOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove previously generated files.
    #[snafu(display("Failed to clean previous output in {path:?}"))]
    Clean {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to scan existing output for a resume point.
    #[snafu(display("Failed to scan {path:?} for resume point"))]
    ResumeScan {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read metadata for an index entry.
    #[snafu(display("Failed to read metadata for {path:?}"))]
    IndexMetadata {
        path: PathBuf,
        source: std::io::Error,
    },
}
