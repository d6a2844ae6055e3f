//! Sitemap index aggregation.
//!
//! Builds the single index document listing every produced part file, with
//! each entry's modification time taken from disk at aggregation time.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use snafu::prelude::*;
use url::Url;

use crate::error::{GeneratorError, IndexMetadataSnafu, WriterSnafu};
use crate::source::Entry;
use crate::writer::{DocumentKind, SitemapWriter, WriterOptions};

/// Base name of the index document.
pub const INDEX_BASE_NAME: &str = "sitemap_index";

/// Entry cap for the index document: the protocol's own limit of 50,000
/// sitemaps per index, independent of the configured per-urlset cap.
pub const INDEX_MAX_ENTRIES: u64 = 50_000;

/// Options for building the index.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Directory the index is written into (same as the part files).
    pub directory: PathBuf,
    /// Base URL part-file locations are joined onto.
    pub base_url: Url,
    /// Web path under the base URL where the directory is served.
    pub web_path: String,
    /// Gzip-compress the index.
    pub gzip: bool,
    /// Indentation width in spaces.
    pub indent: usize,
    /// Entry cap for the index document itself.
    pub max_entries: u64,
}

/// Write the index document over the given part files.
///
/// Part paths are deduplicated and sorted; anything matching the index's own
/// naming pattern is excluded so the index never lists itself. Returns the
/// physical index paths (one, unless the part list overflows the cap).
pub fn build(opts: &IndexOptions, part_files: &[PathBuf]) -> Result<Vec<PathBuf>, GeneratorError> {
    let mut parts: Vec<&PathBuf> = part_files
        .iter()
        .filter(|path| !is_index_name(path))
        .collect();
    parts.sort();
    parts.dedup();

    let mut writer = SitemapWriter::create(WriterOptions {
        directory: opts.directory.clone(),
        base_name: INDEX_BASE_NAME.to_string(),
        kind: DocumentKind::Index,
        gzip: opts.gzip,
        max_entries: opts.max_entries,
        indent: opts.indent,
        start_suffix: None,
        suffix_from_ordering_key: false,
    })
    .context(WriterSnafu)?;

    for part in parts {
        let metadata = std::fs::metadata(part).context(IndexMetadataSnafu { path: part })?;
        let modified = metadata.modified().context(IndexMetadataSnafu { path: part })?;

        let file_name = part
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let mut entry = Entry::location(join_location(
            &opts.base_url,
            &opts.web_path,
            file_name,
        ));
        entry.last_modified = Some(DateTime::<Utc>::from(modified));
        writer.add_entry(&entry).context(WriterSnafu)?;
    }

    writer.close().context(WriterSnafu)
}

/// Join a base URL, an optional web path, and a location segment.
pub fn join_location(base_url: &Url, web_path: &str, segment: &str) -> String {
    let base = base_url.as_str().trim_end_matches('/');
    let path = web_path.trim_matches('/');
    let segment = segment.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/{segment}")
    } else {
        format!("{base}/{path}/{segment}")
    }
}

fn is_index_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(INDEX_BASE_NAME))
        .unwrap_or(false)
}
