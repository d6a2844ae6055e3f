//! Incremental sitemap document writer.
//!
//! Serializes entries into capped, namespaced XML documents without ever
//! holding more than the current batch in memory. When a file reaches its
//! entry cap the writer rotates: the current file is sealed and atomically
//! renamed into place, and the next part is opened under an incremented (or
//! resume-key-derived) suffix. Readers of the output directory only ever see
//! complete documents; a crash mid-write leaves an orphaned `.tmp` file,
//! never a corrupt published one.

use std::borrow::Cow;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use snafu::prelude::*;
use tracing::debug;

use crate::error::{
    CreateTempSnafu, FinishGzipSnafu, RemoveExistingSnafu, ReplaceSnafu, WriteDocumentSnafu,
    WriterError,
};
use crate::source::Entry;

/// Sitemaps.org protocol namespace.
pub const SITEMAP_NAMESPACE: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

/// Which document type the writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// A part file: `urlset` root with `url` entries.
    UrlSet,
    /// The index: `sitemapindex` root with `sitemap` entries.
    Index,
}

impl DocumentKind {
    fn root(&self) -> &'static str {
        match self {
            DocumentKind::UrlSet => "urlset",
            DocumentKind::Index => "sitemapindex",
        }
    }

    fn entry(&self) -> &'static str {
        match self {
            DocumentKind::UrlSet => "url",
            DocumentKind::Index => "sitemap",
        }
    }
}

/// Options for one logical document.
#[derive(Debug, Clone)]
pub struct WriterOptions {
    /// Directory part files are published into.
    pub directory: PathBuf,
    /// Base file name, e.g. `sitemap_pages`.
    pub base_name: String,
    /// Document type.
    pub kind: DocumentKind,
    /// Gzip-compress the output.
    pub gzip: bool,
    /// Entry cap per physical file; reaching it triggers rotation.
    pub max_entries: u64,
    /// Indentation width in spaces per nesting level.
    pub indent: usize,
    /// Suffix for the first physical file. `None` leaves the first part
    /// unsuffixed; a resumed partial run passes the resume key here so the
    /// boundary file is regenerated in place.
    pub start_suffix: Option<u64>,
    /// On rotation, name the new part after the triggering entry's ordering
    /// key instead of incrementing. Set for partial-update sources. When the
    /// triggering entry carries no key, or a key not strictly above the
    /// current part's suffix, the writer falls back to incrementing so no
    /// two parts share a path.
    pub suffix_from_ordering_key: bool,
}

/// The sink a part file is written through.
enum Output {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            Output::Plain(w) => w.write(buf),
            Output::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            Output::Plain(w) => w.flush(),
            Output::Gzip(w) => w.flush(),
        }
    }
}

/// One open physical part file, writing to its temporary path.
struct PartFile {
    tmp_path: PathBuf,
    final_path: PathBuf,
    out: Output,
}

/// Incremental writer for one logical sitemap document.
pub struct SitemapWriter {
    opts: WriterOptions,
    part: Option<PartFile>,
    /// Suffix of the currently open part; `None` for the unsuffixed first file.
    suffix: Option<u64>,
    /// Entries written into the currently open part.
    entries_in_part: u64,
    produced: Vec<PathBuf>,
}

impl SitemapWriter {
    /// Open the writer, positioned at entry count 0 of the first part.
    pub fn create(opts: WriterOptions) -> Result<Self, WriterError> {
        let mut writer = Self {
            suffix: opts.start_suffix,
            opts,
            part: None,
            entries_in_part: 0,
            produced: Vec::new(),
        };
        writer.open_part()?;
        Ok(writer)
    }

    /// Append one entry, rotating to a new part first if the current one is
    /// at capacity.
    pub fn add_entry(&mut self, entry: &Entry) -> Result<(), WriterError> {
        if self.entries_in_part == self.opts.max_entries {
            self.rotate(entry)?;
        }

        let element = self.opts.kind.entry();
        self.write_line(1, &format!("<{element}>"))?;
        self.write_element(2, "loc", &entry.location)?;
        if let Some(time) = entry.last_modified {
            // W3C datetime, the subset of ISO 8601 the protocol uses.
            let stamp = time.format("%Y-%m-%dT%H:%M:%S+00:00").to_string();
            self.write_element(2, "lastmod", &stamp)?;
        }
        if let Some(frequency) = entry.change_frequency {
            self.write_element(2, "changefreq", frequency.as_str())?;
        }
        if let Some(priority) = entry.priority {
            self.write_element(2, "priority", &format!("{priority}"))?;
        }
        self.write_line(1, &format!("</{element}>"))?;

        self.entries_in_part += 1;
        Ok(())
    }

    /// Seal the open part and return every physical file produced, in order.
    pub fn close(mut self) -> Result<Vec<PathBuf>, WriterError> {
        self.seal_part()?;
        Ok(std::mem::take(&mut self.produced))
    }

    fn rotate(&mut self, next_entry: &Entry) -> Result<(), WriterError> {
        self.seal_part()?;

        self.suffix = if self.opts.suffix_from_ordering_key {
            match next_entry.ordering_key {
                // Suffixes must stay strictly increasing; a duplicate key at
                // the boundary would reuse the sealed part's path and
                // overwrite it on seal.
                Some(key) if self.suffix.is_none_or(|current| key > current) => Some(key),
                _ => Some(self.suffix.map_or(1, |s| s + 1)),
            }
        } else {
            Some(self.suffix.map_or(1, |s| s + 1))
        };
        self.entries_in_part = 0;
        self.open_part()
    }

    fn file_name(&self, suffix: Option<u64>) -> String {
        let mut name = self.opts.base_name.clone();
        if let Some(suffix) = suffix {
            name.push_str(&format!("_{suffix}"));
        }
        name.push_str(".xml");
        if self.opts.gzip {
            name.push_str(".gz");
        }
        name
    }

    fn open_part(&mut self) -> Result<(), WriterError> {
        let final_path = self.opts.directory.join(self.file_name(self.suffix));
        let tmp_path = temp_path(&final_path);

        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .context(CreateTempSnafu { path: &tmp_path })?;

        let buffered = BufWriter::new(file);
        let out = if self.opts.gzip {
            Output::Gzip(GzEncoder::new(buffered, Compression::default()))
        } else {
            Output::Plain(buffered)
        };

        debug!(part = %final_path.display(), "Opened sitemap part");
        self.part = Some(PartFile {
            tmp_path,
            final_path,
            out,
        });

        self.write_line(0, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        let root = self.opts.kind.root();
        self.write_line(0, &format!(r#"<{root} xmlns="{SITEMAP_NAMESPACE}">"#))
    }

    /// Write closing tags, flush, and atomically replace the final path with
    /// the completed temp file.
    fn seal_part(&mut self) -> Result<(), WriterError> {
        if self.part.is_none() {
            return Ok(());
        }
        let root = self.opts.kind.root();
        self.write_line(0, &format!("</{root}>"))?;

        let part = self.part.take().expect("checked above");

        let mut inner = match part.out {
            Output::Plain(w) => w,
            Output::Gzip(encoder) => encoder.finish().context(FinishGzipSnafu {
                path: &part.tmp_path,
            })?,
        };
        inner.flush().context(WriteDocumentSnafu {
            path: &part.tmp_path,
        })?;
        drop(inner);

        // Remove any previously published file, then rename the finished
        // temp file into its place. A reader sees the old complete document
        // or the new one, never an intermediate state.
        match fs::remove_file(&part.final_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e).context(RemoveExistingSnafu {
                    path: &part.final_path,
                });
            }
        }
        fs::rename(&part.tmp_path, &part.final_path).context(ReplaceSnafu {
            from: &part.tmp_path,
            to: &part.final_path,
        })?;

        debug!(part = %part.final_path.display(), "Sealed sitemap part");
        self.produced.push(part.final_path);
        Ok(())
    }

    fn write_element(&mut self, level: usize, tag: &str, text: &str) -> Result<(), WriterError> {
        let escaped = escape_text(text);
        self.write_line(level, &format!("<{tag}>{escaped}</{tag}>"))
    }

    fn write_line(&mut self, level: usize, line: &str) -> Result<(), WriterError> {
        let part = self
            .part
            .as_mut()
            .expect("writer has an open part between create() and close()");
        let pad = self.opts.indent * level;
        writeln!(part.out, "{:pad$}{line}", "").context(WriteDocumentSnafu {
            path: &part.tmp_path,
        })
    }
}

/// Escape entry text for embedding in the document.
///
/// Only the ampersand is escaped, matching the long-standing wire format of
/// this generator; locations are expected to be URL-encoded already.
pub fn escape_text(text: &str) -> Cow<'_, str> {
    if text.contains('&') {
        Cow::Owned(text.replace('&', "&amp;"))
    } else {
        Cow::Borrowed(text)
    }
}

fn temp_path(final_path: &Path) -> PathBuf {
    let mut name = final_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    final_path.with_file_name(name)
}
