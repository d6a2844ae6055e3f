//! The generation run coordinator.
//!
//! Drives a full run: lock acquisition, optional cleanup, per-source
//! partitioning and streaming, index aggregation, and notification. Runs
//! are single-threaded and synchronous; memory stays bounded by one batch
//! of records regardless of collection size.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use snafu::prelude::*;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{
    BatchExceedsSitemapCapSnafu, CleanSnafu, ConfigError, ConfigSnafu, GeneratorError, LockSnafu,
    PrepareOutputSnafu, ResumeScanSnafu, SourceSnafu, WriterSnafu,
};
use crate::index::{self, IndexOptions};
use crate::lock::LockFile;
use crate::partition::PartitionPlan;
use crate::ping::{LogNotifier, Notifier};
use crate::resume;
use crate::source::{FetchFilter, Source};
use crate::writer::{DocumentKind, SitemapWriter, WriterOptions};

/// Any file this generator may have published earlier.
static GENERATED_FILE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sitemap.*\.xml(\.gz)?$").expect("Invalid pattern"));

/// Outcome of one generation run.
#[derive(Debug, Clone, Default)]
pub struct GeneratorStats {
    /// True when the run body was skipped because another run holds the lock.
    pub skipped: bool,
    /// Number of sources processed.
    pub sources: usize,
    /// Physical files written this run, index included.
    pub files_written: usize,
    /// Entries written across all part files this run.
    pub entries_written: u64,
}

/// Orchestrates sitemap generation for a set of registered sources.
pub struct Generator {
    config: Config,
    base_url: Url,
    output_dir: PathBuf,
    sources: Vec<Source>,
    notifier: Box<dyn Notifier>,
}

impl Generator {
    /// Build a generator from a validated configuration.
    ///
    /// Only validation happens here; no filesystem or data-source access.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        let base_url = config.parse_base_url()?;
        let output_dir = config.output_dir();
        Ok(Self {
            config,
            base_url,
            output_dir,
            sources: Vec::new(),
            notifier: Box::new(LogNotifier),
        })
    }

    /// Replace the default log-only notifier.
    pub fn with_notifier(mut self, notifier: impl Notifier + 'static) -> Self {
        self.notifier = Box::new(notifier);
        self
    }

    /// Register a source. Sources are immutable once `run` starts.
    pub fn add_source(&mut self, source: Source) -> &mut Self {
        self.sources.push(source);
        self
    }

    /// Execute one generation run.
    ///
    /// Holding the lock elsewhere is not an error: the run body is skipped
    /// and `stats.skipped` is set. Any other failure aborts the run; files
    /// sealed earlier in the run stay in place, and the lock is released on
    /// every path.
    pub fn run(&self) -> Result<GeneratorStats, GeneratorError> {
        std::fs::create_dir_all(&self.output_dir).context(PrepareOutputSnafu {
            path: &self.output_dir,
        })?;

        let Some(_lock) = LockFile::acquire(&self.output_dir).context(LockSnafu)? else {
            info!("Another generation run is in progress; skipping");
            return Ok(GeneratorStats {
                skipped: true,
                ..GeneratorStats::default()
            });
        };

        if !self.config.partial_update {
            self.clean_previous_output()?;
        }

        let mut stats = GeneratorStats::default();
        let mut all_parts: Vec<PathBuf> = Vec::new();

        for source in &self.sources {
            let produced = self.generate_source(source, &mut stats)?;
            stats.files_written += produced.written;
            all_parts.extend(produced.parts);
            stats.sources += 1;
        }

        let index_paths = index::build(
            &IndexOptions {
                directory: self.output_dir.clone(),
                base_url: self.base_url.clone(),
                web_path: self.config.path.clone(),
                gzip: self.config.gzip,
                indent: self.config.indent,
                // The index has its own protocol cap; tightening
                // `max_per_sitemap` must never fragment it.
                max_entries: index::INDEX_MAX_ENTRIES,
            },
            &all_parts,
        )?;
        stats.files_written += index_paths.len();

        if let Some(index_url) = self.index_url(&index_paths) {
            self.notifier.notify(&index_url);
        }

        info!(
            sources = stats.sources,
            files = stats.files_written,
            entries = stats.entries_written,
            "Generation run complete"
        );
        Ok(stats)
    }

    /// Remove files from earlier runs for a clean regeneration. Orphaned
    /// `.tmp` files from a crashed run are deliberately left alone.
    fn clean_previous_output(&self) -> Result<(), GeneratorError> {
        let entries = std::fs::read_dir(&self.output_dir).context(CleanSnafu {
            path: &self.output_dir,
        })?;
        for dir_entry in entries {
            let dir_entry = dir_entry.context(CleanSnafu {
                path: &self.output_dir,
            })?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if GENERATED_FILE_PATTERN.is_match(name) {
                debug!(file = name, "Removing previous output");
                std::fs::remove_file(dir_entry.path()).context(CleanSnafu {
                    path: &self.output_dir,
                })?;
            }
        }
        Ok(())
    }

    fn generate_source(
        &self,
        source: &Source,
        stats: &mut GeneratorStats,
    ) -> Result<SourceOutput, GeneratorError> {
        let batch_size = source.batch_size.unwrap_or(self.config.batch_size);
        if batch_size > self.config.max_per_sitemap {
            // A per-source override must obey the same cap as the global
            // batch size; this is a configuration error, not a runtime one.
            return BatchExceedsSitemapCapSnafu {
                batch_size,
                max_per_sitemap: self.config.max_per_sitemap,
            }
            .fail::<SourceOutput>()
            .context(ConfigSnafu);
        }

        let base_name = format!("sitemap_{}", source.name);

        let resume_key = if source.partial_update {
            resume::find_resume_point(&self.output_dir, &base_name).context(ResumeScanSnafu {
                path: &self.output_dir,
            })?
        } else {
            None
        };

        let mut parts = match resume_key {
            Some(key) => {
                info!(source = %source.name, resume_key = key, "Resuming partial update");
                resume::untouched_parts(&self.output_dir, &base_name, key).context(
                    ResumeScanSnafu {
                        path: &self.output_dir,
                    },
                )?
            }
            None => Vec::new(),
        };

        let filter = FetchFilter {
            min_ordering_key: resume_key,
        };
        let count = source.producer.count(&filter).context(SourceSnafu)?;
        let plan = PartitionPlan::new(count, batch_size, self.config.max_per_sitemap);
        info!(
            source = %source.name,
            count,
            batches = plan.num_batches(),
            files = plan.num_files(),
            "Generating sitemaps"
        );

        let mut writer = SitemapWriter::create(WriterOptions {
            directory: self.output_dir.clone(),
            base_name,
            kind: DocumentKind::UrlSet,
            gzip: self.config.gzip,
            max_entries: self.config.max_per_sitemap,
            indent: self.config.indent,
            start_suffix: resume_key,
            suffix_from_ordering_key: source.partial_update,
        })
        .context(WriterSnafu)?;

        for file in plan.files() {
            for batch_index in file.batches() {
                let batch = plan.batch(batch_index);
                if batch.limit == 0 {
                    continue;
                }
                let entries = source
                    .producer
                    .fetch_entries(&filter, batch.limit, batch.offset)
                    .context(SourceSnafu)?;
                debug!(
                    source = %source.name,
                    batch = batch.index,
                    offset = batch.offset,
                    records = entries.len(),
                    "Writing batch"
                );
                for mut entry in entries {
                    entry.location =
                        index::join_location(&self.base_url, &source.web_path, &entry.location);
                    writer.add_entry(&entry).context(WriterSnafu)?;
                    stats.entries_written += 1;
                }
            }
        }

        let produced = writer.close().context(WriterSnafu)?;
        let written = produced.len();
        parts.extend(produced);
        Ok(SourceOutput { parts, written })
    }

    fn index_url(&self, index_paths: &[PathBuf]) -> Option<Url> {
        let name = index_paths.first()?.file_name()?.to_str()?;
        let joined = index::join_location(&self.base_url, &self.config.path, name);
        Url::parse(&joined).ok()
    }
}

/// Part files a source contributed to the index, plus how many of them were
/// written this run.
struct SourceOutput {
    parts: Vec<PathBuf>,
    written: usize,
}
