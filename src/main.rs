//! bigsitemap: a standalone tool for generating capped sitemap files.
//!
//! Reads a YAML configuration describing one or more URL-list sources and
//! streams them into size-capped, optionally gzipped sitemap files plus a
//! sitemap index, honoring the sitemaps.org per-file entry cap.

mod config;
mod error;
mod generator;
mod index;
mod lock;
mod partition;
mod ping;
mod resume;
mod source;
mod writer;

use std::path::PathBuf;

use clap::Parser;
use snafu::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use error::{ConfigSnafu, GeneratorError, SourceSnafu};
use generator::Generator;
use source::{FileListSource, Source};

/// Capped sitemap generation tool.
#[derive(Parser, Debug)]
#[command(name = "bigsitemap")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Dry run - validate configuration without generating anything.
    #[arg(long)]
    dry_run: bool,
}

#[snafu::report]
fn main() -> Result<(), GeneratorError> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("bigsitemap starting");

    let config = Config::from_file(&args.config).context(ConfigSnafu)?;

    if args.dry_run {
        info!("Dry run mode - validating configuration");
        info!("Base URL: {}", config.base_url);
        info!("Output directory: {}", config.output_dir().display());
        info!(
            "Batch size: {} (max {} entries per file)",
            config.batch_size, config.max_per_sitemap
        );
        for source in &config.sources {
            info!("  - {}: {}", source.name, source.urls_file.display());
        }
        info!("Configuration is valid");
        return Ok(());
    }

    let mut generator = Generator::new(config.clone()).context(ConfigSnafu)?;
    for entry in &config.sources {
        let data = FileListSource::from_file(&entry.urls_file).context(SourceSnafu)?;
        let source = Source::builder(entry.name.as_str(), data)
            .location(|slug: &String| slug.clone())
            .web_path(&entry.path)
            .build()
            .context(ConfigSnafu)?;
        generator.add_source(source);
    }

    let stats = generator.run()?;

    if stats.skipped {
        info!("Run skipped: another generation is in progress");
    } else {
        info!("Generation completed successfully");
        info!("  Sources processed: {}", stats.sources);
        info!("  Files written: {}", stats.files_written);
        info!("  Entries written: {}", stats.entries_written);
    }

    Ok(())
}
