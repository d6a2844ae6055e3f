//! bigsitemap: capped, resumable sitemap generation for large collections.
//!
//! The sitemaps.org protocol forbids a single file from exceeding a fixed
//! entry count, while the underlying collection may be arbitrarily large.
//! This library partitions a record count into batches and files, streams
//! entries into size-capped XML documents (rotating files as they fill),
//! writes one index document over the produced parts, and supports partial
//! updates that leave already-published files untouched.
//!
//! # Example
//!
//! ```ignore
//! use bigsitemap::{Config, FileListSource, Generator, Source};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new("https://example.com", "./public");
//!     let mut generator = Generator::new(config)?;
//!
//!     let pages = FileListSource::from_file("./pages.txt")?;
//!     generator.add_source(
//!         Source::builder("pages", pages)
//!             .location(|slug: &String| slug.clone())
//!             .web_path("pages")
//!             .build()?,
//!     );
//!
//!     let stats = generator.run()?;
//!     println!("Wrote {} entries", stats.entries_written);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod generator;
pub mod index;
pub mod lock;
pub mod partition;
pub mod ping;
pub mod resume;
pub mod source;
pub mod writer;

// Re-export main types
pub use config::Config;
pub use error::GeneratorError;
pub use generator::{Generator, GeneratorStats};
pub use ping::{LogNotifier, Notifier};
pub use source::{ChangeFrequency, DataSource, Entry, FetchFilter, FileListSource, Source};
