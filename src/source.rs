//! Data-source registration and record access.
//!
//! A [`DataSource`] is the external collaborator that owns the record
//! collection: it answers `count` and ordered, bounded `fetch` queries.
//! Accessors for the per-record fields a sitemap entry needs are supplied
//! as plain function references when the source is registered, so every
//! required capability is resolved exactly once, up front.

use std::path::Path;

use chrono::{DateTime, Utc};
use snafu::prelude::*;

use crate::error::{
    ConfigError, MissingLocationAccessorSnafu, MissingOrderingAccessorSnafu, SourceError,
    UrlListSnafu, ZeroBatchSizeSnafu,
};

/// Filter applied to count and fetch queries.
///
/// Under partial update the generator sets `min_ordering_key` to the resume
/// key so already-published ranges are never re-fetched. Sources without an
/// ordering column may ignore it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchFilter {
    /// Only records with ordering key >= this value are in scope.
    pub min_ordering_key: Option<u64>,
}

/// The external record collection a sitemap is generated from.
///
/// `fetch` must return records in a stable order across calls, and in
/// ascending ordering-key order when the source is registered with an
/// ordering-key accessor. Both operations are blocking.
pub trait DataSource {
    /// The opaque record type this source produces.
    type Record;

    /// Number of records matching the filter.
    fn count(&self, filter: &FetchFilter) -> Result<u64, SourceError>;

    /// One ordered batch of records matching the filter.
    fn fetch(
        &self,
        filter: &FetchFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Self::Record>, SourceError>;
}

/// Suggested change frequency for a sitemap entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    /// Protocol text for the `changefreq` element.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeFrequency::Always => "always",
            ChangeFrequency::Hourly => "hourly",
            ChangeFrequency::Daily => "daily",
            ChangeFrequency::Weekly => "weekly",
            ChangeFrequency::Monthly => "monthly",
            ChangeFrequency::Yearly => "yearly",
            ChangeFrequency::Never => "never",
        }
    }
}

/// One ready-to-write sitemap entry, derived from a record through the
/// source's accessors.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Location value. Produced by the location accessor as a path segment;
    /// the generator joins it onto the base URL and web path before writing.
    pub location: String,
    /// Last modification time, written in UTC.
    pub last_modified: Option<DateTime<Utc>>,
    /// Suggested change frequency.
    pub change_frequency: Option<ChangeFrequency>,
    /// Priority in `0.0..=1.0`.
    pub priority: Option<f32>,
    /// Ordering-key value, used for resume suffixes under partial update.
    pub ordering_key: Option<u64>,
}

impl Entry {
    /// Entry with only a location.
    pub fn location(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            last_modified: None,
            change_frequency: None,
            priority: None,
            ordering_key: None,
        }
    }
}

/// Internal, type-erased view of a registered source: batches come out as
/// ready-to-write entries, with the record type gone.
pub(crate) trait EntryProducer {
    fn count(&self, filter: &FetchFilter) -> Result<u64, SourceError>;

    fn fetch_entries(
        &self,
        filter: &FetchFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Entry>, SourceError>;
}

struct TypedSource<D: DataSource> {
    data: D,
    location: Box<dyn Fn(&D::Record) -> String>,
    last_modified: Option<Box<dyn Fn(&D::Record) -> Option<DateTime<Utc>>>>,
    ordering_key: Option<Box<dyn Fn(&D::Record) -> u64>>,
    change_frequency: Option<ChangeFrequency>,
    priority: Option<f32>,
}

impl<D: DataSource> EntryProducer for TypedSource<D> {
    fn count(&self, filter: &FetchFilter) -> Result<u64, SourceError> {
        self.data.count(filter)
    }

    fn fetch_entries(
        &self,
        filter: &FetchFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<Entry>, SourceError> {
        let records = self.data.fetch(filter, limit, offset)?;
        let entries = records
            .iter()
            .map(|record| Entry {
                location: (self.location)(record),
                last_modified: self.last_modified.as_ref().and_then(|f| f(record)),
                change_frequency: self.change_frequency,
                priority: self.priority,
                ordering_key: self.ordering_key.as_ref().map(|f| f(record)),
            })
            .collect();
        Ok(entries)
    }
}

/// A registered producer of sitemap records.
///
/// Immutable once generation starts. Built through [`Source::builder`].
pub struct Source {
    pub(crate) name: String,
    pub(crate) web_path: String,
    pub(crate) batch_size: Option<u64>,
    pub(crate) partial_update: bool,
    pub(crate) producer: Box<dyn EntryProducer>,
}

impl Source {
    /// Start registering a source over the given data collection.
    pub fn builder<D: DataSource + 'static>(
        name: impl Into<String>,
        data: D,
    ) -> SourceBuilder<D> {
        SourceBuilder {
            name: name.into(),
            web_path: String::new(),
            batch_size: None,
            partial_update: false,
            data,
            location: None,
            last_modified: None,
            ordering_key: None,
            change_frequency: None,
            priority: None,
        }
    }

    /// Source name, used in output filenames.
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Builder collecting the accessors and options for one [`Source`].
pub struct SourceBuilder<D: DataSource> {
    name: String,
    web_path: String,
    batch_size: Option<u64>,
    partial_update: bool,
    data: D,
    location: Option<Box<dyn Fn(&D::Record) -> String>>,
    last_modified: Option<Box<dyn Fn(&D::Record) -> Option<DateTime<Utc>>>>,
    ordering_key: Option<Box<dyn Fn(&D::Record) -> u64>>,
    change_frequency: Option<ChangeFrequency>,
    priority: Option<f32>,
}

impl<D: DataSource + 'static> SourceBuilder<D> {
    /// Required: maps a record to its location path segment.
    pub fn location(mut self, f: impl Fn(&D::Record) -> String + 'static) -> Self {
        self.location = Some(Box::new(f));
        self
    }

    /// Maps a record to its last modification time.
    pub fn last_modified(
        mut self,
        f: impl Fn(&D::Record) -> Option<DateTime<Utc>> + 'static,
    ) -> Self {
        self.last_modified = Some(Box::new(f));
        self
    }

    /// Maps a record to its ordering key. Required for partial update.
    pub fn ordering_key(mut self, f: impl Fn(&D::Record) -> u64 + 'static) -> Self {
        self.ordering_key = Some(Box::new(f));
        self
    }

    /// Change frequency written for every entry of this source.
    pub fn change_frequency(mut self, frequency: ChangeFrequency) -> Self {
        self.change_frequency = Some(frequency);
        self
    }

    /// Priority written for every entry of this source.
    pub fn priority(mut self, priority: f32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Web path segment joined between the base URL and each location.
    pub fn web_path(mut self, path: impl Into<String>) -> Self {
        self.web_path = path.into();
        self
    }

    /// Per-source batch size, overriding the configured default.
    pub fn batch_size(mut self, batch_size: u64) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Enable partial update for this source.
    pub fn partial_update(mut self, enabled: bool) -> Self {
        self.partial_update = enabled;
        self
    }

    /// Finish registration.
    ///
    /// Missing required accessors are a fatal configuration error raised
    /// here, before any I/O.
    pub fn build(self) -> Result<Source, ConfigError> {
        let location = self.location.context(MissingLocationAccessorSnafu {
            name: self.name.as_str(),
        })?;
        ensure!(
            !self.partial_update || self.ordering_key.is_some(),
            MissingOrderingAccessorSnafu {
                name: self.name.as_str(),
            }
        );
        // Same rule the global configuration enforces; a per-source
        // override must not reintroduce a zero fetch step.
        ensure!(self.batch_size != Some(0), ZeroBatchSizeSnafu);

        Ok(Source {
            name: self.name,
            web_path: self.web_path,
            batch_size: self.batch_size,
            partial_update: self.partial_update,
            producer: Box::new(TypedSource {
                data: self.data,
                location,
                last_modified: self.last_modified,
                ordering_key: self.ordering_key,
                change_frequency: self.change_frequency,
                priority: self.priority,
            }),
        })
    }
}

/// Built-in source over a plain list of locations.
///
/// Backs the CLI's `urls_file` sources: one location per line, blank lines
/// skipped, order preserved.
#[derive(Debug, Clone)]
pub struct FileListSource {
    locations: Vec<String>,
}

impl FileListSource {
    /// Source over an in-memory list of locations.
    pub fn new(locations: Vec<String>) -> Self {
        Self { locations }
    }

    /// Read locations from a text file, one per line.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).context(UrlListSnafu { path })?;
        let locations = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { locations })
    }
}

impl DataSource for FileListSource {
    type Record = String;

    fn count(&self, _filter: &FetchFilter) -> Result<u64, SourceError> {
        Ok(self.locations.len() as u64)
    }

    fn fetch(
        &self,
        _filter: &FetchFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<String>, SourceError> {
        let records = self
            .locations
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_location_accessor() {
        let result = Source::builder("pages", FileListSource::new(vec![])).build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingLocationAccessor { .. })
        ));
    }

    #[test]
    fn test_partial_update_requires_ordering_key() {
        let result = Source::builder("pages", FileListSource::new(vec![]))
            .location(|loc: &String| loc.clone())
            .partial_update(true)
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::MissingOrderingAccessor { .. })
        ));
    }

    #[test]
    fn test_zero_batch_size_override_rejected() {
        let result = Source::builder("pages", FileListSource::new(vec![]))
            .location(|loc: &String| loc.clone())
            .batch_size(0)
            .build();
        assert!(matches!(result, Err(ConfigError::ZeroBatchSize)));
    }

    #[test]
    fn test_accessors_flow_into_entries() {
        let source = Source::builder("pages", FileListSource::new(vec!["a".into(), "b".into()]))
            .location(|loc: &String| loc.clone())
            .change_frequency(ChangeFrequency::Weekly)
            .priority(0.5)
            .build()
            .unwrap();

        let filter = FetchFilter::default();
        assert_eq!(source.producer.count(&filter).unwrap(), 2);

        let entries = source.producer.fetch_entries(&filter, 10, 0).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].location, "a");
        assert_eq!(entries[0].change_frequency, Some(ChangeFrequency::Weekly));
        assert_eq!(entries[0].priority, Some(0.5));
        assert!(entries[0].ordering_key.is_none());
    }

    #[test]
    fn test_file_list_source_fetch_window() {
        let source = FileListSource::new(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        let filter = FetchFilter::default();
        assert_eq!(source.count(&filter).unwrap(), 4);

        let page = source.fetch(&filter, 2, 1).unwrap();
        assert_eq!(page, vec!["b".to_string(), "c".to_string()]);

        let tail = source.fetch(&filter, 10, 3).unwrap();
        assert_eq!(tail, vec!["d".to_string()]);
    }

    #[test]
    fn test_file_list_source_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("urls.txt");
        std::fs::write(&path, "/a\n\n  /b  \n").unwrap();

        let source = FileListSource::from_file(&path).unwrap();
        let filter = FetchFilter::default();
        assert_eq!(source.count(&filter).unwrap(), 2);
        let all = source.fetch(&filter, 10, 0).unwrap();
        assert_eq!(all, vec!["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_change_frequency_text() {
        assert_eq!(ChangeFrequency::Weekly.as_str(), "weekly");
        assert_eq!(ChangeFrequency::Never.as_str(), "never");
    }
}
