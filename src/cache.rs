// SPDX-License-Identifier: MPL-2.0

//! Package metadata: for each distribution name, its released versions
//! and the requirement strings of each release.
//!
//! [DependencyDatabase] is a snapshot loaded once from JSON.
//! [CachedMetadata] sits in front of any [MetadataFetcher] and refreshes
//! entries once they are older than the configured timeout.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::config::SolverConfig;
use crate::error::ProviderError;
use crate::package::normalize_name;
use crate::type_aliases::Map;

/// Version text to the requirement strings of that release.
pub type Releases = BTreeMap<String, Vec<String>>;

/// Error reading package metadata.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The database could not be read.
    #[error("cannot read the dependency database")]
    Io(#[from] std::io::Error),
    /// The database is not valid JSON of the expected shape.
    #[error("malformed dependency database")]
    Json(#[from] serde_json::Error),
    /// Refreshing a stale entry failed.
    #[error("refreshing metadata of {package} failed")]
    Fetch {
        /// Normalised package name.
        package: String,
        /// Error raised by the fetcher.
        source: ProviderError,
    },
}

/// Lookup of package metadata by name.
pub trait MetadataProvider {
    /// Releases of a package, `None` when the package is unknown.
    fn releases(&self, name: &str) -> Result<Option<Releases>, CacheError>;
}

/// All package metadata in memory, keyed by normalised name.
///
/// The JSON shape is `{"name": {"version": ["requirement", ...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyDatabase {
    packages: BTreeMap<String, Releases>,
}

impl DependencyDatabase {
    /// Empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, CacheError> {
        let raw: BTreeMap<String, Releases> = serde_json::from_str(json)?;
        Ok(raw.into_iter().collect())
    }

    /// Parse a JSON document from a reader.
    pub fn from_reader(reader: impl Read) -> Result<Self, CacheError> {
        let raw: BTreeMap<String, Releases> = serde_json::from_reader(reader)?;
        Ok(raw.into_iter().collect())
    }

    /// Load a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CacheError> {
        let path = path.as_ref();
        debug!("loading dependency database from {}", path.display());
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    /// Add or replace the releases of a package.
    pub fn insert(&mut self, name: &str, releases: Releases) {
        self.packages.insert(normalize_name(name), releases);
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Whether the database holds no package.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl FromIterator<(String, Releases)> for DependencyDatabase {
    fn from_iter<I: IntoIterator<Item = (String, Releases)>>(iter: I) -> Self {
        let mut database = Self::new();
        for (name, releases) in iter {
            database.insert(&name, releases);
        }
        database
    }
}

impl MetadataProvider for DependencyDatabase {
    fn releases(&self, name: &str) -> Result<Option<Releases>, CacheError> {
        Ok(self.packages.get(&normalize_name(name)).cloned())
    }
}

/// Source of fresh metadata for [CachedMetadata], such as a remote index.
pub trait MetadataFetcher {
    /// Current releases of a package, `None` when the package is unknown.
    fn fetch(&self, name: &str) -> Result<Option<Releases>, ProviderError>;
}

impl<F> MetadataFetcher for F
where
    F: Fn(&str) -> Result<Option<Releases>, ProviderError>,
{
    fn fetch(&self, name: &str) -> Result<Option<Releases>, ProviderError> {
        self(name)
    }
}

impl MetadataFetcher for DependencyDatabase {
    fn fetch(&self, name: &str) -> Result<Option<Releases>, ProviderError> {
        Ok(MetadataProvider::releases(self, name)?)
    }
}

struct CacheEntry {
    fetched_at: Instant,
    releases: Option<Releases>,
}

/// Metadata cache with time based expiry.
///
/// An entry is served while it is younger than the timeout,
/// otherwise it is fetched again before being served.
/// A failed refresh is an error, stale data is never served.
/// The cache can be shared by reference between solves.
pub struct CachedMetadata<F> {
    fetcher: F,
    timeout: Duration,
    entries: Mutex<Map<String, CacheEntry>>,
}

impl<F: MetadataFetcher> CachedMetadata<F> {
    /// Empty cache in front of a fetcher.
    pub fn new(fetcher: F, timeout: Duration) -> Self {
        Self {
            fetcher,
            timeout,
            entries: Mutex::new(Map::default()),
        }
    }

    /// Empty cache using the configured timeout.
    pub fn from_config(fetcher: F, config: &SolverConfig) -> Self {
        Self::new(fetcher, config.cache_timeout)
    }

    /// Whether the next lookup of that package goes to the fetcher.
    pub fn is_stale(&self, name: &str) -> bool {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(&normalize_name(name))
            .map_or(true, |entry| entry.fetched_at.elapsed() >= self.timeout)
    }

    /// Forget one package.
    pub fn invalidate(&self, name: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&normalize_name(name));
    }

    /// Forget everything.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<F: MetadataFetcher> MetadataProvider for CachedMetadata<F> {
    fn releases(&self, name: &str) -> Result<Option<Releases>, CacheError> {
        let name = normalize_name(name);
        {
            let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = entries.get(&name) {
                if entry.fetched_at.elapsed() < self.timeout {
                    return Ok(entry.releases.clone());
                }
            }
        }
        // Not locked while fetching, other solves keep reading the cache.
        debug!("refreshing metadata of {}", name);
        let releases = self
            .fetcher
            .fetch(&name)
            .map_err(|source| CacheError::Fetch {
                package: name.clone(),
                source,
            })?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                name,
                CacheEntry {
                    fetched_at: Instant::now(),
                    releases: releases.clone(),
                },
            );
        Ok(releases)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::sync::mpsc;
    use std::thread;

    use super::*;

    const JSON: &str = r#"{
        "Requests": {"2.0.0": ["urllib3>=1.21"], "2.1.0": ["urllib3>=1.21", "idna"]},
        "urllib3": {"1.26.0": []}
    }"#;

    #[test]
    fn database_names_are_normalised() {
        let database = DependencyDatabase::from_json_str(JSON).unwrap();
        assert_eq!(database.len(), 2);
        let releases = database.releases("REQUESTS").unwrap().unwrap();
        assert_eq!(releases["2.1.0"], vec!["urllib3>=1.21", "idna"]);
        assert_eq!(database.releases("flask").unwrap(), None);
    }

    #[test]
    fn malformed_database_is_an_error() {
        assert!(matches!(
            DependencyDatabase::from_json_str(r#"{"a": ["1.0"]}"#),
            Err(CacheError::Json(_))
        ));
        assert!(matches!(
            DependencyDatabase::load("/nonexistent/dependencies.json"),
            Err(CacheError::Io(_))
        ));
    }

    #[test]
    fn fresh_entries_are_served_from_cache() {
        let calls = Cell::new(0);
        let database = DependencyDatabase::from_json_str(JSON).unwrap();
        let fetcher = |name: &str| {
            calls.set(calls.get() + 1);
            database.fetch(name)
        };
        let cache = CachedMetadata::new(fetcher, Duration::from_secs(3600));
        assert!(cache.is_stale("requests"));
        assert!(cache.releases("requests").unwrap().is_some());
        assert!(cache.releases("Requests").unwrap().is_some());
        assert_eq!(calls.get(), 1);
        assert!(!cache.is_stale("requests"));

        cache.invalidate("requests");
        assert!(cache.releases("requests").unwrap().is_some());
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn stale_entries_are_refreshed() {
        let calls = Cell::new(0);
        let fetcher = |_: &str| -> Result<Option<Releases>, ProviderError> {
            calls.set(calls.get() + 1);
            Ok(None)
        };
        let cache = CachedMetadata::new(fetcher, Duration::ZERO);
        assert_eq!(cache.releases("six").unwrap(), None);
        assert_eq!(cache.releases("six").unwrap(), None);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn slow_fetch_does_not_block_readers() {
        let (started_tx, started_rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let done_rx = Mutex::new(done_rx);
        let database = DependencyDatabase::from_json_str(JSON).unwrap();
        let fetcher = |name: &str| -> Result<Option<Releases>, ProviderError> {
            if name == "requests" {
                started_tx.send(())?;
                done_rx
                    .lock()
                    .unwrap()
                    .recv_timeout(Duration::from_secs(10))?;
            }
            database.fetch(name)
        };
        let cache = CachedMetadata::new(fetcher, Duration::from_secs(3600));
        assert!(cache.releases("urllib3").unwrap().is_some());

        thread::scope(|scope| {
            let slow = scope.spawn(|| cache.releases("requests"));
            started_rx.recv().unwrap();
            assert!(cache.releases("urllib3").unwrap().is_some());
            done_tx.send(()).unwrap();
            assert!(slow.join().unwrap().unwrap().is_some());
        });
    }

    #[test]
    fn failed_refresh_is_not_silenced() {
        let fetcher =
            |_: &str| -> Result<Option<Releases>, ProviderError> { Err("index is down".into()) };
        let cache = CachedMetadata::new(fetcher, Duration::ZERO);
        match cache.releases("six") {
            Err(CacheError::Fetch { package, .. }) => assert_eq!(package, "six"),
            other => panic!("unexpected {:?}", other.map(|_| ())),
        }
    }
}
