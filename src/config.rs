// SPDX-License-Identifier: MPL-2.0

//! Solver and metadata cache settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings of a solve.
///
/// Deserialises from JSON, missing fields keep their default:
/// `{"max_iterations": 5000, "cache_timeout": 3600}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Iterations of the main loop after which solving stops with
    /// [SolverExhausted](crate::error::SolveError::SolverExhausted).
    pub max_iterations: usize,
    /// Age after which a cached metadata entry is refreshed, in seconds once serialised.
    #[serde(with = "seconds")]
    pub cache_timeout: Duration,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100_000,
            cache_timeout: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl SolverConfig {
    /// Replace the iteration ceiling.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replace the cache timeout.
    pub fn with_cache_timeout(mut self, cache_timeout: Duration) -> Self {
        self.cache_timeout = cache_timeout;
        self
    }

    /// Read settings from a JSON document.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
