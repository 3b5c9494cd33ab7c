use crate::state::WorkKey;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Key of a cached piece of extracted text
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CacheKey {
    Synopsis {
        case_name: String,
    },
    TeachingPoint {
        case_name: String,
        teaching_point: String,
    },
}

impl CacheKey {
    pub fn synopsis(case_name: impl Into<String>) -> Self {
        Self::Synopsis {
            case_name: case_name.into(),
        }
    }

    pub fn teaching_point(case_name: impl Into<String>, teaching_point: impl Into<String>) -> Self {
        Self::TeachingPoint {
            case_name: case_name.into(),
            teaching_point: teaching_point.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synopsis { case_name } => write!(f, "synopsis of '{}'", case_name),
            Self::TeachingPoint {
                case_name,
                teaching_point,
            } => write!(f, "teaching point '{}' of '{}'", teaching_point, case_name),
        }
    }
}

/// Cleaned text keyed by case and teaching point
///
/// Writes overwrite: re-extracting an item after a resume is harmless.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeCache {
    entries: BTreeMap<CacheKey, String>,
}

impl ScrapeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn put(&mut self, key: CacheKey, value: String) {
        self.entries.insert(key, value);
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CacheKey, &String)> {
        self.entries.iter()
    }
}

impl FromIterator<(CacheKey, String)> for ScrapeCache {
    fn from_iter<I: IntoIterator<Item = (CacheKey, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Everything a run accumulates: the cache and the processed work keys
///
/// A key can be processed without any cache entry; that records an
/// extraction that was attempted and gave up.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineState {
    pub cache: ScrapeCache,
    pub processed: BTreeSet<WorkKey>,
}

impl PipelineState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_processed(&self, key: &WorkKey) -> bool {
        self.processed.contains(key)
    }

    /// Records that `key` reached a terminal state; returns false if it
    /// already had
    pub fn mark_processed(&mut self, key: WorkKey) -> bool {
        self.processed.insert(key)
    }
}

/// State shared between the coordinator and its jobs
///
/// The lock is only held for in-memory updates and snapshot serialization,
/// never across an await.
pub type SharedState = Arc<Mutex<PipelineState>>;
