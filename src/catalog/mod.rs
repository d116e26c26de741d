//! Series catalog: series ID -> sample set and publication date.
//!
//! The engine never owns the catalog. It takes any [`SeriesCatalog`] as an
//! injected read-only dependency, so tests run without an external store.

pub mod memory;
pub mod tsv;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{SampleId, SeriesId};

pub use memory::InMemoryCatalog;
pub use tsv::{load_catalog, parse_catalog};

/// Catalog entry for one series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesEntry {
    /// Member samples.
    pub samples: BTreeSet<SampleId>,
    /// Publication date, `None` when unknown or unpublished.
    pub published: Option<NaiveDate>,
}

impl SeriesEntry {
    /// Create an entry.
    pub fn new(samples: BTreeSet<SampleId>, published: Option<NaiveDate>) -> Self {
        Self { samples, published }
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the series has no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Whether the series was published strictly before `cutoff`.
    pub fn published_before(&self, cutoff: NaiveDate) -> bool {
        self.published.is_some_and(|d| d < cutoff)
    }
}

/// Read-only lookup of series metadata.
///
/// Implementations return `None` for unknown series instead of failing, so
/// callers can tell "unknown" apart from "empty sample set".
pub trait SeriesCatalog {
    /// Look up one series.
    fn lookup(&self, id: &SeriesId) -> Option<&SeriesEntry>;
}

impl<C: SeriesCatalog + ?Sized> SeriesCatalog for std::sync::Arc<C> {
    fn lookup(&self, id: &SeriesId) -> Option<&SeriesEntry> {
        (**self).lookup(id)
    }
}

impl<C: SeriesCatalog + ?Sized> SeriesCatalog for &C {
    fn lookup(&self, id: &SeriesId) -> Option<&SeriesEntry> {
        (**self).lookup(id)
    }
}

/// Error type for catalog loading.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Line does not have the expected fields.
    #[error("catalog line {line_no}: {reason}: '{line}'")]
    Malformed {
        /// 1-based line number.
        line_no: usize,
        /// What is wrong.
        reason: String,
        /// The offending line.
        line: String,
    },
    /// The same series appears twice.
    #[error("catalog line {line_no}: multiple entries for {id}")]
    DuplicateSeries {
        /// 1-based line number of the second entry.
        line_no: usize,
        /// The repeated series.
        id: SeriesId,
    },
    /// I/O error reading the catalog file.
    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),
}
