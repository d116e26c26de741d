//! Overlap evidence types.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::series::SeriesId;

/// Unordered pair of distinct series, stored in canonical order.
///
/// Implements `Ord` for deterministic ordering: (first, second).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesPair {
    /// Canonically smaller series.
    pub first: SeriesId,
    /// Canonically larger series.
    pub second: SeriesId,
}

impl SeriesPair {
    /// Create a pair, swapping the IDs into canonical order if needed.
    ///
    /// Returns `None` for a pair of a series with itself.
    pub fn new(a: SeriesId, b: SeriesId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Some(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    /// Whether `id` is one of the two ends.
    pub fn contains(&self, id: &SeriesId) -> bool {
        &self.first == id || &self.second == id
    }

    /// The end that is not `id`.
    pub fn other(&self, id: &SeriesId) -> Option<&SeriesId> {
        if &self.first == id {
            Some(&self.second)
        } else if &self.second == id {
            Some(&self.first)
        } else {
            None
        }
    }
}

impl fmt::Display for SeriesPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.first, self.second)
    }
}

/// One parsed overlap evidence line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapRecord {
    /// The pair the line is about.
    pub pair: SeriesPair,
    /// Whether the line listed the IDs in canonical order.
    ///
    /// The upstream tool writes every pair twice, once per direction; only
    /// the canonical copy is checked for repeats.
    pub canonical: bool,
    /// The full line as read.
    pub raw: String,
}

impl OverlapRecord {
    /// The evidence fields after the two IDs (opaque to the engine).
    pub fn evidence(&self) -> Vec<&str> {
        self.raw.split('\t').skip(2).collect()
    }
}
