//! Audit records for classified series.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::series::{SampleId, SeriesId};

/// A series dropped because its sample set equals a kept series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duplicate {
    /// Series that is kept (canonically first of its group).
    pub kept: SeriesId,
    /// Series that is dropped.
    pub dropped: SeriesId,
    /// Number of samples shared, which is the size of both series.
    pub n_samples: usize,
}

/// A series dropped because kept strict subsets cover all of its samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Superset {
    /// The dropped superset.
    pub gid: SeriesId,
    /// Number of samples in the superset.
    pub n_samples: usize,
    /// Direct justifying subsets, in canonical order.
    pub subset_ids: Vec<SeriesId>,
}

/// Why a series ended up in `removed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// Fewer samples than the minimum to begin with.
    TooFewSamples,
    /// Fell below the minimum after giving up overlapping samples.
    TrimmedBelowMinimum,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSamples => write!(f, "too_few_samples"),
            Self::TrimmedBelowMinimum => write!(f, "trimmed_below_minimum"),
        }
    }
}

/// A series fully removed by the constrained reducer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapSet {
    /// The removed series.
    pub gid: SeriesId,
    /// Original number of samples.
    pub n_samples: usize,
    /// Samples that would have remained after trimming.
    pub n_remaining: usize,
    /// Always the full original sample set.
    pub gsms_to_remove: BTreeSet<SampleId>,
    /// Which pass removed it.
    pub reason: RemovalReason,
}
