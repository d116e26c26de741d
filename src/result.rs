//! Resolution result.
//!
//! ## Invariants
//!
//! 1. **Disjoint drops**: `duplicates`, `supersets` and `removed` share no ID
//! 2. **No partial drops**: no key of `removed_samples` is in any of the three
//! 3. **Unique audit rows**: each audit list names a series at most once
//! 4. **Kept subsets**: every subset a superset row names is itself kept
//!
//! The engine guarantees these by construction. [`ResolutionResult::check_invariants`]
//! lets the caller verify them anyway before acting on the result.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::canonical::canonical_hash_hex;
use crate::policy::ResolutionPolicy;
use crate::types::{Duplicate, OverlapSet, SampleId, SeriesId, Superset};
use crate::RESOLUTION_SCHEMA_VERSION;

/// Content hash of a classification.
///
/// Same evidence + same policy gives the same fingerprint, whatever the
/// ingestion order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultFingerprint(String);

impl ResultFingerprint {
    /// Get the fingerprint as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ResultFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A classification invariant does not hold.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    /// A series is in two drop categories.
    #[error("series {id} is in both {first} and {second}")]
    Overlapping {
        /// The series.
        id: SeriesId,
        /// First category.
        first: &'static str,
        /// Second category.
        second: &'static str,
    },
    /// A fully dropped series also has a partial sample removal.
    #[error("series {id} is in {category} and also has removed samples")]
    PartialOnDropped {
        /// The series.
        id: SeriesId,
        /// Category it was dropped in.
        category: &'static str,
    },
    /// A superset is justified by a series that was dropped.
    #[error("superset {id} names {subset}, which is in {category}")]
    DroppedSubset {
        /// The superset.
        id: SeriesId,
        /// The dropped subset.
        subset: SeriesId,
        /// Category the subset was dropped in.
        category: &'static str,
    },
    /// An audit list names the same series twice.
    #[error("series {id} listed twice in {category}")]
    Repeated {
        /// The series.
        id: SeriesId,
        /// The audit list.
        category: &'static str,
    },
}

/// Classification produced by one `find` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionResult {
    /// Policy the result was computed with.
    pub policy: ResolutionPolicy,
    /// Dropped duplicates, ordered by dropped ID.
    pub duplicates: Vec<Duplicate>,
    /// Dropped supersets, ordered by ID.
    pub supersets: Vec<Superset>,
    /// Series removed whole by the reducer, ordered by ID.
    pub removed: Vec<OverlapSet>,
    /// Samples trimmed from kept series.
    pub removed_samples: BTreeMap<SeriesId, BTreeSet<SampleId>>,
    /// Clusters over kept series after reduction.
    pub residual_clusters: Vec<Vec<SeriesId>>,
}

/// The part of a result that the fingerprint covers.
#[derive(Serialize)]
struct FingerprintView<'a> {
    schema_version: &'a str,
    params_hash: String,
    duplicates: &'a [Duplicate],
    supersets: &'a [Superset],
    removed: &'a [OverlapSet],
    removed_samples: &'a BTreeMap<SeriesId, BTreeSet<SampleId>>,
}

impl ResolutionResult {
    /// A result with nothing classified.
    pub fn empty(policy: ResolutionPolicy) -> Self {
        Self {
            policy,
            duplicates: Vec::new(),
            supersets: Vec::new(),
            removed: Vec::new(),
            removed_samples: BTreeMap::new(),
            residual_clusters: Vec::new(),
        }
    }

    /// IDs dropped as duplicates.
    pub fn duplicate_ids(&self) -> BTreeSet<SeriesId> {
        self.duplicates.iter().map(|d| d.dropped.clone()).collect()
    }

    /// IDs dropped as supersets.
    pub fn superset_ids(&self) -> BTreeSet<SeriesId> {
        self.supersets.iter().map(|s| s.gid.clone()).collect()
    }

    /// IDs removed whole by the reducer.
    pub fn removed_ids(&self) -> BTreeSet<SeriesId> {
        self.removed.iter().map(|r| r.gid.clone()).collect()
    }

    /// Per-series samples to drop from kept series.
    pub fn removed_samples(&self) -> &BTreeMap<SeriesId, BTreeSet<SampleId>> {
        &self.removed_samples
    }

    /// Duplicate audit rows.
    pub fn duplicates(&self) -> &[Duplicate] {
        &self.duplicates
    }

    /// Superset audit rows.
    pub fn supersets(&self) -> &[Superset] {
        &self.supersets
    }

    /// Removal audit rows.
    pub fn removed(&self) -> &[OverlapSet] {
        &self.removed
    }

    /// Every series dropped whole, whatever the reason.
    pub fn dropped_ids(&self) -> BTreeSet<SeriesId> {
        let mut ids = self.duplicate_ids();
        ids.extend(self.superset_ids());
        ids.extend(self.removed_ids());
        ids
    }

    /// Drop list naming a series, `None` when it is kept.
    pub fn dropped_as(&self, id: &SeriesId) -> Option<&'static str> {
        if self.duplicates.iter().any(|d| &d.dropped == id) {
            Some("duplicates")
        } else if self.supersets.iter().any(|s| &s.gid == id) {
            Some("supersets")
        } else if self.removed.iter().any(|r| &r.gid == id) {
            Some("removed")
        } else {
            None
        }
    }

    /// Whether nothing was dropped or trimmed.
    pub fn is_empty(&self) -> bool {
        self.duplicates.is_empty()
            && self.supersets.is_empty()
            && self.removed.is_empty()
            && self.removed_samples.is_empty()
    }

    /// Samples a series loses: all of them when dropped, the trimmed ones
    /// when kept, `None` when untouched.
    pub fn samples_to_remove<'a>(
        &'a self,
        id: &SeriesId,
        original: &'a BTreeSet<SampleId>,
    ) -> Option<&'a BTreeSet<SampleId>> {
        if self.dropped_ids().contains(id) {
            Some(original)
        } else {
            self.removed_samples.get(id)
        }
    }

    /// Verify disjointness and uniqueness.
    pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
        let duplicates = unique_ids("duplicates", self.duplicates.iter().map(|d| &d.dropped))?;
        let supersets = unique_ids("supersets", self.supersets.iter().map(|s| &s.gid))?;
        let removed = unique_ids("removed", self.removed.iter().map(|r| &r.gid))?;

        let categories = [
            ("duplicates", &duplicates),
            ("supersets", &supersets),
            ("removed", &removed),
        ];

        for (i, &(first, a)) in categories.iter().enumerate() {
            for &(second, b) in &categories[i + 1..] {
                if let Some(id) = a.intersection(b).next() {
                    return Err(InvariantViolation::Overlapping {
                        id: (*id).clone(),
                        first,
                        second,
                    });
                }
            }
        }

        for id in self.removed_samples.keys() {
            for &(category, ids) in &categories {
                if ids.contains(id) {
                    return Err(InvariantViolation::PartialOnDropped {
                        id: id.clone(),
                        category,
                    });
                }
            }
        }

        for superset in &self.supersets {
            for subset in &superset.subset_ids {
                for &(category, ids) in &categories {
                    if ids.contains(subset) {
                        return Err(InvariantViolation::DroppedSubset {
                            id: superset.gid.clone(),
                            subset: subset.clone(),
                            category,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Content fingerprint of the classification.
    pub fn fingerprint(&self) -> ResultFingerprint {
        let view = FingerprintView {
            schema_version: RESOLUTION_SCHEMA_VERSION,
            params_hash: self.policy.params_hash(),
            duplicates: &self.duplicates,
            supersets: &self.supersets,
            removed: &self.removed,
            removed_samples: &self.removed_samples,
        };
        ResultFingerprint(canonical_hash_hex(&view))
    }
}

fn unique_ids<'a>(
    category: &'static str,
    ids: impl Iterator<Item = &'a SeriesId>,
) -> Result<BTreeSet<&'a SeriesId>, InvariantViolation> {
    let mut seen = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(InvariantViolation::Repeated {
                id: id.clone(),
                category,
            });
        }
    }
    Ok(seen)
}
