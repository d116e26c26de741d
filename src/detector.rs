//! Duplicate and superset detection.
//!
//! Runs over the overlap graph plus the catalog's sample sets and marks whole
//! series only; no sample is touched here.
//!
//! ## Rules
//!
//! - **Duplicate**: series joined by equal-set edges form a group. The
//!   canonically first member is kept, every other member is dropped.
//! - **Superset**: a series whose samples are all covered by its kept strict
//!   subsets (overlap neighbours, not duplicates, not supersets themselves,
//!   each with at least `min_samples` samples) is dropped. Candidates are
//!   decided in ascending (size, id) order, so a subset's own status is
//!   settled before any series containing it is looked at. Series in the
//!   `pinned` set are never dropped as supersets; the engine pins a superset
//!   whose subsets did not survive reduction.

use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::SeriesCatalog;
use crate::graph::OverlapGraph;
use crate::types::{Duplicate, SampleId, SeriesId, Superset};

/// Sample sets of every graph node, borrowed from the catalog.
pub type SampleSets<'a> = BTreeMap<&'a SeriesId, &'a BTreeSet<SampleId>>;

/// A graph node has no catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("series {0} appears in the overlap evidence but not in the catalog")]
pub struct MissingEntryError(pub SeriesId);

/// Look up the sample set of every graph node.
pub fn resolve_sample_sets<'a, C>(graph: &'a OverlapGraph, catalog: &'a C) -> Result<SampleSets<'a>, MissingEntryError>
where
    C: SeriesCatalog + ?Sized,
{
    graph
        .nodes()
        .map(|id| {
            catalog
                .lookup(id)
                .map(|entry| (id, &entry.samples))
                .ok_or_else(|| MissingEntryError(id.clone()))
        })
        .collect()
}

/// Output of the detector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Dropped duplicates, ordered by dropped ID.
    pub duplicates: Vec<Duplicate>,
    /// Dropped supersets, ordered by ID.
    pub supersets: Vec<Superset>,
}

impl Detection {
    /// IDs of dropped duplicates.
    pub fn duplicate_ids(&self) -> BTreeSet<SeriesId> {
        self.duplicates.iter().map(|d| d.dropped.clone()).collect()
    }

    /// IDs of dropped supersets.
    pub fn superset_ids(&self) -> BTreeSet<SeriesId> {
        self.supersets.iter().map(|s| s.gid.clone()).collect()
    }
}

/// Classify duplicates, then supersets other than `pinned`.
pub fn detect(
    graph: &OverlapGraph,
    sets: &SampleSets<'_>,
    min_samples: usize,
    pinned: &BTreeSet<SeriesId>,
) -> Detection {
    let duplicates = find_duplicates(graph, sets);
    let dropped: BTreeSet<&SeriesId> = duplicates.iter().map(|d| &d.dropped).collect();
    let supersets = find_supersets(graph, sets, &dropped, pinned, min_samples);

    tracing::debug!(
        duplicates = duplicates.len(),
        supersets = supersets.len(),
        "Duplicate and superset detection complete"
    );

    Detection { duplicates, supersets }
}

fn find_duplicates(graph: &OverlapGraph, sets: &SampleSets<'_>) -> Vec<Duplicate> {
    let same = |a: &SeriesId, b: &SeriesId| match (sets.get(a), sets.get(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    };

    let mut duplicates = Vec::new();
    for group in graph.components_filtered(|_| true, same) {
        let Some((kept, rest)) = group.split_first() else {
            continue;
        };
        let n_samples = sets.get(kept).map_or(0, |s| s.len());
        for dropped in rest {
            duplicates.push(Duplicate {
                kept: kept.clone(),
                dropped: dropped.clone(),
                n_samples,
            });
        }
    }

    duplicates.sort_by(|a, b| a.dropped.cmp(&b.dropped));
    duplicates
}

fn find_supersets(
    graph: &OverlapGraph,
    sets: &SampleSets<'_>,
    duplicates: &BTreeSet<&SeriesId>,
    pinned: &BTreeSet<SeriesId>,
    min_samples: usize,
) -> Vec<Superset> {
    let mut order: Vec<(&SeriesId, &BTreeSet<SampleId>)> = sets
        .iter()
        .filter(|(id, _)| !duplicates.contains(*id) && !pinned.contains(**id))
        .map(|(id, s)| (*id, *s))
        .collect();
    order.sort_by(|a, b| a.1.len().cmp(&b.1.len()).then_with(|| a.0.cmp(b.0)));

    let mut superset_ids: BTreeSet<&SeriesId> = BTreeSet::new();
    let mut supersets = Vec::new();

    for (gid, samples) in order {
        let eligible: Vec<(&SeriesId, &BTreeSet<SampleId>)> = graph
            .neighbors(gid)
            .filter(|n| !duplicates.contains(n) && !superset_ids.contains(n))
            .filter_map(|n| sets.get(n).map(|s| (n, *s)))
            .filter(|(_, s)| s.len() >= min_samples && s.len() < samples.len() && s.is_subset(samples))
            .collect();

        if eligible.is_empty() {
            continue;
        }

        let covered: BTreeSet<&SampleId> = eligible.iter().flat_map(|(_, s)| s.iter()).collect();
        if covered.len() != samples.len() {
            continue;
        }

        // Keep only direct subsets: drop any subset strictly inside another one
        let subset_ids: Vec<SeriesId> = eligible
            .iter()
            .filter(|(_, s)| {
                !eligible
                    .iter()
                    .any(|(_, other)| other.len() > s.len() && s.is_subset(other))
            })
            .map(|(id, _)| (*id).clone())
            .collect();

        superset_ids.insert(gid);
        supersets.push(Superset {
            gid: gid.clone(),
            n_samples: samples.len(),
            subset_ids,
        });
    }

    supersets.sort_by(|a, b| a.gid.cmp(&b.gid));
    supersets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::parser::parse_overlap_line;

    fn id(s: &str) -> SeriesId {
        SeriesId::parse(s).unwrap()
    }

    /// Series are given as (id, comma separated samples).
    fn fixture(series: &[(&str, &str)], lines: &[&str]) -> (OverlapGraph, InMemoryCatalog) {
        let mut catalog = InMemoryCatalog::new();
        for (gid, samples) in series {
            catalog.add_series(id(gid), samples.split(','), None);
        }
        let mut graph = OverlapGraph::new();
        for line in lines {
            graph.insert(parse_overlap_line(line).unwrap()).unwrap();
        }
        (graph, catalog)
    }

    #[test]
    fn test_duplicate_keeps_canonically_first() {
        let (graph, catalog) = fixture(
            &[("GSE5", "a,b"), ("GSE12", "a,b")],
            &["GSE12\tGSE5"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let detection = detect(&graph, &sets, 1, &BTreeSet::new());

        assert_eq!(detection.duplicates.len(), 1);
        assert_eq!(detection.duplicates[0].kept, id("GSE5"));
        assert_eq!(detection.duplicates[0].dropped, id("GSE12"));
        assert_eq!(detection.duplicates[0].n_samples, 2);
    }

    #[test]
    fn test_duplicate_chain_keeps_one() {
        let (graph, catalog) = fixture(
            &[("GSE1", "a"), ("GSE2", "a"), ("GSE3", "a")],
            &["GSE2\tGSE3", "GSE1\tGSE2"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let detection = detect(&graph, &sets, 1, &BTreeSet::new());

        assert_eq!(detection.duplicate_ids(), [id("GSE2"), id("GSE3")].into_iter().collect());
        assert!(detection.duplicates.iter().all(|d| d.kept == id("GSE1")));
    }

    #[test]
    fn test_superset_covered_by_subsets() {
        let (graph, catalog) = fixture(
            &[
                ("GSE1", "a,b,c,d,e,f"),
                ("GSE2", "a,b,c"),
                ("GSE3", "d,e,f"),
            ],
            &["GSE1\tGSE2", "GSE1\tGSE3"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let detection = detect(&graph, &sets, 3, &BTreeSet::new());

        assert_eq!(detection.supersets.len(), 1);
        assert_eq!(detection.supersets[0].gid, id("GSE1"));
        assert_eq!(detection.supersets[0].n_samples, 6);
        assert_eq!(detection.supersets[0].subset_ids, vec![id("GSE2"), id("GSE3")]);
    }

    #[test]
    fn test_partial_cover_is_not_superset() {
        let (graph, catalog) = fixture(
            &[("GSE1", "a,b,c,d,e"), ("GSE3", "a,b,c")],
            &["GSE1\tGSE3"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let detection = detect(&graph, &sets, 3, &BTreeSet::new());
        assert!(detection.supersets.is_empty());
    }

    #[test]
    fn test_small_subsets_do_not_justify() {
        let (graph, catalog) = fixture(
            &[("GSE1", "a,b,c,d"), ("GSE2", "a,b"), ("GSE3", "c,d")],
            &["GSE1\tGSE2", "GSE1\tGSE3"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        assert!(detect(&graph, &sets, 3, &BTreeSet::new()).supersets.is_empty());
        assert_eq!(detect(&graph, &sets, 2, &BTreeSet::new()).superset_ids(), [id("GSE1")].into_iter().collect());
    }

    #[test]
    fn test_only_direct_subsets_listed() {
        // GSE1 ⊋ GSE2 ⊋ GSE3, GSE1 = GSE2 ∪ GSE4
        let (graph, catalog) = fixture(
            &[
                ("GSE1", "a,b,c,d,e,f"),
                ("GSE2", "a,b,c,d"),
                ("GSE3", "a,b"),
                ("GSE4", "d,e,f"),
            ],
            &["GSE1\tGSE2", "GSE1\tGSE3", "GSE1\tGSE4", "GSE2\tGSE3", "GSE2\tGSE4"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let detection = detect(&graph, &sets, 2, &BTreeSet::new());

        assert_eq!(detection.superset_ids(), [id("GSE1")].into_iter().collect());
        assert_eq!(detection.supersets[0].subset_ids, vec![id("GSE2"), id("GSE4")]);
    }

    #[test]
    fn test_superset_of_superset_needs_kept_subsets() {
        // GSE2 = GSE3 ∪ GSE4 is dropped first, so it cannot justify GSE1
        let (graph, catalog) = fixture(
            &[
                ("GSE1", "a,b,c,d,e"),
                ("GSE2", "a,b,c,d"),
                ("GSE3", "a,b"),
                ("GSE4", "c,d"),
                ("GSE5", "e,a"),
            ],
            &["GSE1\tGSE2", "GSE2\tGSE3", "GSE2\tGSE4", "GSE1\tGSE5"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let detection = detect(&graph, &sets, 2, &BTreeSet::new());
        assert_eq!(detection.superset_ids(), [id("GSE2")].into_iter().collect());
    }

    #[test]
    fn test_duplicate_cannot_justify_superset() {
        let (graph, catalog) = fixture(
            &[("GSE1", "a,b,c,d"), ("GSE2", "a,b,c,d"), ("GSE3", "a,b"), ("GSE4", "c,d")],
            &["GSE1\tGSE2", "GSE1\tGSE3", "GSE1\tGSE4", "GSE2\tGSE3", "GSE2\tGSE4"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let detection = detect(&graph, &sets, 2, &BTreeSet::new());

        // GSE2 is a duplicate of GSE1; GSE1 itself is then covered by GSE3 and GSE4
        assert_eq!(detection.duplicate_ids(), [id("GSE2")].into_iter().collect());
        assert_eq!(detection.superset_ids(), [id("GSE1")].into_iter().collect());
        let dups = detection.duplicate_ids();
        assert!(detection.superset_ids().is_disjoint(&dups));
    }

    #[test]
    fn test_pinned_series_is_not_a_superset() {
        let (graph, catalog) = fixture(
            &[
                ("GSE1", "a,b,c,d,e,f"),
                ("GSE2", "a,b,c"),
                ("GSE3", "d,e,f"),
            ],
            &["GSE1\tGSE2", "GSE1\tGSE3"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let pinned: BTreeSet<SeriesId> = [id("GSE1")].into_iter().collect();
        assert!(detect(&graph, &sets, 3, &pinned).supersets.is_empty());
    }

    #[test]
    fn test_missing_catalog_entry() {
        let (graph, catalog) = fixture(&[("GSE1", "a")], &["GSE1\tGSE2"]);
        let err = resolve_sample_sets(&graph, &catalog).unwrap_err();
        assert_eq!(err, MissingEntryError(id("GSE2")));
    }
}
