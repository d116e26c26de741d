//! Constrained reduction.
//!
//! Applies the minimum-size and maximum-overlap rules to the series the
//! detector left alone.
//!
//! 1. **Minimum size**: a series with fewer than `min_samples` samples is
//!    removed whole.
//! 2. **Overlap**: for every overlap edge between two surviving series that
//!    share more than `max_overlap` samples, the shared samples are trimmed
//!    from one side. The smaller series loses; on equal size the canonically
//!    later ID loses.
//! 3. **Fixpoint**: while some series has fewer than `min_samples` samples
//!    left after trimming, the one with the fewest remaining (then the
//!    canonically first) is removed whole and the trims are recomputed
//!    without it. Partners of a removed series get their samples back.
//!
//! Shares are always computed on the original catalog sets.

use std::collections::{BTreeMap, BTreeSet};

use crate::detector::SampleSets;
use crate::graph::OverlapGraph;
use crate::types::{OverlapSet, RemovalReason, SampleId, SeriesId};

/// Output of the reducer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reduction {
    /// Fully removed series, ordered by ID.
    pub removed: Vec<OverlapSet>,
    /// Samples trimmed from series that are otherwise kept.
    pub removed_samples: BTreeMap<SeriesId, BTreeSet<SampleId>>,
}

impl Reduction {
    /// IDs of fully removed series.
    pub fn removed_ids(&self) -> BTreeSet<SeriesId> {
        self.removed.iter().map(|r| r.gid.clone()).collect()
    }
}

type Trims<'a> = BTreeMap<&'a SeriesId, BTreeSet<&'a SampleId>>;

/// Reduce every graph node not in `excluded`.
pub fn reduce(
    graph: &OverlapGraph,
    sets: &SampleSets<'_>,
    excluded: &BTreeSet<SeriesId>,
    min_samples: usize,
    max_overlap: usize,
) -> Reduction {
    let mut removed = Vec::new();
    let mut active: BTreeSet<&SeriesId> = BTreeSet::new();

    for (&id, &samples) in sets.iter() {
        if excluded.contains(id) {
            continue;
        }
        if samples.len() < min_samples {
            removed.push(OverlapSet {
                gid: id.clone(),
                n_samples: samples.len(),
                n_remaining: samples.len(),
                gsms_to_remove: samples.clone(),
                reason: RemovalReason::TooFewSamples,
            });
        } else {
            active.insert(id);
        }
    }

    let too_small = removed.len();

    let trims = loop {
        let trims = compute_trims(graph, sets, &active, max_overlap);

        let promoted = active
            .iter()
            .filter_map(|&id| {
                let total = sets.get(id).map_or(0, |s| s.len());
                let trimmed = trims.get(id).map_or(0, BTreeSet::len);
                let remaining = total - trimmed;
                (remaining < min_samples).then_some((remaining, id))
            })
            .min();

        let Some((remaining, id)) = promoted else {
            break trims;
        };

        let samples = sets.get(id).map(|s| (*s).clone()).unwrap_or_default();
        tracing::debug!(
            series = %id,
            n_samples = samples.len(),
            n_remaining = remaining,
            "Series trimmed below minimum, removing"
        );
        removed.push(OverlapSet {
            gid: id.clone(),
            n_samples: samples.len(),
            n_remaining: remaining,
            gsms_to_remove: samples,
            reason: RemovalReason::TrimmedBelowMinimum,
        });
        active.remove(id);
    };

    let removed_samples: BTreeMap<SeriesId, BTreeSet<SampleId>> = trims
        .into_iter()
        .filter(|(_, samples)| !samples.is_empty())
        .map(|(id, samples)| (id.clone(), samples.into_iter().cloned().collect()))
        .collect();

    removed.sort_by(|a, b| a.gid.cmp(&b.gid));

    tracing::debug!(
        too_small,
        trimmed_below_minimum = removed.len() - too_small,
        trimmed = removed_samples.len(),
        "Constrained reduction complete"
    );

    Reduction {
        removed,
        removed_samples,
    }
}

/// Trims implied by every over-threshold edge between active series.
fn compute_trims<'a>(
    graph: &'a OverlapGraph,
    sets: &SampleSets<'a>,
    active: &BTreeSet<&'a SeriesId>,
    max_overlap: usize,
) -> Trims<'a> {
    let mut trims: Trims<'a> = BTreeMap::new();

    for pair in graph.edges() {
        if !active.contains(&pair.first) || !active.contains(&pair.second) {
            continue;
        }
        let (Some(&a), Some(&b)) = (sets.get(&pair.first), sets.get(&pair.second)) else {
            continue;
        };

        let shared: BTreeSet<&SampleId> = a.intersection(b).collect();
        if shared.len() <= max_overlap {
            continue;
        }

        // Pairs are canonical, so `first` wins a size tie
        let loser = if b.len() > a.len() { &pair.first } else { &pair.second };
        trims.entry(loser).or_default().extend(shared);
    }

    trims
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::detector::resolve_sample_sets;
    use crate::parser::parse_overlap_line;

    fn id(s: &str) -> SeriesId {
        SeriesId::parse(s).unwrap()
    }

    fn samples(list: &str) -> BTreeSet<SampleId> {
        list.split(',').map(SampleId::new).collect()
    }

    /// Series are given as (id, comma separated samples).
    fn fixture(series: &[(&str, &str)], lines: &[&str]) -> (OverlapGraph, InMemoryCatalog) {
        let mut catalog = InMemoryCatalog::new();
        for (gid, list) in series {
            catalog.add_series(id(gid), list.split(','), None);
        }
        let mut graph = OverlapGraph::new();
        for line in lines {
            graph.insert(parse_overlap_line(line).unwrap()).unwrap();
        }
        (graph, catalog)
    }

    fn run(series: &[(&str, &str)], lines: &[&str], min_samples: usize, max_overlap: usize) -> Reduction {
        let (graph, catalog) = fixture(series, lines);
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        reduce(&graph, &sets, &BTreeSet::new(), min_samples, max_overlap)
    }

    #[test]
    fn test_min_size_pass_removes_whole_series() {
        let reduction = run(
            &[("GSE1", "a,b,c,d"), ("GSE2", "x,y")],
            &["GSE1\tGSE2"],
            3,
            3,
        );

        assert_eq!(reduction.removed.len(), 1);
        let removed = &reduction.removed[0];
        assert_eq!(removed.gid, id("GSE2"));
        assert_eq!(removed.reason, RemovalReason::TooFewSamples);
        assert_eq!(removed.gsms_to_remove, samples("x,y"));
        assert!(reduction.removed_samples.is_empty());
    }

    #[test]
    fn test_smaller_series_is_trimmed() {
        let reduction = run(
            &[("GSE1", "a,b,c,d,e"), ("GSE2", "a,b,c,x,y,z,w")],
            &["GSE1\tGSE2"],
            1,
            2,
        );

        assert!(reduction.removed.is_empty());
        assert_eq!(reduction.removed_samples.len(), 1);
        assert_eq!(reduction.removed_samples[&id("GSE1")], samples("a,b,c"));
    }

    #[test]
    fn test_equal_size_later_id_is_trimmed() {
        let reduction = run(
            &[("GSE7", "a,b,c,d"), ("GSE30", "a,b,c,e")],
            &["GSE30\tGSE7"],
            1,
            1,
        );

        assert_eq!(reduction.removed_samples.keys().collect::<Vec<_>>(), vec![&id("GSE30")]);
        assert_eq!(reduction.removed_samples[&id("GSE30")], samples("a,b,c"));
    }

    #[test]
    fn test_overlap_at_threshold_is_kept() {
        let reduction = run(
            &[("GSE1", "a,b,c,d"), ("GSE2", "a,b,e,f,g")],
            &["GSE1\tGSE2"],
            1,
            2,
        );
        assert_eq!(reduction, Reduction::default());
    }

    #[test]
    fn test_trims_accumulate_across_partners() {
        let reduction = run(
            &[
                ("GSE1", "a,b,c,d,e,f,g,h,i,j"),
                ("GSE2", "a,b,p,q,r,s,m,n"),
                ("GSE3", "p,q,r,s,t,u,v,w,x,y"),
            ],
            &["GSE1\tGSE2", "GSE2\tGSE3"],
            2,
            1,
        );

        assert!(reduction.removed.is_empty());
        assert_eq!(reduction.removed_samples[&id("GSE2")], samples("a,b,p,q,r,s"));
    }

    #[test]
    fn test_trimmed_below_minimum_is_removed_whole() {
        let reduction = run(
            &[("GSE1", "a,b,c,d,e,f"), ("GSE2", "a,b,c,x")],
            &["GSE1\tGSE2"],
            3,
            1,
        );

        assert_eq!(reduction.removed.len(), 1);
        let removed = &reduction.removed[0];
        assert_eq!(removed.gid, id("GSE2"));
        assert_eq!(removed.reason, RemovalReason::TrimmedBelowMinimum);
        assert_eq!(removed.n_samples, 4);
        assert_eq!(removed.n_remaining, 1);
        assert_eq!(removed.gsms_to_remove, samples("a,b,c,x"));
        assert!(!reduction.removed_samples.contains_key(&id("GSE2")));
    }

    #[test]
    fn test_removed_partner_gives_samples_back() {
        // GSE2 loses to GSE1 and drops out; GSE3 then keeps p,q
        let reduction = run(
            &[
                ("GSE1", "a,b,c,d,e,f,g"),
                ("GSE2", "a,b,c,d,p,q"),
                ("GSE3", "p,q,r,s"),
            ],
            &["GSE1\tGSE2", "GSE2\tGSE3"],
            3,
            1,
        );

        assert_eq!(reduction.removed_ids(), [id("GSE2")].into_iter().collect());
        assert!(reduction.removed_samples.is_empty());
    }

    #[test]
    fn test_excluded_series_are_ignored() {
        let (graph, catalog) = fixture(
            &[("GSE1", "a,b,c,d"), ("GSE2", "a,b,c,d,e")],
            &["GSE1\tGSE2"],
        );
        let sets = resolve_sample_sets(&graph, &catalog).unwrap();
        let excluded = [id("GSE2")].into_iter().collect();

        let reduction = reduce(&graph, &sets, &excluded, 1, 0);
        assert_eq!(reduction, Reduction::default());
    }
}
