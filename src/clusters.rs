//! Cluster reporting.
//!
//! Clusters are connected components of the overlap graph. The raw clusters
//! describe the evidence as ingested; residual clusters describe what is left
//! after reduction, linking kept series whose remaining samples still
//! intersect.

use std::collections::{BTreeMap, BTreeSet};

use crate::detector::SampleSets;
use crate::graph::OverlapGraph;
use crate::types::{SampleId, SeriesId};

/// Connected components of the raw overlap graph.
pub fn find_clusters(graph: &OverlapGraph) -> Vec<Vec<SeriesId>> {
    graph.components()
}

/// Clusters with at least `min_size` members, in their original order.
pub fn clusters_of_size(clusters: &[Vec<SeriesId>], min_size: usize) -> Vec<Vec<SeriesId>> {
    clusters
        .iter()
        .filter(|c| c.len() >= min_size)
        .cloned()
        .collect()
}

/// Number of clusters per member count.
pub fn size_histogram(clusters: &[Vec<SeriesId>]) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for cluster in clusters {
        *histogram.entry(cluster.len()).or_default() += 1;
    }
    histogram
}

/// Clusters left after reduction.
///
/// Series in `dropped` are left out. Two kept series stay linked only when
/// their samples, minus anything in `removed_samples`, still intersect.
pub fn residual_clusters(
    graph: &OverlapGraph,
    sets: &SampleSets<'_>,
    dropped: &BTreeSet<SeriesId>,
    removed_samples: &BTreeMap<SeriesId, BTreeSet<SampleId>>,
) -> Vec<Vec<SeriesId>> {
    let remaining = |id: &SeriesId| -> BTreeSet<&SampleId> {
        let Some(samples) = sets.get(id) else {
            return BTreeSet::new();
        };
        match removed_samples.get(id) {
            Some(trimmed) => samples.difference(trimmed).collect(),
            None => samples.iter().collect(),
        }
    };

    graph.components_filtered(
        |id| !dropped.contains(id),
        |a, b| !remaining(a).is_disjoint(&remaining(b)),
    )
}
