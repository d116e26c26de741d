//! Overlap graph over series IDs.
//!
//! Undirected, built incrementally from parsed overlap records. Edges are never
//! removed; clearing the graph is the only way to shrink it.
//!
//! Uses BTreeMap/BTreeSet throughout so every traversal runs in canonical
//! `SeriesId` order.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::types::{OverlapRecord, SeriesId, SeriesPair};

/// A canonical pair was ingested twice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("overlap pair {pair} ingested twice in canonical order: '{line}'")]
pub struct DuplicatePairError {
    /// The repeated pair.
    pub pair: SeriesPair,
    /// The second line naming it.
    pub line: String,
}

/// Undirected overlap graph with the raw evidence kept per edge.
#[derive(Debug, Clone, Default)]
pub struct OverlapGraph {
    /// Node -> neighbours.
    adjacency: BTreeMap<SeriesId, BTreeSet<SeriesId>>,
    /// Pair -> raw lines in ingestion order.
    evidence: BTreeMap<SeriesPair, Vec<String>>,
    /// Pairs already seen in canonical order.
    canonical_seen: BTreeSet<SeriesPair>,
}

impl OverlapGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record.
    ///
    /// Returns `true` when the record created a new edge, `false` when it
    /// merged into an existing one (the mirrored copy of a pair).
    pub fn insert(&mut self, record: OverlapRecord) -> Result<bool, DuplicatePairError> {
        let OverlapRecord { pair, canonical, raw } = record;

        if canonical && !self.canonical_seen.insert(pair.clone()) {
            return Err(DuplicatePairError { pair, line: raw });
        }

        self.adjacency
            .entry(pair.first.clone())
            .or_default()
            .insert(pair.second.clone());
        self.adjacency
            .entry(pair.second.clone())
            .or_default()
            .insert(pair.first.clone());

        let lines = self.evidence.entry(pair).or_default();
        let is_new = lines.is_empty();
        lines.push(raw);
        Ok(is_new)
    }

    /// Remove every node, edge and evidence line.
    pub fn clear(&mut self) {
        self.adjacency.clear();
        self.evidence.clear();
        self.canonical_seen.clear();
    }

    /// Whether nothing has been ingested.
    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of nodes.
    pub fn num_nodes(&self) -> usize {
        self.adjacency.len()
    }

    /// Number of distinct edges.
    pub fn num_edges(&self) -> usize {
        self.evidence.len()
    }

    /// Nodes in canonical order.
    pub fn nodes(&self) -> impl Iterator<Item = &SeriesId> {
        self.adjacency.keys()
    }

    /// Edges in canonical order.
    pub fn edges(&self) -> impl Iterator<Item = &SeriesPair> {
        self.evidence.keys()
    }

    /// Whether `id` is a node.
    pub fn contains(&self, id: &SeriesId) -> bool {
        self.adjacency.contains_key(id)
    }

    /// Neighbours of `id` in canonical order.
    pub fn neighbors(&self, id: &SeriesId) -> impl Iterator<Item = &SeriesId> {
        self.adjacency.get(id).into_iter().flatten()
    }

    /// Raw evidence lines for a pair, in ingestion order.
    pub fn evidence(&self, pair: &SeriesPair) -> &[String] {
        self.evidence.get(pair).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Connected components restricted to accepted nodes and edges.
    ///
    /// Members of each component are in canonical order; components are
    /// ordered by their smallest member.
    pub fn components_filtered<N, E>(&self, include_node: N, include_edge: E) -> Vec<Vec<SeriesId>>
    where
        N: Fn(&SeriesId) -> bool,
        E: Fn(&SeriesId, &SeriesId) -> bool,
    {
        let mut visited: BTreeSet<&SeriesId> = BTreeSet::new();
        let mut components = Vec::new();

        for start in self.adjacency.keys() {
            if visited.contains(start) || !include_node(start) {
                continue;
            }

            let mut members: BTreeSet<&SeriesId> = BTreeSet::new();
            let mut queue: VecDeque<&SeriesId> = VecDeque::new();
            visited.insert(start);
            queue.push_back(start);

            while let Some(node) = queue.pop_front() {
                members.insert(node);
                for next in self.neighbors(node) {
                    if visited.contains(next) || !include_node(next) || !include_edge(node, next) {
                        continue;
                    }
                    visited.insert(next);
                    queue.push_back(next);
                }
            }

            components.push(members.into_iter().cloned().collect());
        }

        components
    }

    /// Connected components of the whole graph.
    pub fn components(&self) -> Vec<Vec<SeriesId>> {
        self.components_filtered(|_| true, |_, _| true)
    }
}
