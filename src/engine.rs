//! Resolution engine.
//!
//! Owns the overlap graph and the last result. The catalog is injected and
//! only read.
//!
//! ## Lifecycle
//!
//! 1. `add_overlap_line` for every evidence line
//! 2. `find` (or `find_with`) to classify
//! 3. Read the result; `find_clusters` may be called at any point
//! 4. `reset` to start over, or drop the engine and build a new one

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::catalog::SeriesCatalog;
use crate::clusters::{clusters_of_size, find_clusters, residual_clusters};
use crate::detector::{detect, resolve_sample_sets};
use crate::graph::OverlapGraph;
use crate::parser::{parse_overlap_line, ParseError};
use crate::policy::{PolicyError, ResolutionPolicy};
use crate::reducer::reduce;
use crate::result::ResolutionResult;
use crate::types::{SeriesId, SeriesPair};

/// Error type for engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed overlap line.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Canonical pair ingested twice.
    #[error("overlap pair {pair} ingested twice in canonical order: '{line}'")]
    DuplicatePair {
        /// The repeated pair.
        pair: SeriesPair,
        /// The second line naming it.
        line: String,
    },
    /// A series in the overlap evidence has no catalog entry.
    #[error("series {0} appears in the overlap evidence but not in the catalog")]
    MissingCatalogEntry(SeriesId),
    /// `find` called with nothing ingested.
    #[error("no overlap data ingested")]
    NoOverlapData,
    /// Policy parameters rejected.
    #[error("invalid policy: {0}")]
    InvalidPolicy(#[from] PolicyError),
}

/// Overlap resolution engine.
///
/// Single-threaded: one driving loop calls `add_overlap_line`, `find` and
/// `reset` in sequence.
pub struct ResolutionEngine<C: SeriesCatalog> {
    catalog: Arc<C>,
    graph: OverlapGraph,
    result: Option<ResolutionResult>,
}

impl<C: SeriesCatalog> ResolutionEngine<C> {
    /// Create an engine over a catalog.
    pub fn new(catalog: Arc<C>) -> Self {
        Self {
            catalog,
            graph: OverlapGraph::new(),
            result: None,
        }
    }

    /// Ingest one overlap line.
    ///
    /// Returns `true` when the line created a new edge. Any cached result is
    /// discarded.
    pub fn add_overlap_line(&mut self, line: &str) -> Result<bool, EngineError> {
        let record = parse_overlap_line(line)?;
        self.result = None;
        self.graph
            .insert(record)
            .map_err(|e| EngineError::DuplicatePair {
                pair: e.pair,
                line: e.line,
            })
    }

    /// Classify with the given thresholds and the default cluster size.
    pub fn find(&mut self, min_samples: usize, max_overlap: usize) -> Result<&ResolutionResult, EngineError> {
        self.find_with(ResolutionPolicy::new(min_samples, max_overlap))
    }

    /// Classify with a full policy.
    ///
    /// Repeated calls with the same policy return the cached result.
    pub fn find_with(&mut self, policy: ResolutionPolicy) -> Result<&ResolutionResult, EngineError> {
        policy.validate()?;
        if self.graph.is_empty() {
            return Err(EngineError::NoOverlapData);
        }

        let cached = self.result.as_ref().is_some_and(|r| r.policy == policy);
        if !cached {
            let result = self.compute(policy)?;
            self.result = Some(result);
        }

        self.result.as_ref().ok_or(EngineError::NoOverlapData)
    }

    fn compute(&self, policy: ResolutionPolicy) -> Result<ResolutionResult, EngineError> {
        let sets = resolve_sample_sets(&self.graph, self.catalog.as_ref())
            .map_err(|e| EngineError::MissingCatalogEntry(e.0))?;

        // A superset stays dropped only while every subset it names survives
        // reduction; otherwise it is pinned as kept and both passes rerun.
        let mut pinned: BTreeSet<SeriesId> = BTreeSet::new();
        let (detection, reduction, mut excluded) = loop {
            let detection = detect(&self.graph, &sets, policy.min_samples, &pinned);

            let mut excluded = detection.duplicate_ids();
            excluded.extend(detection.superset_ids());
            let reduction = reduce(&self.graph, &sets, &excluded, policy.min_samples, policy.max_overlap);

            let removed = reduction.removed_ids();
            let unjustified: Vec<SeriesId> = detection
                .supersets
                .iter()
                .filter(|s| s.subset_ids.iter().any(|id| removed.contains(id)))
                .map(|s| s.gid.clone())
                .collect();

            if unjustified.is_empty() {
                break (detection, reduction, excluded);
            }

            tracing::debug!(
                reinstated = unjustified.len(),
                "Supersets lost a subset to reduction, keeping them"
            );
            pinned.extend(unjustified);
        };

        excluded.extend(reduction.removed_ids());
        let residual = residual_clusters(&self.graph, &sets, &excluded, &reduction.removed_samples);

        tracing::info!(
            series = self.graph.num_nodes(),
            edges = self.graph.num_edges(),
            duplicates = detection.duplicates.len(),
            supersets = detection.supersets.len(),
            removed = reduction.removed.len(),
            trimmed = reduction.removed_samples.len(),
            min_samples = policy.min_samples,
            max_overlap = policy.max_overlap,
            "Overlap resolution complete"
        );

        Ok(ResolutionResult {
            policy,
            duplicates: detection.duplicates,
            supersets: detection.supersets,
            removed: reduction.removed,
            removed_samples: reduction.removed_samples,
            residual_clusters: residual,
        })
    }

    /// Last result, if `find` ran since the last change.
    pub fn result(&self) -> Option<&ResolutionResult> {
        self.result.as_ref()
    }

    /// Connected components of the raw overlap graph.
    pub fn find_clusters(&self) -> Vec<Vec<SeriesId>> {
        find_clusters(&self.graph)
    }

    /// Raw clusters with at least `min_size` members.
    pub fn cluster_ids(&self, min_size: usize) -> Vec<Vec<SeriesId>> {
        clusters_of_size(&self.find_clusters(), min_size)
    }

    /// The overlap graph as ingested.
    pub fn graph(&self) -> &OverlapGraph {
        &self.graph
    }

    /// The injected catalog.
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Raw evidence lines for a pair.
    pub fn evidence(&self, pair: &SeriesPair) -> &[String] {
        self.graph.evidence(pair)
    }

    /// Drop all ingested data and the cached result.
    pub fn reset(&mut self) {
        self.graph.clear();
        self.result = None;
    }
}
