//! # gsm-overlap
//!
//! Deterministic overlap resolution for sample series.
//!
//! Given a catalog of series (each a set of sample IDs) and pairwise overlap
//! evidence between them, decide which series to drop whole and which
//! samples to trim from the series that are kept.
//!
//! ## Pipeline
//!
//! ```text
//! overlap lines → parser → OverlapGraph → detector (duplicates, supersets)
//!                                       → reducer  (min size, max overlap)
//!                                       → ResolutionResult
//!                          OverlapGraph → clusters (raw, residual)
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Same evidence + same policy → identical result fingerprint
//! - Ingestion order of the evidence does not change the result
//! - Ties are always broken by the canonical `SeriesId` order
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use gsm_overlap::{InMemoryCatalog, ResolutionEngine, SeriesId};
//!
//! let id = |s: &str| SeriesId::parse(s).unwrap();
//! let mut catalog = InMemoryCatalog::new();
//! catalog.add_series(id("GSE1"), ["a", "b", "c"], None);
//! catalog.add_series(id("GSE2"), ["a", "b", "c"], None);
//!
//! let mut engine = ResolutionEngine::new(Arc::new(catalog));
//! engine.add_overlap_line("GSE1\tGSE2").unwrap();
//! let result = engine.find(3, 3).unwrap();
//! assert!(result.duplicate_ids().contains(&id("GSE2")));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod canonical;
pub mod catalog;
pub mod clusters;
pub mod config;
pub mod detector;
pub mod engine;
pub mod graph;
pub mod parser;
pub mod policy;
pub mod reducer;
pub mod report;
pub mod result;
pub mod types;
pub mod window;

// Re-exports
pub use types::{
    compare_ids, Duplicate, OverlapRecord, OverlapSet, RemovalReason, SampleId, SeriesId,
    SeriesIdError, SeriesPair, Superset,
};
pub use canonical::{canonical_hash, canonical_hash_hex, to_canonical_bytes};
pub use catalog::{load_catalog, parse_catalog, CatalogError, InMemoryCatalog, SeriesCatalog, SeriesEntry};
pub use config::{Config, ConfigError, WindowConfig};
pub use engine::{EngineError, ResolutionEngine};
pub use graph::OverlapGraph;
pub use parser::{parse_overlap_line, ParseError};
pub use policy::{PolicyError, ResolutionPolicy};
pub use report::{read_removal_list, ReportError, ReportWriter, RunManifest, RemovalList};
pub use result::{InvariantViolation, ResolutionResult, ResultFingerprint};
pub use window::{Month, WindowError, WindowReport, WindowedDriver};

/// Schema version for result and report types.
/// Increment on breaking changes to any serialized type.
pub const RESOLUTION_SCHEMA_VERSION: &str = "1.0.0";

/// Default policy version identifier.
pub const DEFAULT_POLICY_VERSION: &str = "resolution_policy_v1";
