//! Core types for overlap resolution.

pub mod series;
pub mod overlap;
pub mod classification;

pub use series::{SeriesId, SeriesIdError, SampleId, compare_ids};
pub use overlap::{SeriesPair, OverlapRecord};
pub use classification::{Duplicate, Superset, OverlapSet, RemovalReason};
