//! Resolution policy definitions.

pub mod resolution;

pub use resolution::{ResolutionPolicy, PolicyError};
