//! Series and sample identifiers.

use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Accession grammar: `<PREFIX><DIGITS>[-<VARIANT>]`, e.g. `GSE1234`, `GDS507`, `GSE15-GPL96`.
fn series_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([A-Za-z]+)([0-9]+)(?:-([A-Za-z0-9_.]+))?$")
            .expect("series id pattern is a valid regex")
    })
}

/// Error returned when a string is not a valid series accession.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeriesIdError {
    /// The string does not follow `<PREFIX><DIGITS>[-<VARIANT>]`.
    #[error("invalid series id '{0}': expected <PREFIX><DIGITS>[-<VARIANT>]")]
    Malformed(String),
    /// The numeric suffix does not fit in 64 bits.
    #[error("invalid series id '{0}': numeric suffix out of range")]
    NumberOutOfRange(String),
}

/// Identifier of a series (a GEO series or dataset).
///
/// Implements `Ord` as the canonical total order: type prefix, then numeric
/// suffix (numerically, so `GSE9 < GSE10`), then variant, then the raw text.
/// The raw text only breaks ties between spellings such as `GSE007` and
/// `GSE7`, which keeps the order consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeriesId {
    prefix: String,
    number: u64,
    variant: Option<String>,
    raw: String,
}

impl SeriesId {
    /// Parse an accession string.
    pub fn parse(s: &str) -> Result<Self, SeriesIdError> {
        let s = s.trim();
        let caps = series_pattern()
            .captures(s)
            .ok_or_else(|| SeriesIdError::Malformed(s.to_string()))?;

        let prefix = caps[1].to_ascii_uppercase();
        let number = caps[2]
            .parse::<u64>()
            .map_err(|_| SeriesIdError::NumberOutOfRange(s.to_string()))?;
        let variant = caps.get(3).map(|m| m.as_str().to_string());

        Ok(Self {
            prefix,
            number,
            variant,
            raw: s.to_string(),
        })
    }

    /// Type prefix, upper-cased (`GSE`, `GDS`, ...).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Numeric suffix.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Platform variant after the `-`, if any.
    pub fn variant(&self) -> Option<&str> {
        self.variant.as_deref()
    }

    /// The accession exactly as it was written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Compare two series IDs in canonical order.
///
/// Free-function form of `Ord for SeriesId`, used where the tie-break rule
/// should read explicitly at the call site.
pub fn compare_ids(a: &SeriesId, b: &SeriesId) -> Ordering {
    a.cmp(b)
}

impl PartialOrd for SeriesId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SeriesId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.prefix
            .cmp(&other.prefix)
            .then_with(|| self.number.cmp(&other.number))
            .then_with(|| self.variant.cmp(&other.variant))
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl FromStr for SeriesId {
    type Err = SeriesIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SeriesId {
    type Error = SeriesIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<SeriesId> for String {
    fn from(id: SeriesId) -> Self {
        id.raw
    }
}

impl fmt::Display for SeriesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Identifier of an individual sample (a GEO GSM).
///
/// Opaque: ordered lexically, only used for set membership.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    /// Create a sample ID. Surrounding whitespace is dropped.
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_string())
    }

    /// Get the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SampleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
