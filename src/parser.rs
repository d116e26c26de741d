//! Overlap record parser.
//!
//! Turns one tab-delimited evidence line into an [`OverlapRecord`]. The first
//! two fields are the series IDs; everything after them is kept verbatim.
//!
//! ```text
//! GSE1<TAB>GSE2<TAB>2,5,2<TAB>GSM1,GSM2<TAB>meta1<TAB>meta2
//! ```

use crate::types::{OverlapRecord, SeriesId, SeriesIdError, SeriesPair};

/// Error for a malformed overlap line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Fewer than two tab-separated fields.
    #[error("overlap line has {fields} field(s), expected at least 2: '{line}'")]
    TooFewFields {
        /// Number of fields found.
        fields: usize,
        /// The offending line.
        line: String,
    },
    /// One of the two IDs is not a series accession.
    #[error("overlap line has an invalid series id ({source}): '{line}'")]
    InvalidSeriesId {
        /// Underlying ID error.
        source: SeriesIdError,
        /// The offending line.
        line: String,
    },
    /// Both IDs name the same series.
    #[error("overlap line pairs series {id} with itself: '{line}'")]
    SelfOverlap {
        /// The repeated ID.
        id: SeriesId,
        /// The offending line.
        line: String,
    },
}

impl ParseError {
    /// The line that failed to parse.
    pub fn line(&self) -> &str {
        match self {
            Self::TooFewFields { line, .. }
            | Self::InvalidSeriesId { line, .. }
            | Self::SelfOverlap { line, .. } => line,
        }
    }
}

/// Parse one overlap evidence line.
///
/// A trailing newline (`\n` or `\r\n`) is stripped before splitting.
pub fn parse_overlap_line(line: &str) -> Result<OverlapRecord, ParseError> {
    let line = line.trim_end_matches(['\n', '\r']);
    let mut fields = line.split('\t');

    let (first, second) = match (fields.next(), fields.next()) {
        (Some(a), Some(b)) => (a, b),
        _ => {
            let count = if line.is_empty() { 0 } else { 1 };
            return Err(ParseError::TooFewFields {
                fields: count,
                line: line.to_string(),
            });
        }
    };

    let parse_id = |s: &str| {
        SeriesId::parse(s).map_err(|source| ParseError::InvalidSeriesId {
            source,
            line: line.to_string(),
        })
    };
    let a = parse_id(first)?;
    let b = parse_id(second)?;

    let canonical = a < b;
    let pair = SeriesPair::new(a.clone(), b).ok_or_else(|| ParseError::SelfOverlap {
        id: a,
        line: line.to_string(),
    })?;

    Ok(OverlapRecord {
        pair,
        canonical,
        raw: line.to_string(),
    })
}
