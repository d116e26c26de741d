//! Tab-delimited catalog files.
//!
//! One series per line, in one of three layouts:
//!
//! ```text
//! GSE1<TAB>GSM1,GSM2
//! GSE1<TAB>2011-03-14<TAB>GSM1,GSM2
//! GSE1<TAB>Mar 14 2011<TAB>Homo sapiens<TAB>GPL570<TAB>GSM1,GSM2
//! ```
//!
//! Blank lines and `#` comments are skipped. A first line that does not start
//! with a series ID is treated as a header.

use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::{CatalogError, InMemoryCatalog, SeriesEntry};
use crate::types::{SampleId, SeriesId};

/// Accepted publication date formats.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d %Y"];

/// Load a catalog file.
pub fn load_catalog(path: impl AsRef<Path>) -> Result<InMemoryCatalog, CatalogError> {
    let file = File::open(path.as_ref())?;
    let catalog = parse_catalog(BufReader::new(file))?;
    tracing::info!(
        path = %path.as_ref().display(),
        series = catalog.len(),
        "Catalog loaded"
    );
    Ok(catalog)
}

/// Parse catalog lines from any reader.
pub fn parse_catalog<R: BufRead>(reader: R) -> Result<InMemoryCatalog, CatalogError> {
    let mut catalog = InMemoryCatalog::new();
    let mut first_content_line = true;

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim_end_matches('\r');

        if trimmed.trim().is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split('\t').collect();
        let id = match SeriesId::parse(fields[0]) {
            Ok(id) => id,
            Err(_) if first_content_line => {
                tracing::debug!(line_no, "Skipping catalog header line");
                first_content_line = false;
                continue;
            }
            Err(e) => return Err(malformed(line_no, e.to_string(), trimmed)),
        };
        first_content_line = false;

        let (date_field, samples_field) = match fields.len() {
            2 => (None, fields[1]),
            3 => (Some(fields[1]), fields[2]),
            n if n >= 5 => (Some(fields[1]), fields[4]),
            n => {
                return Err(malformed(
                    line_no,
                    format!("expected 2, 3 or at least 5 fields, found {n}"),
                    trimmed,
                ))
            }
        };

        let published = match date_field {
            Some(raw) => parse_date(raw).map_err(|reason| malformed(line_no, reason, trimmed))?,
            None => None,
        };

        let samples = samples_field
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(SampleId::new)
            .collect();

        if catalog.insert(id.clone(), SeriesEntry::new(samples, published)).is_some() {
            return Err(CatalogError::DuplicateSeries { line_no, id });
        }
    }

    Ok(catalog)
}

/// Parse a publication date; empty or `-` means unknown.
pub fn parse_date(raw: &str) -> Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == "-" {
        return Ok(None);
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(Some)
        .ok_or_else(|| format!("unrecognized publication date '{raw}'"))
}

fn malformed(line_no: usize, reason: String, line: &str) -> CatalogError {
    CatalogError::Malformed {
        line_no,
        reason,
        line: line.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SeriesCatalog;

    fn id(s: &str) -> SeriesId {
        SeriesId::parse(s).unwrap()
    }

    #[test]
    fn test_two_column_layout() {
        let catalog = parse_catalog("GSE1\tGSM1,GSM2, GSM3\n".as_bytes()).unwrap();
        let entry = catalog.lookup(&id("GSE1")).unwrap();
        assert_eq!(entry.len(), 3);
        assert!(entry.samples.contains(&SampleId::new("GSM3")));
        assert_eq!(entry.published, None);
    }

    #[test]
    fn test_dated_layouts() {
        let text = "gid\tdate\torganisms\tplatform\tsamples\n\
                    GSE1\tMar 14 2011\tHomo sapiens\tGPL570\tGSM1,GSM2\n\
                    GSE2\t2012-01-05\tGSM3\n";
        let catalog = parse_catalog(text.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.lookup(&id("GSE1")).unwrap().published,
            NaiveDate::from_ymd_opt(2011, 3, 14)
        );
        assert_eq!(
            catalog.lookup(&id("GSE2")).unwrap().published,
            NaiveDate::from_ymd_opt(2012, 1, 5)
        );
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let text = "# catalog\n\nGSE1\tGSM1\n";
        let catalog = parse_catalog(text.as_bytes()).unwrap();
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_duplicate_series_rejected() {
        let text = "GSE1\tGSM1\nGSE1\tGSM2\n";
        let err = parse_catalog(text.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateSeries { line_no: 2, .. }));
    }

    #[test]
    fn test_bad_id_after_header_rejected() {
        let text = "GSE1\tGSM1\nbogus\tGSM2\n";
        let err = parse_catalog(text.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::Malformed { line_no: 2, .. }));
    }

    #[test]
    fn test_bad_date_rejected() {
        let err = parse_catalog("GSE1\tyesterday\tGSM1\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("yesterday"));
    }

    #[test]
    fn test_unknown_date() {
        let catalog = parse_catalog("GSE1\t-\tGSM1\n".as_bytes()).unwrap();
        assert_eq!(catalog.lookup(&id("GSE1")).unwrap().published, None);
    }
}
