//! Report files.
//!
//! One directory per run:
//!
//! | File | Content |
//! |---|---|
//! | `duplicates`, `supersets`, `removed` | one series ID per line |
//! | `removedSamples` | `ID<TAB>GSM<TAB>GSM...` |
//! | `clusters.<n>`, `clusters.<n>.after` | one cluster per line, members tab separated |
//! | `overlap.removed` | `ID<TAB>all` or `ID<TAB>GSM1,GSM2,...` |
//! | `series2samples.*`, `samples2series.*` | membership before and after removal |
//! | `audit.log` | human readable reasons |
//! | `manifest.json` | policy, counts, hashes |
//!
//! `n` in the cluster file names is the policy's minimum cluster size.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::catalog::{InMemoryCatalog, SeriesCatalog};
use crate::clusters::{clusters_of_size, size_histogram};
use crate::policy::ResolutionPolicy;
use crate::result::ResolutionResult;
use crate::types::{SampleId, SeriesId};
use crate::window::WindowReport;
use crate::RESOLUTION_SCHEMA_VERSION;

/// Removal list file name.
pub const REMOVAL_LIST_FILE: &str = "overlap.removed";
/// Manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";
/// Audit log file name.
pub const AUDIT_FILE: &str = "audit.log";

/// Marker for "every sample" in the removal list.
const ALL_SAMPLES: &str = "all";

/// Error type for report reading and writing.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Filesystem error.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Manifest serialization failed.
    #[error("manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// A removal list line could not be parsed.
    #[error("{path} line {line_no}: {reason}")]
    Malformed {
        /// File being read.
        path: String,
        /// 1-based line number.
        line_no: usize,
        /// What is wrong.
        reason: String,
    },
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ReportError + '_ {
    move |source| ReportError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Series to drop and samples to trim, as written to `overlap.removed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalList {
    /// Series dropped whole.
    pub removed: BTreeSet<SeriesId>,
    /// Samples trimmed from kept series.
    pub removed_samples: BTreeMap<SeriesId, BTreeSet<SampleId>>,
}

impl RemovalList {
    /// Build from a result.
    pub fn from_result(result: &ResolutionResult) -> Self {
        Self {
            removed: result.dropped_ids(),
            removed_samples: result.removed_samples.clone(),
        }
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.removed.len() + self.removed_samples.len()
    }

    /// Whether nothing is removed.
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.removed_samples.is_empty()
    }

    fn lines(&self) -> Vec<String> {
        let mut rows: BTreeMap<&SeriesId, String> = BTreeMap::new();
        for id in &self.removed {
            rows.insert(id, ALL_SAMPLES.to_string());
        }
        for (id, samples) in &self.removed_samples {
            rows.insert(id, join(samples, ","));
        }
        rows.into_iter().map(|(id, rest)| format!("{id}\t{rest}")).collect()
    }
}

/// Read an `overlap.removed` file.
pub fn read_removal_list(path: impl AsRef<Path>) -> Result<RemovalList, ReportError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(io_err(path))?;
    parse_removal_list(BufReader::new(file), &path.display().to_string())
}

/// Parse removal list lines; `source` names the input in errors.
pub fn parse_removal_list<R: BufRead>(reader: R, source: &str) -> Result<RemovalList, ReportError> {
    let mut list = RemovalList::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| ReportError::Io {
            path: source.to_string(),
            source: e,
        })?;
        let line_no = idx + 1;
        let malformed = |reason: String| ReportError::Malformed {
            path: source.to_string(),
            line_no,
            reason,
        };

        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let (id, rest) = line
            .split_once('\t')
            .ok_or_else(|| malformed("expected ID<TAB>samples".to_string()))?;
        let id = SeriesId::parse(id).map_err(|e| malformed(e.to_string()))?;

        let seen = if rest.trim() == ALL_SAMPLES {
            !list.removed.insert(id.clone()) || list.removed_samples.contains_key(&id)
        } else {
            let samples: BTreeSet<SampleId> = rest
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(SampleId::new)
                .collect();
            if samples.is_empty() {
                return Err(malformed(format!("no samples listed for {id}")));
            }
            list.removed.contains(&id) || list.removed_samples.insert(id.clone(), samples).is_some()
        };

        if seen {
            return Err(malformed(format!("{id} listed more than once")));
        }
    }

    Ok(list)
}

/// Counts recorded in the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    /// Dropped duplicates.
    pub duplicates: usize,
    /// Dropped supersets.
    pub supersets: usize,
    /// Series removed by the reducer.
    pub removed: usize,
    /// Kept series with trimmed samples.
    pub trimmed_series: usize,
    /// Samples trimmed from kept series.
    pub trimmed_samples: usize,
    /// Raw clusters of at least the minimum size.
    pub clusters: usize,
    /// Residual clusters of at least the minimum size.
    pub clusters_after: usize,
    /// Raw cluster count per member count, all sizes.
    pub cluster_sizes: BTreeMap<usize, usize>,
}

/// Manifest written next to the report files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Schema version.
    pub schema_version: String,
    /// Window month, for windowed runs.
    pub month: Option<String>,
    /// Policy used.
    pub policy: ResolutionPolicy,
    /// Hash of the policy parameters.
    pub params_hash: String,
    /// Result fingerprint.
    pub fingerprint: String,
    /// RFC 3339 time the report was written.
    pub computed_at: String,
    /// Summary counts.
    pub counts: ReportCounts,
    /// Files written, relative to the report directory.
    pub files: Vec<String>,
}

/// Writes report files into one directory.
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Create the directory if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        Ok(Self { dir })
    }

    /// Report directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write the classification files, cluster files, removal list, audit
    /// log and manifest.
    pub fn write_result<C>(
        &self,
        result: &ResolutionResult,
        clusters: &[Vec<SeriesId>],
        catalog: &C,
    ) -> Result<RunManifest, ReportError>
    where
        C: SeriesCatalog + ?Sized,
    {
        self.write_result_for(None, result, clusters, catalog, Vec::new())
    }

    /// Write a window's result plus its membership files.
    pub fn write_window(&self, report: &WindowReport, catalog: &InMemoryCatalog) -> Result<RunManifest, ReportError> {
        let files = self.write_membership(catalog, &report.universe, &report.result)?;
        self.write_result_for(
            Some(report.month.to_string()),
            &report.result,
            &report.clusters,
            catalog,
            files,
        )
    }

    fn write_result_for<C>(
        &self,
        month: Option<String>,
        result: &ResolutionResult,
        clusters: &[Vec<SeriesId>],
        catalog: &C,
        mut files: Vec<String>,
    ) -> Result<RunManifest, ReportError>
    where
        C: SeriesCatalog + ?Sized,
    {
        let all_clusters = clusters;
        let min_size = result.policy.min_cluster_size;
        let clusters = clusters_of_size(all_clusters, min_size);
        let clusters_after = clusters_of_size(&result.residual_clusters, min_size);

        files.push(self.write_lines("duplicates", result.duplicate_ids().iter().map(ToString::to_string))?);
        files.push(self.write_lines("supersets", result.superset_ids().iter().map(ToString::to_string))?);
        files.push(self.write_lines("removed", result.removed_ids().iter().map(ToString::to_string))?);
        files.push(self.write_lines(
            "removedSamples",
            result
                .removed_samples
                .iter()
                .map(|(id, samples)| format!("{id}\t{}", join(samples, "\t"))),
        )?);
        files.push(self.write_lines(
            &format!("clusters.{min_size}"),
            clusters.iter().map(|c| join(c, "\t")),
        )?);
        files.push(self.write_lines(
            &format!("clusters.{min_size}.after"),
            clusters_after.iter().map(|c| join(c, "\t")),
        )?);
        files.push(self.write_lines(REMOVAL_LIST_FILE, RemovalList::from_result(result).lines())?);
        files.push(self.write_lines(AUDIT_FILE, audit_lines(result, catalog))?);

        let counts = ReportCounts {
            duplicates: result.duplicates.len(),
            supersets: result.supersets.len(),
            removed: result.removed.len(),
            trimmed_series: result.removed_samples.len(),
            trimmed_samples: result.removed_samples.values().map(BTreeSet::len).sum(),
            clusters: clusters.len(),
            clusters_after: clusters_after.len(),
            cluster_sizes: size_histogram(all_clusters),
        };

        files.push(MANIFEST_FILE.to_string());
        let manifest = RunManifest {
            schema_version: RESOLUTION_SCHEMA_VERSION.to_string(),
            month,
            policy: result.policy.clone(),
            params_hash: result.policy.params_hash(),
            fingerprint: result.fingerprint().to_string(),
            computed_at: chrono::Utc::now().to_rfc3339(),
            counts,
            files,
        };

        let path = self.dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(&path, json).map_err(io_err(&path))?;

        tracing::info!(
            dir = %self.dir.display(),
            fingerprint = %manifest.fingerprint,
            files = manifest.files.len(),
            "Report written"
        );

        Ok(manifest)
    }

    /// Write `series2samples` and `samples2series`, before and after removal.
    ///
    /// Series that lose every sample are left out of the `.after` files.
    pub fn write_membership(
        &self,
        catalog: &InMemoryCatalog,
        universe: &BTreeSet<SeriesId>,
        result: &ResolutionResult,
    ) -> Result<Vec<String>, ReportError> {
        let mut before: BTreeMap<&SeriesId, BTreeSet<SampleId>> = BTreeMap::new();
        let mut after: BTreeMap<&SeriesId, BTreeSet<SampleId>> = BTreeMap::new();
        for id in universe {
            let Some(entry) = catalog.lookup(id) else {
                continue;
            };
            before.insert(id, entry.samples.clone());
            let kept: BTreeSet<SampleId> = match result.samples_to_remove(id, &entry.samples) {
                Some(lost) => entry.samples.difference(lost).cloned().collect(),
                None => entry.samples.clone(),
            };
            if !kept.is_empty() {
                after.insert(id, kept);
            }
        }

        let index_before = catalog.sample_index(universe);
        let index_after: BTreeMap<SampleId, BTreeSet<SeriesId>> = index_before
            .iter()
            .filter_map(|(sample, ids)| {
                let ids: BTreeSet<SeriesId> = ids
                    .iter()
                    .filter(|id| after.get(*id).is_some_and(|kept| kept.contains(sample)))
                    .cloned()
                    .collect();
                (!ids.is_empty()).then(|| (sample.clone(), ids))
            })
            .collect();

        Ok(vec![
            self.write_lines("series2samples.before", series_lines(&before))?,
            self.write_lines("series2samples.after", series_lines(&after))?,
            self.write_lines("samples2series.before", sample_lines(&index_before))?,
            self.write_lines("samples2series.after", sample_lines(&index_after))?,
        ])
    }

    fn write_lines<I>(&self, name: &str, lines: I) -> Result<String, ReportError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let path = self.dir.join(name);
        let file = File::create(&path).map_err(io_err(&path))?;
        let mut out = BufWriter::new(file);
        for line in lines {
            writeln!(out, "{}", line.as_ref()).map_err(io_err(&path))?;
        }
        out.flush().map_err(io_err(&path))?;
        Ok(name.to_string())
    }
}

fn join<T: std::fmt::Display>(items: impl IntoIterator<Item = T>, sep: &str) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

fn series_lines(membership: &BTreeMap<&SeriesId, BTreeSet<SampleId>>) -> Vec<String> {
    membership
        .iter()
        .map(|(id, samples)| format!("{id}\t{}", join(samples, ",")))
        .collect()
}

fn sample_lines(index: &BTreeMap<SampleId, BTreeSet<SeriesId>>) -> Vec<String> {
    index
        .iter()
        .map(|(sample, ids)| format!("{sample}\t{}", join(ids, ",")))
        .collect()
}

fn audit_lines<C: SeriesCatalog + ?Sized>(result: &ResolutionResult, catalog: &C) -> Vec<String> {
    let mut lines = Vec::new();

    for d in &result.duplicates {
        let mut line = format!("{} duplicate of {} ({} samples)", d.dropped, d.kept, d.n_samples);
        if let Some(category) = result.dropped_as(&d.kept) {
            line.push_str(&format!("; {} itself listed in {category}", d.kept));
        }
        lines.push(line);
    }
    for s in &result.supersets {
        lines.push(format!(
            "{} superset for {} ({} samples)",
            s.gid,
            join(&s.subset_ids, ", "),
            s.n_samples
        ));
    }
    for r in &result.removed {
        lines.push(format!(
            "{} removed: {} ({} samples, {} remaining)",
            r.gid, r.reason, r.n_samples, r.n_remaining
        ));
    }
    for (id, trimmed) in &result.removed_samples {
        let total = catalog.lookup(id).map_or(0, |e| e.len());
        lines.push(format!(
            "{} samples before and after: {} {}",
            id,
            total,
            total.saturating_sub(trimmed.len())
        ));
    }

    lines
}
