//! Windowed driver.
//!
//! Runs the engine once per calendar month over a growing corpus. The window
//! for month M holds every series published strictly before the first day of
//! M, and only the overlap lines whose two series are both in that universe.
//!
//! Every window gets a fresh engine, so nothing carries over between months.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::catalog::InMemoryCatalog;
use crate::engine::{EngineError, ResolutionEngine};
use crate::parser::parse_overlap_line;
use crate::policy::ResolutionPolicy;
use crate::report::ReportError;
use crate::result::{InvariantViolation, ResolutionResult};
use crate::types::SeriesId;

/// Error type for the windowed driver.
#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    /// Month string is not `YYYY.MM`.
    #[error("invalid month '{0}', expected YYYY.MM")]
    InvalidMonth(String),
    /// End month before start month.
    #[error("window end {end} is before start {start}")]
    Order {
        /// First month.
        start: Month,
        /// Last month.
        end: Month,
    },
    /// The engine rejected the window's input.
    #[error("window {month}: {source}")]
    Engine {
        /// The failing window.
        month: Month,
        /// Underlying error.
        source: EngineError,
    },
    /// The window's result broke a classification invariant.
    #[error("window {month}: invariant violated: {source}")]
    Invariant {
        /// The failing window.
        month: Month,
        /// The violation.
        source: InvariantViolation,
    },
    /// Writing the window's report failed.
    #[error("window {month}: {source}")]
    Report {
        /// The failing window.
        month: Month,
        /// Underlying error.
        source: ReportError,
    },
}

/// A calendar month, written `YYYY.MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Create a month; `month` is 1-based.
    pub fn new(year: i32, month: u32) -> Result<Self, WindowError> {
        if !(1..=12).contains(&month) || NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(WindowError::InvalidMonth(format!("{year}.{month:02}")));
        }
        Ok(Self { year, month })
    }

    /// Parse `YYYY.MM`.
    pub fn parse(s: &str) -> Result<Self, WindowError> {
        let invalid = || WindowError::InvalidMonth(s.to_string());
        let (year, month) = s.trim().split_once('.').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    /// Year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// Month number, 1-based.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The following month.
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Every month from `start` to `end`, inclusive.
    pub fn range(start: Month, end: Month) -> Result<Vec<Month>, WindowError> {
        if end < start {
            return Err(WindowError::Order { start, end });
        }
        let mut months = vec![start];
        let mut current = start;
        while current < end {
            current = current.next();
            months.push(current);
        }
        Ok(months)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}.{:02}", self.year, self.month)
    }
}

impl FromStr for Month {
    type Err = WindowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Month {
    type Error = WindowError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.to_string()
    }
}

/// Outcome of one window.
#[derive(Debug, Clone)]
pub struct WindowReport {
    /// The window's month.
    pub month: Month,
    /// Series published before the month.
    pub universe: BTreeSet<SeriesId>,
    /// Overlap lines inside the universe.
    pub lines_used: usize,
    /// Classification, empty when no line fell inside the universe.
    pub result: ResolutionResult,
    /// Raw clusters before reduction.
    pub clusters: Vec<Vec<SeriesId>>,
}

/// Runs the engine over consecutive monthly windows.
pub struct WindowedDriver {
    catalog: Arc<InMemoryCatalog>,
    policy: ResolutionPolicy,
}

impl WindowedDriver {
    /// Create a driver.
    pub fn new(catalog: Arc<InMemoryCatalog>, policy: ResolutionPolicy) -> Self {
        Self { catalog, policy }
    }

    /// The policy every window runs with.
    pub fn policy(&self) -> &ResolutionPolicy {
        &self.policy
    }

    /// Run a single window.
    pub fn run_window<S: AsRef<str>>(&self, month: Month, lines: &[S]) -> Result<WindowReport, WindowError> {
        let engine_err = |source: EngineError| WindowError::Engine { month, source };

        let universe = self.catalog.published_before(month.first_day());
        let mut engine = ResolutionEngine::new(Arc::clone(&self.catalog));
        let mut lines_used = 0;

        for line in lines {
            let line = line.as_ref();
            let record = parse_overlap_line(line).map_err(|e| engine_err(e.into()))?;
            if !universe.contains(&record.pair.first) || !universe.contains(&record.pair.second) {
                continue;
            }
            engine.add_overlap_line(line).map_err(engine_err)?;
            lines_used += 1;
        }

        let (result, clusters) = if engine.graph().is_empty() {
            tracing::info!(%month, universe = universe.len(), "No overlap lines in window");
            (ResolutionResult::empty(self.policy.clone()), Vec::new())
        } else {
            let result = engine.find_with(self.policy.clone()).map_err(engine_err)?.clone();
            (result, engine.find_clusters())
        };

        result
            .check_invariants()
            .map_err(|source| WindowError::Invariant { month, source })?;

        tracing::info!(
            %month,
            universe = universe.len(),
            lines = lines_used,
            dropped = result.dropped_ids().len(),
            trimmed = result.removed_samples.len(),
            clusters = clusters.len(),
            "Window resolved"
        );

        Ok(WindowReport {
            month,
            universe,
            lines_used,
            result,
            clusters,
        })
    }

    /// Run every window from `start` to `end`, handing each report to
    /// `on_window` before moving on. Stops at the first error.
    pub fn run<S, F>(&self, start: Month, end: Month, lines: &[S], mut on_window: F) -> Result<usize, WindowError>
    where
        S: AsRef<str>,
        F: FnMut(WindowReport) -> Result<(), WindowError>,
    {
        let months = Month::range(start, end)?;
        for &month in &months {
            let report = self.run_window(month, lines)?;
            on_window(report)?;
        }
        Ok(months.len())
    }
}
