//! In-memory series catalog.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::{SeriesCatalog, SeriesEntry};
use crate::types::{SampleId, SeriesId};

/// In-memory catalog.
///
/// Uses BTreeMap for deterministic iteration order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    entries: BTreeMap<SeriesId, SeriesEntry>,
}

impl InMemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a series. Returns the previous entry, if any.
    pub fn insert(&mut self, id: SeriesId, entry: SeriesEntry) -> Option<SeriesEntry> {
        self.entries.insert(id, entry)
    }

    /// Add a series from sample name strings (test and fixture helper).
    pub fn add_series<I, S>(&mut self, id: SeriesId, samples: I, published: Option<NaiveDate>)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let samples = samples.into_iter().map(SampleId::new).collect();
        self.entries.insert(id, SeriesEntry::new(samples, published));
    }

    /// Number of series.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All series IDs in canonical order.
    pub fn ids(&self) -> impl Iterator<Item = &SeriesId> {
        self.entries.keys()
    }

    /// All entries in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&SeriesId, &SeriesEntry)> {
        self.entries.iter()
    }

    /// Series published strictly before `cutoff`.
    pub fn published_before(&self, cutoff: NaiveDate) -> BTreeSet<SeriesId> {
        self.entries
            .iter()
            .filter(|(_, e)| e.published_before(cutoff))
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Reverse mapping sample -> series, restricted to `universe`.
    pub fn sample_index(&self, universe: &BTreeSet<SeriesId>) -> BTreeMap<SampleId, BTreeSet<SeriesId>> {
        let mut index: BTreeMap<SampleId, BTreeSet<SeriesId>> = BTreeMap::new();
        for id in universe {
            if let Some(entry) = self.entries.get(id) {
                for sample in &entry.samples {
                    index.entry(sample.clone()).or_default().insert(id.clone());
                }
            }
        }
        index
    }
}

impl SeriesCatalog for InMemoryCatalog {
    fn lookup(&self, id: &SeriesId) -> Option<&SeriesEntry> {
        self.entries.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> SeriesId {
        SeriesId::parse(s).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn test_lookup() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_series(id("GSE1"), ["GSM1", "GSM2"], None);

        let entry = catalog.lookup(&id("GSE1")).unwrap();
        assert_eq!(entry.len(), 2);
        assert!(catalog.lookup(&id("GSE2")).is_none());
    }

    #[test]
    fn test_empty_set_is_not_missing() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_series(id("GSE1"), Vec::<&str>::new(), None);
        let entry = catalog.lookup(&id("GSE1")).unwrap();
        assert!(entry.is_empty());
    }

    #[test]
    fn test_published_before_is_strict() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_series(id("GSE1"), ["a"], date(2011, 1, 15));
        catalog.add_series(id("GSE2"), ["b"], date(2011, 2, 1));
        catalog.add_series(id("GSE3"), ["c"], None);

        let cutoff = NaiveDate::from_ymd_opt(2011, 2, 1).unwrap();
        let ids = catalog.published_before(cutoff);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![id("GSE1")]);
    }

    #[test]
    fn test_sample_index() {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_series(id("GSE1"), ["a", "b"], None);
        catalog.add_series(id("GSE2"), ["b", "c"], None);

        let universe: BTreeSet<_> = [id("GSE1"), id("GSE2")].into_iter().collect();
        let index = catalog.sample_index(&universe);
        assert_eq!(index[&SampleId::new("b")].len(), 2);
        assert_eq!(index[&SampleId::new("a")].len(), 1);
    }
}
