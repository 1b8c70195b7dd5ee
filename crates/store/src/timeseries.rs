//! Time-series store keyed by (ETF code, date).

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;
use csv::StringRecord;
use pcf_core::{Error, PcfRecord, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::row::{TimeseriesRow, REQUIRED_COLUMNS};

/// Outcome of one merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    /// New keys.
    pub inserted: usize,
    /// Existing keys whose record changed.
    pub replaced: usize,
    /// Existing keys whose record was identical.
    pub unchanged: usize,
}

/// Fail with [`Error::MissingColumn`] unless every required column is present.
pub fn validate_columns(headers: &StringRecord, required: &[&str]) -> Result<()> {
    for column in required {
        if !headers.iter().any(|h| h.trim() == *column) {
            return Err(Error::missing_column(*column));
        }
    }
    Ok(())
}

/// In-memory canonical table. Latest write wins per key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeseriesStore {
    records: BTreeMap<(String, NaiveDate), PcfRecord>,
}

impl TimeseriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, etf_code: &str, date: NaiveDate) -> Option<&PcfRecord> {
        self.records.get(&(etf_code.to_string(), date))
    }

    /// Merge records, overwriting by key. Re-merging identical records is a
    /// no-op.
    pub fn merge<I>(&mut self, records: I) -> MergeSummary
    where
        I: IntoIterator<Item = PcfRecord>,
    {
        let mut summary = MergeSummary::default();
        for record in records {
            match self.records.get_mut(&record.key()) {
                None => {
                    self.records.insert(record.key(), record);
                    summary.inserted += 1;
                }
                Some(existing) if *existing == record => summary.unchanged += 1,
                Some(existing) => {
                    *existing = record;
                    summary.replaced += 1;
                }
            }
        }
        debug!(
            inserted = summary.inserted,
            replaced = summary.replaced,
            unchanged = summary.unchanged,
            "merged records"
        );
        summary
    }

    /// Every record, ordered by ETF code then date.
    pub fn records(&self) -> impl Iterator<Item = &PcfRecord> {
        self.records.values()
    }

    /// Distinct ETF codes.
    pub fn codes(&self) -> BTreeSet<&str> {
        self.records.keys().map(|(code, _)| code.as_str()).collect()
    }

    /// One ETF's records in date order.
    pub fn series(&self, etf_code: &str) -> Vec<&PcfRecord> {
        self.records
            .values()
            .filter(|r| r.etf_code == etf_code)
            .collect()
    }

    /// Records restricted to `codes` (all when `None`) and an inclusive date
    /// range, ordered by ETF code then date.
    pub fn filter(
        &self,
        codes: Option<&BTreeSet<String>>,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Vec<&PcfRecord> {
        self.records
            .values()
            .filter(|r| codes.map_or(true, |c| c.contains(&r.etf_code)))
            .filter(|r| from.map_or(true, |d| r.date >= d))
            .filter(|r| to.map_or(true, |d| r.date <= d))
            .collect()
    }

    /// Write every record as flat CSV rows.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for record in self.records.values() {
            writer.serialize(TimeseriesRow::from(record))?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Read flat CSV rows. The header must carry every required column.
    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        validate_columns(reader.headers()?, REQUIRED_COLUMNS)?;

        let mut store = Self::new();
        for row in reader.deserialize::<TimeseriesRow>() {
            store.merge([PcfRecord::from(row?)]);
        }
        Ok(store)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_csv(File::create(path)?)?;
        info!(path = %path.display(), records = self.len(), "saved time series");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let store = Self::read_csv(File::open(path)?)?;
        info!(path = %path.display(), records = store.len(), "loaded time series");
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcf_core::{FuturesLegs, FuturesPosition, FuturesType};

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, day).unwrap()
    }

    fn record(code: &str, day: u32, shares: i64) -> PcfRecord {
        let mut r = PcfRecord::empty(code, date(day));
        r.nav = Some(shares as f64 * 10.5);
        r.shares_outstanding = Some(shares);
        r
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut store = TimeseriesStore::new();
        let batch = vec![record("1306", 12, 100), record("1321", 12, 50)];

        let first = store.merge(batch.clone());
        assert_eq!(first.inserted, 2);

        let snapshot = store.clone();
        let second = store.merge(batch);
        assert_eq!(second, MergeSummary { inserted: 0, replaced: 0, unchanged: 2 });
        assert_eq!(store, snapshot);
    }

    #[test]
    fn test_latest_write_wins() {
        let mut store = TimeseriesStore::new();
        store.merge([record("1306", 12, 100)]);
        let summary = store.merge([record("1306", 12, 120)]);
        assert_eq!(summary.replaced, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1306", date(12)).unwrap().shares_outstanding, Some(120));
    }

    #[test]
    fn test_series_and_filter() {
        let mut store = TimeseriesStore::new();
        store.merge([
            record("1306", 13, 110),
            record("1306", 11, 100),
            record("1321", 12, 50),
            record("1570", 12, 70),
        ]);

        let series: Vec<_> = store.series("1306").iter().map(|r| r.date).collect();
        assert_eq!(series, vec![date(11), date(13)]);

        let codes: BTreeSet<String> = ["1306".to_string(), "1321".to_string()].into();
        let filtered = store.filter(Some(&codes), Some(date(12)), None);
        let keys: Vec<_> = filtered.iter().map(|r| (r.etf_code.as_str(), r.date)).collect();
        assert_eq!(keys, vec![("1306", date(13)), ("1321", date(12))]);

        assert_eq!(store.filter(None, None, Some(date(11))).len(), 1);
        assert_eq!(store.codes().len(), 3);
    }

    #[test]
    fn test_csv_round_trip_keeps_legs_and_nulls() {
        let mut with_legs = record("1570", 12, 200);
        with_legs.cash_component = None;
        let (legs, _) = FuturesLegs::capped(vec![
            FuturesPosition::new("NK225 2603", FuturesType::Nk225, Some("2603".into()), 5, 1.9e8),
            FuturesPosition::new("??", FuturesType::Unknown, None, -1, -0.5),
        ]);
        with_legs.futures = legs;

        let mut store = TimeseriesStore::new();
        store.merge([with_legs, record("1306", 12, 100)]);

        let mut buf = Vec::new();
        store.write_csv(&mut buf).unwrap();
        let restored = TimeseriesStore::read_csv(buf.as_slice()).unwrap();
        assert_eq!(restored, store);
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "etf_code,date,nav\n1306,2026-02-12,100\n";
        let err = TimeseriesStore::read_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { column } if column == "shares_outstanding"));
    }

    #[test]
    fn test_minimal_columns_load() {
        let csv = "etf_code,date,nav,shares_outstanding\n1306,2026-02-12,100,10\n1306,2026-02-13,,\n";
        let store = TimeseriesStore::read_csv(csv.as_bytes()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("1306", date(12)).unwrap().nav_per_unit(), Some(10.0));
        assert_eq!(store.get("1306", date(13)).unwrap().nav, None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etf_timeseries.csv");

        let mut store = TimeseriesStore::new();
        store.merge([record("1306", 12, 100)]);
        store.save(&path).unwrap();

        assert_eq!(TimeseriesStore::load(&path).unwrap(), store);
    }
}
