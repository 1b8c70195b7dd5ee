//! NAV aggregates.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use pcf_core::PcfRecord;
use serde::{Deserialize, Serialize};

/// NAV statistics for one date over a set of ETFs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavAggregate {
    /// Disclosure date.
    pub date: NaiveDate,
    /// Σ NAV over records with a NAV. Absent when none has one.
    pub total_nav: Option<f64>,
    /// Mean NAV over records with a NAV.
    pub mean_nav: Option<f64>,
    /// Largest NAV on the date.
    pub max_nav: Option<f64>,
    /// Distinct ETFs with a record on the date.
    pub etf_count: usize,
}

/// One ETF's NAV on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPoint {
    /// ETF code.
    pub etf_code: String,
    /// Disclosure date.
    pub date: NaiveDate,
    /// Fund NAV, when disclosed or reconstructed.
    pub nav: Option<f64>,
}

/// Per-date NAV total, mean, max and ETF count over member ETFs.
pub fn aggregate_nav(records: &[PcfRecord], codes: &BTreeSet<String>) -> Vec<NavAggregate> {
    let mut by_date: BTreeMap<NaiveDate, (Vec<f64>, BTreeSet<&str>)> = BTreeMap::new();
    for record in records.iter().filter(|r| codes.contains(&r.etf_code)) {
        let (navs, etfs) = by_date.entry(record.date).or_default();
        etfs.insert(record.etf_code.as_str());
        if let Some(nav) = record.nav {
            navs.push(nav);
        }
    }

    by_date
        .into_iter()
        .map(|(date, (navs, etfs))| {
            let total = (!navs.is_empty()).then(|| navs.iter().sum::<f64>());
            NavAggregate {
                date,
                total_nav: total,
                mean_nav: total.map(|t| t / navs.len() as f64),
                max_nav: navs.iter().copied().reduce(f64::max),
                etf_count: etfs.len(),
            }
        })
        .collect()
}

/// Member NAVs, ordered by date then ETF code.
pub fn nav_breakdown(records: &[PcfRecord], codes: &BTreeSet<String>) -> Vec<NavPoint> {
    let mut points: Vec<NavPoint> = records
        .iter()
        .filter(|r| codes.contains(&r.etf_code))
        .map(|r| NavPoint {
            etf_code: r.etf_code.clone(),
            date: r.date,
            nav: r.nav,
        })
        .collect();
    points.sort_by(|a, b| (a.date, &a.etf_code).cmp(&(b.date, &b.etf_code)));
    points
}
