//! Creation/redemption flow.
//!
//! Primary-market activity shows up as a change in units outstanding. The
//! flow for day t is valued at day t-1's per-unit NAV, the price at which
//! the units were created or redeemed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use pcf_core::config::RuntimeConfig;
use pcf_core::{CreationRedemption, FlowType, PcfRecord, Result};
use rayon::prelude::*;
use tracing::{debug, warn};

/// Flows for one ETF's date-ordered series.
///
/// The first record yields no observation. Observations whose share delta
/// is undefined (a side missing, or the difference overflowing) are kept
/// with flow type `None` and no amount.
pub fn flows_for_series(series: &[&PcfRecord]) -> Vec<CreationRedemption> {
    series
        .windows(2)
        .map(|pair| {
            let (prev, curr) = (pair[0], pair[1]);
            let shares_change = match (curr.shares_outstanding, prev.shares_outstanding) {
                (Some(now), Some(before)) => {
                    let delta = now.checked_sub(before);
                    if delta.is_none() {
                        warn!(
                            etf_code = %curr.etf_code,
                            date = %curr.date,
                            now,
                            before,
                            "shares outstanding change overflows"
                        );
                    }
                    delta
                }
                _ => None,
            };
            let prev_nav_per_unit = prev.nav_per_unit();
            let flow_amount = match (shares_change, prev_nav_per_unit) {
                (Some(delta), Some(price)) => Some(delta as f64 * price),
                _ => None,
            };
            CreationRedemption {
                etf_code: curr.etf_code.clone(),
                trade_date: curr.date,
                shares_outstanding: curr.shares_outstanding,
                shares_change,
                nav_per_unit: curr.nav_per_unit(),
                prev_nav_per_unit,
                flow_amount,
                flow_type: FlowType::from_delta(shares_change),
            }
        })
        .collect()
}

/// Creation/redemption observations for every ETF in `records`.
///
/// Records are grouped per ETF and ordered by date; a later duplicate of the
/// same (code, date) replaces an earlier one. Groups are derived in parallel.
/// Output is ordered by ETF code, then trade date.
pub fn compute_creation_redemption(
    records: &[PcfRecord],
    runtime: &RuntimeConfig,
) -> Result<Vec<CreationRedemption>> {
    let mut groups: BTreeMap<&str, BTreeMap<NaiveDate, &PcfRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.etf_code.as_str())
            .or_default()
            .insert(record.date, record);
    }

    let series: Vec<Vec<&PcfRecord>> = groups
        .into_values()
        .map(|by_date| by_date.into_values().collect())
        .collect();

    let pool = runtime.build_pool()?;
    let flows: Vec<CreationRedemption> = pool.install(|| {
        series
            .par_iter()
            .flat_map_iter(|s| flows_for_series(s))
            .collect()
    });

    debug!(
        records = records.len(),
        etfs = series.len(),
        observations = flows.len(),
        "derived creation/redemption"
    );
    Ok(flows)
}
