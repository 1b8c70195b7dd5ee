//! Futures exposure.
//!
//! Vendors report futures market value inconsistently: some disclose the
//! full notional, others a per-contract price. The per-contract estimate
//! |mv| / (|qty| x multiplier) separates the two: a large estimate means the
//! value already is notional.

use chrono::NaiveDate;
use pcf_core::config::DerivationConfig;
use pcf_core::{FuturesType, PcfRecord};
use serde::{Deserialize, Serialize};

/// One futures leg flattened with its record's ETF code, date and NAV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesExposure {
    /// ETF code of the owning record.
    pub etf_code: String,
    /// Disclosure date of the owning record.
    pub date: NaiveDate,
    /// Fund NAV of the owning record.
    pub nav: Option<f64>,
    /// Canonical futures type.
    pub futures_type: FuturesType,
    /// Contract month as "YYMM".
    pub contract_month: Option<String>,
    /// Signed contract count.
    pub quantity: i64,
    /// Market value as reported.
    pub market_value: f64,
    /// Contract multiplier of the type.
    pub multiplier: i64,
    /// |market value| / NAV, defined when NAV > 0.
    pub futures_ratio: Option<f64>,
    /// Estimated notional value, see [`estimate_notional`].
    pub notional: f64,
}

/// Notional value of one leg.
///
/// Zero quantity: market value as-is. Otherwise the per-contract estimate
/// decides: at or above `threshold` the market value is taken as notional,
/// below it the market value is scaled by the multiplier.
pub fn estimate_notional(
    market_value: f64,
    quantity: i64,
    multiplier: i64,
    threshold: f64,
) -> f64 {
    if quantity == 0 {
        return market_value;
    }
    let contracts = (quantity.unsigned_abs() as f64) * (multiplier.max(1) as f64);
    let per_contract = market_value.abs() / contracts;
    if per_contract >= threshold {
        market_value
    } else {
        market_value * multiplier as f64
    }
}

/// Explode every record's futures legs into exposure rows.
pub fn compute_futures_exposure(
    records: &[PcfRecord],
    config: &DerivationConfig,
) -> Vec<FuturesExposure> {
    records
        .iter()
        .flat_map(|record| {
            record.futures.iter().map(move |leg| FuturesExposure {
                etf_code: record.etf_code.clone(),
                date: record.date,
                nav: record.nav,
                futures_type: leg.futures_type,
                contract_month: leg.contract_month.clone(),
                quantity: leg.quantity,
                market_value: leg.market_value,
                multiplier: leg.multiplier,
                futures_ratio: record
                    .nav
                    .filter(|nav| *nav > 0.0)
                    .map(|nav| leg.market_value.abs() / nav),
                notional: estimate_notional(
                    leg.market_value,
                    leg.quantity,
                    leg.multiplier,
                    config.notional_threshold,
                ),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pcf_core::{FuturesLegs, FuturesPosition};

    #[test]
    fn test_estimate_notional() {
        // 10 TOPIX contracts at full notional: estimate 2,800 >= 100.
        assert_relative_eq!(
            estimate_notional(280_000_000.0, 10, 10_000, 100.0),
            280_000_000.0
        );
        // Per-unit price disclosed: estimate 28 < 100, scale by multiplier.
        assert_relative_eq!(estimate_notional(2_800_000.0, 10, 10_000, 100.0), 28_000_000_000.0);
        assert_relative_eq!(estimate_notional(-5_000.0, 0, 10_000, 100.0), -5_000.0);
        assert_relative_eq!(estimate_notional(-100.0, -1, 1, 100.0), -100.0);
    }

    #[test]
    fn test_exposure_rows() {
        let mut record = PcfRecord::empty("1570", NaiveDate::from_ymd_opt(2026, 2, 12).unwrap());
        record.nav = Some(1_000_000_000.0);
        let (legs, _) = FuturesLegs::capped(vec![
            FuturesPosition::new(
                "NK225 2603",
                FuturesType::Nk225,
                Some("2603".into()),
                50,
                1_900_000_000.0,
            ),
            FuturesPosition::new(
                "NK225 MINI 2603",
                FuturesType::Nk225Mini,
                None,
                -10,
                -38_000_000.0,
            ),
        ]);
        record.futures = legs;

        let mut no_nav = PcfRecord::empty("1357", record.date);
        let (legs, _) =
            FuturesLegs::capped(vec![FuturesPosition::new("X", FuturesType::Unknown, None, 1, 5.0)]);
        no_nav.futures = legs;

        let rows = compute_futures_exposure(&[record, no_nav], &DerivationConfig::default());
        assert_eq!(rows.len(), 3);
        assert_relative_eq!(rows[0].futures_ratio.unwrap(), 1.9);
        assert_relative_eq!(rows[0].notional, 1_900_000_000.0);
        assert_relative_eq!(rows[1].futures_ratio.unwrap(), 0.038);
        assert_eq!(rows[2].futures_ratio, None);
        // Estimate 5 < 100 with multiplier 1: unchanged.
        assert_relative_eq!(rows[2].notional, 5.0);
    }
}
