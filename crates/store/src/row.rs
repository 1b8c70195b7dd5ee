//! Flat persisted row.
//!
//! One row per (ETF code, date) with the two futures legs spread over fixed
//! `futures1_*` / `futures2_*` columns.

use chrono::NaiveDate;
use pcf_core::{FuturesLegs, FuturesPosition, FuturesType, PcfRecord};
use serde::{Deserialize, Serialize};

/// Columns every time-series table must carry.
pub const REQUIRED_COLUMNS: &[&str] = &["etf_code", "date", "nav", "shares_outstanding"];

/// One persisted (ETF code, date) row. Empty cells read back as `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesRow {
    /// ETF code.
    pub etf_code: String,
    /// Disclosure date, ISO formatted.
    pub date: NaiveDate,
    /// Fund net asset value.
    pub nav: Option<f64>,
    /// Units outstanding.
    pub shares_outstanding: Option<i64>,
    /// Cash held by the fund.
    pub cash_component: Option<f64>,
    /// Total shares held across equity holdings.
    pub equity_count: Option<i64>,
    /// Total market value of equity holdings.
    pub equity_market_value: Option<f64>,
    /// Derived on write; ignored on read.
    pub nav_per_unit: Option<f64>,

    /// First leg: vendor name as disclosed.
    pub futures1_raw_name: Option<String>,
    /// First leg: canonical type tag.
    pub futures1_type: Option<FuturesType>,
    /// First leg: contract month as "YYMM".
    pub futures1_contract_month: Option<String>,
    /// First leg: signed contract count.
    pub futures1_quantity: Option<i64>,
    /// First leg: reported market value.
    pub futures1_market_value: Option<f64>,
    /// First leg: contract multiplier, written for readers only.
    pub futures1_multiplier: Option<i64>,

    /// Second leg: vendor name as disclosed.
    pub futures2_raw_name: Option<String>,
    /// Second leg: canonical type tag.
    pub futures2_type: Option<FuturesType>,
    /// Second leg: contract month as "YYMM".
    pub futures2_contract_month: Option<String>,
    /// Second leg: signed contract count.
    pub futures2_quantity: Option<i64>,
    /// Second leg: reported market value.
    pub futures2_market_value: Option<f64>,
    /// Second leg: contract multiplier, written for readers only.
    pub futures2_multiplier: Option<i64>,
}

type LegColumns = (
    Option<String>,
    Option<FuturesType>,
    Option<String>,
    Option<i64>,
    Option<f64>,
    Option<i64>,
);

fn leg_columns(leg: Option<&FuturesPosition>) -> LegColumns {
    match leg {
        Some(p) => (
            Some(p.raw_name.clone()),
            Some(p.futures_type),
            p.contract_month.clone(),
            Some(p.quantity),
            Some(p.market_value),
            Some(p.multiplier),
        ),
        None => (None, None, None, None, None, None),
    }
}

/// Rebuild a leg. The stored multiplier is ignored in favour of the type's.
fn leg_from_columns(
    raw_name: Option<String>,
    futures_type: Option<FuturesType>,
    contract_month: Option<String>,
    quantity: Option<i64>,
    market_value: Option<f64>,
) -> Option<FuturesPosition> {
    if raw_name.is_none() && futures_type.is_none() {
        return None;
    }
    Some(FuturesPosition::new(
        raw_name.unwrap_or_default(),
        futures_type.unwrap_or(FuturesType::Unknown),
        contract_month,
        quantity.unwrap_or(0),
        market_value.unwrap_or(0.0),
    ))
}

impl From<&PcfRecord> for TimeseriesRow {
    fn from(record: &PcfRecord) -> Self {
        let (f1_name, f1_type, f1_month, f1_qty, f1_mv, f1_mult) =
            leg_columns(record.futures.get(0));
        let (f2_name, f2_type, f2_month, f2_qty, f2_mv, f2_mult) =
            leg_columns(record.futures.get(1));
        Self {
            etf_code: record.etf_code.clone(),
            date: record.date,
            nav: record.nav,
            shares_outstanding: record.shares_outstanding,
            cash_component: record.cash_component,
            equity_count: record.equity_count,
            equity_market_value: record.equity_market_value,
            nav_per_unit: record.nav_per_unit(),
            futures1_raw_name: f1_name,
            futures1_type: f1_type,
            futures1_contract_month: f1_month,
            futures1_quantity: f1_qty,
            futures1_market_value: f1_mv,
            futures1_multiplier: f1_mult,
            futures2_raw_name: f2_name,
            futures2_type: f2_type,
            futures2_contract_month: f2_month,
            futures2_quantity: f2_qty,
            futures2_market_value: f2_mv,
            futures2_multiplier: f2_mult,
        }
    }
}

impl From<TimeseriesRow> for PcfRecord {
    fn from(row: TimeseriesRow) -> Self {
        let legs = [
            leg_from_columns(
                row.futures1_raw_name,
                row.futures1_type,
                row.futures1_contract_month,
                row.futures1_quantity,
                row.futures1_market_value,
            ),
            leg_from_columns(
                row.futures2_raw_name,
                row.futures2_type,
                row.futures2_contract_month,
                row.futures2_quantity,
                row.futures2_market_value,
            ),
        ];
        let (futures, _) = FuturesLegs::capped(legs.into_iter().flatten());

        PcfRecord {
            etf_code: row.etf_code,
            date: row.date,
            nav: row.nav,
            shares_outstanding: row.shares_outstanding,
            cash_component: row.cash_component,
            equity_count: row.equity_count,
            equity_market_value: row.equity_market_value,
            futures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> PcfRecord {
        let mut r = PcfRecord::empty("1306", NaiveDate::from_ymd_opt(2026, 2, 12).unwrap());
        r.nav = Some(2_000.0);
        r.shares_outstanding = Some(100);
        let (legs, _) = FuturesLegs::capped(vec![FuturesPosition::new(
            "TOPIX FUT 2603",
            FuturesType::Topix,
            Some("2603".to_string()),
            3,
            8_400_000.0,
        )]);
        r.futures = legs;
        r
    }

    #[test]
    fn test_row_flattens_legs() {
        let row = TimeseriesRow::from(&record());
        assert_eq!(row.nav_per_unit, Some(20.0));
        assert_eq!(row.futures1_type, Some(FuturesType::Topix));
        assert_eq!(row.futures1_multiplier, Some(10_000));
        assert_eq!(row.futures2_raw_name, None);
        assert_eq!(PcfRecord::from(row), record());
    }

    #[test]
    fn test_stored_multiplier_is_not_trusted() {
        let mut row = TimeseriesRow::from(&record());
        row.futures1_multiplier = Some(7);
        let restored = PcfRecord::from(row);
        assert_eq!(restored.futures.get(0).unwrap().multiplier, 10_000);
    }

    #[test]
    fn test_leg_with_name_only_is_unknown() {
        let mut row = TimeseriesRow::from(&record());
        row.futures2_raw_name = Some("SOMETHING".to_string());
        let restored = PcfRecord::from(row);
        assert_eq!(restored.futures.len(), 2);
        assert_eq!(restored.futures.get(1).unwrap().futures_type, FuturesType::Unknown);
        assert_eq!(restored.futures.get(1).unwrap().multiplier, 1);
    }
}
