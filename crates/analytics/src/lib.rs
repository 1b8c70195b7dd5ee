//! Derived metrics over canonical PCF records.
//!
//! This crate provides:
//! - Creation/redemption flow per ETF
//! - Category aggregates, breakdowns, rankings and per-ETF history
//! - NAV aggregates
//! - Futures notional exposure

pub mod category;
pub mod exposure;
pub mod flow;
pub mod nav;

pub use category::{
    aggregate_category, daily_ranking, etf_breakdown, etf_history, resolve_codes,
    DailyFlowAggregate, EtfHistoryPoint, RankingEntry,
};
pub use exposure::{compute_futures_exposure, estimate_notional, FuturesExposure};
pub use flow::{compute_creation_redemption, flows_for_series};
pub use nav::{aggregate_nav, nav_breakdown, NavAggregate, NavPoint};
