//! Canonical storage for PCF time series and the ETF master.
//!
//! This crate provides:
//! - The flat persisted row format
//! - A (code, date)-keyed time-series store with idempotent merge
//! - The ETF master table

pub mod master;
pub mod row;
pub mod timeseries;

pub use master::EtfMasterTable;
pub use row::TimeseriesRow;
pub use timeseries::{MergeSummary, TimeseriesStore};
