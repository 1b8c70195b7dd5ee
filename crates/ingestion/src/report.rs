//! Per-file parse diagnostics.
//!
//! Every parse returns a [`ParseReport`] instead of writing to shared state.
//! Recording an event also emits a `tracing` event so batch runs stay
//! observable without inspecting reports.

use chrono::NaiveDate;
use pcf_core::{PcfRecord, Provider};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::primitives::{clean_cell, parse_date, parse_int, parse_number};

/// Caller-supplied context for one parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseContext {
    /// Date used when the file's own disclosure date is missing or unreadable.
    pub fallback_date: NaiveDate,
}

impl ParseContext {
    pub fn new(fallback_date: NaiveDate) -> Self {
        Self { fallback_date }
    }

    /// Parse a disclosure date, falling back (and reporting it) when unreadable.
    pub(crate) fn resolve_date(&self, raw: &str, report: &mut ParseReport) -> NaiveDate {
        parse_date(raw).unwrap_or_else(|| {
            report.degraded("date", raw);
            self.fallback_date
        })
    }
}

/// One diagnostic raised while parsing a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseEvent {
    /// A futures name matched no rule and was kept as UNKNOWN.
    UnknownFuturesName { raw_name: String },
    /// More futures rows than the leg cap; the extra rows were discarded.
    FuturesLegsTruncated { kept: usize, dropped: usize },
    /// A field could not be read and was left absent or replaced.
    FieldDegraded { field: String, raw: String },
    /// No record was produced for the file.
    RecordDropped { reason: String },
}

/// Diagnostics for one parsed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseReport {
    /// Provider whose dialect was parsed.
    pub provider: Provider,
    /// ETF the file was fetched for.
    pub etf_code: String,
    /// Events in the order they were raised.
    pub events: Vec<ParseEvent>,
}

impl ParseReport {
    pub fn new(provider: Provider, etf_code: impl Into<String>) -> Self {
        Self {
            provider,
            etf_code: etf_code.into(),
            events: Vec::new(),
        }
    }

    pub fn unknown_futures(&mut self, raw_name: &str) {
        warn!(
            provider = %self.provider,
            etf_code = %self.etf_code,
            raw_name,
            "futures name classified as UNKNOWN"
        );
        self.events.push(ParseEvent::UnknownFuturesName {
            raw_name: raw_name.to_string(),
        });
    }

    pub fn legs_truncated(&mut self, kept: usize, dropped: usize) {
        warn!(
            provider = %self.provider,
            etf_code = %self.etf_code,
            kept,
            dropped,
            "futures legs beyond the cap discarded"
        );
        self.events.push(ParseEvent::FuturesLegsTruncated { kept, dropped });
    }

    pub fn degraded(&mut self, field: &str, raw: &str) {
        debug!(
            provider = %self.provider,
            etf_code = %self.etf_code,
            field,
            raw,
            "field degraded"
        );
        self.events.push(ParseEvent::FieldDegraded {
            field: field.to_string(),
            raw: raw.to_string(),
        });
    }

    pub fn dropped(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        error!(
            provider = %self.provider,
            etf_code = %self.etf_code,
            reason = %reason,
            "record dropped"
        );
        self.events.push(ParseEvent::RecordDropped { reason });
    }

    /// Parse a numeric field, reporting it when absent or unreadable.
    pub(crate) fn read_number(&mut self, field: &str, raw: &str) -> Option<f64> {
        let value = parse_number(raw);
        if value.is_none() {
            self.degraded(field, clean_cell(raw));
        }
        value
    }

    /// Integer counterpart of [`ParseReport::read_number`].
    pub(crate) fn read_int(&mut self, field: &str, raw: &str) -> Option<i64> {
        let value = parse_int(raw);
        if value.is_none() {
            self.degraded(field, clean_cell(raw));
        }
        value
    }

    /// Whether the file produced no record.
    pub fn is_dropped(&self) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, ParseEvent::RecordDropped { .. }))
    }

    /// Raw names of every UNKNOWN futures leg, for manual triage.
    pub fn unknown_names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().filter_map(|e| match e {
            ParseEvent::UnknownFuturesName { raw_name } => Some(raw_name.as_str()),
            _ => None,
        })
    }
}

/// Result of parsing one file: the record, if any, and its diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// The canonical record, absent when the file was dropped.
    pub record: Option<PcfRecord>,
    /// Diagnostics raised while parsing.
    pub report: ParseReport,
}
