//! ICE Data Services dialect.
//!
//! Fixed-position layout:
//!
//! ```text
//! line 0  metadata header
//! line 1  code, name, cash component, shares outstanding, disclosure date
//! line 2  (blank)
//! line 3  holdings column header
//! line 4+ holdings
//! ```

use chrono::NaiveDate;
use pcf_core::{Error, PcfRecord, Result};

use crate::holdings::{summarize_holdings, ColumnLayout};
use crate::primitives::{cell, parse_date, split_cells, text_lines};
use crate::report::{ParseContext, ParseReport};

/// Minimum line count for a fixed-position file.
const MIN_LINES: usize = 4;

const META_LINE: usize = 1;
const HEADER_LINE: usize = 3;
const FIRST_HOLDING_LINE: usize = 4;

const META_CASH: usize = 2;
const META_SHARES: usize = 3;
const META_DATE: usize = 4;
const META_MIN_CELLS: usize = 5;

/// The four-line preamble shared by the ICE and S&P Global layouts.
#[derive(Debug, Clone)]
pub(crate) struct FixedPreamble {
    /// Cells of line 0.
    pub title: Vec<String>,
    /// Cells of line 1.
    pub meta: Vec<String>,
    /// Cells of line 3.
    pub header: Vec<String>,
}

impl FixedPreamble {
    pub fn read(lines: &[&str]) -> Result<Self> {
        if lines.len() < MIN_LINES {
            return Err(Error::parse(format!(
                "{} lines, expected at least {MIN_LINES}",
                lines.len()
            )));
        }
        let meta = split_cells(lines[META_LINE]);
        if meta.len() < META_MIN_CELLS {
            return Err(Error::parse(format!(
                "metadata row has {} cells, expected at least {META_MIN_CELLS}",
                meta.len()
            )));
        }
        Ok(Self {
            title: split_cells(lines[0]),
            meta,
            header: split_cells(lines[HEADER_LINE]),
        })
    }

    pub fn meta_cell(&self, index: usize) -> &str {
        cell(&self.meta, index)
    }

    pub fn date(&self) -> Option<NaiveDate> {
        parse_date(self.meta_cell(META_DATE))
    }

    /// Holdings rows, split into cells.
    pub fn rows<'a>(&self, lines: &'a [&'a str]) -> impl Iterator<Item = Vec<String>> + 'a {
        lines.iter().skip(FIRST_HOLDING_LINE).map(|line| split_cells(line))
    }

    /// Cash, shares outstanding and date from the metadata row.
    pub fn read_common(
        &self,
        etf_code: &str,
        ctx: &ParseContext,
        report: &mut ParseReport,
    ) -> PcfRecord {
        let date = ctx.resolve_date(self.meta_cell(META_DATE), report);
        let mut record = PcfRecord::empty(etf_code, date);
        record.cash_component = report.read_number("cash_component", self.meta_cell(META_CASH));
        record.shares_outstanding =
            report.read_int("shares_outstanding", self.meta_cell(META_SHARES));
        record
    }
}

/// NAV rebuilt from the basket: cash component plus equity value.
///
/// Absent equity counts as zero; absent cash leaves the NAV undefined.
pub(crate) fn reconstruct_nav(cash: Option<f64>, equity_value: Option<f64>) -> Option<f64> {
    cash.map(|c| c + equity_value.unwrap_or(0.0))
}

/// Parse one ICE file into a record.
pub fn parse_ice(
    text: &str,
    etf_code: &str,
    ctx: &ParseContext,
    report: &mut ParseReport,
) -> Result<PcfRecord> {
    let lines = text_lines(text);
    let preamble = FixedPreamble::read(&lines)?;
    let layout = ColumnLayout::from_header(&preamble.header);

    let mut record = preamble.read_common(etf_code, ctx, report);
    let summary = summarize_holdings(preamble.rows(&lines), &layout, report);

    record.equity_count = summary.equity_count;
    record.equity_market_value = summary.equity_market_value;
    record.futures = summary.futures;
    record.nav = reconstruct_nav(record.cash_component, record.equity_market_value);
    if record.nav.is_none() {
        report.degraded("nav", "");
    }

    Ok(record)
}
