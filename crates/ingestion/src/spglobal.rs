//! S&P Global dialect.
//!
//! Same preamble as the ICE layout, with an optional "Market Value" holdings
//! column that is taken verbatim. One sub-variant announces an AUM-style
//! token in its header line, carries the fund's NAV/AUM in the metadata row
//! and lists cash and margin balances as pseudo-holdings.

use pcf_core::{PcfRecord, Result};

use crate::holdings::{summarize_holdings, ColumnLayout};
use crate::ice::{reconstruct_nav, FixedPreamble};
use crate::primitives::text_lines;
use crate::report::{ParseContext, ParseReport};

/// Metadata position of the NAV/AUM value when no header cell names it.
const DEFAULT_AUM_COLUMN: usize = 5;

/// Lowercased header tokens marking the AUM sub-variant.
const AUM_MARKERS: &[&str] = &["aum", "assets under management", "cash & others"];

fn is_aum_label(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    label == "aum" || label.contains("assets under management")
}

/// Whether the file's header line announces the AUM sub-variant.
fn is_aum_variant(title: &[String]) -> bool {
    title.iter().any(|c| {
        let c = c.trim().to_lowercase();
        AUM_MARKERS.iter().any(|m| c == *m || (m.len() > 3 && c.contains(m)))
    })
}

/// Parse one S&P Global file into a record.
pub fn parse_spglobal(
    text: &str,
    etf_code: &str,
    ctx: &ParseContext,
    report: &mut ParseReport,
) -> Result<PcfRecord> {
    let lines = text_lines(text);
    let preamble = FixedPreamble::read(&lines)?;
    let layout = ColumnLayout::from_header(&preamble.header).with_market_value(&preamble.header);

    let mut record = preamble.read_common(etf_code, ctx, report);
    let summary = summarize_holdings(preamble.rows(&lines), &layout, report);

    record.equity_count = summary.equity_count;
    record.equity_market_value = summary.equity_market_value;
    record.futures = summary.futures;

    let disclosed = if is_aum_variant(&preamble.title) {
        let column = preamble
            .title
            .iter()
            .position(|c| is_aum_label(c))
            .unwrap_or(DEFAULT_AUM_COLUMN);
        report.read_number("nav", preamble.meta_cell(column))
    } else {
        None
    };

    record.nav =
        disclosed.or_else(|| reconstruct_nav(record.cash_component, record.equity_market_value));
    if record.nav.is_none() {
        report.degraded("nav", "");
    }

    Ok(record)
}
