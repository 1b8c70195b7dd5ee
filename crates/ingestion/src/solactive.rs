//! Solactive dialect.
//!
//! A labelled key/value metadata block, ended by a blank line or by the
//! holdings header, followed by the holdings table:
//!
//! ```text
//! Fund Code,1306
//! Cash Component,1000000
//! Shares Outstanding,500000
//! Fund Date,12/02/2026
//!
//! Code,Name,ISIN,Exchange,Currency,Shares Amount,Stock Price
//! ...
//! ```

use pcf_core::{Error, PcfRecord, Result};

use crate::holdings::{summarize_holdings, ColumnLayout};
use crate::ice::reconstruct_nav;
use crate::primitives::{cell, is_blank_row, split_cells, text_lines};
use crate::report::{ParseContext, ParseReport};

const MIN_LINES: usize = 2;

/// Metadata fields recognised in the key/value block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MetaField {
    Code,
    Date,
    SharesOutstanding,
    Cash,
    Nav,
}

/// Key synonyms per field, matched case-insensitively by substring.
/// Fields are tried in this order; the first field whose synonyms match wins.
const SYNONYMS: &[(MetaField, &[&str])] = &[
    (MetaField::Code, &["fund code", "etf code", "security code", "code"]),
    (MetaField::Date, &["fund date", "pcf date", "date"]),
    (
        MetaField::SharesOutstanding,
        &["shares outstanding", "units outstanding", "units", "口数"],
    ),
    (MetaField::Cash, &["cash component", "cash", "現金"]),
    (MetaField::Nav, &["net asset", "nav"]),
];

/// Per-unit figures share the NAV synonyms but are not the fund NAV.
const PER_UNIT_MARKERS: &[&str] = &["per unit", "per share"];

const CODE_HEADERS: &[&str] = &["code", "コード"];
const QUANTITY_HEADERS: &[&str] = &["shares", "amount", "quantity", "株数"];

fn classify_key(key: &str) -> Option<MetaField> {
    let key = key.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    SYNONYMS
        .iter()
        .find(|(field, synonyms)| {
            synonyms.iter().any(|s| key.contains(s))
                && !(*field == MetaField::Nav && PER_UNIT_MARKERS.iter().any(|m| key.contains(m)))
        })
        .map(|(field, _)| *field)
}

/// A row with a code-like cell and a quantity-like cell.
fn is_holdings_header(row: &[String]) -> bool {
    let lowered: Vec<String> = row.iter().map(|c| c.to_lowercase()).collect();
    let has = |needles: &[&str]| lowered.iter().any(|c| needles.iter().any(|n| c.contains(n)));
    has(CODE_HEADERS) && has(QUANTITY_HEADERS)
}

/// Metadata values as written in the file.
#[derive(Debug, Default)]
struct RawMeta {
    code: Option<String>,
    date: Option<String>,
    shares_outstanding: Option<String>,
    cash: Option<String>,
    nav: Option<String>,
}

impl RawMeta {
    /// Keep the first value seen per field.
    fn set(&mut self, field: MetaField, value: &str) {
        let slot = match field {
            MetaField::Code => &mut self.code,
            MetaField::Date => &mut self.date,
            MetaField::SharesOutstanding => &mut self.shares_outstanding,
            MetaField::Cash => &mut self.cash,
            MetaField::Nav => &mut self.nav,
        };
        slot.get_or_insert_with(|| value.to_string());
    }
}

/// Parse one Solactive file into a record.
pub fn parse_solactive(
    text: &str,
    etf_code: &str,
    ctx: &ParseContext,
    report: &mut ParseReport,
) -> Result<PcfRecord> {
    let lines = text_lines(text);
    if lines.len() < MIN_LINES {
        return Err(Error::parse(format!(
            "{} lines, expected at least {MIN_LINES}",
            lines.len()
        )));
    }

    let rows: Vec<Vec<String>> = lines.iter().map(|l| split_cells(l)).collect();

    let mut meta = RawMeta::default();
    let mut header_index = None;
    let mut scan_from = rows.len();
    for (i, row) in rows.iter().enumerate() {
        if is_blank_row(row) {
            scan_from = i + 1;
            break;
        }
        if is_holdings_header(row) {
            header_index = Some(i);
            break;
        }
        if let Some(field) = classify_key(cell(row, 0)) {
            meta.set(field, cell(row, 1));
        }
    }
    if header_index.is_none() {
        header_index = rows
            .iter()
            .enumerate()
            .skip(scan_from)
            .find(|(_, row)| is_holdings_header(row))
            .map(|(i, _)| i);
    }

    if meta.code.as_deref().is_some_and(|c| c != etf_code) {
        tracing::debug!(
            etf_code,
            disclosed = meta.code.as_deref().unwrap_or_default(),
            "disclosed fund code differs from requested code"
        );
    }

    let date = ctx.resolve_date(meta.date.as_deref().unwrap_or_default(), report);
    let mut record = PcfRecord::empty(etf_code, date);
    record.cash_component =
        report.read_number("cash_component", meta.cash.as_deref().unwrap_or_default());
    record.shares_outstanding = report.read_int(
        "shares_outstanding",
        meta.shares_outstanding.as_deref().unwrap_or_default(),
    );

    if let Some(header_index) = header_index {
        let layout = ColumnLayout::from_header(&rows[header_index]);
        let summary = summarize_holdings(rows[header_index + 1..].iter().cloned(), &layout, report);
        record.equity_count = summary.equity_count;
        record.equity_market_value = summary.equity_market_value;
        record.futures = summary.futures;
    }

    let disclosed = match meta.nav.as_deref() {
        Some(raw) => report.read_number("nav", raw),
        None => None,
    };
    record.nav =
        disclosed.or_else(|| reconstruct_nav(record.cash_component, record.equity_market_value));
    if record.nav.is_none() {
        report.degraded("nav", "");
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use pcf_core::{FuturesType, Provider};

    fn ctx() -> ParseContext {
        ParseContext::new(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap())
    }

    const FIXTURE: &str = "\
Fund Code,1306
Fund Name,TOPIX ETF
Cash Component,\"1,000,000\"
Shares Outstanding,500000
Fund Date,12/02/2026

Code,Name,ISIN,Exchange,Currency,Shares Amount,Stock Price
7203,TOYOTA MOTOR,JP3633400001,TSE,JPY,1000,2500
,TOPIX FUT MAR 26,,OSE,JPY,10,2800
";

    #[test]
    fn test_parse_fixture_reconstructs_nav() {
        let mut report = ParseReport::new(Provider::Solactive, "1306");
        let record = parse_solactive(FIXTURE, "1306", &ctx(), &mut report).unwrap();

        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 2, 12).unwrap());
        assert_relative_eq!(record.cash_component.unwrap(), 1_000_000.0);
        assert_eq!(record.shares_outstanding, Some(500_000));
        assert_eq!(record.equity_count, Some(1000));
        assert_relative_eq!(record.nav.unwrap(), 3_500_000.0);

        let leg = record.futures.get(0).unwrap();
        assert_eq!(leg.futures_type, FuturesType::Topix);
        assert_eq!(leg.contract_month.as_deref(), Some("2603"));
        assert_relative_eq!(leg.market_value, 28_000.0);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_disclosed_nav_wins_and_header_ends_block() {
        let text = "\
ETF Code,1321
Net Asset Value,\"12,345,678\"
NAV per Unit,40000
Units Outstanding,300
Cash,5000
PCF Date,2026-02-12
Code,Name,ISIN,Exchange,Currency,Shares Amount,Stock Price
8306,MUFG,JP3902900004,TSE,JPY,10,2000
";
        let mut report = ParseReport::new(Provider::Solactive, "1321");
        let record = parse_solactive(text, "1321", &ctx(), &mut report).unwrap();
        assert_relative_eq!(record.nav.unwrap(), 12_345_678.0);
        assert_eq!(record.shares_outstanding, Some(300));
        assert_relative_eq!(record.cash_component.unwrap(), 5000.0);
        assert_eq!(record.equity_count, Some(10));
    }

    #[test]
    fn test_first_value_per_field_is_kept() {
        let mut meta = RawMeta::default();
        meta.set(MetaField::Cash, "1");
        meta.set(MetaField::Cash, "2");
        assert_eq!(meta.cash.as_deref(), Some("1"));
    }

    #[test]
    fn test_key_classification() {
        assert_eq!(classify_key("Fund Code"), Some(MetaField::Code));
        assert_eq!(classify_key("Cash Component"), Some(MetaField::Cash));
        assert_eq!(classify_key("現金"), Some(MetaField::Cash));
        assert_eq!(classify_key("Units Outstanding"), Some(MetaField::SharesOutstanding));
        assert_eq!(classify_key("Net Asset Value"), Some(MetaField::Nav));
        assert_eq!(classify_key("NAV per Unit"), None);
        assert_eq!(classify_key("Fund Name"), None);
    }

    #[test]
    fn test_missing_holdings_and_date() {
        let text = "Fund Code,1306\nCash Component,100";
        let mut report = ParseReport::new(Provider::Solactive, "1306");
        let record = parse_solactive(text, "1306", &ctx(), &mut report).unwrap();
        assert_eq!(record.date, ctx().fallback_date);
        assert_relative_eq!(record.nav.unwrap(), 100.0);
        assert!(record.futures.is_empty());
    }

    #[test]
    fn test_single_line_is_rejected() {
        let mut report = ParseReport::new(Provider::Solactive, "1306");
        assert!(parse_solactive("Fund Code,1306", "1306", &ctx(), &mut report).is_err());
    }
}
