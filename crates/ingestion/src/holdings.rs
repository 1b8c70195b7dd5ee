//! Holdings-section handling shared by the vendor dialects.
//!
//! The per-file summary (equity totals plus futures legs) feeds the canonical
//! record; the per-stock list feeds holdings views.

use chrono::NaiveDate;
use pcf_core::{FuturesLegs, FuturesType, Provider};
use serde::{Deserialize, Serialize};

use crate::classifier::is_futures_row;
use crate::futures::normalize_futures;
use crate::ice::FixedPreamble;
use crate::primitives::{cell, find_column, is_blank_row, parse_int, parse_number, text_lines};
use crate::report::{ParseContext, ParseReport};

/// Quantity column used when the header names none.
const DEFAULT_QUANTITY_COLUMN: usize = 5;

/// Code-cell values that mark non-holding rows in S&P Global files.
const NON_HOLDING_CODES: &[&str] = &["cash", "margin"];

/// Column positions inside the holdings section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnLayout {
    pub quantity: usize,
    pub price: usize,
    /// Explicit market value column, when the vendor provides one.
    pub market_value: Option<usize>,
    /// Skip rows whose code cell is "cash" or "margin".
    pub skip_cash_rows: bool,
}

impl ColumnLayout {
    /// Locate columns by header name, falling back to fixed positions.
    pub fn from_header(header: &[String]) -> Self {
        let quantity = find_column(header, &["shares amount", "shares"])
            .unwrap_or(DEFAULT_QUANTITY_COLUMN);
        let price = find_column(header, &["stock price"]).unwrap_or(quantity + 1);
        Self {
            quantity,
            price,
            market_value: None,
            skip_cash_rows: false,
        }
    }

    /// Also pick up a "market value" column and skip cash/margin rows.
    pub fn with_market_value(mut self, header: &[String]) -> Self {
        self.market_value = find_column(header, &["market value"]);
        self.skip_cash_rows = true;
        self
    }

    fn is_non_holding(&self, row: &[String]) -> bool {
        if !self.skip_cash_rows {
            return false;
        }
        let code = cell(row, 0).to_lowercase();
        NON_HOLDING_CODES.contains(&code.as_str())
    }

    fn explicit_market_value(&self, row: &[String]) -> Option<f64> {
        self.market_value.and_then(|idx| parse_number(cell(row, idx)))
    }
}

/// Aggregates over one file's holdings section.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct HoldingsSummary {
    /// Σ shares over contributing equity rows.
    pub equity_count: Option<i64>,
    /// Σ market value over contributing equity rows.
    pub equity_market_value: Option<f64>,
    pub futures: FuturesLegs,
}

/// Fold holdings rows into equity totals and capped futures legs.
///
/// An equity row contributes only when both its quantity and price are
/// present and nonzero. A futures row's market value is the explicit column
/// when present, else quantity x price, else 0 (reported as degraded).
pub(crate) fn summarize_holdings<I>(
    rows: I,
    layout: &ColumnLayout,
    report: &mut ParseReport,
) -> HoldingsSummary
where
    I: IntoIterator<Item = Vec<String>>,
{
    // None once the running share total overflows.
    let mut equity_count = Some(0i64);
    let mut equity_value = 0.0f64;
    let mut contributing = 0usize;
    let mut positions = Vec::new();

    for row in rows {
        if row.len() < 3 || is_blank_row(&row) || layout.is_non_holding(&row) {
            continue;
        }

        let quantity = parse_int(cell(&row, layout.quantity));
        let price = parse_number(cell(&row, layout.price));

        if is_futures_row(&row) {
            let name = cell(&row, 1);
            let market_value = match (layout.explicit_market_value(&row), quantity, price) {
                (Some(mv), _, _) => mv,
                (None, Some(q), Some(p)) => q as f64 * p,
                _ => {
                    report.degraded("futures_market_value", name);
                    0.0
                }
            };
            let position = normalize_futures(name, quantity.unwrap_or(0), market_value);
            if position.futures_type == FuturesType::Unknown {
                report.unknown_futures(&position.raw_name);
            }
            positions.push(position);
            continue;
        }

        match (quantity, price) {
            (Some(q), Some(p)) if q != 0 && p != 0.0 => {
                equity_count = match equity_count.map(|total| total.checked_add(q)) {
                    Some(None) => {
                        report.degraded("equity_count", cell(&row, layout.quantity));
                        None
                    }
                    other => other.flatten(),
                };
                equity_value += layout.explicit_market_value(&row).unwrap_or(q as f64 * p);
                contributing += 1;
            }
            _ => {}
        }
    }

    let (futures, dropped) = FuturesLegs::capped(positions);
    if dropped > 0 {
        report.legs_truncated(futures.len(), dropped);
    }

    let has_equity = contributing > 0;
    HoldingsSummary {
        equity_count: equity_count.filter(|_| has_equity),
        equity_market_value: has_equity.then_some(equity_value),
        futures,
    }
}

/// One stock held by an ETF on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityHolding {
    /// ETF holding the stock.
    pub etf_code: String,
    /// Disclosure date of the file.
    pub date: NaiveDate,
    /// Exchange code of the stock (may be empty when a name is present).
    pub stock_code: String,
    /// Stock name as disclosed.
    pub stock_name: String,
    /// Shares held.
    pub shares: i64,
    /// Price per share.
    pub price: f64,
    /// Explicit market value when the file has one, else shares x price.
    pub market_value: f64,
}

/// Per-stock equity holdings from an ICE or S&P Global file.
///
/// Futures rows, cash/margin rows, rows missing quantity or price and rows
/// with neither code nor name are skipped. Other providers and malformed
/// files yield an empty list.
pub fn extract_holdings(
    provider: Provider,
    text: &str,
    etf_code: &str,
    ctx: &ParseContext,
) -> Vec<EquityHolding> {
    let layout_for = |header: &[String]| match provider {
        Provider::Ice => Some(ColumnLayout::from_header(header)),
        Provider::SpGlobal => Some(ColumnLayout::from_header(header).with_market_value(header)),
        Provider::Solactive | Provider::ExcelImport => None,
    };

    let lines = text_lines(text);
    let Ok(preamble) = FixedPreamble::read(&lines) else {
        return Vec::new();
    };
    let Some(layout) = layout_for(&preamble.header) else {
        return Vec::new();
    };
    let date = preamble.date().unwrap_or(ctx.fallback_date);

    preamble
        .rows(&lines)
        .filter(|row| row.len() >= 3 && !layout.is_non_holding(row) && !is_futures_row(row))
        .filter_map(|row| {
            let stock_code = cell(&row, 0).to_string();
            let stock_name = cell(&row, 1).to_string();
            if stock_code.is_empty() && stock_name.is_empty() {
                return None;
            }
            let shares = parse_int(cell(&row, layout.quantity)).filter(|s| *s != 0)?;
            let price = parse_number(cell(&row, layout.price)).filter(|p| *p != 0.0)?;
            let market_value = layout
                .explicit_market_value(&row)
                .unwrap_or(shares as f64 * price);
            Some(EquityHolding {
                etf_code: etf_code.to_string(),
                date,
                stock_code,
                stock_name,
                shares,
                price,
                market_value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::split_cells;
    use approx::assert_relative_eq;

    fn rows(lines: &[&str]) -> Vec<Vec<String>> {
        lines.iter().map(|l| split_cells(l)).collect()
    }

    fn header(line: &str) -> Vec<String> {
        split_cells(line)
    }

    #[test]
    fn test_layout_from_header_and_fallback() {
        let layout = ColumnLayout::from_header(&header(
            "Code,Name,ISIN,Exchange,Currency,Shares Amount,Stock Price",
        ));
        assert_eq!((layout.quantity, layout.price), (5, 6));

        let layout = ColumnLayout::from_header(&header("a,b,shares,c,stock price"));
        assert_eq!((layout.quantity, layout.price), (2, 4));

        let layout = ColumnLayout::from_header(&header("a,b,c"));
        assert_eq!((layout.quantity, layout.price), (5, 6));
        assert_eq!(layout.market_value, None);
    }

    #[test]
    fn test_summary_accumulates_equity_and_futures() {
        let layout = ColumnLayout::from_header(&header(
            "Code,Name,ISIN,Exchange,Currency,Shares Amount,Stock Price",
        ));
        let mut report = ParseReport::new(Provider::Ice, "1306");
        let summary = summarize_holdings(
            rows(&[
                "7203,TOYOTA,JP3633400001,TSE,JPY,100,2500",
                "6758,SONY,JP3435000009,TSE,JPY,50,3000",
                "9999,ZERO PRICE,,TSE,JPY,10,0",
                ",TOPIX FUT 2603,,OSE,JPY,2,2800",
            ]),
            &layout,
            &mut report,
        );

        assert_eq!(summary.equity_count, Some(150));
        assert_relative_eq!(summary.equity_market_value.unwrap(), 400_000.0);
        assert_eq!(summary.futures.len(), 1);
        let leg = summary.futures.get(0).unwrap();
        assert_eq!(leg.futures_type, FuturesType::Topix);
        assert_eq!(leg.quantity, 2);
        assert_relative_eq!(leg.market_value, 5600.0);
        assert!(report.events.is_empty());
    }

    #[test]
    fn test_summary_without_equity_is_absent() {
        let layout = ColumnLayout::from_header(&[]);
        let mut report = ParseReport::new(Provider::Ice, "1306");
        let summary = summarize_holdings(rows(&["x,y,z"]), &layout, &mut report);
        assert_eq!(summary.equity_count, None);
        assert_eq!(summary.equity_market_value, None);
        assert!(summary.futures.is_empty());
    }

    #[test]
    fn test_summary_truncates_and_reports_unknown() {
        let layout = ColumnLayout::from_header(&header("c,n,i,e,cur,shares,stock price"));
        let mut report = ParseReport::new(Provider::Ice, "1570");
        let summary = summarize_holdings(
            rows(&[
                ",NK225 FUT 2603,,OSE,JPY,10,38000",
                ",NK225 MINI 2603,,OSE,JPY,5,38000",
                ",MYSTERY FUTURES,,OSE,JPY,1,",
            ]),
            &layout,
            &mut report,
        );
        assert_eq!(summary.futures.len(), 2);
        assert_eq!(report.unknown_names().collect::<Vec<_>>(), vec!["MYSTERY FUTURES"]);
        assert!(report.events.iter().any(|e| matches!(
            e,
            crate::report::ParseEvent::FuturesLegsTruncated { kept: 2, dropped: 1 }
        )));
        assert!(report.events.iter().any(|e| matches!(
            e,
            crate::report::ParseEvent::FieldDegraded { field, .. } if field == "futures_market_value"
        )));
    }

    #[test]
    fn test_equity_count_overflow_degrades() {
        let layout = ColumnLayout::from_header(&header("c,n,i,e,cur,shares,stock price"));
        let mut report = ParseReport::new(Provider::Ice, "1321");
        let summary = summarize_holdings(
            rows(&[
                "7203,TOYOTA,,TSE,JPY,9000000000000000000,1",
                "6758,SONY,,TSE,JPY,9000000000000000000,1",
                "8306,MUFG,,TSE,JPY,10,1",
            ]),
            &layout,
            &mut report,
        );
        assert_eq!(summary.equity_count, None);
        assert_relative_eq!(summary.equity_market_value.unwrap(), 1.8e19);
        assert_eq!(
            report.events,
            vec![crate::report::ParseEvent::FieldDegraded {
                field: "equity_count".to_string(),
                raw: "9000000000000000000".to_string(),
            }]
        );
    }

    #[test]
    fn test_explicit_market_value_and_cash_rows() {
        let head = header("Code,Name,ISIN,Exchange,Currency,Shares Amount,Stock Price,Market Value");
        let layout = ColumnLayout::from_header(&head).with_market_value(&head);
        assert_eq!(layout.market_value, Some(7));

        let mut report = ParseReport::new(Provider::SpGlobal, "2558");
        let summary = summarize_holdings(
            rows(&[
                "7203,TOYOTA,,TSE,JPY,100,2500,250100",
                "Cash,JPY CASH,,,JPY,1,1000000,1000000",
                ",TOPIX FUT 2603,,OSE,JPY,3,2800,-84000000",
            ]),
            &layout,
            &mut report,
        );
        assert_eq!(summary.equity_count, Some(100));
        assert_relative_eq!(summary.equity_market_value.unwrap(), 250_100.0);
        assert_relative_eq!(summary.futures.get(0).unwrap().market_value, -84_000_000.0);
    }

    #[test]
    fn test_extract_holdings_ice() {
        let text = "\
Code,Name,Cash Component,Shares Outstanding,Fund Date
1306,TOPIX ETF,1000000,500000,2026-02-12

Code,Name,ISIN,Exchange,Currency,Shares Amount,Stock Price
7203,TOYOTA,JP3633400001,TSE,JPY,100,2500
,,,TSE,JPY,10,100
6758,SONY,JP3435000009,TSE,JPY,,3000
,TOPIX FUT 2603,,OSE,JPY,2,2800
";
        let ctx = ParseContext::new(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let holdings = extract_holdings(Provider::Ice, text, "1306", &ctx);
        assert_eq!(holdings.len(), 1);
        assert_eq!(holdings[0].stock_code, "7203");
        assert_eq!(holdings[0].date, NaiveDate::from_ymd_opt(2026, 2, 12).unwrap());
        assert_relative_eq!(holdings[0].market_value, 250_000.0);

        assert!(extract_holdings(Provider::Solactive, text, "1306", &ctx).is_empty());
        assert!(extract_holdings(Provider::Ice, "a\nb", "1306", &ctx).is_empty());
    }
}
