//! Equity/futures row classification.
//!
//! Decides whether one holdings row of a PCF file is a futures leg or an
//! equity holding, using the exchange code first and the instrument name as
//! a fallback.
//!
//! Known limitation: a genuine equity listed on a futures exchange with a
//! compact ticker is classified as futures. There is no disambiguation rule
//! for that case yet.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Cell positions that may carry the exchange code.
const EXCHANGE_COLUMNS: [usize; 2] = [3, 4];

/// Exchange tokens recognised in the exchange column.
const KNOWN_EXCHANGES: &[&str] = &[
    "OSE", "XOSE", "TSE", "XTKS", "SAP", "OTC", "HKF", "TOCOM", "XNYS", "XNAS",
];

/// Domestic futures exchanges.
const FUTURES_EXCHANGES: &[&str] = &["OSE", "XOSE"];

/// Compact futures ticker: 2-4 letters, an optional extra letter or digit,
/// then one digit (e.g. "TPX6", "NKM6").
static FUTURES_TICKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{2,4}[A-Z0-9]?[0-9]$").expect("valid ticker pattern"));

/// Name patterns identifying a futures row when the code cell is empty.
static FUTURES_NAME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"FUTURES",
        r"FUTR",
        r"TOPIX\s+[0-9]{4}",
        r"NK225\s+[0-9]{4}",
        r"NIKKEI\s*225?\s+[0-9]",
        r"TOPIX\s+INDX",
        r"NIKKEI\s+225\s+MINI",
        r"JGB",
        r"先物",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid futures name pattern"))
    .collect()
});

/// Kind of holdings row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    /// Equity holding (also the conservative default).
    Equity,
    /// Futures leg.
    Futures,
}

/// First recognised exchange token in the candidate columns.
fn exchange_token<S: AsRef<str>>(row: &[S]) -> Option<String> {
    EXCHANGE_COLUMNS.iter().find_map(|&idx| {
        let value = row.get(idx)?.as_ref().trim().to_uppercase();
        KNOWN_EXCHANGES.contains(&value.as_str()).then_some(value)
    })
}

/// Classify one row already split into cells.
pub fn classify_row<S: AsRef<str>>(row: &[S]) -> RowKind {
    if row.len() < 3 {
        return RowKind::Equity;
    }

    let code = row[0].as_ref().trim().to_uppercase();
    let name = row[1].as_ref().trim().to_uppercase();

    if let Some(exchange) = exchange_token(row) {
        if FUTURES_EXCHANGES.contains(&exchange.as_str())
            && (code.is_empty() || FUTURES_TICKER.is_match(&code))
        {
            return RowKind::Futures;
        }
    }

    if code.is_empty()
        && !name.is_empty()
        && FUTURES_NAME_PATTERNS.iter().any(|p| p.is_match(&name))
    {
        return RowKind::Futures;
    }

    RowKind::Equity
}

/// Whether the row is a futures leg.
#[inline]
pub fn is_futures_row<S: AsRef<str>>(row: &[S]) -> bool {
    classify_row(row) == RowKind::Futures
}
