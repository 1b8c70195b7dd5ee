//! Parsing primitives shared by every vendor dialect.
//!
//! Number, date and cell handling lives here once so the dialect parsers
//! cannot drift apart.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};

/// Date layouts seen across vendors, tried in order.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%b-%Y",
];

/// Strip surrounding whitespace and quotes from a cell.
#[inline]
pub fn clean_cell(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

/// Parse a numeric cell. Thousands separators are ignored; empty cells and
/// "-" are absent, as is anything that does not parse to a finite number.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cleaned = clean_cell(cell).replace(',', "");
    if cleaned.is_empty() || cleaned == "-" {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse an integer cell, truncating any fractional part.
pub fn parse_int(cell: &str) -> Option<i64> {
    parse_number(cell).map(|v| v.trunc() as i64)
}

/// Parse a date cell in any of the known vendor layouts.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let cleaned = clean_cell(cell);
    if cleaned.is_empty() {
        return None;
    }

    // Compact YYYYMMDD.
    if cleaned.len() == 8 && cleaned.bytes().all(|b| b.is_ascii_digit()) {
        let year = cleaned[..4].parse().ok()?;
        let month = cleaned[4..6].parse().ok()?;
        let day = cleaned[6..].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(cleaned, fmt).ok())
}

/// Split raw vendor text into lines, dropping a byte-order mark and any
/// leading/trailing blank lines.
pub fn text_lines(text: &str) -> Vec<&str> {
    text.trim_start_matches('\u{feff}').trim().lines().collect()
}

/// Split one CSV line into trimmed cells, honouring quotes.
pub fn split_cells(line: &str) -> Vec<String> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => record.iter().map(|c| clean_cell(c).to_string()).collect(),
        Ok(false) => Vec::new(),
        // Unbalanced quotes: fall back to a plain comma split.
        Err(_) => line.split(',').map(|c| clean_cell(c).to_string()).collect(),
    }
}

/// Cell at `index`, or "" when the row is shorter.
#[inline]
pub fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or("")
}

/// Index of the first header equal (case-insensitively) to one of `names`.
pub fn find_column(headers: &[String], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        names.iter().any(|n| h == *n)
    })
}

/// Whether every cell of the row is blank.
pub fn is_blank_row(row: &[String]) -> bool {
    row.iter().all(|c| c.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234.5"), Some(1234.5));
        assert_eq!(parse_number("\" 42 \""), Some(42.0));
        assert_eq!(parse_number("-12"), Some(-12.0));
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("n/a"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn test_parse_int_truncates() {
        assert_eq!(parse_int("1,000.9"), Some(1000));
        assert_eq!(parse_int("-3.7"), Some(-3));
        assert_eq!(parse_int("x"), None);
    }

    #[test]
    fn test_parse_date_layouts() {
        assert_eq!(parse_date("2026-02-12"), Some(date(2026, 2, 12)));
        assert_eq!(parse_date("2026/02/12"), Some(date(2026, 2, 12)));
        assert_eq!(parse_date("12/02/2026"), Some(date(2026, 2, 12)));
        assert_eq!(parse_date("02/13/2026"), Some(date(2026, 2, 13)));
        assert_eq!(parse_date("20260212"), Some(date(2026, 2, 12)));
        assert_eq!(parse_date("12-Feb-2026"), Some(date(2026, 2, 12)));
        assert_eq!(parse_date("\"2026-02-12\""), Some(date(2026, 2, 12)));
        assert_eq!(parse_date("20261312"), None);
        assert_eq!(parse_date("soon"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_split_cells_respects_quotes() {
        let cells = split_cells("7203,\"TOYOTA MOTOR CORP\",\"1,000\", TSE ");
        assert_eq!(cells, vec!["7203", "TOYOTA MOTOR CORP", "1,000", "TSE"]);
        assert_eq!(parse_number(&cells[2]), Some(1000.0));
    }

    #[test]
    fn test_text_lines_trims_bom_and_blank_edges() {
        let lines = text_lines("\u{feff}\n\na,b\r\nc,d\n\n");
        assert_eq!(lines, vec!["a,b", "c,d"]);
    }

    #[test]
    fn test_find_column() {
        let headers: Vec<String> = ["Code", "Name", "Shares Amount", "Stock Price"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(find_column(&headers, &["shares amount", "shares"]), Some(2));
        assert_eq!(find_column(&headers, &["market value"]), None);
    }
}
