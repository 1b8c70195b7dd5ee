//! Legacy workbook import.
//!
//! The historical archive is a workbook with one worksheet per ETF, twelve
//! columns per row, newest date first:
//!
//! | col | field |
//! |-----|-------|
//! | 0 | date |
//! | 1 | NAV |
//! | 2 | shares outstanding |
//! | 3 | cash component |
//! | 4 | equity count |
//! | 5 | equity market value |
//! | 6-8 | futures leg 1: name, quantity, market value |
//! | 9-11 | futures leg 2: name, quantity, market value |
//!
//! Reading the workbook file itself is left to the caller; this module
//! converts already-extracted cell values.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use pcf_core::config::CategoryConfig;
use pcf_core::{
    EtfCategory, EtfMaster, FuturesLegs, FuturesPosition, FuturesType, PcfRecord, Provider,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::futures::normalize_futures;
use crate::primitives::{parse_date, parse_number};
use crate::report::ParseReport;

/// Worksheets that hold no ETF data.
const SPECIAL_SHEETS: &[&str] = &["目次_TOP", "目次_BOTTOM", "グラフ", "Sheet1", "エラーログ"];
const CHART_SHEET_PREFIX: &str = "Chart_";

/// Header labels that leak into the futures name columns.
const LEG_HEADER_LABELS: &[&str] = &["先物の種類1", "先物の種類2"];

/// Column triples (name, quantity, market value) of the two futures legs.
const LEG_COLUMNS: [(usize, usize, usize); 2] = [(6, 7, 8), (9, 10, 11)];

static ETF_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z]{3,6}$").expect("valid ETF code pattern"));

/// One worksheet cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(s) => Some(s.trim().to_string()),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Date(d) => Some(d.to_string()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => parse_number(s),
            _ => None,
        }
    }

    fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|v| v.trunc() as i64)
    }

    /// Dates arrive as typed dates, text, or spreadsheet serial numbers.
    fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::Date(d) => Some(*d),
            Cell::Text(s) => parse_date(s),
            Cell::Number(n) => excel_serial_date(*n),
            Cell::Empty => None,
        }
    }
}

/// Convert a spreadsheet serial day number (1900 date system).
fn excel_serial_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(Days::new(serial.trunc() as u64))
}

/// One worksheet: its name and rows of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// Everything imported from one workbook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkbookImport {
    /// Converted rows of every ETF worksheet.
    pub records: Vec<PcfRecord>,
    /// One synthesised master entry per worksheet that produced records.
    pub masters: Vec<EtfMaster>,
    /// Special or unrecognised worksheet names.
    pub skipped_sheets: Vec<String>,
    /// One report per ETF worksheet: unknown futures names and dropped rows.
    pub reports: Vec<ParseReport>,
}

/// Whether a worksheet holds no ETF data.
pub fn is_special_sheet(name: &str) -> bool {
    SPECIAL_SHEETS.contains(&name) || name.starts_with(CHART_SHEET_PREFIX)
}

/// ETF code from a worksheet name: "1306", "380A", or "1306_TOPIX" (code
/// before the first underscore).
pub fn extract_etf_code(sheet_name: &str) -> Option<String> {
    let candidate = sheet_name.split('_').next().unwrap_or_default().trim();
    ETF_CODE.is_match(candidate).then(|| candidate.to_string())
}

fn is_empty_row(row: &[Cell]) -> bool {
    row.iter().all(|c| *c == Cell::Empty)
}

fn is_header_row(row: &[Cell]) -> bool {
    match row.first() {
        Some(Cell::Text(s)) => s.contains("日付") || s.to_lowercase().contains("date"),
        _ => false,
    }
}

fn read_leg(
    row: &[Cell],
    (name_col, qty_col, mv_col): (usize, usize, usize),
) -> Option<FuturesPosition> {
    let name = row.get(name_col)?.as_text()?;
    if name.is_empty() || LEG_HEADER_LABELS.contains(&name.as_str()) {
        return None;
    }
    let quantity = row.get(qty_col).and_then(Cell::as_i64).unwrap_or(0);
    let market_value = row.get(mv_col).and_then(Cell::as_f64).unwrap_or(0.0);
    Some(normalize_futures(&name, quantity, market_value))
}

/// Convert one 12-column worksheet row.
///
/// Rows without a readable date yield nothing and are reported as dropped;
/// unknown futures names are reported and kept as UNKNOWN.
pub fn convert_row(
    etf_code: &str,
    row: &[Cell],
    report: &mut ParseReport,
) -> Option<PcfRecord> {
    let Some(date) = row.first().and_then(Cell::as_date) else {
        let raw = row.first().and_then(Cell::as_text).unwrap_or_default();
        report.dropped(format!("unreadable row date '{raw}'"));
        return None;
    };
    let number = |idx: usize| row.get(idx).and_then(Cell::as_f64);
    let integer = |idx: usize| row.get(idx).and_then(Cell::as_i64);

    let mut record = PcfRecord::empty(etf_code, date);
    record.nav = number(1);
    record.shares_outstanding = integer(2);
    record.cash_component = number(3);
    record.equity_count = integer(4);
    record.equity_market_value = number(5);

    let (futures, _) =
        FuturesLegs::capped(LEG_COLUMNS.iter().filter_map(|cols| read_leg(row, *cols)));
    for leg in &futures {
        if leg.futures_type == FuturesType::Unknown {
            report.unknown_futures(&leg.raw_name);
        }
    }
    record.futures = futures;
    Some(record)
}

/// Convert every data row of one worksheet. A leading header row and fully
/// empty rows are skipped without a report.
pub fn import_sheet(
    etf_code: &str,
    rows: &[Vec<Cell>],
    report: &mut ParseReport,
) -> Vec<PcfRecord> {
    let body = match rows.first() {
        Some(first) if is_header_row(first) => &rows[1..],
        _ => rows,
    };
    body.iter()
        .filter(|row| !is_empty_row(row))
        .filter_map(|row| convert_row(etf_code, row, report))
        .collect()
}

/// Category tag: configured code lists first, then the futures families the
/// fund actually trades.
pub fn classify_etf(
    code: &str,
    futures_types: &BTreeSet<FuturesType>,
    categories: &CategoryConfig,
) -> EtfCategory {
    let listed = |set: &str| {
        categories
            .codes(set)
            .is_some_and(|codes| codes.iter().any(|c| c == code))
    };
    if listed("topix_all") {
        return EtfCategory::Topix;
    }
    if listed("nikkei225_all") {
        return EtfCategory::Nikkei225;
    }
    if futures_types.iter().any(|t| t.is_topix_family()) {
        return EtfCategory::Topix;
    }
    if futures_types.iter().any(|t| t.is_nk225_family()) {
        return EtfCategory::Nikkei225;
    }
    EtfCategory::Other
}

/// Import every ETF worksheet, synthesising one master entry per sheet that
/// produced records.
pub fn import_workbook(sheets: &[Sheet], categories: &CategoryConfig) -> WorkbookImport {
    let mut import = WorkbookImport::default();

    for sheet in sheets {
        if is_special_sheet(&sheet.name) {
            import.skipped_sheets.push(sheet.name.clone());
            continue;
        }
        let Some(code) = extract_etf_code(&sheet.name) else {
            warn!(sheet = %sheet.name, "no ETF code in sheet name");
            import.skipped_sheets.push(sheet.name.clone());
            continue;
        };

        let mut report = ParseReport::new(Provider::ExcelImport, code.as_str());
        let records = import_sheet(&code, &sheet.rows, &mut report);
        import.reports.push(report);
        if records.is_empty() {
            continue;
        }

        let futures_types: BTreeSet<FuturesType> = records
            .iter()
            .flat_map(|r| r.futures.iter().map(|leg| leg.futures_type))
            .collect();

        let mut master = EtfMaster::new(code.as_str(), Provider::ExcelImport);
        master.name = sheet.name.clone();
        master.category = classify_etf(&code, &futures_types, categories);
        master.has_futures = !futures_types.is_empty();

        import.masters.push(master);
        import.records.extend(records);
    }

    info!(
        etfs = import.masters.len(),
        records = import.records.len(),
        skipped = import.skipped_sheets.len(),
        "workbook import finished"
    );
    import
}
