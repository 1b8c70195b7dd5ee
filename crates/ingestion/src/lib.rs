//! Vendor PCF ingestion and normalization.
//!
//! This crate handles:
//! - Equity/futures row classification
//! - Futures name normalization (canonical type, contract month)
//! - Parsing of the ICE, Solactive and S&P Global CSV dialects
//! - Per-stock holdings extraction
//! - Legacy workbook row import
//! - Parallel batch parsing

pub mod batch;
pub mod classifier;
pub mod futures;
pub mod holdings;
pub mod ice;
pub mod legacy;
pub mod parser;
pub mod primitives;
pub mod report;
pub mod solactive;
pub mod spglobal;

pub use batch::{parse_batch, BatchOutcome, RawDisclosure};
pub use classifier::{classify_row, is_futures_row, RowKind};
pub use futures::{classify_futures_type, extract_contract_month, normalize_futures};
pub use holdings::{extract_holdings, EquityHolding};
pub use legacy::{import_workbook, Cell, Sheet, WorkbookImport};
pub use parser::parse_pcf;
pub use report::{ParseContext, ParseEvent, ParseOutcome, ParseReport};
