//! Core data types for the PCF pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Maximum number of futures legs retained per record.
pub const MAX_FUTURES_LEGS: usize = 2;

/// Compute per-unit NAV.
///
/// Defined only when both inputs are present, shares outstanding is positive
/// and the quotient is finite.
#[inline]
pub fn per_unit_nav(nav: Option<f64>, shares_outstanding: Option<i64>) -> Option<f64> {
    let nav = nav?;
    let shares = shares_outstanding?;
    if shares <= 0 {
        return None;
    }
    let value = nav / shares as f64;
    value.is_finite().then_some(value)
}

/// Vendor that published a PCF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// ICE Data Services (fixed-position layout).
    Ice,
    /// Solactive AG (labelled key/value layout).
    Solactive,
    /// S&P Global (fixed-position layout with market value column).
    #[serde(rename = "spglobal")]
    SpGlobal,
    /// Rows migrated from the legacy workbook.
    ExcelImport,
}

impl Provider {
    /// Stable tag used in storage and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Ice => "ice",
            Provider::Solactive => "solactive",
            Provider::SpGlobal => "spglobal",
            Provider::ExcelImport => "excel_import",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ice" => Ok(Provider::Ice),
            "solactive" => Ok(Provider::Solactive),
            "spglobal" => Ok(Provider::SpGlobal),
            "excel_import" => Ok(Provider::ExcelImport),
            other => Err(Error::data(format!("unknown provider '{other}'"))),
        }
    }
}

/// Classification tag stored on the ETF master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EtfCategory {
    /// Tracks TOPIX (plain, leveraged or inverse).
    Topix,
    /// Tracks the Nikkei 225 (plain, leveraged or inverse).
    Nikkei225,
    /// Everything else.
    #[default]
    Other,
}

impl EtfCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            EtfCategory::Topix => "topix",
            EtfCategory::Nikkei225 => "nikkei225",
            EtfCategory::Other => "other",
        }
    }
}

impl FromStr for EtfCategory {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "topix" => Ok(EtfCategory::Topix),
            "nikkei225" => Ok(EtfCategory::Nikkei225),
            "other" | "" => Ok(EtfCategory::Other),
            other => Err(Error::data(format!("unknown ETF category '{other}'"))),
        }
    }
}

/// Identity and classification of one fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfMaster {
    /// Exchange ticker (e.g. "1306", "380A"). Unique key.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Provider the fund's PCF is fetched from.
    pub provider: Provider,
    /// Reporting category.
    pub category: EtfCategory,
    /// Whether the fund carries a futures overlay.
    pub has_futures: bool,
}

impl EtfMaster {
    /// Create a master entry with default classification.
    pub fn new(code: impl Into<String>, provider: Provider) -> Self {
        Self {
            code: code.into(),
            name: String::new(),
            provider,
            category: EtfCategory::Other,
            has_futures: false,
        }
    }
}

/// Canonical futures instrument type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FuturesType {
    Topix,
    MiniTopix,
    #[serde(rename = "NK225")]
    Nk225,
    #[serde(rename = "NK225_MINI")]
    Nk225Mini,
    #[serde(rename = "NK225_MICRO")]
    Nk225Micro,
    #[serde(rename = "JPX400")]
    Jpx400,
    #[serde(rename = "TSEREIT")]
    TseReit,
    #[serde(rename = "JGB10Y")]
    Jgb10y,
    TopixBanks,
    #[serde(rename = "TOPIX_CORE30")]
    TopixCore30,
    TseGrowth,
    #[serde(rename = "JPX_PRIME150")]
    JpxPrime150,
    #[serde(rename = "NK225_OPTION_CALL")]
    Nk225OptionCall,
    #[serde(rename = "NK225_OPTION_PUT")]
    Nk225OptionPut,
    /// Fallback for names no rule recognises.
    Unknown,
}

impl FuturesType {
    /// Every canonical type, fallback last.
    pub const ALL: [FuturesType; 15] = [
        FuturesType::Topix,
        FuturesType::MiniTopix,
        FuturesType::Nk225,
        FuturesType::Nk225Mini,
        FuturesType::Nk225Micro,
        FuturesType::Jpx400,
        FuturesType::TseReit,
        FuturesType::Jgb10y,
        FuturesType::TopixBanks,
        FuturesType::TopixCore30,
        FuturesType::TseGrowth,
        FuturesType::JpxPrime150,
        FuturesType::Nk225OptionCall,
        FuturesType::Nk225OptionPut,
        FuturesType::Unknown,
    ];

    /// Storage tag.
    pub fn as_str(self) -> &'static str {
        match self {
            FuturesType::Topix => "TOPIX",
            FuturesType::MiniTopix => "MINI_TOPIX",
            FuturesType::Nk225 => "NK225",
            FuturesType::Nk225Mini => "NK225_MINI",
            FuturesType::Nk225Micro => "NK225_MICRO",
            FuturesType::Jpx400 => "JPX400",
            FuturesType::TseReit => "TSEREIT",
            FuturesType::Jgb10y => "JGB10Y",
            FuturesType::TopixBanks => "TOPIX_BANKS",
            FuturesType::TopixCore30 => "TOPIX_CORE30",
            FuturesType::TseGrowth => "TSE_GROWTH",
            FuturesType::JpxPrime150 => "JPX_PRIME150",
            FuturesType::Nk225OptionCall => "NK225_OPTION_CALL",
            FuturesType::Nk225OptionPut => "NK225_OPTION_PUT",
            FuturesType::Unknown => "UNKNOWN",
        }
    }

    /// Contract multiplier for this type.
    pub fn multiplier(self) -> i64 {
        match self {
            FuturesType::Topix => 10_000,
            FuturesType::MiniTopix => 1_000,
            FuturesType::Nk225 => 1_000,
            FuturesType::Nk225Mini => 100,
            FuturesType::Nk225Micro => 10,
            FuturesType::Jpx400 => 100,
            FuturesType::TseReit => 1_000,
            FuturesType::Jgb10y => 10_000,
            FuturesType::TopixBanks => 1_000,
            FuturesType::TopixCore30 => 10_000,
            FuturesType::TseGrowth => 1_000,
            FuturesType::JpxPrime150 => 1_000,
            FuturesType::Nk225OptionCall => 1_000,
            FuturesType::Nk225OptionPut => 1_000,
            FuturesType::Unknown => 1,
        }
    }

    /// TOPIX-linked instruments.
    pub fn is_topix_family(self) -> bool {
        matches!(
            self,
            FuturesType::Topix
                | FuturesType::MiniTopix
                | FuturesType::TopixBanks
                | FuturesType::TopixCore30
        )
    }

    /// Nikkei 225-linked instruments, options included.
    pub fn is_nk225_family(self) -> bool {
        matches!(
            self,
            FuturesType::Nk225
                | FuturesType::Nk225Mini
                | FuturesType::Nk225Micro
                | FuturesType::Nk225OptionCall
                | FuturesType::Nk225OptionPut
        )
    }
}

impl fmt::Display for FuturesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuturesType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        FuturesType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| Error::data(format!("unknown futures type '{tag}'")))
    }
}

/// One normalized futures leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesPosition {
    /// Vendor name as disclosed, kept for audit.
    pub raw_name: String,
    /// Canonical type.
    pub futures_type: FuturesType,
    /// Contract month as "YYMM".
    pub contract_month: Option<String>,
    /// Signed contract count (positive = long).
    pub quantity: i64,
    /// Market value as reported by the vendor.
    pub market_value: f64,
    /// Contract multiplier, always taken from the canonical type.
    pub multiplier: i64,
}

impl FuturesPosition {
    /// Build a position, deriving the multiplier from the type.
    pub fn new(
        raw_name: impl Into<String>,
        futures_type: FuturesType,
        contract_month: Option<String>,
        quantity: i64,
        market_value: f64,
    ) -> Self {
        Self {
            raw_name: raw_name.into(),
            futures_type,
            contract_month,
            quantity,
            market_value,
            multiplier: futures_type.multiplier(),
        }
    }
}

/// Bounded list of futures legs, at most [`MAX_FUTURES_LEGS`] entries.
///
/// Always built fresh per record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<FuturesPosition>", into = "Vec<FuturesPosition>")]
pub struct FuturesLegs(Vec<FuturesPosition>);

impl FuturesLegs {
    /// Create an empty list.
    pub fn new() -> Self {
        Self(Vec::with_capacity(MAX_FUTURES_LEGS))
    }

    /// Append a leg. Hands the position back when the list is full.
    pub fn push(&mut self, position: FuturesPosition) -> std::result::Result<(), FuturesPosition> {
        if self.is_full() {
            return Err(position);
        }
        self.0.push(position);
        Ok(())
    }

    /// Fill from an iterator, returning the list and the number of legs dropped by the cap.
    pub fn capped<I>(positions: I) -> (Self, usize)
    where
        I: IntoIterator<Item = FuturesPosition>,
    {
        let mut legs = Self::new();
        let mut dropped = 0;
        for position in positions {
            if legs.push(position).is_err() {
                dropped += 1;
            }
        }
        (legs, dropped)
    }

    pub fn is_full(&self) -> bool {
        self.0.len() >= MAX_FUTURES_LEGS
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&FuturesPosition> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FuturesPosition> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[FuturesPosition] {
        &self.0
    }
}

impl TryFrom<Vec<FuturesPosition>> for FuturesLegs {
    type Error = Error;

    fn try_from(positions: Vec<FuturesPosition>) -> Result<Self, Self::Error> {
        if positions.len() > MAX_FUTURES_LEGS {
            return Err(Error::data(format!(
                "{} futures legs exceed the cap of {MAX_FUTURES_LEGS}",
                positions.len()
            )));
        }
        Ok(Self(positions))
    }
}

impl From<FuturesLegs> for Vec<FuturesPosition> {
    fn from(legs: FuturesLegs) -> Self {
        legs.0
    }
}

impl<'a> IntoIterator for &'a FuturesLegs {
    type Item = &'a FuturesPosition;
    type IntoIter = std::slice::Iter<'a, FuturesPosition>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// One ETF's disclosure for one calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcfRecord {
    /// ETF code.
    pub etf_code: String,
    /// Disclosure date.
    pub date: NaiveDate,
    /// Fund net asset value.
    pub nav: Option<f64>,
    /// Units outstanding.
    pub shares_outstanding: Option<i64>,
    /// Cash held by the fund.
    pub cash_component: Option<f64>,
    /// Total shares held across equity holdings.
    pub equity_count: Option<i64>,
    /// Total market value of equity holdings.
    pub equity_market_value: Option<f64>,
    /// Futures legs (at most two).
    pub futures: FuturesLegs,
}

impl PcfRecord {
    /// Create a record with every numeric field absent.
    pub fn empty(etf_code: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            etf_code: etf_code.into(),
            date,
            nav: None,
            shares_outstanding: None,
            cash_component: None,
            equity_count: None,
            equity_market_value: None,
            futures: FuturesLegs::new(),
        }
    }

    /// NAV per unit outstanding.
    #[inline]
    pub fn nav_per_unit(&self) -> Option<f64> {
        per_unit_nav(self.nav, self.shares_outstanding)
    }

    /// Storage key.
    pub fn key(&self) -> (String, NaiveDate) {
        (self.etf_code.clone(), self.date)
    }
}

/// Direction of a primary-market flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    /// Shares outstanding increased.
    Creation,
    /// Shares outstanding decreased.
    Redemption,
    /// No change, or the change is undefined.
    None,
}

impl FlowType {
    /// Classify a share delta.
    pub fn from_delta(delta: Option<i64>) -> Self {
        match delta {
            Some(d) if d > 0 => FlowType::Creation,
            Some(d) if d < 0 => FlowType::Redemption,
            _ => FlowType::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FlowType::Creation => "creation",
            FlowType::Redemption => "redemption",
            FlowType::None => "none",
        }
    }
}

/// One derived daily creation/redemption observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreationRedemption {
    /// ETF code.
    pub etf_code: String,
    /// Trade date (the later of the two compared records).
    pub trade_date: NaiveDate,
    /// Units outstanding on the trade date.
    pub shares_outstanding: Option<i64>,
    /// Change in units outstanding versus the previous record.
    pub shares_change: Option<i64>,
    /// Same-day per-unit NAV.
    pub nav_per_unit: Option<f64>,
    /// Previous record's per-unit NAV, the settlement price.
    pub prev_nav_per_unit: Option<f64>,
    /// shares_change x prev_nav_per_unit.
    pub flow_amount: Option<f64>,
    /// Flow direction.
    pub flow_type: FlowType,
}
