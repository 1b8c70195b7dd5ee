//! Category-level flow views.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use pcf_core::config::{CategoryConfig, ALL_CATEGORY};
use pcf_core::{CreationRedemption, EtfCategory, EtfMaster, Error, FlowType, Result};
use serde::{Deserialize, Serialize};

/// Member ETF codes of a reporting category.
///
/// Resolution order: configured code list, then the "all" pseudo-category
/// (every code in `present`), then master entries tagged with a matching
/// category. Anything else is an error.
pub fn resolve_codes<'a, I>(
    category: &str,
    categories: &CategoryConfig,
    masters: &[EtfMaster],
    present: I,
) -> Result<BTreeSet<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    if let Some(codes) = categories.codes(category) {
        return Ok(codes.iter().cloned().collect());
    }
    if category == ALL_CATEGORY {
        return Ok(present.into_iter().map(str::to_string).collect());
    }
    if let Ok(tag) = category.parse::<EtfCategory>() {
        return Ok(masters
            .iter()
            .filter(|m| m.category == tag)
            .map(|m| m.code.clone())
            .collect());
    }
    Err(Error::unknown_category(category))
}

/// One day's flows over a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyFlowAggregate {
    /// Trade date.
    pub date: NaiveDate,
    /// Σ positive flow amounts.
    pub total_creation: f64,
    /// Σ negative flow amounts (≤ 0).
    pub total_redemption: f64,
    /// total_creation + total_redemption.
    pub net_flow: f64,
    /// Running sum of net_flow.
    pub cumulative_flow: f64,
    /// Member ETFs with a creation that day.
    pub creation_count: u32,
    /// Member ETFs with a redemption that day.
    pub redemption_count: u32,
}

fn is_member(flow: &CreationRedemption, codes: &BTreeSet<String>) -> bool {
    codes.contains(&flow.etf_code)
}

/// Per-date totals over member ETFs, in date order.
pub fn aggregate_category(
    flows: &[CreationRedemption],
    codes: &BTreeSet<String>,
) -> Vec<DailyFlowAggregate> {
    let mut by_date: BTreeMap<NaiveDate, DailyFlowAggregate> = BTreeMap::new();

    for flow in flows.iter().filter(|f| is_member(f, codes)) {
        let day = by_date.entry(flow.trade_date).or_insert(DailyFlowAggregate {
            date: flow.trade_date,
            total_creation: 0.0,
            total_redemption: 0.0,
            net_flow: 0.0,
            cumulative_flow: 0.0,
            creation_count: 0,
            redemption_count: 0,
        });

        match flow.flow_amount {
            Some(amount) if amount > 0.0 => day.total_creation += amount,
            Some(amount) if amount < 0.0 => day.total_redemption += amount,
            _ => {}
        }
        match flow.flow_type {
            FlowType::Creation => day.creation_count += 1,
            FlowType::Redemption => day.redemption_count += 1,
            FlowType::None => {}
        }
    }

    let mut cumulative = 0.0;
    by_date
        .into_values()
        .map(|mut day| {
            day.net_flow = day.total_creation + day.total_redemption;
            cumulative += day.net_flow;
            day.cumulative_flow = cumulative;
            day
        })
        .collect()
}

/// Member flows, ordered by date then ETF code.
pub fn etf_breakdown(
    flows: &[CreationRedemption],
    codes: &BTreeSet<String>,
) -> Vec<CreationRedemption> {
    let mut out: Vec<CreationRedemption> = flows
        .iter()
        .filter(|f| is_member(f, codes))
        .cloned()
        .collect();
    out.sort_by(|a, b| (a.trade_date, &a.etf_code).cmp(&(b.trade_date, &b.etf_code)));
    out
}

/// One row of a same-day ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// 1-based position.
    pub rank: usize,
    /// ETF code.
    pub etf_code: String,
    /// Master display name, or the code when none is known.
    pub label: String,
    /// Signed flow amount; `None` ranks last.
    pub flow_amount: Option<f64>,
    /// Flow direction.
    pub flow_type: FlowType,
}

/// Member flows on `date`, sorted descending by signed flow amount.
/// Undefined amounts sort last; ties break by ETF code.
pub fn daily_ranking(
    flows: &[CreationRedemption],
    codes: &BTreeSet<String>,
    date: NaiveDate,
    masters: &[EtfMaster],
) -> Vec<RankingEntry> {
    let labels: BTreeMap<&str, &str> = masters
        .iter()
        .filter(|m| !m.name.is_empty())
        .map(|m| (m.code.as_str(), m.name.as_str()))
        .collect();

    let mut day: Vec<&CreationRedemption> = flows
        .iter()
        .filter(|f| f.trade_date == date && is_member(f, codes))
        .collect();
    day.sort_by(|a, b| {
        a.flow_amount
            .is_none()
            .cmp(&b.flow_amount.is_none())
            .then_with(|| {
                b.flow_amount
                    .map(OrderedFloat)
                    .cmp(&a.flow_amount.map(OrderedFloat))
            })
            .then_with(|| a.etf_code.cmp(&b.etf_code))
    });

    day.into_iter()
        .enumerate()
        .map(|(i, f)| RankingEntry {
            rank: i + 1,
            etf_code: f.etf_code.clone(),
            label: labels
                .get(f.etf_code.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| f.etf_code.clone()),
            flow_amount: f.flow_amount,
            flow_type: f.flow_type,
        })
        .collect()
}

/// One point of a single ETF's flow history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EtfHistoryPoint {
    /// Trade date of the observation.
    pub trade_date: NaiveDate,
    /// Change in units outstanding.
    pub shares_change: Option<i64>,
    /// Same-day per-unit NAV.
    pub nav_per_unit: Option<f64>,
    /// Signed flow amount.
    pub flow_amount: Option<f64>,
    /// Flow direction.
    pub flow_type: FlowType,
    /// Running sum of defined flow amounts.
    pub cumulative_flow: f64,
}

/// Date-ordered flow history of one ETF with cumulative flow.
pub fn etf_history(flows: &[CreationRedemption], etf_code: &str) -> Vec<EtfHistoryPoint> {
    let mut own: Vec<&CreationRedemption> =
        flows.iter().filter(|f| f.etf_code == etf_code).collect();
    own.sort_by_key(|f| f.trade_date);

    let mut cumulative = 0.0;
    own.into_iter()
        .map(|f| {
            cumulative += f.flow_amount.unwrap_or(0.0);
            EtfHistoryPoint {
                trade_date: f.trade_date,
                shares_change: f.shares_change,
                nav_per_unit: f.nav_per_unit,
                flow_amount: f.flow_amount,
                flow_type: f.flow_type,
                cumulative_flow: cumulative,
            }
        })
        .collect()
}
