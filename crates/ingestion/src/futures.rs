//! Futures instrument name normalization.
//!
//! Vendors disclose futures legs under dozens of free-text spellings
//! ("TOPIX 2603", "NK225 FUTURES MAR.2026", "NIKKEI225FUTUERS202603", ...).
//! This module maps each name to a canonical [`FuturesType`] and a "YYMM"
//! contract month.

use once_cell::sync::Lazy;
use pcf_core::{FuturesPosition, FuturesType};
use regex::Regex;

const MONTHS: &str = "JAN|FEB|MAR|APR|MAY|JUN|JUL|AUG|SEP|OCT|NOV|DEC";

/// Ordered classification rules. First match wins.
///
/// Order is load-bearing: the bare index patterns (`NK225`, `TOPIX`) match
/// every variant name, so options come before micro, micro before mini,
/// and mini/sector variants before the plain index.
static FUTURES_RULES: Lazy<Vec<(Regex, FuturesType)>> = Lazy::new(|| {
    [
        // NK225 options
        (r"NK225\s*\.OP\.CALL", FuturesType::Nk225OptionCall),
        (r"NK225\s*\.OP\.PUT", FuturesType::Nk225OptionPut),
        // NK225 micro
        (r"(?:NK225|NIKKEI\s*225?)\s*MICRO", FuturesType::Nk225Micro),
        // NK225 mini
        (r"225\s*-?\s*MINI", FuturesType::Nk225Mini),
        (r"NIKKEI\s*225?\s*MINI", FuturesType::Nk225Mini),
        (r"NK225\s*MINI", FuturesType::Nk225Mini),
        (r"MINI\s*-?\s*(?:NK|NIKKEI)\s*225", FuturesType::Nk225Mini),
        // NK225 large
        (r"NK225", FuturesType::Nk225),
        (r"NIKKEI\s*225", FuturesType::Nk225),
        // mini TOPIX
        (r"MINI\s*-?\s*(?:TOPIX|TPX)", FuturesType::MiniTopix),
        (r"TOPIX\s*(?:INDX\s*)?MINI", FuturesType::MiniTopix),
        // TOPIX sub-indices, ahead of plain TOPIX
        (r"TOPIX\s*BANKS?\s*(?:INDEX)?", FuturesType::TopixBanks),
        (r"TOPIX\s*CORE\s*30", FuturesType::TopixCore30),
        // TOPIX large
        (r"TOPIX", FuturesType::Topix),
        (
            r"(?:JPX\s*-?\s*NIKKEI\s*(?:INDEX\s*)?400|NK400|JPXNIKKEI\s*400)",
            FuturesType::Jpx400,
        ),
        (r"JPX\s*PRIME\s*150", FuturesType::JpxPrime150),
        (r"(?:TSE\s*-?\s*REIT|TSEREIT|TOPIX\s*REIT)", FuturesType::TseReit),
        (r"TSE\s*GROWTH", FuturesType::TseGrowth),
        (r"10\s*YEAR\s*JGB", FuturesType::Jgb10y),
    ]
    .into_iter()
    .map(|(pattern, futures_type)| {
        let regex = Regex::new(&format!("(?i){pattern}")).expect("valid futures rule");
        (regex, futures_type)
    })
    .collect()
});

/// Characters left behind by mis-decoded Shift-JIS text.
static MOJIBAKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[・ｽ]+").expect("valid pattern"));

/// ".FEB.2026." option month.
static RE_OPTION_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\.({MONTHS})\.([0-9]{{4}})\.")).expect("valid pattern")
});

/// "MAR.2026" or "MAR 2026".
static RE_MMM_YYYY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTHS})[.\s]([0-9]{{4}})\b")).expect("valid pattern")
});

/// "MAR 26".
static RE_MMM_YY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTHS})\s+([0-9]{{2}})\b")).expect("valid pattern")
});

/// Maximal digit runs, used for the bare 6-digit form.
static RE_DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("valid pattern"));

/// Standalone 4-digit token.
static RE_YYMM: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-9]{4})\b").expect("valid pattern"));

/// Two-digit month number for an English month abbreviation.
fn month_number(abbr: &str) -> Option<&'static str> {
    let number = match abbr.to_ascii_uppercase().as_str() {
        "JAN" => "01",
        "FEB" => "02",
        "MAR" => "03",
        "APR" => "04",
        "MAY" => "05",
        "JUN" => "06",
        "JUL" => "07",
        "AUG" => "08",
        "SEP" => "09",
        "OCT" => "10",
        "NOV" => "11",
        "DEC" => "12",
        _ => return None,
    };
    Some(number)
}

/// YYMM from a month abbreviation and a 2- or 4-digit year capture.
fn month_and_year(regex: &Regex, raw_name: &str) -> Option<String> {
    let caps = regex.captures(raw_name)?;
    let month = month_number(caps.get(1)?.as_str())?;
    let year = caps.get(2)?.as_str();
    let yy = &year[year.len() - 2..];
    Some(format!("{yy}{month}"))
}

/// Extract the contract month as "YYMM".
///
/// Patterns are tried in a fixed order, first match wins:
/// 1. option notation ".MMM.YYYY."
/// 2. "MMM.YYYY" / "MMM YYYY"
/// 3. "MMM YY"
/// 4. bare "20YYMM" not adjacent to other digits
/// 5. bare "YYMM" with YY in 20..=35 and MM in 1..=12, last because it is
///    the easiest to hit by accident
pub fn extract_contract_month(raw_name: &str) -> Option<String> {
    if let Some(ym) = month_and_year(&RE_OPTION_MONTH, raw_name) {
        return Some(ym);
    }
    if let Some(ym) = month_and_year(&RE_MMM_YYYY, raw_name) {
        return Some(ym);
    }
    if let Some(ym) = month_and_year(&RE_MMM_YY, raw_name) {
        return Some(ym);
    }

    if let Some(run) = RE_DIGIT_RUN
        .find_iter(raw_name)
        .map(|m| m.as_str())
        .find(|run| run.len() == 6 && run.starts_with("20"))
    {
        return Some(run[2..].to_string());
    }

    RE_YYMM
        .captures_iter(raw_name)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .find(|candidate| {
            let yy: u32 = candidate[..2].parse().unwrap_or(0);
            let mm: u32 = candidate[2..].parse().unwrap_or(0);
            (20..=35).contains(&yy) && (1..=12).contains(&mm)
        })
        .map(str::to_string)
}

/// Map a raw futures name to its canonical type. Unmatched names are
/// [`FuturesType::Unknown`].
pub fn classify_futures_type(raw_name: &str) -> FuturesType {
    let cleaned = MOJIBAKE.replace_all(raw_name, "");
    let cleaned = cleaned.trim();

    FUTURES_RULES
        .iter()
        .find(|(pattern, _)| pattern.is_match(cleaned))
        .map(|(_, futures_type)| *futures_type)
        .unwrap_or(FuturesType::Unknown)
}

/// Normalize one futures leg.
///
/// Never fails: unknown names become [`FuturesType::Unknown`] with
/// multiplier 1. Callers record them for manual triage.
pub fn normalize_futures(raw_name: &str, quantity: i64, market_value: f64) -> FuturesPosition {
    let raw_name = raw_name.trim();
    if raw_name.is_empty() {
        return FuturesPosition::new("", FuturesType::Unknown, None, quantity, market_value);
    }

    let futures_type = classify_futures_type(raw_name);
    FuturesPosition::new(
        raw_name,
        futures_type,
        extract_contract_month(raw_name),
        quantity,
        market_value,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_precedes_index() {
        let position = normalize_futures("NK225.OP.CALL MAR.2026", 5, 1000.0);
        assert_eq!(position.futures_type, FuturesType::Nk225OptionCall);
        assert_eq!(position.contract_month.as_deref(), Some("2603"));
        assert_eq!(position.multiplier, 1_000);

        assert_eq!(
            classify_futures_type("NK225.OP.PUT.FEB.2026.36000"),
            FuturesType::Nk225OptionPut
        );
    }

    #[test]
    fn test_micro_before_mini_before_large() {
        assert_eq!(classify_futures_type("NIKKEI 225 MICRO MAR 26"), FuturesType::Nk225Micro);
        assert_eq!(classify_futures_type("NK225 MINI 2603"), FuturesType::Nk225Mini);
        assert_eq!(classify_futures_type("MINI-NIKKEI 225 2603"), FuturesType::Nk225Mini);
        assert_eq!(classify_futures_type("NIKKEI 225 FUT MAR26"), FuturesType::Nk225);
        assert_eq!(classify_futures_type("NK225 2603"), FuturesType::Nk225);
    }

    #[test]
    fn test_topix_variants() {
        assert_eq!(classify_futures_type("MINI TOPIX 2603"), FuturesType::MiniTopix);
        assert_eq!(classify_futures_type("TOPIX INDX MINI MAR 26"), FuturesType::MiniTopix);
        assert_eq!(classify_futures_type("TOPIX BANKS INDEX 2603"), FuturesType::TopixBanks);
        assert_eq!(classify_futures_type("TOPIX CORE30 2603"), FuturesType::TopixCore30);
        assert_eq!(classify_futures_type("topix 2603"), FuturesType::Topix);
    }

    #[test]
    fn test_other_indices() {
        assert_eq!(classify_futures_type("JPX-NIKKEI 400 FUT"), FuturesType::Jpx400);
        assert_eq!(classify_futures_type("JPX PRIME 150 2603"), FuturesType::JpxPrime150);
        assert_eq!(classify_futures_type("TSE REIT FUTR 2603"), FuturesType::TseReit);
        assert_eq!(classify_futures_type("TSE GROWTH 250 2603"), FuturesType::TseGrowth);
        assert_eq!(classify_futures_type("10 YEAR JGB MAR 26"), FuturesType::Jgb10y);
    }

    #[test]
    fn test_mojibake_is_stripped() {
        assert_eq!(classify_futures_type("・ｽTOPIX 2603"), FuturesType::Topix);
    }

    #[test]
    fn test_unknown_falls_back() {
        let position = normalize_futures("S&P 500 EMINI MAR 26", -2, 5.0);
        assert_eq!(position.futures_type, FuturesType::Unknown);
        assert_eq!(position.multiplier, 1);
        assert_eq!(position.quantity, -2);
        assert_eq!(position.contract_month.as_deref(), Some("2603"));
    }

    #[test]
    fn test_empty_name() {
        let position = normalize_futures("   ", 3, 0.0);
        assert_eq!(position.futures_type, FuturesType::Unknown);
        assert_eq!(position.contract_month, None);
        assert_eq!(position.raw_name, "");
    }

    #[test]
    fn test_contract_month_forms() {
        assert_eq!(extract_contract_month("202603").as_deref(), Some("2603"));
        assert_eq!(extract_contract_month("MAR.2026").as_deref(), Some("2603"));
        assert_eq!(extract_contract_month("MAR 2026").as_deref(), Some("2603"));
        assert_eq!(extract_contract_month("MAR 26").as_deref(), Some("2603"));
        assert_eq!(extract_contract_month("2603").as_deref(), Some("2603"));
        assert_eq!(extract_contract_month("NK225.OP.PUT.FEB.2026.36000").as_deref(), Some("2602"));
    }

    #[test]
    fn test_six_digit_form_needs_digit_boundaries() {
        assert_eq!(
            extract_contract_month("NIKKEI225FUTUERS202603").as_deref(),
            Some("2603")
        );
        // Embedded in a longer product code: not a contract month.
        assert_eq!(extract_contract_month("ID 12026031"), None);
    }

    #[test]
    fn test_four_digit_form_is_bounded() {
        assert_eq!(extract_contract_month("TOPIX 1999"), None);
        assert_eq!(extract_contract_month("TOPIX 2613"), None);
        assert_eq!(extract_contract_month("TOPIX 3612"), None);
        assert_eq!(extract_contract_month("TOPIX 1999 2609").as_deref(), Some("2609"));
        assert_eq!(extract_contract_month("NK225"), None);
    }
}
