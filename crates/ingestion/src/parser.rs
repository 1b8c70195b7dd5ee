//! Provider dispatch.
//!
//! Structural failures never escape: they become "no record" plus a
//! `RecordDropped` event, so one bad file cannot affect its neighbours.
//! A panicking parser is contained the same way.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use pcf_core::{Error, PcfRecord, Provider, Result};
use tracing::debug;

use crate::ice::parse_ice;
use crate::report::{ParseContext, ParseOutcome, ParseReport};
use crate::solactive::parse_solactive;
use crate::spglobal::parse_spglobal;

fn parse_dialect(
    provider: Provider,
    text: &str,
    etf_code: &str,
    ctx: &ParseContext,
    report: &mut ParseReport,
) -> Result<PcfRecord> {
    if text.trim().is_empty() {
        return Err(Error::parse("empty disclosure"));
    }
    match provider {
        Provider::Ice => parse_ice(text, etf_code, ctx, report),
        Provider::Solactive => parse_solactive(text, etf_code, ctx, report),
        Provider::SpGlobal => parse_spglobal(text, etf_code, ctx, report),
        Provider::ExcelImport => Err(Error::parse(
            "excel_import rows come from the workbook importer, not text disclosures",
        )),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Run one parse, turning both errors and panics into a dropped record.
fn isolate<F>(report: &mut ParseReport, parse: F) -> Option<PcfRecord>
where
    F: FnOnce(&mut ParseReport) -> Result<PcfRecord>,
{
    match panic::catch_unwind(AssertUnwindSafe(|| parse(report))) {
        Ok(Ok(record)) => Some(record),
        Ok(Err(e)) => {
            report.dropped(e.to_string());
            None
        }
        Err(payload) => {
            report.dropped(format!("parser panicked: {}", panic_message(&*payload)));
            None
        }
    }
}

/// Parse one vendor disclosure into a canonical record.
pub fn parse_pcf(
    provider: Provider,
    text: &str,
    etf_code: &str,
    ctx: &ParseContext,
) -> ParseOutcome {
    let mut report = ParseReport::new(provider, etf_code);
    let record = isolate(&mut report, |report| {
        parse_dialect(provider, text, etf_code, ctx, report)
    });
    if let Some(record) = &record {
        debug!(
            %provider,
            etf_code,
            date = %record.date,
            legs = record.futures.len(),
            "parsed disclosure"
        );
    }
    ParseOutcome { record, report }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ctx() -> ParseContext {
        ParseContext::new(NaiveDate::from_ymd_opt(2026, 2, 13).unwrap())
    }

    #[test]
    fn test_dispatch_by_provider() {
        let ice = "h\n1306,X,100,10,2026-02-12\n\nCode,Name\n";
        let outcome = parse_pcf(Provider::Ice, ice, "1306", &ctx());
        assert!(outcome.record.is_some());
        assert!(!outcome.report.is_dropped());

        let solactive = "Fund Code,1306\nCash,100\n";
        let outcome = parse_pcf(Provider::Solactive, solactive, "1306", &ctx());
        assert_eq!(outcome.record.unwrap().cash_component, Some(100.0));
    }

    #[test]
    fn test_failures_become_dropped_records() {
        for provider in [Provider::Ice, Provider::Solactive, Provider::SpGlobal] {
            let outcome = parse_pcf(provider, "  \n ", "1306", &ctx());
            assert!(outcome.record.is_none());
            assert!(outcome.report.is_dropped());
        }

        let outcome = parse_pcf(Provider::SpGlobal, "one\ntwo", "1306", &ctx());
        assert!(outcome.record.is_none());

        let outcome = parse_pcf(Provider::ExcelImport, "a,b\nc,d", "1306", &ctx());
        assert!(outcome.report.is_dropped());
        assert_eq!(outcome.report.provider, Provider::ExcelImport);
    }

    #[test]
    fn test_panicking_parser_drops_record() {
        let mut report = ParseReport::new(Provider::Ice, "1306");
        let record = isolate(&mut report, |_| -> Result<PcfRecord> {
            panic!("index out of range")
        });
        assert!(record.is_none());
        assert!(report.is_dropped());
        assert!(matches!(
            report.events.last(),
            Some(crate::report::ParseEvent::RecordDropped { reason })
                if reason == "parser panicked: index out of range"
        ));
    }
}
