//! Parallel parsing of many disclosures.

use chrono::NaiveDate;
use pcf_core::config::RuntimeConfig;
use pcf_core::{PcfRecord, Provider, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::parser::parse_pcf;
use crate::report::{ParseContext, ParseOutcome, ParseReport};

/// One fetched disclosure awaiting parsing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDisclosure {
    /// Vendor, selecting the dialect.
    pub provider: Provider,
    /// ETF the file belongs to.
    pub etf_code: String,
    /// Date the disclosure was fetched for; the fallback when the file's own
    /// date is unreadable.
    pub date: NaiveDate,
    /// Raw CSV text.
    pub text: String,
}

/// Results of a batch, in input order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Records of the inputs that parsed.
    pub records: Vec<PcfRecord>,
    /// One report per input.
    pub reports: Vec<ParseReport>,
    /// Inputs that produced no record.
    pub failed: usize,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.records.len()
    }
}

/// Parse every disclosure on a private worker pool.
///
/// Files are independent: a failure in one never affects another. Only a
/// pool construction failure is returned as an error.
pub fn parse_batch(inputs: &[RawDisclosure], runtime: &RuntimeConfig) -> Result<BatchOutcome> {
    let pool = runtime.build_pool()?;

    let outcomes: Vec<ParseOutcome> = pool.install(|| {
        inputs
            .par_iter()
            .map(|raw| {
                let ctx = ParseContext::new(raw.date);
                parse_pcf(raw.provider, &raw.text, &raw.etf_code, &ctx)
            })
            .collect()
    });

    let mut batch = BatchOutcome::default();
    for outcome in outcomes {
        match outcome.record {
            Some(record) => batch.records.push(record),
            None => batch.failed += 1,
        }
        batch.reports.push(outcome.report);
    }

    info!(
        files = inputs.len(),
        parsed = batch.succeeded(),
        failed = batch.failed,
        workers = pool.current_num_threads(),
        "batch parse finished"
    );
    Ok(batch)
}
