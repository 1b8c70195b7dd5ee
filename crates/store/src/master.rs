//! ETF master table.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use pcf_core::{EtfCategory, EtfMaster, Provider, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::timeseries::validate_columns;

/// Only the code is mandatory on load.
const REQUIRED_COLUMNS: &[&str] = &["code"];

#[derive(Debug, Serialize, Deserialize)]
struct MasterRow {
    code: String,
    name: Option<String>,
    provider: Option<Provider>,
    category: Option<EtfCategory>,
    has_futures: Option<bool>,
}

impl From<&EtfMaster> for MasterRow {
    fn from(master: &EtfMaster) -> Self {
        Self {
            code: master.code.clone(),
            name: Some(master.name.clone()),
            provider: Some(master.provider),
            category: Some(master.category),
            has_futures: Some(master.has_futures),
        }
    }
}

impl From<MasterRow> for EtfMaster {
    fn from(row: MasterRow) -> Self {
        let mut master = EtfMaster::new(row.code, row.provider.unwrap_or(Provider::ExcelImport));
        master.name = row.name.unwrap_or_default();
        master.category = row.category.unwrap_or_default();
        master.has_futures = row.has_futures.unwrap_or(false);
        master
    }
}

/// Master entries keyed by ETF code. Entries are never removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EtfMasterTable {
    entries: BTreeMap<String, EtfMaster>,
}

impl EtfMasterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace by code.
    pub fn upsert(&mut self, master: EtfMaster) {
        self.entries.insert(master.code.clone(), master);
    }

    pub fn upsert_all<I>(&mut self, masters: I)
    where
        I: IntoIterator<Item = EtfMaster>,
    {
        for master in masters {
            self.upsert(master);
        }
    }

    pub fn get(&self, code: &str) -> Option<&EtfMaster> {
        self.entries.get(code)
    }

    /// Display label: the name when one is known, otherwise the code.
    pub fn label<'a>(&'a self, code: &'a str) -> &'a str {
        match self.entries.get(code) {
            Some(m) if !m.name.is_empty() => &m.name,
            _ => code,
        }
    }

    /// Codes tagged with `category`, in code order.
    pub fn codes_in_category(&self, category: EtfCategory) -> Vec<&str> {
        self.entries
            .values()
            .filter(|m| m.category == category)
            .map(|m| m.code.as_str())
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &EtfMaster> {
        self.entries.values()
    }

    /// Owned copy of every entry, for the analytics views.
    pub fn to_vec(&self) -> Vec<EtfMaster> {
        self.entries.values().cloned().collect()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::Writer::from_writer(writer);
        for master in self.entries.values() {
            writer.serialize(MasterRow::from(master))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_csv<R: Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        validate_columns(reader.headers()?, REQUIRED_COLUMNS)?;

        let mut table = Self::new();
        for row in reader.deserialize::<MasterRow>() {
            table.upsert(row?.into());
        }
        Ok(table)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.write_csv(File::create(path)?)?;
        info!(path = %path.display(), entries = self.len(), "saved ETF master");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let table = Self::read_csv(File::open(path)?)?;
        info!(path = %path.display(), entries = table.len(), "loaded ETF master");
        Ok(table)
    }
}
