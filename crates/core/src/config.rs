//! Configuration structures for the PCF pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};

/// Name of the pseudo-category covering every ETF present in the data.
pub const ALL_CATEGORY: &str = "all";

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Derivation engine configuration.
    pub derivation: DerivationConfig,
    /// Reporting categories.
    pub categories: CategoryConfig,
    /// Worker pool configuration.
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Parse a TOML document. Missing sections keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Parse a JSON document. Missing sections keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Load from a file, picking the format from the extension (TOML unless `.json`).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text)?,
            _ => Self::from_toml_str(&text)?,
        };
        debug!(
            path = %path.display(),
            categories = config.categories.sets.len(),
            workers = config.runtime.workers,
            "loaded config"
        );
        Ok(config)
    }
}

/// Derivation engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DerivationConfig {
    /// Per-contract value at or above which a reported futures market value
    /// is taken to be full notional already.
    pub notional_threshold: f64,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            notional_threshold: 100.0,
        }
    }
}

/// Named reporting categories, each a fixed set of ETF codes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    /// Category name -> member ETF codes.
    pub sets: BTreeMap<String, Vec<String>>,
    /// Category name -> display label.
    pub labels: BTreeMap<String, String>,
}

impl CategoryConfig {
    /// Member codes of a configured category.
    pub fn codes(&self, category: &str) -> Option<&[String]> {
        self.sets.get(category).map(Vec::as_slice)
    }

    /// Display label, falling back to the category name.
    pub fn label<'a>(&'a self, category: &'a str) -> &'a str {
        self.labels.get(category).map(String::as_str).unwrap_or(category)
    }
}

fn codes(list: &[&str]) -> Vec<String> {
    list.iter().map(|c| c.to_string()).collect()
}

const TOPIX_PLAIN: &[&str] = &[
    "1305", "1306", "1308", "1348", "1473", "1475", "2524", "2557", "2625",
];
const TOPIX_LEV: &[&str] = &["1568", "1367"];
const TOPIX_INV: &[&str] = &["1569", "1457", "1356", "1368"];
const NIKKEI225_PLAIN: &[&str] = &[
    "1320", "1321", "1329", "1330", "1346", "1369", "1397", "1578", "2525", "2624", "473A",
];
const NIKKEI225_LEV: &[&str] = &["1358", "1365", "1458", "1570", "1579"];
const NIKKEI225_INV: &[&str] = &["1456", "1571", "1580", "1357", "1360", "1366", "1459"];

impl Default for CategoryConfig {
    fn default() -> Self {
        let topix_levinv = [TOPIX_LEV, TOPIX_INV].concat();
        let nikkei_levinv = [NIKKEI225_LEV, NIKKEI225_INV].concat();
        let topix_all = [TOPIX_PLAIN, topix_levinv.as_slice()].concat();
        let nikkei_all = [NIKKEI225_PLAIN, nikkei_levinv.as_slice()].concat();

        let mut sets = BTreeMap::new();
        sets.insert("topix".to_string(), codes(TOPIX_PLAIN));
        sets.insert("topix_lev".to_string(), codes(TOPIX_LEV));
        sets.insert("topix_inv".to_string(), codes(TOPIX_INV));
        sets.insert("topix_levinv".to_string(), codes(&topix_levinv));
        sets.insert("topix_all".to_string(), codes(&topix_all));
        sets.insert("nikkei225".to_string(), codes(NIKKEI225_PLAIN));
        sets.insert("nikkei225_lev".to_string(), codes(NIKKEI225_LEV));
        sets.insert("nikkei225_inv".to_string(), codes(NIKKEI225_INV));
        sets.insert("nikkei225_levinv".to_string(), codes(&nikkei_levinv));
        sets.insert("nikkei225_all".to_string(), codes(&nikkei_all));

        let labels = [
            ("topix", "TOPIX (plain)"),
            ("topix_lev", "TOPIX (leveraged)"),
            ("topix_inv", "TOPIX (inverse)"),
            ("topix_levinv", "TOPIX (leveraged/inverse)"),
            ("topix_all", "TOPIX (all)"),
            ("nikkei225", "Nikkei 225 (plain)"),
            ("nikkei225_lev", "Nikkei 225 (leveraged)"),
            ("nikkei225_inv", "Nikkei 225 (inverse)"),
            ("nikkei225_levinv", "Nikkei 225 (leveraged/inverse)"),
            ("nikkei225_all", "Nikkei 225 (all)"),
            (ALL_CATEGORY, "All ETFs"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { sets, labels }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Number of parallel workers (0 = auto).
    pub workers: u32,
}

impl RuntimeConfig {
    /// Worker count to build a pool with; 0 lets the pool size itself to the host.
    pub fn worker_threads(&self) -> usize {
        self.workers as usize
    }

    /// Build a private worker pool sized by [`RuntimeConfig::workers`].
    pub fn build_pool(&self) -> Result<rayon::ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads())
            .build()
            .map_err(|e| Error::config(format!("failed to build worker pool: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_relative_eq!(config.derivation.notional_threshold, 100.0);
        assert_eq!(config.runtime.workers, 0);
        assert_eq!(config.categories.codes("topix_lev").unwrap(), ["1568", "1367"]);
        assert_eq!(config.categories.codes("nikkei225_all").unwrap().len(), 23);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            [derivation]
            notional_threshold = 250.0
            "#,
        )
        .unwrap();
        assert_relative_eq!(config.derivation.notional_threshold, 250.0);
        assert!(config.categories.codes("topix").is_some());
    }

    #[test]
    fn test_json_categories_override() {
        let config = Config::from_json_str(
            r#"{"categories": {"sets": {"mine": ["1306", "1321"]}}, "runtime": {"workers": 4}}"#,
        )
        .unwrap();
        assert_eq!(config.categories.codes("mine").unwrap().len(), 2);
        assert!(config.categories.codes("topix").is_none());
        assert_eq!(config.categories.label("mine"), "mine");
        assert_eq!(config.runtime.worker_threads(), 4);
    }

    #[test]
    fn test_build_pool() {
        let pool = RuntimeConfig { workers: 2 }.build_pool().unwrap();
        assert_eq!(pool.current_num_threads(), 2);
        assert!(RuntimeConfig::default().build_pool().unwrap().current_num_threads() >= 1);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pcf.toml");
        std::fs::write(&path, "[runtime]\nworkers = 2\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.runtime.workers, 2);
    }
}
