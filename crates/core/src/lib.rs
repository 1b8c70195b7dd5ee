//! Core types and configuration for the PCF pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Canonical records (ETF master, PCF record, futures legs, flows)
//! - Configuration structures
//! - Common error types
//! - Tracing setup

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_tracing;
pub use types::*;
