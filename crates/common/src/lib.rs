//! Common building blocks shared across tessera crates.
//!
//! - **Configuration**: Strongly typed application configuration (`config`).
//! - **Telemetry**: `tracing` subscriber setup (`telemetry`).
pub mod config;
pub mod telemetry;

pub use crate::config::{
    AccessorSetting, AppConfig, DatabaseSettings, LoggingSettings, ShardSettings, ShardingSettings,
};
