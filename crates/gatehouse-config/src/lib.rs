//! # Gatehouse Config
//!
//! Configuration loading for the Gatehouse edge gateway:
//!
//! - [`GatewayConfig`] - process settings from `GATEHOUSE_*` environment
//!   variables
//! - [`RulesFile`] / [`default_rules`] - the JSON rules file and the
//!   built-in rule set used when none is configured
//! - [`RulesWatcher`] - debounced file watching for rules hot-reload

#![forbid(unsafe_code)]

mod config;
mod error;
mod rules_file;
mod watcher;

pub use config::GatewayConfig;
pub use error::ConfigError;
pub use rules_file::{default_rules, RulesFile};
pub use watcher::RulesWatcher;
