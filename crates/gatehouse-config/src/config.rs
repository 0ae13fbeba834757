//! Gateway process configuration.
//!
//! All settings come from `GATEHOUSE_*` environment variables. The only
//! required one is the token secret; everything else has a sensible
//! default so a local gateway starts with nothing but
//! `GATEHOUSE_JWT_SECRET=dev cargo run`.

use crate::error::ConfigError;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;

const VAR_BIND_ADDRESS: &str = "GATEHOUSE_BIND_ADDRESS";
const VAR_JWT_SECRET: &str = "GATEHOUSE_JWT_SECRET";
const VAR_RULES_FILE: &str = "GATEHOUSE_RULES_FILE";
const VAR_LOG_JSON: &str = "GATEHOUSE_LOG_JSON";

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Process-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address the listener binds to.
    pub bind_address: SocketAddr,

    /// Shared secret for HS256 token verification.
    pub jwt_secret: String,

    /// Optional rules file; when absent the built-in defaults apply and
    /// hot reload is disabled.
    pub rules_file: Option<PathBuf>,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl GatewayConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&std::env::vars().collect())
    }

    /// Loads configuration from an explicit variable map. Split out from
    /// [`from_env`](Self::from_env) so tests never touch process state.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get(VAR_BIND_ADDRESS)
            .map_or(DEFAULT_BIND_ADDRESS, String::as_str)
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::env_parse(VAR_BIND_ADDRESS, e.to_string()))?;

        let jwt_secret = vars
            .get(VAR_JWT_SECRET)
            .filter(|s| !s.trim().is_empty())
            .cloned()
            .ok_or_else(|| ConfigError::missing(VAR_JWT_SECRET))?;

        let rules_file = vars.get(VAR_RULES_FILE).map(PathBuf::from);

        let log_json = match vars.get(VAR_LOG_JSON).map(String::as_str) {
            None | Some("false" | "0" | "") => false,
            Some("true" | "1") => true,
            Some(other) => {
                return Err(ConfigError::env_parse(
                    VAR_LOG_JSON,
                    format!("expected true or false, got {other:?}"),
                ))
            }
        };

        Ok(Self {
            bind_address,
            jwt_secret,
            rules_file,
            log_json,
        })
    }
}
