//! Process-level settings read from the environment.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{EngineError, EngineResult};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_CONFIG_DIR: &str = "./config/logistics";

/// Settings for running the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Address the server listens on.
    pub bind_addr: SocketAddr,
    /// Directory holding admission.yaml and pricing.yaml.
    pub config_dir: PathBuf,
    /// Postgres connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
}

impl ServerSettings {
    /// Reads `FLEET_BIND_ADDR`, `FLEET_CONFIG_DIR` and `DATABASE_URL`.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("FLEET_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind
            .parse::<SocketAddr>()
            .map_err(|e| EngineError::ConfigParseError {
                path: "FLEET_BIND_ADDR".to_string(),
                message: e.to_string(),
            })?;

        let config_dir = lookup("FLEET_CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        Ok(Self {
            bind_addr,
            config_dir,
            database_url,
        })
    }
}
