//! Runtime configuration read from the environment

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::{ApiError, Result};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LEDGER_MAX_RETRIES: u32 = 5;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: IpAddr,
    pub port: u16,
    /// JSON skill catalog; without it every skill goes through fallback lookup.
    pub catalog_path: Option<PathBuf>,
    pub ledger_max_retries: u32,
    pub db_max_connections: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparsable optional values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ApiError::Internal("DATABASE_URL must be set".to_string()))?;

        let host = lookup("HOST")
            .and_then(|value| value.parse::<IpAddr>().ok())
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let port = lookup("PORT")
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(DEFAULT_PORT);

        let catalog_path = lookup("CATALOG_PATH")
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        let ledger_max_retries = lookup("LEDGER_MAX_RETRIES")
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(DEFAULT_LEDGER_MAX_RETRIES);

        let db_max_connections = lookup("DB_MAX_CONNECTIONS")
            .and_then(|value| value.parse::<u32>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

        Ok(Self {
            database_url,
            host,
            port,
            catalog_path,
            ledger_max_retries,
            db_max_connections,
        })
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
