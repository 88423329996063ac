use std::env;

/// Backing store for booking records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Postgres,
    InMemory,
}

/// Errors raised while reading configuration from the environment
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("DATABASE_URL must be set when STORE_TYPE=postgres")]
    MissingDatabaseUrl,

    #[error("Invalid STORE_TYPE: {0}. Must be 'postgres' or 'inmemory'")]
    InvalidStoreType(String),

    #[error("PORT must be a valid u16, got: {0}")]
    InvalidPort(String),
}

/// Application configuration parsed from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub store_type: StoreType,
    pub database_url: Option<String>,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_type = match lookup("STORE_TYPE")
            .unwrap_or_else(|| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StoreType::Postgres,
            "inmemory" => StoreType::InMemory,
            other => return Err(ConfigError::InvalidStoreType(other.to_string())),
        };

        let database_url = lookup("DATABASE_URL");
        if store_type == StoreType::Postgres && database_url.is_none() {
            return Err(ConfigError::MissingDatabaseUrl);
        }

        let host = lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string());

        let port_raw = lookup("PORT").unwrap_or_else(|| "8094".to_string());
        let port: u16 = port_raw
            .parse()
            .map_err(|_| ConfigError::InvalidPort(port_raw.clone()))?;

        Ok(Config {
            store_type,
            database_url,
            host,
            port,
        })
    }
}
