use anyhow::Context;
use std::env::VarError;
use std::str::FromStr;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/library.sqlite3";
const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 5002;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug)]
pub struct Config {
    database_url: String,
    database_max_connections: u32,
    server_host: String,
    server_port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = load_env_or("DATABASE_URL", DEFAULT_DATABASE_URL.to_string())?;
        let database_max_connections =
            load_env_or("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?;
        let server_host = load_env_or("SERVER_HOST", DEFAULT_SERVER_HOST.to_string())?;
        let server_port = load_env_or("SERVER_PORT", DEFAULT_SERVER_PORT)?;
        Ok(Self {
            database_url,
            database_max_connections,
            server_host,
            server_port,
        })
    }

    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    #[must_use]
    pub const fn database_max_connections(&self) -> u32 {
        self.database_max_connections
    }

    #[must_use]
    pub fn server_host(&self) -> &str {
        &self.server_host
    }

    #[must_use]
    pub const fn server_port(&self) -> u16 {
        self.server_port
    }
}

/// Reads and parses `key`, falling back to `default` when it is unset.
fn load_env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(val) => parse_env(key, &val),
        Err(VarError::NotPresent) => Ok(default),
        Err(err) => {
            Err(err).with_context(|| format!("Failed to load environment variable {key}"))
        }
    }
}

fn parse_env<T>(key: &str, val: &str) -> anyhow::Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::error::Error + Send + Sync + 'static,
{
    val.parse::<T>()
        .with_context(|| format!("Failed to parse environment variable {key}"))
}
