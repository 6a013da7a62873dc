use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ExpenseServerError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ExpenseServerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StoreBackend::Mongo),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ExpenseServerError::Config(format!(
                "Unknown store backend '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub database_name: String,
    pub store_backend: StoreBackend,
    pub bcrypt_cost: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            mongodb_uri: "mongodb://localhost:27017".to_string(),
            database_name: "expenses".to_string(),
            store_backend: StoreBackend::Mongo,
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ExpenseServerError::Config(format!("Invalid value for {}: {}", key, raw))),
        Err(_) => Ok(None),
    }
}

impl ServerConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ExpenseServerError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: ServerConfig = toml::from_str(&content).map_err(|e| {
            ExpenseServerError::Config(format!("Failed to parse config file: {}", e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the TOML file named by `CONFIG_PATH` (if set), then
    /// individual environment variables.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var("CONFIG_PATH") {
            Ok(path) => Self::load_from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(host) = env_parse("SERVER_HOST")? {
            self.host = host;
        }
        if let Some(port) = env_parse("SERVER_PORT")? {
            self.port = port;
        }
        if let Some(uri) = env_parse("MONGODB_URI")? {
            self.mongodb_uri = uri;
        }
        if let Some(name) = env_parse("DATABASE_NAME")? {
            self.database_name = name;
        }
        if let Some(backend) = env_parse("STORE_BACKEND")? {
            self.store_backend = backend;
        }
        if let Some(cost) = env_parse("BCRYPT_COST")? {
            self.bcrypt_cost = cost;
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ExpenseServerError::Config(format!(
                "bcrypt_cost must be between 4 and 31, got {}",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }
}
