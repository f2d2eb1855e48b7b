use anyhow::Result;

mod database;
mod logging;
mod push;

pub use database::DbConfig;
pub use logging::LoggingConfig;
pub use push::{ApnsConfig, ApnsEnvironment, FcmConfig, PushConfig, PushProvider};

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;

// Bounded timeout applied to each profile lookup and push send
const DEFAULT_EXTERNAL_CALL_TIMEOUT_MS: u64 = 5000;

// Message content limit (characters, not bytes)
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 4000;

// Device tokens longer than this are rejected at registration
pub const MAX_DEVICE_TOKEN_LENGTH: usize = 512;

/// Which repository implementation backs the service
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" | "mem" => Ok(Self::Memory),
            _ => anyhow::bail!(
                "Invalid storage backend: {}. Must be 'postgres' or 'memory'",
                s
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub storage_backend: StorageBackend,
    pub bind_address: String,
    pub rust_log: String,
    /// Timeout for each call that leaves the process (profile reads, push sends)
    pub external_call_timeout_ms: u64,
    pub max_message_length: usize,
    pub logging: LoggingConfig,
    pub db: DbConfig,
    pub push: PushConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            storage_backend: StorageBackend::Memory,
            bind_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            rust_log: "info".to_string(),
            external_call_timeout_ms: DEFAULT_EXTERNAL_CALL_TIMEOUT_MS,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
            logging: LoggingConfig::default(),
            db: DbConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let storage_backend: StorageBackend = std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let database_url = match storage_backend {
            StorageBackend::Postgres => std::env::var("DATABASE_URL").map_err(|_| {
                anyhow::anyhow!("DATABASE_URL must be set when STORAGE_BACKEND=postgres")
            })?,
            StorageBackend::Memory => std::env::var("DATABASE_URL").unwrap_or_default(),
        };

        let bind_address = std::env::var("BIND_ADDRESS").unwrap_or_else(|_| {
            let port = std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT);
            format!("0.0.0.0:{}", port)
        });

        let max_message_length = std::env::var("MAX_MESSAGE_LENGTH")
            .ok()
            .and_then(|m| m.parse().ok())
            .unwrap_or(DEFAULT_MAX_MESSAGE_LENGTH);
        if max_message_length == 0 {
            anyhow::bail!("MAX_MESSAGE_LENGTH must be greater than zero");
        }

        Ok(Self {
            database_url,
            storage_backend,
            bind_address,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            external_call_timeout_ms: std::env::var("EXTERNAL_CALL_TIMEOUT_MS")
                .ok()
                .and_then(|t| t.parse().ok())
                .unwrap_or(DEFAULT_EXTERNAL_CALL_TIMEOUT_MS),
            max_message_length,
            logging: LoggingConfig::from_env()?,
            db: DbConfig::from_env(),
            push: PushConfig::from_env()?,
        })
    }

    pub fn external_call_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.external_call_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_parses_aliases() {
        assert_eq!(
            "Postgres".parse::<StorageBackend>().unwrap(),
            StorageBackend::Postgres
        );
        assert_eq!(
            "in-memory".parse::<StorageBackend>().unwrap(),
            StorageBackend::Memory
        );
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn default_config_uses_memory_and_disabled_push() {
        let config = Config::default();
        assert_eq!(config.storage_backend, StorageBackend::Memory);
        assert_eq!(config.push.provider, PushProvider::Disabled);
        assert_eq!(
            config.external_call_timeout(),
            std::time::Duration::from_millis(5000)
        );
    }
}
