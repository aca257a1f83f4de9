//! Application configuration loaded from environment variables.

use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // === Database ===
    /// PostgreSQL connection string (URL or key=value form).
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Maximum number of pooled connections.
    #[serde(default = "default_pool_size")]
    pub db_pool_size: usize,

    /// Per-operation database deadline in seconds.
    #[serde(default = "default_db_timeout")]
    pub db_timeout_secs: u64,

    // === Server Configuration ===
    /// HTTP server port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub rust_log: String,

    /// Enable verbose logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_database_url() -> String {
    "postgres://postgres@localhost:5432/papka".to_string()
}

fn default_pool_size() -> usize {
    16
}

fn default_db_timeout() -> u64 {
    5
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            db_pool_size: default_pool_size(),
            db_timeout_secs: default_db_timeout(),
            port: default_port(),
            rust_log: default_log_level(),
            verbose: false,
        }
    }
}

impl Config {
    /// Load configuration from environment, reading .env file first.
    pub fn load() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    /// Check if the configuration is valid.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_url.trim().is_empty() {
            return Err("DATABASE_URL is required".to_string());
        }

        if self.database_url.parse::<tokio_postgres::Config>().is_err() {
            return Err("DATABASE_URL is not a valid PostgreSQL connection string".to_string());
        }

        if self.db_pool_size == 0 {
            return Err("DB_POOL_SIZE must be at least 1".to_string());
        }

        if self.db_timeout_secs == 0 {
            return Err("DB_TIMEOUT_SECS must be at least 1".to_string());
        }

        Ok(())
    }

    /// Database deadline as a [`Duration`].
    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs)
    }

    /// Tracing filter directive. Verbose (from the CLI flag or `VERBOSE`)
    /// wins over `RUST_LOG`.
    pub fn log_directive(&self, verbose_flag: bool) -> String {
        if verbose_flag || self.verbose {
            "papka=debug,info".to_string()
        } else {
            self.rust_log.clone()
        }
    }

    /// Connection string with the password masked, for logging.
    pub fn redacted_database_url(&self) -> String {
        let url = &self.database_url;
        let (Some(scheme_end), Some(at)) = (url.find("://"), url.rfind('@')) else {
            return url.clone();
        };
        let credentials = &url[scheme_end + 3..at];
        match credentials.find(':') {
            Some(colon) => format!(
                "{}{}:****{}",
                &url[..scheme_end + 3],
                &credentials[..colon],
                &url[at..]
            ),
            None => url.clone(),
        }
    }
}
