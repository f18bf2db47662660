use std::{env, fmt, net::SocketAddr, sync::Arc, time::Duration};

use super::server_bind_address;

const SECRET_VAR: &str = "EVENTSUB_WEBHOOK_SECRET";
const RETENTION_VAR: &str = "EVENTSUB_DEDUPE_RETENTION_SECS";
const SWEEP_VAR: &str = "EVENTSUB_DEDUPE_SWEEP_SECS";

const DEFAULT_RETENTION_SECS: u64 = 15 * 60;
const DEFAULT_SWEEP_SECS: u64 = 60;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns `true` when the current environment should behave as development.
    pub fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }

    /// Returns the canonical name used for logging/metrics labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Retention policy for the delivery deduplication cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupeConfig {
    /// How long a delivery identifier is remembered.
    pub retention: Duration,
    /// How often expired identifiers are swept from memory.
    pub sweep_interval: Duration,
}

impl Default for DedupeConfig {
    fn default() -> Self {
        Self {
            retention: Duration::from_secs(DEFAULT_RETENTION_SECS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_SECS),
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub environment: Environment,
    pub webhook_secret: Arc<[u8]>,
    pub dedupe: DedupeConfig,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let bind_addr = server_bind_address().map_err(ConfigError::BindAddress)?;

        let secret = env::var(SECRET_VAR).unwrap_or_default();
        if secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        let webhook_secret: Arc<[u8]> = Arc::from(secret.into_bytes().into_boxed_slice());

        let dedupe = DedupeConfig {
            retention: positive_secs(RETENTION_VAR, DEFAULT_RETENTION_SECS)?,
            sweep_interval: positive_secs(SWEEP_VAR, DEFAULT_SWEEP_SECS)?,
        };

        Ok(Self {
            bind_addr,
            environment,
            webhook_secret,
            dedupe,
        })
    }
}

fn positive_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let Ok(raw) = env::var(name) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidDuration { name, value: raw }),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    BindAddress(std::net::AddrParseError),
    MissingSecret,
    InvalidDuration { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::BindAddress(err) => write!(f, "invalid APP_BIND_ADDR value: {err}"),
            Self::MissingSecret => write!(f, "{SECRET_VAR} must be set to a non-empty value"),
            Self::InvalidDuration { name, value } => {
                write!(f, "{name} must be a positive number of seconds (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}
