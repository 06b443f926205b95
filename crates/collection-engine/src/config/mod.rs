use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::collection::RecoveryThresholds;

const DEFAULT_ASAAS_API_URL: &str = "https://api.asaas.com/v3";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub payments: PaymentConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            payments: PaymentConfig::from_env()?,
            engine: EngineConfig::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Which gateway backs the payment provider contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Asaas,
    Sandbox,
}

/// Operating mode of the in-process sandbox gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayMode {
    Test,
    Production,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    pub provider: ProviderKind,
    pub gateway_mode: GatewayMode,
    pub asaas: AsaasConfig,
}

impl PaymentConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let provider = match var_or("PAYMENT_PROVIDER", "asaas")
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "asaas" => ProviderKind::Asaas,
            "sandbox" | "custom" => ProviderKind::Sandbox,
            other => return Err(ConfigError::UnknownProvider(other.to_string())),
        };

        let gateway_mode = match var_or("CUSTOM_GATEWAY_MODE", "test")
            .trim()
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => GatewayMode::Production,
            _ => GatewayMode::Test,
        };

        let api_key = env::var("ASAAS_API_KEY")
            .ok()
            .filter(|value| !value.trim().is_empty());

        Ok(Self {
            provider,
            gateway_mode,
            asaas: AsaasConfig {
                api_key,
                api_url: var_or("ASAAS_API_URL", DEFAULT_ASAAS_API_URL),
            },
        })
    }
}

/// Asaas credentials. A missing key is not a configuration error: the adapter
/// reports it as an unavailable provider on first use.
#[derive(Clone)]
pub struct AsaasConfig {
    pub api_key: Option<String>,
    pub api_url: String,
}

impl fmt::Debug for AsaasConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsaasConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_url", &self.api_url)
            .finish()
    }
}

/// Throughput and resilience dials for batch evaluation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub concurrency: usize,
    pub provider_max_attempts: u32,
    pub provider_base_backoff: Duration,
    pub score_cache_ttl: Duration,
    pub thresholds: RecoveryThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            provider_max_attempts: 3,
            provider_base_backoff: Duration::from_millis(200),
            score_cache_ttl: Duration::from_secs(3600),
            thresholds: RecoveryThresholds::default(),
        }
    }
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let concurrency = parse_var("COLLECTION_CONCURRENCY", defaults.concurrency)?.max(1);
        let provider_max_attempts =
            parse_var("PROVIDER_MAX_ATTEMPTS", defaults.provider_max_attempts)?.max(1);
        let backoff_ms = parse_var(
            "PROVIDER_BASE_BACKOFF_MS",
            defaults.provider_base_backoff.as_millis() as u64,
        )?;
        let ttl_secs = parse_var("SCORE_CACHE_TTL_SECS", defaults.score_cache_ttl.as_secs())?;

        Ok(Self {
            concurrency,
            provider_max_attempts,
            provider_base_backoff: Duration::from_millis(backoff_ms),
            score_cache_ttl: Duration::from_secs(ttl_secs),
            thresholds: defaults.thresholds,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { key }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str },
    UnknownProvider(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key } => {
                write!(f, "{key} must be a non-negative integer")
            }
            ConfigError::UnknownProvider(value) => {
                write!(f, "PAYMENT_PROVIDER '{value}' is not one of: asaas, sandbox")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for key in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "PAYMENT_PROVIDER",
            "CUSTOM_GATEWAY_MODE",
            "ASAAS_API_KEY",
            "ASAAS_API_URL",
            "COLLECTION_CONCURRENCY",
            "PROVIDER_MAX_ATTEMPTS",
            "PROVIDER_BASE_BACKOFF_MS",
            "SCORE_CACHE_TTL_SECS",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.payments.provider, ProviderKind::Asaas);
        assert_eq!(config.payments.gateway_mode, GatewayMode::Test);
        assert!(config.payments.asaas.api_key.is_none());
        assert_eq!(config.payments.asaas.api_url, DEFAULT_ASAAS_API_URL);
        assert_eq!(config.engine.concurrency, 4);
        assert_eq!(config.engine.thresholds.automatic_min, 294);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn custom_alias_selects_sandbox_and_zero_concurrency_is_clamped() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PAYMENT_PROVIDER", "custom");
        env::set_var("COLLECTION_CONCURRENCY", "0");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.payments.provider, ProviderKind::Sandbox);
        assert_eq!(config.engine.concurrency, 1);
        reset_env();
    }

    #[test]
    fn rejects_unknown_provider_and_bad_numbers() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("PAYMENT_PROVIDER", "paypal");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::UnknownProvider(value)) if value == "paypal"
        ));

        reset_env();
        env::set_var("PROVIDER_MAX_ATTEMPTS", "many");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidNumber {
                key: "PROVIDER_MAX_ATTEMPTS"
            })
        ));
        reset_env();
    }

    #[test]
    fn asaas_config_debug_redacts_key() {
        let config = AsaasConfig {
            api_key: Some("secret-key".to_string()),
            api_url: DEFAULT_ASAAS_API_URL.to_string(),
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("<redacted>"));
    }
}
