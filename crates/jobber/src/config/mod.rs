use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::jobs::autopilot::{
    AutopilotSettings, DEFAULT_APPROVAL_THRESHOLD, DEFAULT_AUTO_APPLY_THRESHOLD,
};
use crate::workflows::jobs::dispatch::DEFAULT_CLAIM_LEASE_SECONDS;

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

/// Top-level configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub autopilot: AutopilotSettings,
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            autopilot: autopilot_from_env(),
            dispatch: dispatch_from_env(),
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

/// Task delivery knobs.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub claim_lease_seconds: i64,
}

/// Autopilot gates from the environment. Thresholds fall back to the
/// defaults on non-numeric values and clamp into 0..=100; the remote
/// override is only applied when the variable is present.
fn autopilot_from_env() -> AutopilotSettings {
    AutopilotSettings {
        auto_apply_threshold: threshold_from_env(
            "JOBBER_AUTO_APPLY_THRESHOLD",
            DEFAULT_AUTO_APPLY_THRESHOLD,
        ),
        approval_threshold: threshold_from_env(
            "JOBBER_APPROVAL_THRESHOLD",
            DEFAULT_APPROVAL_THRESHOLD,
        ),
        remote_required: env::var("JOBBER_REMOTE_REQUIRED")
            .ok()
            .map(|raw| raw.trim() == "true"),
    }
}

fn threshold_from_env(name: &str, fallback: u8) -> u8 {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(value) => value.clamp(0, 100) as u8,
            Err(_) => fallback,
        },
        Err(_) => fallback,
    }
}

fn dispatch_from_env() -> DispatchConfig {
    let claim_lease_seconds = env::var("JOBBER_CLAIM_LEASE_SECONDS")
        .ok()
        .and_then(|raw| raw.trim().parse::<i64>().ok())
        .filter(|seconds| *seconds > 0)
        .unwrap_or(DEFAULT_CLAIM_LEASE_SECONDS);
    DispatchConfig {
        claim_lease_seconds,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
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
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("JOBBER_AUTO_APPLY_THRESHOLD");
        env::remove_var("JOBBER_APPROVAL_THRESHOLD");
        env::remove_var("JOBBER_REMOTE_REQUIRED");
        env::remove_var("JOBBER_CLAIM_LEASE_SECONDS");
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
        assert_eq!(
            config.autopilot.auto_apply_threshold,
            DEFAULT_AUTO_APPLY_THRESHOLD
        );
        assert_eq!(
            config.autopilot.approval_threshold,
            DEFAULT_APPROVAL_THRESHOLD
        );
        assert_eq!(config.autopilot.remote_required, None);
        assert_eq!(
            config.dispatch.claim_lease_seconds,
            DEFAULT_CLAIM_LEASE_SECONDS
        );
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
    }

    #[test]
    fn thresholds_clamp_and_fall_back() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("JOBBER_AUTO_APPLY_THRESHOLD", "250");
        env::set_var("JOBBER_APPROVAL_THRESHOLD", "not-a-number");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.autopilot.auto_apply_threshold, 100);
        assert_eq!(
            config.autopilot.approval_threshold,
            DEFAULT_APPROVAL_THRESHOLD
        );
    }

    #[test]
    fn remote_override_only_applies_when_set() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("JOBBER_REMOTE_REQUIRED", "false");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.autopilot.remote_required, Some(false));
    }
}
