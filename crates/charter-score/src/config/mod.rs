use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Deployment stage the service runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Everything the library and the API binary read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scoring: ScoringConfig,
    /// JSON charter snapshot to load at startup.
    pub data_path: Option<PathBuf>,
}

impl AppConfig {
    /// Read `.env` (when present) and then the `APP_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            environment: env::var("APP_ENV")
                .map(|raw| AppEnvironment::parse(&raw))
                .unwrap_or(AppEnvironment::Development),
            server: ServerConfig {
                host: text_var("APP_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: typed_var("APP_PORT", |raw| raw.parse::<u16>().ok())?
                    .unwrap_or(DEFAULT_PORT),
            },
            telemetry: TelemetryConfig {
                log_level: text_var("APP_LOG_LEVEL")
                    .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
            scoring: ScoringConfig::from_env()?,
            data_path: text_var("APP_DATA_PATH").map(PathBuf::from),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost {
                    host: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Knobs for the scoring engine.
///
/// Timeline weighting is a per-configuration switch rather than process state, so two
/// services with different settings can score the same store side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub timeline_weighting: bool,
    pub max_delegation_depth: usize,
    pub stable_tolerance: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            timeline_weighting: true,
            max_delegation_depth: 32,
            stable_tolerance: 0.2,
        }
    }
}

impl ScoringConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            timeline_weighting: typed_var("APP_TIMELINE_WEIGHTING", parse_flag)?
                .unwrap_or(defaults.timeline_weighting),
            max_delegation_depth: typed_var("APP_MAX_DELEGATION_DEPTH", |raw| {
                raw.parse::<usize>().ok().filter(|depth| *depth > 0)
            })?
            .unwrap_or(defaults.max_delegation_depth),
            stable_tolerance: typed_var("APP_STABLE_TOLERANCE", |raw| {
                raw.parse::<f64>()
                    .ok()
                    .filter(|tolerance| tolerance.is_finite() && *tolerance >= 0.0)
            })?
            .unwrap_or(defaults.stable_tolerance),
        })
    }
}

/// Non-blank value of `name`, trimmed.
fn text_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

/// Parse `name` when set. A value the parser rejects is an error naming the variable.
fn typed_var<T>(
    name: &'static str,
    parse: impl Fn(&str) -> Option<T>,
) -> Result<Option<T>, ConfigError> {
    match text_var(name) {
        Some(raw) => parse(&raw)
            .map(Some)
            .ok_or(ConfigError::InvalidValue { name, value: raw }),
        None => Ok(None),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidHost {
        host: String,
        source: std::net::AddrParseError,
    },
    InvalidValue {
        name: &'static str,
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidHost { host, .. } => {
                write!(f, "APP_HOST '{host}' is neither localhost nor an IP address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an unsupported value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source, .. } => Some(source),
            ConfigError::InvalidValue { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};

    const VARS: [&str; 8] = [
        "APP_ENV",
        "APP_HOST",
        "APP_PORT",
        "APP_LOG_LEVEL",
        "APP_DATA_PATH",
        "APP_TIMELINE_WEIGHTING",
        "APP_MAX_DELEGATION_DEPTH",
        "APP_STABLE_TOLERANCE",
    ];

    fn with_env<T>(vars: &[(&str, &str)], check: impl FnOnce() -> T) -> T {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        let _guard = LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for name in VARS {
            env::remove_var(name);
        }
        for (name, value) in vars {
            env::set_var(name, value);
        }
        let result = check();
        for name in VARS {
            env::remove_var(name);
        }
        result
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = with_env(&[], AppConfig::load).expect("defaults load");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.scoring, ScoringConfig::default());
        assert!(config.data_path.is_none());
    }

    #[test]
    fn localhost_binds_loopback() {
        let config =
            with_env(&[("APP_HOST", "localhost"), ("APP_PORT", "8088")], AppConfig::load)
                .expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8088));
    }

    #[test]
    fn scoring_overrides_are_read() {
        let config = with_env(
            &[
                ("APP_ENV", "production"),
                ("APP_TIMELINE_WEIGHTING", "off"),
                ("APP_MAX_DELEGATION_DEPTH", "8"),
                ("APP_STABLE_TOLERANCE", "0.1"),
                ("APP_DATA_PATH", "/srv/charters.json"),
            ],
            AppConfig::load,
        )
        .expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(!config.scoring.timeline_weighting);
        assert_eq!(config.scoring.max_delegation_depth, 8);
        assert_eq!(config.scoring.stable_tolerance, 0.1);
        assert_eq!(config.data_path, Some(PathBuf::from("/srv/charters.json")));
    }

    #[test]
    fn invalid_values_name_the_variable() {
        let depth = with_env(&[("APP_MAX_DELEGATION_DEPTH", "0")], AppConfig::load);
        assert!(matches!(
            depth,
            Err(ConfigError::InvalidValue {
                name: "APP_MAX_DELEGATION_DEPTH",
                ..
            })
        ));

        let port = with_env(&[("APP_PORT", "70000")], AppConfig::load);
        assert!(matches!(
            port,
            Err(ConfigError::InvalidValue { name: "APP_PORT", .. })
        ));
    }

    #[test]
    fn unparseable_host_is_rejected_at_bind_time() {
        let config = with_env(&[("APP_HOST", "charter.internal")], AppConfig::load)
            .expect("host is only checked when binding");
        assert!(matches!(
            config.server.socket_addr(),
            Err(ConfigError::InvalidHost { .. })
        ));
    }
}
