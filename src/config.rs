/*
 * Responsibility
 * - Load environment / configuration (listen addr, users service, open paths,
 *   DB settings provider selection, CORS allowlist)
 * - Validate at startup (missing values fail the boot, never a request)
 */
use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::db::settings::SettingsProvider;
use crate::middleware::auth::open_paths::OpenPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

pub struct Config {
    pub addr: SocketAddr,

    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    /// Base URL of the users-management service that validates bearer tokens.
    pub users_service_url: Url,
    /// Outbound budget for one validate-token call.
    pub users_service_timeout: Duration,

    /// Path+method combinations exempt from authentication.
    /// Empty means every request carries through the gateway.
    pub open_paths: OpenPaths,

    pub db_settings_provider: SettingsProvider,
    pub db_max_connections: u32,

    pub request_timeout: Duration,
    pub request_body_limit_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3000);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let users_service_url = std::env::var("USERS_SERVICE_URL")
            .map_err(|_| ConfigError::Missing("USERS_SERVICE_URL"))?
            .parse::<Url>()
            .map_err(|_| ConfigError::Invalid("USERS_SERVICE_URL"))?;

        let users_service_timeout = Duration::from_secs(
            std::env::var("USERS_SERVICE_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5),
        );

        let open_paths = OpenPaths::parse(&std::env::var("OPEN_PATHS").unwrap_or_default())
            .map_err(|_| ConfigError::Invalid("OPEN_PATHS"))?;

        let db_settings_provider = match std::env::var("DB_SETTINGS_PROVIDER")
            .map_err(|_| ConfigError::Missing("DB_SETTINGS_PROVIDER"))?
            .as_str()
        {
            "env" => SettingsProvider::Env,
            "secret-file" => SettingsProvider::SecretFile {
                path: PathBuf::from(
                    std::env::var("DB_SECRET_FILE")
                        .map_err(|_| ConfigError::Missing("DB_SECRET_FILE"))?,
                ),
            },
            _ => return Err(ConfigError::Invalid("DB_SETTINGS_PROVIDER")),
        };

        let db_max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let request_timeout = Duration::from_secs(
            std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        );

        let request_body_limit_bytes = std::env::var("REQUEST_BODY_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1024 * 1024);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            users_service_url,
            users_service_timeout,
            open_paths,
            db_settings_provider,
            db_max_connections,
            request_timeout,
            request_body_limit_bytes,
        })
    }
}
