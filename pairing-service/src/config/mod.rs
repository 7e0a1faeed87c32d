use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::models::oauth_client::DEFAULT_CLIENT_NAME;
use crate::services::LockBudget;

#[derive(Debug, Clone)]
pub struct PairingConfig {
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub jwt: JwtConfig,
    pub tokens: TokenConfig,
    pub tv_code: TvCodeConfig,
    pub security: SecurityConfig,
    pub swagger: SwaggerConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn url(&self) -> &str {
        self.url.expose_secret()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    /// File holding the HS256 signing key.
    pub signing_key_path: String,
    /// `iss` claim; the public base URL of the application.
    pub issuer: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TokenConfig {
    /// Name of the OAuth client record tokens are minted for.
    pub client_name: String,
    pub access_token_expiry_days: i64,
    pub refresh_token_expiry_days: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            access_token_expiry_days: 15,
            refresh_token_expiry_days: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TvCodeConfig {
    pub expiry_minutes: i64,
    pub max_attempts: u32,
    pub lock_hold_seconds: u64,
    pub lock_wait_seconds: u64,
}

impl Default for TvCodeConfig {
    fn default() -> Self {
        Self {
            expiry_minutes: 10,
            max_attempts: 10,
            lock_hold_seconds: 10,
            lock_wait_seconds: 5,
        }
    }
}

impl TvCodeConfig {
    pub fn lock_budget(&self) -> LockBudget {
        LockBudget {
            hold: Duration::from_secs(self.lock_hold_seconds),
            wait: Duration::from_secs(self.lock_wait_seconds),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwaggerConfig {
    pub enabled: SwaggerMode,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SwaggerMode {
    Public,
    Disabled,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RateLimitConfig {
    pub login_attempts: u32,
    pub login_window_seconds: u64,
    pub poll_attempts: u32,
    pub poll_window_seconds: u64,
    pub global_ip_limit: u32,
    pub global_ip_window_seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_attempts: 5,
            login_window_seconds: 900,
            poll_attempts: 10,
            poll_window_seconds: 60,
            global_ip_limit: 100,
            global_ip_window_seconds: 60,
        }
    }
}

impl PairingConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let environment: Environment = env_str
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;

        let is_prod = environment == Environment::Prod;

        let config = PairingConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("pairing-service"), is_prod)?,
            service_version: get_env("SERVICE_VERSION", Some(env!("CARGO_PKG_VERSION")), is_prod)?,
            log_level: get_env("LOG_LEVEL", Some("info"), is_prod)?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: Secret::new(get_env("DATABASE_URL", None, is_prod)?),
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", "10", is_prod)?,
                min_connections: parse_env("DATABASE_MIN_CONNECTIONS", "1", is_prod)?,
            },
            redis: RedisConfig {
                url: get_env("REDIS_URL", Some("redis://127.0.0.1:6379"), is_prod)?,
            },
            jwt: JwtConfig {
                signing_key_path: get_env("JWT_SIGNING_KEY_PATH", None, is_prod)?,
                issuer: get_env("APP_URL", Some("http://localhost:8080"), is_prod)?,
            },
            tokens: TokenConfig {
                client_name: get_env("OAUTH_CLIENT_NAME", Some(DEFAULT_CLIENT_NAME), is_prod)?,
                access_token_expiry_days: parse_env("ACCESS_TOKEN_EXPIRY_DAYS", "15", is_prod)?,
                refresh_token_expiry_days: parse_env("REFRESH_TOKEN_EXPIRY_DAYS", "30", is_prod)?,
            },
            tv_code: TvCodeConfig {
                expiry_minutes: parse_env("TV_CODE_EXPIRY_MINUTES", "10", is_prod)?,
                max_attempts: parse_env("TV_CODE_MAX_ATTEMPTS", "10", is_prod)?,
                lock_hold_seconds: parse_env("TV_CODE_LOCK_HOLD_SECONDS", "10", is_prod)?,
                lock_wait_seconds: parse_env("TV_CODE_LOCK_WAIT_SECONDS", "5", is_prod)?,
            },
            security: SecurityConfig {
                allowed_origins: get_env("ALLOWED_ORIGINS", Some("http://localhost:3000"), is_prod)?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            },
            swagger: SwaggerConfig {
                enabled: parse_env("ENABLE_SWAGGER", "public", is_prod)?,
            },
            rate_limit: RateLimitConfig {
                login_attempts: parse_env("RATE_LIMIT_LOGIN_ATTEMPTS", "5", is_prod)?,
                login_window_seconds: parse_env("RATE_LIMIT_LOGIN_WINDOW_SECONDS", "900", is_prod)?,
                poll_attempts: parse_env("RATE_LIMIT_POLL_ATTEMPTS", "10", is_prod)?,
                poll_window_seconds: parse_env("RATE_LIMIT_POLL_WINDOW_SECONDS", "60", is_prod)?,
                global_ip_limit: parse_env("RATE_LIMIT_GLOBAL_IP_LIMIT", "100", is_prod)?,
                global_ip_window_seconds: parse_env(
                    "RATE_LIMIT_GLOBAL_IP_WINDOW_SECONDS",
                    "60",
                    is_prod,
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.common.port == 0 {
            return Err(config_error("PORT must be greater than 0"));
        }

        if self.tokens.access_token_expiry_days <= 0 {
            return Err(config_error("ACCESS_TOKEN_EXPIRY_DAYS must be positive"));
        }

        if self.tokens.refresh_token_expiry_days <= 0 {
            return Err(config_error("REFRESH_TOKEN_EXPIRY_DAYS must be positive"));
        }

        if self.tv_code.expiry_minutes <= 0 {
            return Err(config_error("TV_CODE_EXPIRY_MINUTES must be positive"));
        }

        if self.tv_code.max_attempts == 0 {
            return Err(config_error("TV_CODE_MAX_ATTEMPTS must be positive"));
        }

        if self.tv_code.lock_hold_seconds == 0 {
            return Err(config_error("TV_CODE_LOCK_HOLD_SECONDS must be positive"));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(config_error(
                "DATABASE_MIN_CONNECTIONS cannot exceed DATABASE_MAX_CONNECTIONS",
            ));
        }

        // In production, ensure stricter validation
        if self.environment == Environment::Prod {
            if self.security.allowed_origins.iter().any(|o| o == "*") {
                return Err(config_error("Wildcard CORS origin not allowed in production"));
            }

            if self.swagger.enabled == SwaggerMode::Public {
                tracing::warn!("Swagger UI is publicly accessible in production");
            }
        }

        Ok(())
    }
}

fn config_error(msg: &str) -> AppError {
    AppError::ConfigError(anyhow::anyhow!(msg.to_string()))
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required in production but not set",
                    key
                ))))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(format!(
                    "{} is required but not set",
                    key
                ))))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, Some(default), is_prod)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("{} has invalid value '{}': {}", key, raw, e))
    })
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl FromStr for SwaggerMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "public" | "true" => Ok(SwaggerMode::Public),
            "disabled" | "false" => Ok(SwaggerMode::Disabled),
            _ => Err(format!("Invalid swagger mode: {}", s)),
        }
    }
}
