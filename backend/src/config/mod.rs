//! Configuration management for In-Paw-Dia
//!
//! This module handles loading and validating configuration from environment variables,
//! with support for different environments (development, staging, production).

use std::env;
use thiserror::Error;

use crate::auth::DEFAULT_BCRYPT_COST;

const DEV_ACCESS_SECRET: &str = "dev-access-secret";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret";

/// Upper bound for `JWT_ACCESS_TOKEN_TTL_SECONDS` (one day)
pub const MAX_ACCESS_TTL_SECONDS: i64 = 86_400;
/// Upper bound for `JWT_REFRESH_TOKEN_TTL_DAYS`
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid environment value: {0}")]
    InvalidValue(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),
}

/// Application environment
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Parse environment from string
    pub fn parse(s: &str) -> Result<Self, ConfigError> {
        match s.to_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(ConfigError::InvalidValue(format!(
                "Invalid environment: '{}'. Expected: dev, staging, or prod",
                s
            ))),
        }
    }

    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Get the environment name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL; in-memory stores are used when absent
    pub database_url: Option<String>,

    /// Current environment
    pub environment: Environment,

    /// Server port
    pub port: u16,

    /// Maximum database connections
    pub db_max_connections: u32,

    /// Rate limit: requests per second per IP
    pub rate_limit_rps: u32,

    /// Allowed CORS origin (the front-end)
    pub frontend_url: Option<String>,

    /// Log level (RUST_LOG)
    pub log_level: String,

    /// Secret for signing access tokens
    pub jwt_access_secret: String,

    /// Secret for signing refresh tokens
    pub jwt_refresh_secret: String,

    /// Access token TTL in seconds (default: 900 = 15 minutes)
    pub jwt_access_token_ttl_seconds: i64,

    /// Refresh token TTL in days (default: 7)
    pub jwt_refresh_token_ttl_days: i64,

    /// bcrypt cost factor
    pub bcrypt_cost: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .map(|s| Environment::parse(&s))
            .unwrap_or(Ok(Environment::Development))?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort("PORT must be a valid number".to_string()))?;

        let db_max_connections = env::var("DB_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .unwrap_or(5);

        let rate_limit_rps = env::var("RATE_LIMIT_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse::<u32>()
            .unwrap_or(100);

        let frontend_url = env::var("FRONTEND_URL").ok();

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let jwt_access_secret = env::var("JWT_ACCESS_SECRET").ok();
        let jwt_refresh_secret = env::var("JWT_REFRESH_SECRET").ok();

        let jwt_access_token_ttl_seconds = env::var("JWT_ACCESS_TOKEN_TTL_SECONDS")
            .unwrap_or_else(|_| "900".to_string())
            .parse::<i64>()
            .unwrap_or(900);

        let jwt_refresh_token_ttl_days = env::var("JWT_REFRESH_TOKEN_TTL_DAYS")
            .unwrap_or_else(|_| "7".to_string())
            .parse::<i64>()
            .unwrap_or(7);

        let bcrypt_cost = env::var("BCRYPT_COST")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(DEFAULT_BCRYPT_COST);

        let config = Config {
            database_url,
            environment,
            port,
            db_max_connections,
            rate_limit_rps,
            frontend_url,
            log_level,
            jwt_access_secret: jwt_access_secret
                .clone()
                .unwrap_or_else(|| DEV_ACCESS_SECRET.to_string()),
            jwt_refresh_secret: jwt_refresh_secret
                .clone()
                .unwrap_or_else(|| DEV_REFRESH_SECRET.to_string()),
            jwt_access_token_ttl_seconds,
            jwt_refresh_token_ttl_days,
            bcrypt_cost,
        };

        if config.environment.is_production() {
            if config.database_url.is_none() {
                return Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string()));
            }
            if jwt_access_secret.is_none() {
                return Err(ConfigError::MissingEnvVar("JWT_ACCESS_SECRET".to_string()));
            }
            if jwt_refresh_secret.is_none() {
                return Err(ConfigError::MissingEnvVar("JWT_REFRESH_SECRET".to_string()));
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that hold in every environment
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_access_secret == self.jwt_refresh_secret {
            return Err(ConfigError::InvalidValue(
                "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must differ".to_string(),
            ));
        }
        if self.jwt_access_token_ttl_seconds <= 0 || self.jwt_refresh_token_ttl_days <= 0 {
            return Err(ConfigError::InvalidValue(
                "Token lifetimes must be positive".to_string(),
            ));
        }
        if self.jwt_access_token_ttl_seconds > MAX_ACCESS_TTL_SECONDS {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_ACCESS_TOKEN_TTL_SECONDS must be at most {}, got {}",
                MAX_ACCESS_TTL_SECONDS, self.jwt_access_token_ttl_seconds
            )));
        }
        if self.jwt_refresh_token_ttl_days > MAX_REFRESH_TTL_DAYS {
            return Err(ConfigError::InvalidValue(format!(
                "JWT_REFRESH_TOKEN_TTL_DAYS must be at most {}, got {}",
                MAX_REFRESH_TTL_DAYS, self.jwt_refresh_token_ttl_days
            )));
        }
        if !(4..=31).contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "BCRYPT_COST must be between 4 and 31, got {}",
                self.bcrypt_cost
            )));
        }
        Ok(())
    }

    /// Get database URL with the password masked, for logging
    pub fn database_url_masked(&self) -> Option<String> {
        let url = self.database_url.as_ref()?;
        if let Some(at_pos) = url.find('@') {
            if let Some(colon_pos) = url[..at_pos].rfind(':') {
                let prefix = &url[..colon_pos + 1];
                let suffix = &url[at_pos..];
                return Some(format!("{}****{}", prefix, suffix));
            }
        }
        Some(url.clone())
    }
}
