// configuration de l'application (variables d'environnement / .env)

use rust_decimal::Decimal;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentProvider {
    Stripe { secret_key: String },
    Memory,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub upload_dir: PathBuf,
    pub public_files_url: String,
    pub log_format: LogFormat,
    pub auto_migrate: bool,
    pub payment_provider: PaymentProvider,
    pub crowdfunding_goal: Decimal,
    pub cookie_secure: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Construit la configuration à partir d'une fonction de lecture,
    /// ce qui permet de tester sans toucher à l'environnement du process.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        let payment_provider = match lookup("PAYMENT_PROVIDER").as_deref() {
            None | Some("memory") => PaymentProvider::Memory,
            Some("stripe") => PaymentProvider::Stripe {
                secret_key: required("STRIPE_SECRET_KEY")?,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "PAYMENT_PROVIDER",
                    value: other.to_string(),
                });
            }
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            None | Some("pretty") => LogFormat::Pretty,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: other.to_string(),
                });
            }
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            host: lookup("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(&lookup, "PORT", 8080)?,
            jwt_secret: required("JWT_SECRET")?,
            jwt_ttl_hours: parse_or(&lookup, "JWT_TTL_HOURS", 24)?,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./uploads")),
            public_files_url: lookup("PUBLIC_FILES_URL").unwrap_or_else(|| "/files".to_string()),
            log_format,
            auto_migrate: parse_or(&lookup, "AUTO_MIGRATE", true)?,
            payment_provider,
            crowdfunding_goal: parse_or(&lookup, "CROWDFUNDING_GOAL", Decimal::new(10_000, 0))?,
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}
