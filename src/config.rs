use std::{env, str::FromStr};

use anyhow::{Context, Result, bail};

use crate::auth::{JwtConfig, jwt::DEFAULT_EXPIRATION_MINUTES};

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct BookingConfig {
    /// Restaurant every customer booking is placed with.
    pub default_restaurant_id: i32,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub jwt: JwtConfig,
    pub booking: BookingConfig,
}

/// Reads configuration from the environment. Call
/// [`crate::bootstrap::init_env`] first to pick up a `.env` file.
pub fn load() -> Result<AppConfig> {
    let secret = required("JWT_SECRET")?;
    if secret.len() < 32 {
        bail!("JWT_SECRET must be at least 32 characters long");
    }

    Ok(AppConfig {
        database: DatabaseConfig {
            url: required("DATABASE_URL")?,
            max_connections: optional("DATABASE_MAX_CONNECTIONS", 10)?,
            connect_timeout_secs: optional("DATABASE_CONNECT_TIMEOUT_SECS", 5)?,
        },
        server: ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: optional("SERVER_PORT", 5000)?,
        },
        jwt: JwtConfig {
            secret,
            expiration_minutes: optional("JWT_EXPIRATION_MINUTES", DEFAULT_EXPIRATION_MINUTES)?,
        },
        booking: BookingConfig {
            default_restaurant_id: parse("BOOKING_RESTAURANT_ID", &required("BOOKING_RESTAURANT_ID")?)?,
        },
    })
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn optional<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => parse(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("{key} has an invalid value '{value}'"))
}
