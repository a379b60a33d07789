use std::{fmt::Display, str::FromStr};

use anyhow::anyhow;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
    pub session_inactivity_minutes: i64,
    pub secure_cookies: bool,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Ok(Self {
            database_url: try_load("DATABASE_URL", "sqlite://jokes.db?mode=rwc")?,
            port: try_load("PORT", "8080")?,
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "16")?,
            session_inactivity_minutes: try_load("SESSION_INACTIVITY_MINUTES", "30")?,
            secure_cookies: try_load("SECURE_COOKIES", "false")?,
        })
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> anyhow::Result<T>
where
    T::Err: Display,
{
    dotenv::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_owned()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
            anyhow!("environment misconfigured: {key}: {e}")
        })
}
