use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::TimeDelta;

use lounge_api::AppOptions;
use lounge_auth::AdminCredentials;

/// Process configuration, read from `LOUNGE_*` environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub static_dir: PathBuf,
    pub secure_cookies: bool,
    pub session_ttl: Duration,
    /// Maximum age of a chat message before the sweep removes it.
    pub retention: TimeDelta,
    pub sweep_interval: Duration,
    /// `None` disables admin login.
    pub admin: Option<AdminCredentials>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let retention_hours: i64 = parse_or(&get, "LOUNGE_RETENTION_HOURS", 48)?;
        let retention = TimeDelta::try_hours(retention_hours)
            .filter(|d| *d > TimeDelta::zero())
            .context("LOUNGE_RETENTION_HOURS must be a positive number of hours")?;

        let sweep_secs: u64 = parse_or(&get, "LOUNGE_SWEEP_INTERVAL_SECS", 6 * 60 * 60)?;
        anyhow::ensure!(sweep_secs > 0, "LOUNGE_SWEEP_INTERVAL_SECS must be positive");

        let ttl_hours: u64 = parse_or(&get, "LOUNGE_SESSION_TTL_HOURS", 7 * 24)?;

        Ok(Self {
            host: text("LOUNGE_HOST", "0.0.0.0"),
            port: parse_or(&get, "LOUNGE_PORT", 8080)?,
            db_path: text("LOUNGE_DB_PATH", "lounge.db").into(),
            static_dir: text("LOUNGE_STATIC_DIR", "static").into(),
            secure_cookies: parse_or(&get, "LOUNGE_COOKIE_SECURE", false)?,
            session_ttl: Duration::from_secs(ttl_hours * 60 * 60),
            retention,
            sweep_interval: Duration::from_secs(sweep_secs),
            admin: AdminCredentials::new(
                text("LOUNGE_ADMIN_USERNAME", ""),
                text("LOUNGE_ADMIN_PASSWORD", ""),
                text("LOUNGE_ADMIN_PHASEKEY", ""),
            ),
        })
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid bind address {}:{}", self.host, self.port))
    }

    pub fn app_options(&self) -> AppOptions {
        AppOptions {
            admin: self.admin.clone(),
            session_ttl: self.session_ttl,
            secure_cookies: self.secure_cookies,
        }
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key}={raw:?} is not valid")),
        None => Ok(default),
    }
}
