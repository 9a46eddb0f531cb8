use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, ensure};
use jiff::tz::TimeZone;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub database_max_connections: u32,
    pub admin_password: String,
    pub teacher_passcode: String,
    /// Cookie signing secret, at least 32 bytes.
    pub secret_key: String,
    pub session_ttl_minutes: i64,
    pub poster_dir: PathBuf,
    pub timezone: TimeZone,
    pub login_burst: u32,
    pub login_replenish_secs: u64,
}

/// Longest admin login a session cookie may carry: thirty days.
pub const MAX_SESSION_TTL_MINUTES: i64 = 60 * 24 * 30;

const DEV_SECRET_KEY: &str = "dev-school-cinema-secret-key-change-me-before-deploying";

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://cinema.db?mode=rwc".to_string());

        let database_max_connections: u32 = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);

        let admin_password = std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!("ADMIN_PASSWORD not set, using the development default");
            "nnhs2025!".to_string()
        });

        let teacher_passcode =
            std::env::var("TEACHER_PASSCODE").unwrap_or_else(|_| "namnyeong123".to_string());

        let secret_key = std::env::var("SECRET_KEY").unwrap_or_else(|_| {
            tracing::warn!("SECRET_KEY not set, sessions are signed with a development key");
            DEV_SECRET_KEY.to_string()
        });

        let session_ttl_minutes: i64 =
            std::env::var("SESSION_TTL_MINUTES").ok().and_then(|s| s.parse().ok()).unwrap_or(120);

        let poster_dir = std::env::var("POSTER_DIR").unwrap_or_else(|_| "posters".to_string());

        let tz_name = std::env::var("APP_TIMEZONE").unwrap_or_else(|_| "Asia/Seoul".to_string());
        let timezone = TimeZone::get(&tz_name).with_context(|| format!("APP_TIMEZONE={tz_name}"))?;

        let login_burst: u32 =
            std::env::var("LOGIN_BURST").ok().and_then(|s| s.parse().ok()).unwrap_or(5);

        let login_replenish_secs: u64 =
            std::env::var("LOGIN_REPLENISH_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(60);

        let config = Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            database_max_connections,
            admin_password,
            teacher_passcode,
            secret_key,
            session_ttl_minutes,
            poster_dir: PathBuf::from(poster_dir),
            timezone,
            login_burst,
            login_replenish_secs,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.admin_password.is_empty(), "ADMIN_PASSWORD must not be empty");
        ensure!(!self.teacher_passcode.is_empty(), "TEACHER_PASSCODE must not be empty");
        ensure!(self.secret_key.len() >= 32, "SECRET_KEY must be at least 32 bytes");
        ensure!(self.session_ttl_minutes > 0, "SESSION_TTL_MINUTES must be positive");
        ensure!(
            self.session_ttl_minutes <= MAX_SESSION_TTL_MINUTES,
            "SESSION_TTL_MINUTES must be at most {MAX_SESSION_TTL_MINUTES}"
        );
        ensure!(self.database_max_connections > 0, "DATABASE_MAX_CONNECTIONS must be positive");
        ensure!(self.login_burst > 0, "LOGIN_BURST must be positive");
        ensure!(self.login_replenish_secs > 0, "LOGIN_REPLENISH_SECS must be positive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            addr: "127.0.0.1:0".parse().unwrap(),
            database_url: "sqlite::memory:".to_string(),
            database_max_connections: 1,
            admin_password: "admin-pass".to_string(),
            teacher_passcode: "teacher-pass".to_string(),
            secret_key: DEV_SECRET_KEY.to_string(),
            session_ttl_minutes: 30,
            poster_dir: PathBuf::from("posters"),
            timezone: TimeZone::get("Asia/Seoul").unwrap(),
            login_burst: 5,
            login_replenish_secs: 60,
        }
    }

    #[test]
    fn accepts_sane_values() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn rejects_short_secret() {
        let mut config = sample();
        config.secret_key = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SECRET_KEY"));
    }

    #[test]
    fn rejects_empty_admin_password() {
        let mut config = sample();
        config.admin_password.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_session_ttl() {
        let mut config = sample();
        config.session_ttl_minutes = i64::MAX / 2;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("SESSION_TTL_MINUTES"));

        config.session_ttl_minutes = MAX_SESSION_TTL_MINUTES;
        assert!(config.validate().is_ok());
    }
}
