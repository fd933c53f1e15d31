use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::tokens::TokenScope;

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_open_conns: u32,
    pub max_idle_minutes: u64,
    pub acquire_timeout_secs: u64,
    pub query_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
    pub retries: u32,
}

/// Lifetimes of the bearer tokens handed out by each flow.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub activation_ttl_minutes: i64,
    pub authentication_ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
    pub password_reset_ttl_minutes: i64,
}

impl TokenConfig {
    pub fn ttl(&self, scope: TokenScope) -> time::Duration {
        let minutes = match scope {
            TokenScope::Activation => self.activation_ttl_minutes,
            TokenScope::Authentication => self.authentication_ttl_minutes,
            TokenScope::Refresh => self.refresh_ttl_minutes,
            TokenScope::PasswordReset => self.password_reset_ttl_minutes,
        };
        time::Duration::minutes(minutes)
    }
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            activation_ttl_minutes: 72 * 60,
            authentication_ttl_minutes: 24 * 60,
            refresh_ttl_minutes: 30 * 24 * 60,
            password_reset_ttl_minutes: 3 * 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimiterConfig {
    pub enabled: bool,
    pub rps: f64,
    pub burst: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            rps: 2.0,
            burst: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub host: String,
    pub port: u16,
    pub database: DatabaseConfig,
    pub smtp: Option<SmtpConfig>,
    pub tokens: TokenConfig,
    pub limiter: LimiterConfig,
    pub cors_trusted_origins: Vec<String>,
    pub background_max_tasks: usize,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database = DatabaseConfig {
            url: std::env::var("DATABASE_URL")?,
            max_open_conns: env_or("DB_MAX_OPEN_CONNS", 25),
            max_idle_minutes: env_or("DB_MAX_IDLE_MINUTES", 15),
            acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 5),
            query_timeout_secs: env_or("DB_QUERY_TIMEOUT_SECS", 3),
        };

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) => Some(SmtpConfig {
                host,
                port: env_or("SMTP_PORT", 2525),
                username: std::env::var("SMTP_USERNAME")?,
                password: std::env::var("SMTP_PASSWORD")?,
                sender: std::env::var("SMTP_SENDER")
                    .unwrap_or_else(|_| "FollowUps <no-reply@followups.local>".into()),
                retries: env_or("SMTP_RETRIES", 3),
            }),
            Err(_) => None,
        };

        let defaults = TokenConfig::default();
        let tokens = TokenConfig {
            activation_ttl_minutes: env_or(
                "TOKEN_ACTIVATION_TTL_MINUTES",
                defaults.activation_ttl_minutes,
            ),
            authentication_ttl_minutes: env_or(
                "TOKEN_AUTHENTICATION_TTL_MINUTES",
                defaults.authentication_ttl_minutes,
            ),
            refresh_ttl_minutes: env_or("TOKEN_REFRESH_TTL_MINUTES", defaults.refresh_ttl_minutes),
            password_reset_ttl_minutes: env_or(
                "TOKEN_PASSWORD_RESET_TTL_MINUTES",
                defaults.password_reset_ttl_minutes,
            ),
        };

        let limits = LimiterConfig::default();
        let limiter = LimiterConfig {
            enabled: env_or("LIMITER_ENABLED", limits.enabled),
            rps: env_or("LIMITER_RPS", limits.rps),
            burst: env_or("LIMITER_BURST", limits.burst),
        };

        Ok(Self {
            env: std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()),
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_or("APP_PORT", 4000),
            database,
            smtp,
            tokens,
            limiter,
            cors_trusted_origins: trusted_origins(
                &std::env::var("CORS_TRUSTED_ORIGINS").unwrap_or_default(),
            ),
            background_max_tasks: env_or("BACKGROUND_MAX_TASKS", 16),
        })
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

/// Space separated list, as in `CORS_TRUSTED_ORIGINS="https://a.io https://b.io"`.
fn trusted_origins(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
