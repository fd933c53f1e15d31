use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::config::DatabaseConfig;

#[cfg(test)]
pub mod memory;
pub mod versioned;

pub use versioned::{update_versioned, Versioned, VersionedUpdate};

/// Name of the unique constraint guarding `users.email`.
const USERS_EMAIL_KEY: &str = "users_email_key";

/// Errors surfaced by every store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("edit conflict")]
    EditConflict,
    #[error("duplicate email")]
    DuplicateEmail,
    #[error("store operation timed out")]
    Timeout,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut => StoreError::Timeout,
            sqlx::Error::Database(ref db) if db.constraint() == Some(USERS_EMAIL_KEY) => {
                StoreError::DuplicateEmail
            }
            other => StoreError::Database(other),
        }
    }
}

/// Bounds a single store operation; an elapsed deadline is reported as `Timeout`.
pub async fn with_timeout<T, F>(limit: Duration, fut: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res.map_err(StoreError::from),
        Err(_) => Err(StoreError::Timeout),
    }
}

pub async fn connect(cfg: &DatabaseConfig) -> anyhow::Result<PgPool> {
    let db = PgPoolOptions::new()
        .max_connections(cfg.max_open_conns)
        .idle_timeout(Duration::from_secs(cfg.max_idle_minutes * 60))
        .acquire_timeout(Duration::from_secs(cfg.acquire_timeout_secs))
        .connect(&cfg.url)
        .await
        .context("connect to database")?;
    tracing::info!(max_connections = cfg.max_open_conns, "database pool established");
    Ok(db)
}
