use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{update_versioned, with_timeout, StoreError};
use crate::users::repo_types::{NewUser, User};

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts an unactivated user at version 1. A taken email yields `DuplicateEmail`.
    async fn insert(&self, user: NewUser) -> Result<User, StoreError>;
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;
    /// Commits `user` through the version check and stores the new version on it.
    async fn update(&self, user: &mut User) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgUserRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgUserRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl UserRepo for PgUserRepo {
    async fn insert(&self, user: NewUser) -> Result<User, StoreError> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, User>(
                r#"
                INSERT INTO users (name, email, password_hash, activated)
                VALUES ($1, $2, $3, FALSE)
                RETURNING id, created_at, name, email, password_hash, activated, version
                "#,
            )
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, User>(
                r#"
                SELECT id, created_at, name, email, password_hash, activated, version
                FROM users
                WHERE email = $1
                "#,
            )
            .bind(email)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn update(&self, user: &mut User) -> Result<(), StoreError> {
        update_versioned(&self.db, self.timeout, user).await
    }
}
