use std::time::Duration;

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use crate::db::{with_timeout, StoreError};
use crate::tokens::repo_types::{TokenRow, TokenScope};
use crate::users::User;

#[async_trait]
pub trait TokenRepo: Send + Sync {
    async fn insert(&self, row: TokenRow) -> Result<(), StoreError>;

    /// Owner of the token stored under `hash` in `scope`, provided it expires after `now`.
    async fn user_for_token(
        &self,
        hash: &[u8],
        scope: TokenScope,
        now: OffsetDateTime,
    ) -> Result<User, StoreError>;

    async fn delete_for_user(&self, user_id: i64, scope: TokenScope) -> Result<u64, StoreError>;

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct PgTokenRepo {
    db: PgPool,
    timeout: Duration,
}

impl PgTokenRepo {
    pub fn new(db: PgPool, timeout: Duration) -> Self {
        Self { db, timeout }
    }
}

#[async_trait]
impl TokenRepo for PgTokenRepo {
    async fn insert(&self, row: TokenRow) -> Result<(), StoreError> {
        with_timeout(
            self.timeout,
            sqlx::query(
                r#"
                INSERT INTO tokens (hash, user_id, expiry, scope)
                VALUES ($1, $2, $3, $4)
                "#,
            )
            .bind(&row.hash)
            .bind(row.user_id)
            .bind(row.expiry)
            .bind(row.scope.as_str())
            .execute(&self.db),
        )
        .await?;
        Ok(())
    }

    async fn user_for_token(
        &self,
        hash: &[u8],
        scope: TokenScope,
        now: OffsetDateTime,
    ) -> Result<User, StoreError> {
        with_timeout(
            self.timeout,
            sqlx::query_as::<_, User>(
                r#"
                SELECT users.id, users.created_at, users.name, users.email,
                       users.password_hash, users.activated, users.version
                  FROM users
                 INNER JOIN tokens ON users.id = tokens.user_id
                 WHERE tokens.hash = $1
                   AND tokens.scope = $2
                   AND tokens.expiry > $3
                "#,
            )
            .bind(hash)
            .bind(scope.as_str())
            .bind(now)
            .fetch_one(&self.db),
        )
        .await
    }

    async fn delete_for_user(&self, user_id: i64, scope: TokenScope) -> Result<u64, StoreError> {
        let res = with_timeout(
            self.timeout,
            sqlx::query("DELETE FROM tokens WHERE scope = $1 AND user_id = $2")
                .bind(scope.as_str())
                .bind(user_id)
                .execute(&self.db),
        )
        .await?;
        Ok(res.rows_affected())
    }

    async fn delete_all_for_user(&self, user_id: i64) -> Result<u64, StoreError> {
        let res = with_timeout(
            self.timeout,
            sqlx::query("DELETE FROM tokens WHERE user_id = $1")
                .bind(user_id)
                .execute(&self.db),
        )
        .await?;
        Ok(res.rows_affected())
    }
}
