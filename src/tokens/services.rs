use std::sync::Arc;

use axum::extract::FromRef;
use time::OffsetDateTime;
use tracing::{debug, instrument};

use crate::db::StoreError;
use crate::error::AppError;
use crate::state::AppState;
use crate::tokens::codec::{self, TOKEN_BYTES};
use crate::tokens::repo::TokenRepo;
use crate::tokens::repo_types::{Token, TokenScope};
use crate::users::User;

/// Issues, resolves and revokes scoped bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    repo: Arc<dyn TokenRepo>,
}

impl FromRef<AppState> for TokenService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(state.tokens.clone())
    }
}

impl TokenService {
    pub fn new(repo: Arc<dyn TokenRepo>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        user_id: i64,
        ttl: time::Duration,
        scope: TokenScope,
    ) -> Result<Token, AppError> {
        let minted = codec::mint(TOKEN_BYTES);
        let token = Token {
            plaintext: minted.plaintext,
            expiry: OffsetDateTime::now_utc() + ttl,
            hash: minted.hash,
            user_id,
            scope,
        };
        self.repo.insert(token.row()).await?;
        debug!(user_id, %scope, expiry = %token.expiry, "token issued");
        Ok(token)
    }

    /// Owner of a live token in `scope`.
    ///
    /// Garbled, unknown, expired and wrong-scope tokens all end up as
    /// `InvalidOrExpiredToken`; garbled ones never reach the store.
    #[instrument(skip(self, plaintext))]
    pub async fn find_valid(&self, plaintext: &str, scope: TokenScope) -> Result<User, AppError> {
        if !codec::is_well_formed(plaintext) {
            return Err(AppError::InvalidOrExpiredToken);
        }
        let hash = codec::hash_of(plaintext);
        match self
            .repo
            .user_for_token(&hash, scope, OffsetDateTime::now_utc())
            .await
        {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(AppError::InvalidOrExpiredToken),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self))]
    pub async fn purge_for_user_scope(
        &self,
        user_id: i64,
        scope: TokenScope,
    ) -> Result<(), AppError> {
        let removed = self.repo.delete_for_user(user_id, scope).await?;
        debug!(user_id, %scope, removed, "tokens purged");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn purge_all_for_user(&self, user_id: i64) -> Result<(), AppError> {
        let removed = self.repo.delete_all_for_user(user_id).await?;
        debug!(user_id, removed, "all tokens purged");
        Ok(())
    }
}
