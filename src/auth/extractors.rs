use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use crate::error::AppError;
use crate::tokens::{TokenScope, TokenService};
use crate::users::User;

/// Owner of the `Authorization: Bearer <authentication token>` on the request.
pub struct AuthUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::AuthenticationRequired)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .or_else(|| auth_header.strip_prefix("bearer "))
            .ok_or(AppError::InvalidOrExpiredToken)?;

        let user = TokenService::from_ref(state)
            .find_valid(token.trim(), TokenScope::Authentication)
            .await
            .map_err(|e| {
                warn!(error = %e, "bearer token rejected");
                e
            })?;

        Ok(AuthUser(user))
    }
}

/// Like [`AuthUser`], but the account must also be activated.
pub struct ActivatedUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for ActivatedUser
where
    S: Send + Sync,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.activated {
            return Err(AppError::InactiveAccount);
        }
        Ok(ActivatedUser(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;
    use std::sync::Arc;

    use crate::db::memory::MemoryStore;
    use crate::users::{NewUser, UserRepo};

    #[derive(Clone)]
    struct TestState {
        tokens: TokenService,
    }

    impl FromRef<TestState> for TokenService {
        fn from_ref(state: &TestState) -> Self {
            state.tokens.clone()
        }
    }

    async fn setup(activated: bool) -> (TestState, String) {
        let store = Arc::new(MemoryStore::new());
        let mut user = UserRepo::insert(
            store.as_ref(),
            NewUser {
                name: "Alice".into(),
                email: "alice@x.com".into(),
                password_hash: "hash".into(),
            },
        )
        .await
        .unwrap();
        if activated {
            user.activated = true;
            UserRepo::update(store.as_ref(), &mut user).await.unwrap();
        }
        let tokens = TokenService::new(store);
        let token = tokens
            .create(user.id, time::Duration::hours(1), TokenScope::Authentication)
            .await
            .unwrap();
        (TestState { tokens }, token.plaintext)
    }

    fn parts(authorization: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/v1/users/me");
        if let Some(value) = authorization {
            req = req.header(AUTHORIZATION, value);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn resolves_bearer_owner() {
        let (state, token) = setup(false).await;
        let mut p = parts(Some(&format!("Bearer {token}")));
        let AuthUser(user) = AuthUser::from_request_parts(&mut p, &state).await.unwrap();
        assert_eq!(user.email, "alice@x.com");
    }

    #[tokio::test]
    async fn missing_and_malformed_headers() {
        let (state, token) = setup(true).await;

        let mut p = parts(None);
        assert!(matches!(
            AuthUser::from_request_parts(&mut p, &state).await,
            Err(AppError::AuthenticationRequired)
        ));

        let mut p = parts(Some(&format!("Token {token}")));
        assert!(matches!(
            AuthUser::from_request_parts(&mut p, &state).await,
            Err(AppError::InvalidOrExpiredToken)
        ));

        let mut p = parts(Some("Bearer ???"));
        assert!(matches!(
            AuthUser::from_request_parts(&mut p, &state).await,
            Err(AppError::InvalidOrExpiredToken)
        ));
    }

    #[tokio::test]
    async fn activation_gate() {
        let (state, token) = setup(false).await;
        let mut p = parts(Some(&format!("Bearer {token}")));
        assert!(matches!(
            ActivatedUser::from_request_parts(&mut p, &state).await,
            Err(AppError::InactiveAccount)
        ));

        let (state, token) = setup(true).await;
        let mut p = parts(Some(&format!("Bearer {token}")));
        assert!(ActivatedUser::from_request_parts(&mut p, &state).await.is_ok());
    }
}
