//! Account flows: registration, activation, login, refresh and password reset.
//!
//! Every flow that changes a user commits the change through the versioned
//! update first and only then purges tokens, so a conflicting write leaves
//! the caller's tokens usable for a retry.

use std::sync::Arc;

use axum::extract::FromRef;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::auth::password::{hash_password, verify_against_dummy, verify_password};
use crate::background::Background;
use crate::config::TokenConfig;
use crate::db::StoreError;
use crate::error::AppError;
use crate::mailer::{templates, Mailer};
use crate::state::AppState;
use crate::tokens::{Token, TokenScope, TokenService};
use crate::users::{NewUser, User, UserRepo};
use crate::validator::{
    normalize_email, not_blank, validate_email, validate_name, validate_password_plaintext,
    Validator,
};

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserRepo>,
    tokens: TokenService,
    mailer: Arc<dyn Mailer>,
    background: Background,
    ttls: TokenConfig,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        Self::new(
            state.users.clone(),
            TokenService::from_ref(state),
            state.mailer.clone(),
            state.background.clone(),
            state.config.tokens.clone(),
        )
    }
}

/// Tokens handed out by a successful login.
#[derive(Debug)]
pub struct Session {
    pub authentication: Token,
    pub refresh: Token,
}

fn validate_token_present(v: &mut Validator, token: &str) {
    v.check(not_blank(token), "token", "must be provided");
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        tokens: TokenService,
        mailer: Arc<dyn Mailer>,
        background: Background,
        ttls: TokenConfig,
    ) -> Self {
        Self {
            users,
            tokens,
            mailer,
            background,
            ttls,
        }
    }

    async fn issue(&self, user_id: i64, scope: TokenScope) -> Result<Token, AppError> {
        self.tokens.create(user_id, self.ttls.ttl(scope), scope).await
    }

    fn send_later(
        &self,
        job: &'static str,
        recipient: String,
        template: &'static str,
        data: serde_json::Value,
    ) {
        let mailer = self.mailer.clone();
        self.background.spawn(job, async move {
            mailer.send(&recipient, template, data).await
        });
    }

    /// Creates an unactivated account and mails its activation token.
    #[instrument(skip(self, name, password))]
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let email = normalize_email(email);
        let mut v = Validator::new();
        validate_name(&mut v, name);
        validate_email(&mut v, &email);
        validate_password_plaintext(&mut v, password);
        v.finish()?;

        let user = self
            .users
            .insert(NewUser {
                name: name.trim().to_string(),
                email,
                password_hash: hash_password(password)?,
            })
            .await?;

        let token = self.issue(user.id, TokenScope::Activation).await?;
        self.send_later(
            "user_welcome_email",
            user.email.clone(),
            templates::USER_WELCOME,
            json!({
                "userId": user.id,
                "activationToken": token.plaintext,
                "expiresIn": templates::describe_lifetime(self.ttls.ttl(TokenScope::Activation)),
            }),
        );

        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    #[instrument(skip(self, token))]
    pub async fn activate(&self, token: &str) -> Result<User, AppError> {
        let mut v = Validator::new();
        validate_token_present(&mut v, token);
        v.finish()?;

        let mut user = self.tokens.find_valid(token, TokenScope::Activation).await?;
        user.activated = true;
        self.users.update(&mut user).await?;
        self.tokens
            .purge_for_user_scope(user.id, TokenScope::Activation)
            .await?;

        info!(user_id = user.id, version = user.version, "user activated");
        Ok(user)
    }

    /// Unknown email and wrong password both end as `InvalidCredentials`.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AppError> {
        let email = normalize_email(email);
        let mut v = Validator::new();
        validate_email(&mut v, &email);
        validate_password_plaintext(&mut v, password);
        v.finish()?;

        let user = match self.users.get_by_email(&email).await {
            Ok(user) => Some(user),
            Err(StoreError::NotFound) => None,
            Err(e) => return Err(e.into()),
        };
        let matched = match &user {
            Some(user) => verify_password(password, &user.password_hash)?,
            None => {
                verify_against_dummy(password);
                false
            }
        };
        let Some(user) = user.filter(|_| matched) else {
            warn!("login rejected");
            return Err(AppError::InvalidCredentials);
        };

        let authentication = self.issue(user.id, TokenScope::Authentication).await?;
        let refresh = self.issue(user.id, TokenScope::Refresh).await?;
        info!(user_id = user.id, "user logged in");
        Ok(Session {
            authentication,
            refresh,
        })
    }

    /// New authentication token for a live refresh token. The refresh token stays valid.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token, AppError> {
        let mut v = Validator::new();
        v.check(not_blank(refresh_token), "refresh_token", "must be provided");
        v.finish()?;

        let user = self.tokens.find_valid(refresh_token, TokenScope::Refresh).await?;
        let token = self.issue(user.id, TokenScope::Authentication).await?;
        debug!(user_id = user.id, "authentication token refreshed");
        Ok(token)
    }

    /// Mails a reset token when the account exists. Callers see the same
    /// outcome whether or not it does.
    #[instrument(skip(self, email))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        let mut v = Validator::new();
        validate_email(&mut v, &email);
        v.finish()?;

        let user = match self.users.get_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                debug!("password reset requested for unknown email");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        let token = self.issue(user.id, TokenScope::PasswordReset).await?;
        self.send_later(
            "password_reset_email",
            user.email,
            templates::PASSWORD_RESET,
            json!({
                "passwordResetToken": token.plaintext,
                "expiresIn": templates::describe_lifetime(self.ttls.ttl(TokenScope::PasswordReset)),
            }),
        );
        info!(user_id = user.id, "password reset requested");
        Ok(())
    }

    /// Sets a new password and revokes every token the user holds.
    #[instrument(skip(self, token, password))]
    pub async fn confirm_password_reset(
        &self,
        token: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let mut v = Validator::new();
        validate_password_plaintext(&mut v, password);
        validate_token_present(&mut v, token);
        v.finish()?;

        let mut user = self.tokens.find_valid(token, TokenScope::PasswordReset).await?;
        user.password_hash = hash_password(password)?;
        self.users.update(&mut user).await?;
        self.tokens.purge_all_for_user(user.id).await?;

        info!(user_id = user.id, version = user.version, "password reset");
        Ok(user)
    }
}
