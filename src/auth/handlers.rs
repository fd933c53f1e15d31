use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::auth::dto::{
    ActivateRequest, LoginRequest, LoginResponse, MessageResponse, RefreshRequest,
    RefreshResponse, RegisterRequest, ResetPasswordRequest, UpdatePasswordRequest, UserEnvelope,
};
use crate::auth::extractors::AuthUser;
use crate::auth::services::AuthService;
use crate::error::AppError;
use crate::state::AppState;

pub const RESET_REQUESTED_MESSAGE: &str =
    "an email will be sent to you containing password reset instructions";

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/activated", put(activate))
        .route("/users/resetpassword", put(request_password_reset))
        .route("/users/updatepassword", put(update_password))
        .route("/users/me", get(get_me))
}

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/tokens/authentication", post(login))
        .route("/tokens/refresh", put(refresh))
}

#[instrument(skip(auth, payload))]
pub async fn register(
    State(auth): State<AuthService>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserEnvelope>), AppError> {
    let user = auth
        .register(&payload.name, &payload.email, &payload.password)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(UserEnvelope { user })))
}

#[instrument(skip(auth, payload))]
pub async fn activate(
    State(auth): State<AuthService>,
    Json(payload): Json<ActivateRequest>,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = auth.activate(&payload.token).await?;
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(auth, payload))]
pub async fn request_password_reset(
    State(auth): State<AuthService>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    auth.request_password_reset(&payload.email).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(MessageResponse {
            message: RESET_REQUESTED_MESSAGE.into(),
        }),
    ))
}

#[instrument(skip(auth, payload))]
pub async fn update_password(
    State(auth): State<AuthService>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<UserEnvelope>, AppError> {
    let user = auth
        .confirm_password_reset(&payload.token, &payload.password)
        .await?;
    Ok(Json(UserEnvelope { user }))
}

#[instrument(skip(auth, payload))]
pub async fn login(
    State(auth): State<AuthService>,
    Json(payload): Json<LoginRequest>,
) -> Result<(StatusCode, Json<LoginResponse>), AppError> {
    let session = auth.login(&payload.email, &payload.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            authentication_token: session.authentication,
            refresh_token: session.refresh,
        }),
    ))
}

#[instrument(skip(auth, payload))]
pub async fn refresh(
    State(auth): State<AuthService>,
    Json(payload): Json<RefreshRequest>,
) -> Result<(StatusCode, Json<RefreshResponse>), AppError> {
    let authentication_token = auth.refresh(&payload.refresh_token).await?;
    Ok((
        StatusCode::CREATED,
        Json(RefreshResponse {
            authentication_token,
        }),
    ))
}

#[instrument(skip(user), fields(user_id = user.id))]
pub async fn get_me(AuthUser(user): AuthUser) -> Json<UserEnvelope> {
    Json(UserEnvelope { user })
}
