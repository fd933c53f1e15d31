use serde::{Deserialize, Serialize};

use crate::tokens::Token;
use crate::users::User;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ActivateRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub password: String,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub authentication_token: Token,
    pub refresh_token: Token,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub authentication_token: Token,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}
