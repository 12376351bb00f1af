use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use shared_database::StoreError;
use shared_models::error::AppError;
use shared_utils::jwt::SessionError;

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub age: String,
    pub gender: String,
    pub blood_group: String,
    pub health_number: String,
    #[serde(default)]
    pub height: Option<String>,
    #[serde(default)]
    pub weight: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignUpResponse {
    pub user_id: String,
    pub email: String,
    pub verification_sent: bool,
}

/// Issued after a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user_id: String,
    pub email: String,
    pub role: String,
    /// The caller's profile record as stored (`users/{uid}` or `doctors/{key}`).
    pub profile: Option<Value>,
}

// ==============================================================================
// IDENTITY PROVIDER MODELS
// ==============================================================================

/// Account returned by a successful sign-up or sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityAccount {
    pub local_id: String,
    pub email: String,
    pub id_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub local_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: bool,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthCellError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid e-mail or password")]
    InvalidCredentials,

    #[error("Please verify your e-mail before logging in")]
    EmailNotVerified,

    #[error("No doctor is registered with this e-mail")]
    NotADoctor,

    #[error("An account with this e-mail already exists")]
    EmailExists,

    #[error("Identity provider rejected the request: {0}")]
    Provider(String),

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Session error: {0}")]
    Session(String),
}

impl From<StoreError> for AuthCellError {
    fn from(err: StoreError) -> Self {
        AuthCellError::Network(err.to_string())
    }
}

impl From<SessionError> for AuthCellError {
    fn from(err: SessionError) -> Self {
        AuthCellError::Session(err.to_string())
    }
}

impl From<reqwest::Error> for AuthCellError {
    fn from(err: reqwest::Error) -> Self {
        AuthCellError::Network(err.to_string())
    }
}

impl From<AuthCellError> for AppError {
    fn from(err: AuthCellError) -> Self {
        match err {
            AuthCellError::Validation(msg) => AppError::ValidationError(msg),
            AuthCellError::InvalidCredentials
            | AuthCellError::EmailNotVerified
            | AuthCellError::NotADoctor => AppError::Auth(err.to_string()),
            AuthCellError::EmailExists => AppError::Conflict(err.to_string()),
            AuthCellError::Provider(msg) => AppError::BadRequest(msg),
            AuthCellError::Network(msg) => AppError::Network(msg),
            AuthCellError::Session(msg) => AppError::Internal(msg),
        }
    }
}
