use std::sync::Arc;

use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{HierarchicalStore, RealtimeDbClient};
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;

use crate::models::{LoginRequest, PasswordResetRequest, SessionResponse, SignUpRequest};
use crate::services::auth::AuthService;
use crate::services::identity::{IdentityProvider, IdentityToolkitClient};

#[derive(Clone)]
pub struct AuthState {
    pub config: Arc<AppConfig>,
    pub auth: Arc<AuthService>,
}

impl AuthState {
    pub fn new(
        config: Arc<AppConfig>,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn HierarchicalStore>,
    ) -> Self {
        Self {
            auth: Arc::new(AuthService::new(Arc::clone(&config), identity, store)),
            config,
        }
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let identity: Arc<dyn IdentityProvider> = Arc::new(IdentityToolkitClient::new(&config));
        let store: Arc<dyn HierarchicalStore> = Arc::new(RealtimeDbClient::new(&config));
        Self::new(config, identity, store)
    }
}

pub async fn sign_up(
    State(state): State<AuthState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let created = state.auth.sign_up(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "user": created,
            "message": "Verification email sent! Please verify your email before logging in.",
        })),
    ))
}

pub async fn login_patient(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(state.auth.login_patient(request).await?))
}

pub async fn login_doctor(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    Ok(Json(state.auth.login_doctor(request).await?))
}

pub async fn request_password_reset(
    State(state): State<AuthState>,
    Json(request): Json<PasswordResetRequest>,
) -> Result<Json<Value>, AppError> {
    state.auth.request_password_reset(&request.email).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Password reset email sent",
    })))
}

/// Session check. The auth middleware has already validated the token.
pub async fn verify_token(Extension(user): Extension<User>) -> Json<TokenResponse> {
    debug!("Verified session for {}", user.id);

    Json(TokenResponse {
        valid: true,
        user_id: user.id,
        email: user.email,
        role: user.role,
    })
}
