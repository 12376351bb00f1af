// libs/doctor-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_database::{BlobStore, HierarchicalStore, RealtimeDbClient, StorageClient};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_doctor;

use crate::models::{DoctorError, InlineFile, UpdateDoctorRequest};
use crate::services::DoctorService;

#[derive(Clone)]
pub struct DoctorState {
    pub config: Arc<AppConfig>,
    pub doctors: Arc<DoctorService>,
}

impl DoctorState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn HierarchicalStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        Self {
            doctors: Arc::new(DoctorService::new(store, blobs)),
            config,
        }
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let store: Arc<dyn HierarchicalStore> = Arc::new(RealtimeDbClient::new(&config));
        let blobs: Arc<dyn BlobStore> = Arc::new(StorageClient::new(&config));
        Self::new(config, store, blobs)
    }
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound(err.to_string()),
            DoctorError::UnauthorizedAccess => AppError::Forbidden(err.to_string()),
            DoctorError::ValidationError(msg) => AppError::ValidationError(msg),
            DoctorError::NetworkFailure(msg) | DoctorError::StorageFailure(msg) => AppError::Network(msg),
        }
    }
}

pub async fn get_my_profile(
    State(state): State<DoctorState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let profile = state.doctors.get_profile(&user.id).await?;
    Ok(Json(json!(profile)))
}

pub async fn update_my_profile(
    State(state): State<DoctorState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let profile = state.doctors.update_profile(&user.id, request).await?;
    Ok(Json(json!({
        "success": true,
        "profile": profile,
    })))
}

pub async fn upload_my_image(
    State(state): State<DoctorState>,
    Extension(user): Extension<User>,
    Json(file): Json<InlineFile>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let url = state.doctors.upload_profile_image(&user.id, file).await?;
    Ok(Json(json!({
        "success": true,
        "image": url,
    })))
}

pub async fn remove_my_image(
    State(state): State<DoctorState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let profile = state.doctors.remove_profile_image(&user.id).await?;
    Ok(Json(json!({
        "success": true,
        "profile": profile,
    })))
}
