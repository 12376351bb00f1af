// libs/patient-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use notification_cell::{EmailJsDispatcher, NotificationDispatcher};
use shared_config::AppConfig;
use shared_database::{BlobStore, HierarchicalStore, RealtimeDbClient, StorageClient};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_doctor, require_patient};

use crate::models::{
    CreatePrescriptionRequest, InlineFile, PatientError, PatientSearchQuery, UpdateProfileRequest,
};
use crate::services::{PatientService, PrescriptionService};

#[derive(Clone)]
pub struct PatientState {
    pub config: Arc<AppConfig>,
    pub patients: Arc<PatientService>,
    pub prescriptions: Arc<PrescriptionService>,
}

impl PatientState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn HierarchicalStore>,
        blobs: Arc<dyn BlobStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            patients: Arc::new(PatientService::new(Arc::clone(&store), Arc::clone(&blobs))),
            prescriptions: Arc::new(PrescriptionService::new(store, blobs, notifier)),
            config,
        }
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let store: Arc<dyn HierarchicalStore> = Arc::new(RealtimeDbClient::new(&config));
        let blobs: Arc<dyn BlobStore> = Arc::new(StorageClient::new(&config));
        let notifier: Arc<dyn NotificationDispatcher> = Arc::new(EmailJsDispatcher::new(&config));
        Self::new(config, store, blobs, notifier)
    }
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::NotFound => AppError::NotFound(err.to_string()),
            PatientError::Unauthorized => AppError::Forbidden(err.to_string()),
            PatientError::ValidationError(msg) => AppError::ValidationError(msg),
            PatientError::NetworkFailure(msg) => AppError::Network(msg),
            PatientError::StorageFailure(msg) => AppError::Network(msg),
        }
    }
}

// ==============================================================================
// OWN PROFILE (PATIENT)
// ==============================================================================

pub async fn get_my_profile(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let profile = state.patients.get_profile(&user.id).await?;
    Ok(Json(json!(profile)))
}

pub async fn update_my_profile(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let profile = state.patients.update_profile(&user.id, request).await?;
    Ok(Json(json!({
        "success": true,
        "profile": profile,
    })))
}

pub async fn upload_my_image(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Json(file): Json<InlineFile>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let url = state.patients.upload_profile_image(&user.id, file).await?;
    Ok(Json(json!({
        "success": true,
        "image": url,
    })))
}

pub async fn get_my_prescriptions(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let prescriptions = state.prescriptions.history(&user.id).await?;
    Ok(Json(json!({
        "total": prescriptions.len(),
        "prescriptions": prescriptions,
    })))
}

// ==============================================================================
// DOCTOR VIEWS
// ==============================================================================

pub async fn search_patients(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Query(query): Query<PatientSearchQuery>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let patients = state.patients.search(&query.q).await?;
    Ok(Json(json!({
        "total": patients.len(),
        "patients": patients,
    })))
}

pub async fn get_patient(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let profile = state.patients.get_profile(&patient_id).await?;
    Ok(Json(json!(profile)))
}

pub async fn create_prescription(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_doctor(&user)?;

    let prescription = state
        .prescriptions
        .create(&user.id, &patient_id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "prescription": prescription,
        })),
    ))
}

pub async fn get_patient_prescriptions(
    State(state): State<PatientState>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let prescriptions = state.prescriptions.history(&patient_id).await?;
    Ok(Json(json!({
        "total": prescriptions.len(),
        "prescriptions": prescriptions,
    })))
}
