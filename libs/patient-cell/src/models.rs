use serde::{Deserialize, Serialize};
use serde_json::Value;

use shared_database::{BlobError, StoreError};
pub use shared_utils::inline_file::{InlineFile, InlineFileError};

/// Patient profile as stored under `users/{uid}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PatientProfile {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub blood_group: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub height: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub weight: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub health_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub age: Option<String>,
    pub gender: Option<String>,
    pub blood_group: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub health_number: Option<String>,
}

/// Row in the doctor's patient search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientSummary {
    pub patient_id: String,
    pub name: String,
    pub age: Option<String>,
    pub health_number: Option<String>,
    pub last_visit: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientSearchQuery {
    #[serde(default)]
    pub q: String,
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

/// Prescription as stored under `prescriptions/{doctor}/{patient}/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionRecord {
    pub prescription: String,
    /// `gs://bucket/path` of the attachment, if any.
    #[serde(default)]
    pub file_url: Option<String>,
    pub date: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePrescriptionRequest {
    pub prescription: String,
    pub attachment: Option<InlineFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prescription {
    pub id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub prescription: String,
    pub date: String,
    pub file_url: Option<String>,
    /// Resolved link to the attachment, when it could be resolved.
    pub download_url: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PatientError {
    #[error("Patient not found")]
    NotFound,

    #[error("Unauthorized access to patient data")]
    Unauthorized,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("File storage failure: {0}")]
    StorageFailure(String),
}

impl From<StoreError> for PatientError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized(_) => PatientError::Unauthorized,
            StoreError::InvalidPath(msg) => PatientError::ValidationError(msg),
            other => PatientError::NetworkFailure(other.to_string()),
        }
    }
}

impl From<InlineFileError> for PatientError {
    fn from(err: InlineFileError) -> Self {
        PatientError::ValidationError(err.to_string())
    }
}

impl From<BlobError> for PatientError {
    fn from(err: BlobError) -> Self {
        PatientError::StorageFailure(err.to_string())
    }
}
