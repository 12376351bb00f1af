use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use shared_database::{BlobError, StoreError};
pub use shared_utils::inline_file::{InlineFile, InlineFileError};

/// Doctor profile as stored under `doctors/{key}`. Field names follow the
/// records the booking screens already read.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DoctorProfile {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Spl", default)]
    pub specialty: String,
    #[serde(rename = "Phone", default, deserialize_with = "lenient_phone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

// Older records hold the phone as a number.
fn lenient_phone<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Partial profile update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateDoctorRequest {
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("Unauthorized access to doctor data")]
    UnauthorizedAccess,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("File storage failure: {0}")]
    StorageFailure(String),
}

impl From<StoreError> for DoctorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized(_) => DoctorError::UnauthorizedAccess,
            StoreError::InvalidPath(msg) => DoctorError::ValidationError(msg),
            other => DoctorError::NetworkFailure(other.to_string()),
        }
    }
}

impl From<InlineFileError> for DoctorError {
    fn from(err: InlineFileError) -> Self {
        DoctorError::ValidationError(err.to_string())
    }
}

impl From<BlobError> for DoctorError {
    fn from(err: BlobError) -> Self {
        DoctorError::StorageFailure(err.to_string())
    }
}
