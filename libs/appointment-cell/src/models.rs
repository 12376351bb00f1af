// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use shared_database::StoreError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Rescheduled,
    /// Written by other clients of the shared store. Counted in reports,
    /// never entered or left through the status workflow.
    Completed,
    /// Stored record with a missing or unrecognised `Status`. Still blocks
    /// nearby slots; takes no part in the workflow.
    #[serde(skip_deserializing)]
    Unknown,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "Pending"),
            AppointmentStatus::Confirmed => write!(f, "Confirmed"),
            AppointmentStatus::Cancelled => write!(f, "Cancelled"),
            AppointmentStatus::Rescheduled => write!(f, "Rescheduled"),
            AppointmentStatus::Completed => write!(f, "Completed"),
            AppointmentStatus::Unknown => write!(f, "Unknown"),
        }
    }
}

impl FromStr for AppointmentStatus {
    type Err = AppointmentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "cancelled" | "canceled" => Ok(AppointmentStatus::Cancelled),
            "rescheduled" => Ok(AppointmentStatus::Rescheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            other => Err(AppointmentError::ValidationError(format!("Unknown status '{}'", other))),
        }
    }
}

/// One scheduled or requested visit, identified by
/// `(doctor_id, patient_id, appointment_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub appointment_id: String,
    pub doctor_id: String,
    pub patient_id: String,
    pub date_time: DateTime<Utc>,
    pub patient_name: String,
    pub doctor_name: String,
    pub note: String,
    pub status: AppointmentStatus,
    pub email: String,
}

impl Appointment {
    pub fn key(&self) -> AppointmentKey {
        AppointmentKey {
            doctor_id: self.doctor_id.clone(),
            patient_id: self.patient_id.clone(),
            appointment_id: self.appointment_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppointmentKey {
    pub doctor_id: String,
    pub patient_id: String,
    pub appointment_id: String,
}

impl AppointmentKey {
    pub fn path(&self) -> String {
        format!(
            "appointments/{}/{}/{}",
            self.doctor_id, self.patient_id, self.appointment_id
        )
    }
}

/// Appointment as it is laid out in the store. Ids may be missing on records
/// written by older clients; they are recovered from the record's path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    #[serde(rename = "AppointmentID", default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    #[serde(rename = "DoctorID", default, skip_serializing_if = "Option::is_none")]
    pub doctor_id: Option<String>,
    #[serde(rename = "PatientID", default, skip_serializing_if = "Option::is_none")]
    pub patient_id: Option<String>,
    #[serde(rename = "DateTime")]
    pub date_time: DateTime<Utc>,
    #[serde(rename = "PatientName", default)]
    pub patient_name: String,
    #[serde(rename = "DoctorName", default)]
    pub doctor_name: String,
    #[serde(rename = "Note", default)]
    pub note: String,
    #[serde(rename = "Status", default)]
    pub status: Option<String>,
    #[serde(default)]
    pub email: String,
}

impl AppointmentRecord {
    pub fn into_appointment(self, key: AppointmentKey) -> Appointment {
        let status = match self.status.as_deref().map(str::parse::<AppointmentStatus>) {
            Some(Ok(status)) => status,
            Some(Err(e)) => {
                warn!("Appointment at '{}' has {}", key.path(), e);
                AppointmentStatus::Unknown
            }
            None => {
                warn!("Appointment at '{}' has no status", key.path());
                AppointmentStatus::Unknown
            }
        };

        Appointment {
            status,
            appointment_id: self.appointment_id.unwrap_or(key.appointment_id),
            doctor_id: self.doctor_id.unwrap_or(key.doctor_id),
            patient_id: self.patient_id.unwrap_or(key.patient_id),
            date_time: self.date_time,
            patient_name: self.patient_name,
            doctor_name: self.doctor_name,
            note: self.note,
            email: self.email,
        }
    }
}

impl From<&Appointment> for AppointmentRecord {
    fn from(appointment: &Appointment) -> Self {
        Self {
            appointment_id: Some(appointment.appointment_id.clone()),
            doctor_id: Some(appointment.doctor_id.clone()),
            patient_id: Some(appointment.patient_id.clone()),
            date_time: appointment.date_time,
            patient_name: appointment.patient_name.clone(),
            doctor_name: appointment.doctor_name.clone(),
            note: appointment.note.clone(),
            status: Some(appointment.status.to_string()),
            email: appointment.email.clone(),
        }
    }
}

/// Candidate 30-minute slot. Derived per request, never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeSlot {
    /// Wall-clock start in the clinic's time zone, `HH:MM`.
    pub time: String,
    pub starts_at: DateTime<Utc>,
    pub is_disabled: bool,
}

// ==============================================================================
// REFERENCE ENTITIES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DoctorProfile {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Spl", default)]
    pub specialty: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// One entry of the doctor directory patients pick from when booking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DoctorSummary {
    pub doctor_id: String,
    pub name: String,
    pub specialty: String,
    pub image: Option<String>,
}

/// The slice of a patient profile a booking needs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PatientContact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub age: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub health_number: Option<String>,
}

/// Profile fields are free text in the app but some clients write numbers.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Doctor,
    Patient,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: String,
    pub date: NaiveDate,
    /// A slot start as produced by slot generation, `HH:MM`.
    pub time: String,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppointmentReport {
    pub total: u32,
    pub completed: u32,
    pub cancelled: u32,
    pub rescheduled: u32,
    pub prescriptions: u32,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AppointmentError {
    #[error("Appointment not found")]
    NotFound,

    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("There is already an appointment scheduled within 15 minutes of the selected time")]
    BookingConflict,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Notification failure: {0}")]
    NotificationFailure(String),
}

impl From<StoreError> for AppointmentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unauthorized(msg) => AppointmentError::AuthError(msg),
            StoreError::InvalidPath(msg) => AppointmentError::ValidationError(msg),
            other => AppointmentError::NetworkFailure(other.to_string()),
        }
    }
}
