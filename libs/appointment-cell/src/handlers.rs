// libs/appointment-cell/src/handlers.rs
use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::NaiveDate;
use futures::stream::{self, Stream};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use notification_cell::{EmailJsDispatcher, NotificationDispatcher};
use shared_config::AppConfig;
use shared_database::{HierarchicalStore, RealtimeDbClient};
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::{require_doctor, require_patient};

use crate::models::{
    Actor, AppointmentError, AppointmentKey, BookAppointmentRequest, RescheduleAppointmentRequest,
    UpdateStatusRequest,
};
use crate::services::booking::{AppointmentBookingService, DoctorListing};
use crate::services::reports::{AppointmentReportService, ReportPeriod};

/// Shared handler state: configuration plus the services built on the
/// configured store and notification dispatcher.
#[derive(Clone)]
pub struct AppointmentState {
    pub config: Arc<AppConfig>,
    pub booking: Arc<AppointmentBookingService>,
    pub reports: Arc<AppointmentReportService>,
}

impl AppointmentState {
    pub fn new(
        config: Arc<AppConfig>,
        store: Arc<dyn HierarchicalStore>,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            booking: Arc::new(AppointmentBookingService::new(&config, Arc::clone(&store), notifier)),
            reports: Arc::new(AppointmentReportService::new(&config, store)),
            config,
        }
    }

    pub fn from_config(config: Arc<AppConfig>) -> Self {
        let store: Arc<dyn HierarchicalStore> = Arc::new(RealtimeDbClient::new(&config));
        let notifier: Arc<dyn NotificationDispatcher> = Arc::new(EmailJsDispatcher::new(&config));
        Self::new(config, store, notifier)
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotFound
            | AppointmentError::DoctorNotFound
            | AppointmentError::PatientNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::AuthError(msg) => AppError::Auth(msg),
            AppointmentError::BookingConflict => AppError::Conflict(err.to_string()),
            AppointmentError::InvalidTransition { .. } => AppError::BadRequest(err.to_string()),
            AppointmentError::ValidationError(msg) => AppError::ValidationError(msg),
            AppointmentError::NetworkFailure(msg) => AppError::Network(msg),
            AppointmentError::NotificationFailure(msg) => AppError::Internal(msg),
        }
    }
}

fn actor_of(user: &User) -> Result<Actor, AppError> {
    if user.is_doctor() {
        Ok(Actor::Doctor)
    } else if user.is_patient() {
        Ok(Actor::Patient)
    } else {
        Err(AppError::Forbidden("Unknown role".to_string()))
    }
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize, Default)]
pub struct DoctorListingQuery {
    pub date: Option<NaiveDate>,
    pub pending: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct DailyReportQuery {
    pub date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct MonthlyReportQuery {
    /// `YYYY-MM`
    pub month: String,
}

// ==============================================================================
// SLOTS AND BOOKING
// ==============================================================================

pub async fn list_doctors(
    State(state): State<AppointmentState>,
) -> Result<Json<Value>, AppError> {
    let doctors = state.booking.doctors().await?;

    Ok(Json(json!({
        "doctors": doctors,
        "total": doctors.len(),
    })))
}

pub async fn get_available_slots(
    State(state): State<AppointmentState>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Value>, AppError> {
    let slots = state.booking.available_slots(&doctor_id, query.date).await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "date": query.date,
        "slots": slots,
    })))
}

pub async fn book_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    require_patient(&user)?;

    let appointment = state.booking.book_appointment(&user.id, request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "appointment": appointment,
            "message": "Appointment requested",
        })),
    ))
}

pub async fn update_appointment_status(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(key): Path<AppointmentKey>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let actor = actor_of(&user)?;
    let appointment = state
        .booking
        .update_status(actor, &user.id, &key, request.status)
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

pub async fn reschedule_appointment(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Path(key): Path<AppointmentKey>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let appointment = state.booking.reschedule(&user.id, &key, request).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
        "message": "Appointment rescheduled",
    })))
}

// ==============================================================================
// LISTINGS
// ==============================================================================

pub async fn get_doctor_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Query(query): Query<DoctorListingQuery>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let listing = DoctorListing {
        date: query.date,
        pending_only: query.pending.unwrap_or(false),
    };
    let appointments = state.booking.doctor_appointments(&user.id, listing).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

pub async fn get_patient_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_patient(&user)?;

    let appointments = state.booking.patient_appointments(&user.id).await?;

    Ok(Json(json!({
        "appointments": appointments,
        "total": appointments.len(),
    })))
}

/// Server-sent events carrying the doctor's appointment subtree whenever it
/// changes. Closing the connection ends the subscription.
pub async fn stream_doctor_appointments(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    require_doctor(&user)?;

    let subscription = state.booking.watch_doctor_appointments(&user.id);
    let events = stream::unfold(subscription, |mut subscription| async move {
        let snapshot = subscription.changed().await.ok()?;
        let event = Event::default()
            .event("appointments")
            .json_data(snapshot.unwrap_or(Value::Null))
            .unwrap_or_else(|e| {
                warn!("Failed to encode appointment snapshot: {}", e);
                Event::default().event("error")
            });
        Some((Ok(event), subscription))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

// ==============================================================================
// REPORTS
// ==============================================================================

pub async fn get_daily_report(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Query(query): Query<DailyReportQuery>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let report = state.reports.report(ReportPeriod::Day(query.date)).await?;

    Ok(Json(json!({
        "date": query.date,
        "report": report,
    })))
}

pub async fn get_monthly_report(
    State(state): State<AppointmentState>,
    Extension(user): Extension<User>,
    Query(query): Query<MonthlyReportQuery>,
) -> Result<Json<Value>, AppError> {
    require_doctor(&user)?;

    let period = ReportPeriod::month(&query.month)?;
    let report = state.reports.report(period).await?;

    Ok(Json(json!({
        "month": query.month,
        "report": report,
    })))
}
