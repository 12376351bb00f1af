use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{appointment_routes, AppointmentState};
use auth_cell::{auth_routes, AuthState};
use doctor_cell::{doctor_routes, DoctorState};
use patient_cell::{patient_routes, PatientState};
use shared_config::AppConfig;

pub fn create_router(config: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic API is running!" }))
        .nest("/auth", auth_routes(AuthState::from_config(config.clone())))
        .nest("/appointments", appointment_routes(AppointmentState::from_config(config.clone())))
        .nest("/doctors", doctor_routes(DoctorState::from_config(config.clone())))
        .nest("/patients", patient_routes(PatientState::from_config(config)))
}
