// libs/appointment-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AppointmentState};

pub fn appointment_routes(state: AppointmentState) -> Router {
    // All appointment operations require authentication
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/doctors", get(handlers::list_doctors))
        .route("/doctors/{doctor_id}/slots", get(handlers::get_available_slots))

        // Listings
        .route("/doctor", get(handlers::get_doctor_appointments))
        .route("/doctor/live", get(handlers::stream_doctor_appointments))
        .route("/patient", get(handlers::get_patient_appointments))

        // Status workflow
        .route(
            "/{doctor_id}/{patient_id}/{appointment_id}/status",
            patch(handlers::update_appointment_status),
        )
        .route(
            "/{doctor_id}/{patient_id}/{appointment_id}/reschedule",
            patch(handlers::reschedule_appointment),
        )

        // Reports
        .route("/reports/daily", get(handlers::get_daily_report))
        .route("/reports/monthly", get(handlers::get_monthly_report))

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
