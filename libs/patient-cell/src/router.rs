// libs/patient-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, PatientState};

pub fn patient_routes(state: PatientState) -> Router {
    let protected_routes = Router::new()
        // Signed-in patient
        .route("/me", get(handlers::get_my_profile).put(handlers::update_my_profile))
        .route("/me/image", post(handlers::upload_my_image))
        .route("/me/prescriptions", get(handlers::get_my_prescriptions))

        // Doctor views
        .route("/search", get(handlers::search_patients))
        .route("/{patient_id}", get(handlers::get_patient))
        .route(
            "/{patient_id}/prescriptions",
            post(handlers::create_prescription).get(handlers::get_patient_prescriptions),
        )

        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
