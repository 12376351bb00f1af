// libs/doctor-cell/src/router.rs
use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, DoctorState};

pub fn doctor_routes(state: DoctorState) -> Router {
    let protected_routes = Router::new()
        .route("/me", get(handlers::get_my_profile).put(handlers::update_my_profile))
        .route("/me/image", post(handlers::upload_my_image).delete(handlers::remove_my_image))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .with_state(state)
}
