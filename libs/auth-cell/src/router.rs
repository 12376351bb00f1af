use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, AuthState};

pub fn auth_routes(state: AuthState) -> Router {
    let public_routes = Router::new()
        .route("/signup", post(handlers::sign_up))
        .route("/login/patient", post(handlers::login_patient))
        .route("/login/doctor", post(handlers::login_doctor))
        .route("/password-reset", post(handlers::request_password_reset));

    let protected_routes = Router::new()
        .route("/verify", get(handlers::verify_token))
        .layer(middleware::from_fn_with_state(state.config.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
