pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use handlers::PatientState;
pub use router::patient_routes;
