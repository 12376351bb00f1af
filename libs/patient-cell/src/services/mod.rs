pub mod patient;
pub mod prescription;

pub use patient::PatientService;
pub use prescription::PrescriptionService;
