pub mod booking;
pub mod conflict;
pub mod lifecycle;
pub mod reports;
pub mod repository;
pub mod slots;
