pub mod attendance;
pub mod auth;
pub mod core;
pub mod dashboard;
pub mod reports;
pub mod setup;
pub mod students;
