//! API endpoint handlers

pub mod health;
pub mod reports;
pub mod sessions;
pub mod webhook;

pub use health::health_routes;
pub use reports::report_routes;
pub use sessions::session_routes;
pub use webhook::webhook_routes;
