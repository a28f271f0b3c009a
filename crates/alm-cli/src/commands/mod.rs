pub mod analyze;
pub mod auth;
pub mod config;
pub mod dispatch;
pub mod exposure;
pub mod me;
pub mod report;
