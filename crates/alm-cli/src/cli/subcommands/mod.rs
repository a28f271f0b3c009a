mod auth;
mod exposure;

pub use auth::{AuthCommands, AuthSetTokenArgs};
pub use exposure::ExposureCommands;
