//! HTTP service for the stockpile ignition forecaster

pub mod api;
pub mod config;
pub mod error;

pub use api::{create_router, serve, AppState};
pub use config::IgnitionConfig;
pub use error::{ApiError, ApiResult};
