//! Core library for stockpile spontaneous-ignition forecasting
//!
//! This crate provides the core functionality for:
//! - CSV schema normalization and ingestion
//! - An append-only record store
//! - Feature reconstruction, categorical encoding and risk prediction
//! - Forecast aggregation and history queries
//! - Health checks and observability

pub mod health;
pub mod history;
pub mod ingest;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod store;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{IgnitionMetrics, StructuredLogger};
