//! Common utilities shared across the unit of work and its adapters.
//!
//! This crate provides:
//! - Unified error handling for registry, coordinator and adapter failures
//! - Configuration structures loaded from the environment
//! - Tracing subscriber initialisation

pub mod config;
pub mod constants;
pub mod error;
pub mod telemetry;

pub use config::*;
pub use error::{AppError, AppResult, OptionExt};
