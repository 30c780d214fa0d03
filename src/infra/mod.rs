//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod host;
pub mod telemetry;
