//! Infrastructure adapters and runtime bootstrap.

pub mod blobs;
pub mod error;
pub mod telemetry;
