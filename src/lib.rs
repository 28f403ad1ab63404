//! devmate: local development companion
//!
//! Detects a project's container configuration, brings it up, and reports
//! whether every compose service is healthy and reachable.

pub mod cli;
pub mod core;
pub mod error;
pub mod utils;

pub use error::DevmateError;
