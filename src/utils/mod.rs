//! Shared utilities: the crate's error types and the logging bootstrap.

pub mod error;
pub mod logging;
