//! Core module - shared infrastructure for bankdesk
//!
//! Foundational types, configuration, and error handling used throughout
//! the crate.

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, PolicyMode, RetryConfig};
pub use error::{DeskError, Result, RoundError};
pub use types::*;
