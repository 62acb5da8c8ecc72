//! # revpred Common Library
//!
//! Shared code for the revenue prediction service and its tools:
//! - Error types
//! - Bootstrap configuration loading (TOML + overrides)

pub mod config;
pub mod error;

pub use error::{Error, Result};
