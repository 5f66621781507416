//! # ClassTrack Common Library
//!
//! Shared code for the ClassTrack backend:
//! - Error types (`Error` enum with crate-wide `Result` alias)
//! - Configuration loading (TOML file + environment overrides)
//! - Timestamp utilities (month windows, RFC3339 round-tripping)

pub mod config;
pub mod error;
pub mod time;

pub use error::{Error, Result};
