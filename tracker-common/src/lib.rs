//! Shared types and utilities for the tracker crates.
//!
//! This crate holds the observability setup and the error type used by the
//! binary's output path. It stays small so every other crate can depend on it
//! without pulling in the HTTP or configuration stacks.
//!
//! # Overview
//!
//! - [`observability`]: `tracing` initialisation for binaries and tests
//! - [`TrackerError`] and [`Result`]: errors raised while persisting collected data
//!
//! ```rust
//! use tracker_common::TrackerError;
//!
//! let err = TrackerError::Output("data/sample is not a directory".into());
//! assert_eq!(err.to_string(), "Output error: data/sample is not a directory");
//! ```

pub mod observability;

/// Error types shared by the tracker binaries.
#[derive(thiserror::Error, Debug)]
pub enum TrackerError {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Records could not be encoded as JSON.
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The output location could not be used.
    #[error("Output error: {0}")]
    Output(String),
}

/// Convenient alias for results that use [`TrackerError`].
pub type Result<T> = std::result::Result<T, TrackerError>;
