//! Core error type.
//!
//! Sub-crates define their own error enums and wrap `FleetError` as one
//! variant via `#[from]`.

use thiserror::Error;

/// The top-level error type for `fleet-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum FleetError {
    /// Fatal at startup: empty fleet, depot off the grid, bad ranges, …
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Shorthand result type for all `fleet-*` crates.
pub type FleetResult<T> = Result<T, FleetError>;
