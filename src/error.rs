//! Custom error types for the application.
//!
//! This module defines the primary error type, `SlmError`, for the entire
//! crate. Using the `thiserror` crate, it provides a centralized and
//! consistent way to handle the different kinds of failures that can occur,
//! from configuration and I/O issues to instrument-specific problems.
//!
//! ## Error Hierarchy
//!
//! - **`Config`**: Wraps errors from the `config` crate, typically file
//!   parsing or format issues in the settings TOML.
//! - **`Validation`**: Semantic errors in parameters or sweep configuration
//!   that pass parsing but are logically out of range (a zero mask dimension,
//!   a wavelength outside the meter's correction range). These are rejected
//!   before any device interaction.
//! - **`Io`** / **`Csv`** / **`Json`**: Wraps the standard I/O, CSV, and
//!   parameter-file serialization errors.
//! - **`DeviceUnavailable`**: The SLM boundary reported a failure (SDK load
//!   error, board not found, write/read failure). The preview path downgrades
//!   this to status text and keeps operating headless.
//! - **`Instrument`**: Power-meter communication or parse failures.
//! - **`Aborted`**: A calibration sweep observed its abort flag.
//! - **`InvalidState`**: A sweep operation was requested in a state that does
//!   not permit it.
//! - **`FeatureNotEnabled`**: Functionality compiled out via feature flags
//!   was requested, with a message telling the user how to enable it.

use thiserror::Error;

/// Convenience alias for results using the application error type.
pub type AppResult<T> = std::result::Result<T, SlmError>;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum SlmError {
    /// Settings file could not be loaded or deserialized.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// A parameter or sweep setting is out of range.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Calibration table could not be written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Parameter file could not be read or written.
    #[error("Parameter file error: {0}")]
    Json(#[from] serde_json::Error),

    /// The SLM boundary reported a failure.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The power meter reported a failure or a malformed reply.
    #[error("Instrument error: {0}")]
    Instrument(String),

    /// The calibration sweep was cancelled.
    #[error("Calibration sweep aborted")]
    Aborted,

    /// A sweep operation was requested outside its legal state.
    #[error("Invalid state for operation: {0}")]
    InvalidState(String),

    /// Feature-gated functionality was requested but compiled out.
    #[error("Feature '{0}' is not enabled. Rebuild with --features {0}")]
    FeatureNotEnabled(String),
}
