//! # SLM Bessel Core Library
//!
//! This crate drives a phase-only spatial light modulator (SLM) used to
//! shape laser light into Bessel-beam-like patterns, and calibrates that SLM
//! against an optical power meter so that requested gray levels map linearly
//! to phase retardation. The library holds all the logic; the binary
//! (`main.rs`) is a thin headless CLI over it.
//!
//! ## Crate Structure
//!
//! - **`mask`**: the pure phase-mask synthesis engine: coordinate grid,
//!   axicon/lens generators, sector blend, compositor, and the binary
//!   gratings the calibration sweep writes.
//! - **`params`**: the validated [`params::MaskParameters`] value describing
//!   what to render, with JSON persistence.
//! - **`hardware`**: the device boundary: [`hardware::slm::SlmDevice`] and
//!   [`hardware::power_meter::PowerMeter`] traits, SCPI plumbing, mock
//!   implementations, and the feature-gated Meadowlark Blink adapter.
//! - **`calibration`**: the sweep state machine recording per-region
//!   gray-level/power CSV tables.
//! - **`preview`**: the explicit parameter-change → regenerate → push
//!   pipeline, plus the fire-and-forget temperature poller.
//! - **`export`**: `.dat` table export for lens-design software.
//! - **`config`**: TOML application settings.
//! - **`error`**: the central [`error::SlmError`] type.
//! - **`validation`**: small parameter validators shared by the above.

pub mod calibration;
pub mod config;
pub mod error;
pub mod export;
pub mod hardware;
pub mod mask;
pub mod params;
pub mod preview;
pub mod validation;

pub use error::{AppResult, SlmError};
pub use mask::GrayMask;
pub use params::MaskParameters;
