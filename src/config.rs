//! Application settings.
//!
//! Loaded from a TOML file via the `config` crate, with `SLM_`-prefixed
//! environment variables layered on top. Every field has a default, so a
//! missing file yields a fully usable configuration.
//!
//! ## Schema
//!
//! ```toml
//! output_dir = "calibration"
//! settle = "50ms"
//! average_count = 100
//! pixel_size_mm = 0.015
//! # lut_file = "slm4096.lut"
//!
//! [sdk]
//! bit_depth = 12
//! write_timeout_ms = 5000
//!
//! [parameters]
//! dimensions = [1152, 960]
//! period1 = 30
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::Config;
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, SlmError};
use crate::params::MaskParameters;

fn default_output_dir() -> PathBuf {
    PathBuf::from("calibration")
}
fn default_settle() -> Duration {
    Duration::from_millis(50)
}
fn default_average_count() -> u32 {
    100
}
fn default_pixel_size_mm() -> f64 {
    0.015
}
fn default_bit_depth() -> u32 {
    12
}
fn default_write_timeout_ms() -> u32 {
    5000
}

/// Vendor SDK parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkSettings {
    /// SLM bitness passed to SDK initialization.
    #[serde(default = "default_bit_depth")]
    pub bit_depth: u32,

    /// Image write timeout in milliseconds.
    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u32,
}

impl Default for SdkSettings {
    fn default() -> Self {
        Self {
            bit_depth: default_bit_depth(),
            write_timeout_ms: default_write_timeout_ms(),
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory receiving calibration CSV files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Liquid-crystal settling interval between a mask write and the meter
    /// read during a sweep.
    #[serde(with = "humantime_serde", default = "default_settle")]
    pub settle: Duration,

    /// Power-meter averaging count.
    #[serde(default = "default_average_count")]
    pub average_count: u32,

    /// Pixel pitch used for `.dat` export, in millimeters.
    #[serde(default = "default_pixel_size_mm")]
    pub pixel_size_mm: f64,

    /// Gray-level lookup table to load on connect, if any.
    #[serde(default)]
    pub lut_file: Option<PathBuf>,

    /// Vendor SDK parameters.
    #[serde(default)]
    pub sdk: SdkSettings,

    /// Seed mask parameters.
    #[serde(default)]
    pub parameters: MaskParameters,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            settle: default_settle(),
            average_count: default_average_count(),
            pixel_size_mm: default_pixel_size_mm(),
            lut_file: None,
            sdk: SdkSettings::default(),
            parameters: MaskParameters::default(),
        }
    }
}

impl Settings {
    /// Loads settings from an optional TOML file with `SLM_` environment
    /// overrides, then validates.
    pub fn load(path: Option<&Path>) -> AppResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings: Self = builder
            .add_source(config::Environment::with_prefix("SLM"))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Semantic checks after deserialization.
    pub fn validate(&self) -> AppResult<()> {
        if self.average_count == 0 {
            return Err(SlmError::Validation(
                "average_count must be at least 1".to_string(),
            ));
        }
        if !(self.pixel_size_mm.is_finite() && self.pixel_size_mm > 0.0) {
            return Err(SlmError::Validation(
                "pixel_size_mm must be positive".to_string(),
            ));
        }
        self.parameters.validate()
    }
}
