//! Mask generation parameters.
//!
//! [`MaskParameters`] is the validated description of what to render: mask
//! resolution, the two axicon periods and their enable flags, the shared
//! center offset, the ellipticity correction, and the optional lens term.
//! It is produced by whatever frontend drives the crate (CLI flags, a saved
//! JSON file, a GUI) and consumed by [`crate::mask::compositor::generate`].
//!
//! The struct is a plain value: generation never mutates it, and two
//! identical values always render bit-identical masks.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use crate::error::{AppResult, SlmError};
use crate::validation::{is_finite, is_valid_dimension, is_valid_period};

fn default_dimensions() -> (u32, u32) {
    (1152, 960)
}
fn default_axicon1_enabled() -> bool {
    true
}
fn default_period1() -> u32 {
    30
}
fn default_period2() -> u32 {
    32
}

/// Validated configuration for one mask generation call.
///
/// Field defaults match the values the original bench tool seeds its panel
/// with: a 1152x960 frame, a single axicon of period 30, centered, circular,
/// no lens term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskParameters {
    /// Mask resolution in pixels, `(width, height)`. Must match the physical
    /// SLM active area once a device is connected; device-reported dimensions
    /// take precedence over user input.
    #[serde(default = "default_dimensions")]
    pub dimensions: (u32, u32),

    /// Render the first axicon ramp.
    #[serde(default = "default_axicon1_enabled")]
    pub axicon1_enabled: bool,

    /// Pixels per phase cycle of the first axicon.
    #[serde(default = "default_period1")]
    pub period1: u32,

    /// Interleave a second axicon into alternating angular sectors.
    #[serde(default)]
    pub axicon2_enabled: bool,

    /// Pixels per phase cycle of the second axicon.
    #[serde(default = "default_period2")]
    pub period2: u32,

    /// Center shift in pixels, shared by all terms.
    #[serde(default)]
    pub offset: (i32, i32),

    /// Ellipticity angles in degrees; each axis metric is scaled by cos²(α).
    #[serde(default)]
    pub ellipticity: (f64, f64),

    /// Add a wrapped quadratic (Fresnel-lens) phase term.
    #[serde(default)]
    pub lens_enabled: bool,

    /// Lens focal length in pixels; signed, negative diverges. A value of
    /// zero disables the lens regardless of the flag.
    #[serde(default)]
    pub lens_focal_length: f64,
}

impl Default for MaskParameters {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            axicon1_enabled: default_axicon1_enabled(),
            period1: default_period1(),
            axicon2_enabled: false,
            period2: default_period2(),
            offset: (0, 0),
            ellipticity: (0.0, 0.0),
            lens_enabled: false,
            lens_focal_length: 0.0,
        }
    }
}

impl MaskParameters {
    /// Checks every field for semantic validity.
    ///
    /// # Errors
    ///
    /// Returns [`SlmError::Validation`] naming the offending field when a
    /// dimension is zero, a period is below one pixel, or an angle or focal
    /// length is not finite.
    pub fn validate(&self) -> AppResult<()> {
        is_valid_dimension(self.dimensions.0)
            .map_err(|e| SlmError::Validation(format!("width: {e}")))?;
        is_valid_dimension(self.dimensions.1)
            .map_err(|e| SlmError::Validation(format!("height: {e}")))?;
        is_valid_period(self.period1).map_err(|e| SlmError::Validation(format!("period1: {e}")))?;
        is_valid_period(self.period2).map_err(|e| SlmError::Validation(format!("period2: {e}")))?;
        is_finite(self.ellipticity.0)
            .map_err(|e| SlmError::Validation(format!("ellipticity x: {e}")))?;
        is_finite(self.ellipticity.1)
            .map_err(|e| SlmError::Validation(format!("ellipticity y: {e}")))?;
        is_finite(self.lens_focal_length)
            .map_err(|e| SlmError::Validation(format!("lens focal length: {e}")))?;
        Ok(())
    }

    /// Loads a parameter set from a JSON file.
    pub fn load_json(path: &Path) -> AppResult<Self> {
        let file = File::open(path)?;
        let params: Self = serde_json::from_reader(BufReader::new(file))?;
        params.validate()?;
        Ok(params)
    }

    /// Saves this parameter set to a JSON file, pretty-printed.
    pub fn save_json(&self, path: &Path) -> AppResult<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    /// Overrides the frame size with device-reported dimensions.
    pub fn with_device_dimensions(mut self, dimensions: (u32, u32)) -> Self {
        self.dimensions = dimensions;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let params = MaskParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.dimensions, (1152, 960));
        assert_eq!(params.period1, 30);
        assert!(!params.axicon2_enabled);
        assert_eq!(params.period2, 32);
    }

    #[test]
    fn zero_width_rejected() {
        let params = MaskParameters {
            dimensions: (0, 960),
            ..Default::default()
        };
        let err = params.validate().unwrap_err();
        assert!(err.to_string().contains("width"));
    }

    #[test]
    fn zero_period_rejected() {
        let params = MaskParameters {
            period1: 0,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn nan_ellipticity_rejected() {
        let params = MaskParameters {
            ellipticity: (f64::NAN, 0.0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn json_round_trip_preserves_all_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        let params = MaskParameters {
            dimensions: (512, 512),
            axicon1_enabled: true,
            period1: 17,
            axicon2_enabled: true,
            period2: 23,
            offset: (-4, 9),
            ellipticity: (12.5, -3.0),
            lens_enabled: true,
            lens_focal_length: -4000.0,
        };
        params.save_json(&path).unwrap();
        let restored = MaskParameters::load_json(&path).unwrap();
        assert_eq!(params, restored);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let params: MaskParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(params, MaskParameters::default());
    }
}
