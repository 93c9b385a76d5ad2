//! Combines enabled mask terms into one 8-bit gray-level mask.
//!
//! This is the pure function the rest of the system is built around:
//! identical parameters always yield a bit-identical mask, and nothing here
//! touches a device, a file, or any shared state.

use ndarray::Array2;

use super::generators::{axicon, blend, lens};
use super::grid::GeometryGrid;
use super::{GrayMask, GRAY_MAX, SECTOR_COUNT};
use crate::error::AppResult;
use crate::params::MaskParameters;

/// Renders the mask described by `params`.
///
/// Composition order: axicon 1 (if enabled), then axicon 2 interleaved over
/// 64 angular sectors (if enabled), then the lens term added modulo 255 (if
/// enabled and the focal length is non-zero). Working precision is `u16`
/// until the final cast so the lens addition cannot overflow.
///
/// # Errors
///
/// Returns [`crate::error::SlmError::Validation`] if `params` fails
/// validation; no computation happens in that case.
pub fn generate(params: &MaskParameters) -> AppResult<GrayMask> {
    params.validate()?;

    let grid = GeometryGrid::new(params.dimensions, params.ellipticity);
    let mut result = Array2::<u16>::zeros(grid.shape());

    if params.axicon1_enabled {
        result = axicon(&grid, params.period1, params.offset, GRAY_MAX);
    }

    if params.axicon2_enabled {
        let second = axicon(&grid, params.period2, params.offset, GRAY_MAX);
        result = blend(&result, &second, &grid, params.offset, SECTOR_COUNT);
    }

    if params.lens_enabled && params.lens_focal_length != 0.0 {
        let lens_term = lens(&grid, params.lens_focal_length, params.offset);
        result = &result + &lens_term;
        result.mapv_inplace(|v| v % GRAY_MAX);
    }

    Ok(result.mapv(|v| v as u8))
}
