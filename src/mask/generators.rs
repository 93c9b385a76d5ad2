//! Mask term generators: axicon ramp, lens term, angular sector blend.
//!
//! All three work on the `u16` working arrays the compositor combines; the
//! cast to 8 bits happens only once, after composition. Degenerate inputs
//! (single-pixel frames, zero periods, zero focal length) never divide by
//! zero; they yield all-zero terms instead.

use ndarray::Array2;
use std::f64::consts::PI;

use super::grid::GeometryGrid;
use super::GRAY_MAX;

/// Axicon phase ramp: a sawtooth descending from `period` to 1 with spatial
/// period `period` pixels, radially symmetric (or elliptical, per the grid's
/// weights), normalized to `min(gray_ceiling, 255)`.
pub fn axicon(
    grid: &GeometryGrid,
    period: u32,
    offset: (i32, i32),
    gray_ceiling: u16,
) -> Array2<u16> {
    let shape = grid.shape();
    if period == 0 {
        return Array2::zeros(shape);
    }
    let raw = Array2::from_shape_fn(shape, |(row, col)| {
        let r = grid.radius(row, col, offset);
        period - (r.floor() as u32 % period)
    });
    let max = raw.iter().copied().max().unwrap_or(0);
    if max == 0 {
        return Array2::zeros(shape);
    }
    let ceiling = f64::from(gray_ceiling.min(GRAY_MAX));
    raw.mapv(|v| (f64::from(v) / f64::from(max) * ceiling).round() as u16)
}

/// Wrapped quadratic (Fresnel-lens) phase term: `floor(r² / 2f) mod 255`.
///
/// The reduction uses the Euclidean remainder so diverging lenses (negative
/// focal lengths) still land in `[0, 254]`. A zero focal length disables the
/// term entirely.
pub fn lens(grid: &GeometryGrid, focal_length: f64, offset: (i32, i32)) -> Array2<u16> {
    let shape = grid.shape();
    if focal_length == 0.0 {
        return Array2::zeros(shape);
    }
    Array2::from_shape_fn(shape, |(row, col)| {
        let r = grid.radius(row, col, offset);
        let wrapped = (r * r / (2.0 * focal_length)).floor() as i64;
        wrapped.rem_euclid(i64::from(GRAY_MAX)) as u16
    })
}

/// Interleaves two masks over radial sectors.
///
/// The full azimuth is split into `sections` equal wedges ordered by
/// `atan2(-(x+dx), -(y+dy)) + π`. Pixels whose angle falls in an
/// even-indexed wedge take `mask_b`'s value; the rest keep `mask_a`. Wedges
/// are half-open `[θ, θ+Δθ)`, with the 2π endpoint wrapping to wedge 0, so
/// every pixel is assigned from exactly one of the two inputs.
pub fn blend(
    mask_a: &Array2<u16>,
    mask_b: &Array2<u16>,
    grid: &GeometryGrid,
    offset: (i32, i32),
    sections: usize,
) -> Array2<u16> {
    let shape = grid.shape();
    if sections == 0 {
        return mask_a.clone();
    }
    let wedge_width = 2.0 * PI / sections as f64;
    Array2::from_shape_fn(shape, |(row, col)| {
        let theta = grid.azimuth(row, col, offset);
        let wedge = (theta / wedge_width) as usize % sections;
        if wedge % 2 == 0 {
            mask_b[[row, col]]
        } else {
            mask_a[[row, col]]
        }
    })
}
