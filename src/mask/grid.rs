//! Centered coordinate grid with ellipticity correction.
//!
//! All mask generators share the same radial metric: pixel coordinates are
//! centered on the frame, shifted by the user offset, and each axis is
//! weighted by cos²(α) of its ellipticity angle. The grid is recomputed per
//! generation call; it carries no state between calls.

use std::f64::consts::PI;

/// Centered axis coordinates: `W` evenly spaced samples spanning
/// `[-W/2, W/2]` inclusive. A collapsed axis (`n <= 1`) yields the single
/// coordinate 0 so downstream code never divides by a zero span.
fn centered_axis(n: u32) -> Vec<f64> {
    let n = n as usize;
    if n <= 1 {
        return vec![0.0];
    }
    let half = n as f64 / 2.0;
    let step = n as f64 / (n - 1) as f64;
    (0..n).map(|i| -half + i as f64 * step).collect()
}

/// Precomputed coordinate grid for one `(dimensions, ellipticity)` pair.
#[derive(Debug, Clone)]
pub struct GeometryGrid {
    /// Per-column x coordinate.
    xs: Vec<f64>,
    /// Per-row y coordinate.
    ys: Vec<f64>,
    /// cos²(αx) weight on the x metric.
    wx: f64,
    /// cos²(αy) weight on the y metric.
    wy: f64,
}

impl GeometryGrid {
    /// Builds the grid for a `(width, height)` frame with ellipticity angles
    /// in degrees.
    pub fn new(dimensions: (u32, u32), ellipticity_deg: (f64, f64)) -> Self {
        let (width, height) = dimensions;
        Self {
            xs: centered_axis(width),
            ys: centered_axis(height),
            wx: ellipticity_deg.0.to_radians().cos().powi(2),
            wy: ellipticity_deg.1.to_radians().cos().powi(2),
        }
    }

    /// Grid shape as `(rows, cols)`, matching mask array shape.
    pub fn shape(&self) -> (usize, usize) {
        (self.ys.len(), self.xs.len())
    }

    /// Ellipticity-weighted radial coordinate of pixel `(row, col)` under the
    /// given center offset:
    /// `sqrt(cos²(αx)·(x+dx)² + cos²(αy)·(y+dy)²)`.
    pub fn radius(&self, row: usize, col: usize, offset: (i32, i32)) -> f64 {
        let x = self.xs[col] + f64::from(offset.0);
        let y = self.ys[row] + f64::from(offset.1);
        (self.wx * x * x + self.wy * y * y).sqrt()
    }

    /// Azimuth of pixel `(row, col)` about the offset center, in `[0, 2π]`.
    ///
    /// Computed as `atan2(-(x+dx), -(y+dy)) + π`; the sector blend treats the
    /// 2π endpoint as wrapping back to 0.
    pub fn azimuth(&self, row: usize, col: usize, offset: (i32, i32)) -> f64 {
        let x = self.xs[col] + f64::from(offset.0);
        let y = self.ys[row] + f64::from(offset.1);
        f64::atan2(-x, -y) + PI
    }
}
