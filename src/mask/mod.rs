//! Phase-mask synthesis engine.
//!
//! Everything in this module is pure computation: given a parameter set, the
//! submodules produce 2-D gray-level arrays with no device interaction and no
//! hidden state. The pipeline is
//!
//! 1. [`grid::GeometryGrid`] builds the centered, ellipticity-weighted coordinate
//!    grid shared by all generators;
//! 2. [`generators`] holds the axicon sawtooth ramp, the wrapped quadratic lens
//!    term, and the angular sector blend;
//! 3. [`compositor`] combines the enabled terms into one 8-bit mask;
//! 4. [`grating`] builds the binary gratings the calibration sweep writes.
//!
//! Masks are row-major [`ndarray::Array2`] values with shape
//! `(height, width)`. Composition happens in `u16` working precision so the
//! lens addition cannot overflow before its modulo reduction.

pub mod compositor;
pub mod generators;
pub mod grating;
pub mod grid;

/// An 8-bit gray-level image, one value per SLM pixel.
///
/// Row-major, shape `(height, width)`. A fresh value is produced on every
/// generation call; no identity persists between calls.
pub type GrayMask = ndarray::Array2<u8>;

/// Highest gray level the hardware accepts.
pub const GRAY_MAX: u16 = 255;

/// Number of angular wedges used when interleaving two axicon periods.
///
/// Must stay even: the blend overwrites every even-indexed wedge, so an odd
/// count would give the two periods unequal coverage.
pub const SECTOR_COUNT: usize = 64;
