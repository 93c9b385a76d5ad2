//! Export of a mask to the plain-text `.dat` table lens-design software
//! imports.
//!
//! Format: a header line `rows cols pixel_size_mm pixel_size_mm 0.0 0.0`
//! followed by one line per pixel, row-major, `phase 0.0 0.0 0.0 0`, where
//! the phase is `gray / 255 · π` radians.

use std::f64::consts::PI;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::AppResult;
use crate::mask::GrayMask;

/// Default SLM pixel pitch in millimeters (15 µm).
pub const DEFAULT_PIXEL_SIZE_MM: f64 = 0.015;

/// Writes the `.dat` table for `mask` to `out`.
pub fn write_dat<W: Write>(mask: &GrayMask, pixel_size_mm: f64, out: &mut W) -> io::Result<()> {
    let (rows, cols) = mask.dim();
    writeln!(
        out,
        "{rows} {cols} {pixel_size_mm} {pixel_size_mm} 0.0 0.0"
    )?;
    for &gray in mask.iter() {
        let phase = f64::from(gray) / 255.0 * PI;
        writeln!(out, "{phase} 0.0 0.0 0.0 0")?;
    }
    Ok(())
}

/// Writes the `.dat` table for `mask` to a file at `path`.
pub fn export_dat(mask: &GrayMask, pixel_size_mm: f64, path: &Path) -> AppResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_dat(mask, pixel_size_mm, &mut writer)?;
    writer.flush()?;
    Ok(())
}
