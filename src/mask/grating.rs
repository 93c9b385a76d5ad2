//! Binary calibration gratings and the 8x8 region tiling.
//!
//! The calibration sweep never uses the axicon compositor; it writes a plain
//! vertical-stripe grating whose diffracted power tracks the phase depth of
//! the swept gray level. Regional sweeps restrict the grating to one tile of
//! an 8x8 partition of the frame and leave every other pixel at zero.

use std::ops::Range;

use ndarray::Array2;

use super::GrayMask;

/// Tiles per side of the regional partition.
pub const REGION_GRID: u8 = 8;

/// Total number of regions in a regional sweep.
pub const REGION_COUNT: u8 = REGION_GRID * REGION_GRID;

/// Full-frame binary grating: vertical stripes `pitch` pixels wide.
///
/// Columns whose stripe index is even carry `gray`; the rest are zero. A
/// pitch of zero is treated as one pixel.
pub fn binary_grating(dimensions: (u32, u32), pitch: u32, gray: u8) -> GrayMask {
    let (width, height) = dimensions;
    let pitch = pitch.max(1);
    Array2::from_shape_fn((height as usize, width as usize), |(_, col)| {
        if (col as u32 / pitch) % 2 == 0 {
            gray
        } else {
            0
        }
    })
}

/// Pixel bounds of one region, row-major over the 8x8 tiling
/// (`row = region / 8`, `col = region % 8`).
///
/// Spans are computed as `(k·extent)/8 .. ((k+1)·extent)/8`, so frames whose
/// sides are not multiples of eight still partition exactly, with no pixel in
/// two tiles and none left out.
pub fn tile_bounds(region: u8, dimensions: (u32, u32)) -> (Range<usize>, Range<usize>) {
    let (width, height) = (dimensions.0 as usize, dimensions.1 as usize);
    let grid = REGION_GRID as usize;
    let row = (region / REGION_GRID) as usize;
    let col = (region % REGION_GRID) as usize;
    let rows = (row * height) / grid..((row + 1) * height) / grid;
    let cols = (col * width) / grid..((col + 1) * width) / grid;
    (rows, cols)
}

/// Binary grating restricted to one region tile; pixels outside the tile are
/// zero.
pub fn regional_grating(dimensions: (u32, u32), pitch: u32, gray: u8, region: u8) -> GrayMask {
    let (width, height) = dimensions;
    let pitch = pitch.max(1);
    let (rows, cols) = tile_bounds(region, dimensions);
    Array2::from_shape_fn((height as usize, width as usize), |(r, c)| {
        if rows.contains(&r) && cols.contains(&c) && (c as u32 / pitch) % 2 == 0 {
            gray
        } else {
            0
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pitch_one_alternates_columns() {
        let g = binary_grating((8, 2), 1, 200);
        for col in 0..8 {
            let expected = if col % 2 == 0 { 200 } else { 0 };
            assert_eq!(g[[0, col]], expected);
            assert_eq!(g[[1, col]], expected);
        }
    }

    #[test]
    fn stripe_width_matches_pitch() {
        let g = binary_grating((16, 1), 4, 255);
        for col in 0..16usize {
            let expected = if (col / 4) % 2 == 0 { 255 } else { 0 };
            assert_eq!(g[[0, col]], expected);
        }
    }

    #[test]
    fn zero_pitch_degrades_to_single_pixel_stripes() {
        let g = binary_grating((4, 1), 0, 255);
        assert_eq!(g[[0, 0]], 255);
        assert_eq!(g[[0, 1]], 0);
    }

    #[test]
    fn tiles_partition_the_frame_exactly() {
        let dims = (1152, 960);
        let mut covered = Array2::<u32>::zeros((960, 1152));
        for region in 0..REGION_COUNT {
            let (rows, cols) = tile_bounds(region, dims);
            for r in rows {
                for c in cols.clone() {
                    covered[[r, c]] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&n| n == 1));
    }

    #[test]
    fn tiles_partition_uneven_frames_exactly() {
        let dims = (100, 70);
        let mut covered = Array2::<u32>::zeros((70, 100));
        for region in 0..REGION_COUNT {
            let (rows, cols) = tile_bounds(region, dims);
            for r in rows {
                for c in cols.clone() {
                    covered[[r, c]] += 1;
                }
            }
        }
        assert!(covered.iter().all(|&n| n == 1));
    }

    #[test]
    fn regional_grating_is_zero_outside_its_tile() {
        let dims = (64, 64);
        let region = 27; // row 3, col 3
        let g = regional_grating(dims, 2, 255, region);
        let (rows, cols) = tile_bounds(region, dims);
        for ((r, c), &v) in g.indexed_iter() {
            if !(rows.contains(&r) && cols.contains(&c)) {
                assert_eq!(v, 0);
            }
        }
        // The tile itself carries the grating.
        assert!(g.iter().any(|&v| v == 255));
    }

    #[test]
    fn regional_grating_matches_full_grating_inside_tile() {
        let dims = (64, 64);
        let full = binary_grating(dims, 3, 128);
        let region = 9; // row 1, col 1
        let partial = regional_grating(dims, 3, 128, region);
        let (rows, cols) = tile_bounds(region, dims);
        for r in rows {
            for c in cols.clone() {
                assert_eq!(partial[[r, c]], full[[r, c]]);
            }
        }
    }
}
