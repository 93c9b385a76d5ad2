//! SLM device session boundary.
//!
//! [`SlmDevice`] is the only surface the core uses to reach hardware. Any
//! call may fail (device unplugged, driver error); callers on the preview
//! path must treat [`crate::error::SlmError::DeviceUnavailable`] as a status
//! flag and keep operating on pure computation.

use std::path::Path;

use crate::error::AppResult;
use crate::mask::GrayMask;

/// Result of an SDK connect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardInfo {
    /// Number of boards the SDK enumerated. Only the first is ever used.
    pub boards: u32,
    /// Vendor status code; zero means success.
    pub status: i32,
}

/// Options for one mask write.
#[derive(Debug, Clone, Copy)]
pub struct WriteOptions {
    /// Hold the frame until an external trigger arrives.
    pub wait_for_trigger: bool,
    /// Emit the output pulse on frame display.
    pub external_pulse: bool,
    /// Write timeout in milliseconds. The vendor manual suggests the call
    /// may block this long.
    pub timeout_ms: u32,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            wait_for_trigger: false,
            external_pulse: false,
            timeout_ms: 5000,
        }
    }
}

/// A session with one spatial light modulator.
///
/// Single-owner: exactly one session is open at a time, so implementations
/// need no internal locking. All methods take `&mut self` and block until
/// the device answers or times out.
pub trait SlmDevice: Send {
    /// Initializes the SDK and enumerates boards.
    fn connect(&mut self) -> AppResult<BoardInfo>;

    /// Loads a gray-level lookup table from a vendor `.lut` file.
    fn load_lookup_table(&mut self, path: &Path) -> AppResult<()>;

    /// Writes one mask to the device.
    ///
    /// Implementations must transmit the frame in column-major pixel order;
    /// [`frame_buffer`] performs the conversion from the row-major mask.
    fn write_mask(&mut self, mask: &GrayMask, options: &WriteOptions) -> AppResult<()>;

    /// Reads the liquid-crystal cell temperature in degrees Celsius.
    fn temperature_c(&mut self) -> AppResult<f64>;

    /// Reads the active-area dimensions as `(width, height)` pixels.
    fn dimensions(&mut self) -> AppResult<(u32, u32)>;
}

impl<T: SlmDevice + ?Sized> SlmDevice for Box<T> {
    fn connect(&mut self) -> AppResult<BoardInfo> {
        (**self).connect()
    }
    fn load_lookup_table(&mut self, path: &Path) -> AppResult<()> {
        (**self).load_lookup_table(path)
    }
    fn write_mask(&mut self, mask: &GrayMask, options: &WriteOptions) -> AppResult<()> {
        (**self).write_mask(mask, options)
    }
    fn temperature_c(&mut self) -> AppResult<f64> {
        (**self).temperature_c()
    }
    fn dimensions(&mut self) -> AppResult<(u32, u32)> {
        (**self).dimensions()
    }
}

/// Converts a row-major mask into the column-major byte buffer the device
/// protocol requires.
///
/// Byte `col * height + row` of the output is pixel `(row, col)` of the
/// mask; the buffer length is always `width * height`.
pub fn frame_buffer(mask: &GrayMask) -> Vec<u8> {
    let (height, width) = mask.dim();
    let mut buffer = Vec::with_capacity(width * height);
    for col in 0..width {
        for row in 0..height {
            buffer.push(mask[[row, col]]);
        }
    }
    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn frame_buffer_is_column_major() {
        // 2 rows x 3 cols
        let mask: GrayMask = array![[1u8, 2, 3], [4, 5, 6]];
        assert_eq!(frame_buffer(&mask), vec![1, 4, 2, 5, 3, 6]);
    }

    #[test]
    fn frame_buffer_length_is_width_times_height() {
        let mask = GrayMask::zeros((960, 1152));
        assert_eq!(frame_buffer(&mask).len(), 960 * 1152);
    }

    #[test]
    fn default_write_options_match_vendor_guidance() {
        let options = WriteOptions::default();
        assert!(!options.wait_for_trigger);
        assert!(!options.external_pulse);
        assert_eq!(options.timeout_ms, 5000);
    }
}
