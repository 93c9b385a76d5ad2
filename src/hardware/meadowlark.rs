//! Meadowlark Blink SDK adapter.
//!
//! Binds the vendor `Blink_C_wrapper` library at runtime and implements
//! [`SlmDevice`] over it. Only the first board is ever addressed. Every
//! failure, from a missing DLL to a sentinel return value, is mapped to
//! [`SlmError::DeviceUnavailable`]; nothing in this module panics.
//!
//! Compiled only with the `meadowlark_hardware` feature.
#![allow(unsafe_code)]

use std::ffi::{c_char, CString};
use std::path::Path;

use libloading::{Library, Symbol};
use log::info;

use crate::error::{AppResult, SlmError};
use crate::mask::GrayMask;

use super::slm::{frame_buffer, BoardInfo, SlmDevice, WriteOptions};

/// Board id the SDK assigns to the first (and only) device we drive.
const BOARD_ID: i32 = 1;

type CreateSdkFn = unsafe extern "C" fn(u32, *mut u32, *mut i32, i32, i32, i32, i32, *const c_char);
type LoadLutFn = unsafe extern "C" fn(i32, *const c_char) -> i32;
type WriteImageFn = unsafe extern "C" fn(i32, *const u8, u32, i32, i32, u32) -> i32;
type ReadTemperatureFn = unsafe extern "C" fn(i32) -> f64;
type GetDimensionFn = unsafe extern "C" fn(i32) -> i32;

/// One session with a Meadowlark board through the Blink SDK.
pub struct MeadowlarkSlm {
    library: Library,
    bit_depth: u32,
}

impl MeadowlarkSlm {
    /// Loads the `Blink_C_wrapper` library from `dll_path`.
    ///
    /// `bit_depth` is the SLM bitness passed to `Create_SDK`; the boards in
    /// use here are 12-bit.
    pub fn open(dll_path: &Path, bit_depth: u32) -> AppResult<Self> {
        let library = unsafe { Library::new(dll_path) }.map_err(|e| {
            SlmError::DeviceUnavailable(format!("cannot load {}: {e}", dll_path.display()))
        })?;
        info!("loaded Blink SDK from {}", dll_path.display());
        Ok(Self { library, bit_depth })
    }

    fn symbol<T>(&self, name: &[u8]) -> AppResult<Symbol<'_, T>> {
        unsafe { self.library.get(name) }.map_err(|e| {
            SlmError::DeviceUnavailable(format!(
                "missing SDK symbol {}: {e}",
                String::from_utf8_lossy(name)
            ))
        })
    }
}

impl SlmDevice for MeadowlarkSlm {
    fn connect(&mut self) -> AppResult<BoardInfo> {
        let create: Symbol<CreateSdkFn> = self.symbol(b"Create_SDK")?;
        let mut boards: u32 = 0;
        let mut status: i32 = 0;
        // Trailing arguments follow the vendor manual's recommendation:
        // RAM write enable, use GPU, max transient frames 10, null
        // calibration.
        unsafe {
            create(
                self.bit_depth,
                &mut boards,
                &mut status,
                1,
                1,
                0,
                10,
                std::ptr::null(),
            );
        }
        info!("Blink SDK reports {boards} board(s), status {status}");
        Ok(BoardInfo { boards, status })
    }

    fn load_lookup_table(&mut self, path: &Path) -> AppResult<()> {
        let load: Symbol<LoadLutFn> = self.symbol(b"Load_LUT_file")?;
        let c_path = CString::new(path.to_string_lossy().as_bytes())
            .map_err(|_| SlmError::DeviceUnavailable("LUT path contains NUL".into()))?;
        let status = unsafe { load(BOARD_ID, c_path.as_ptr()) };
        if status != 0 {
            return Err(SlmError::DeviceUnavailable(format!(
                "Load_LUT_file returned status {status}"
            )));
        }
        Ok(())
    }

    fn write_mask(&mut self, mask: &GrayMask, options: &WriteOptions) -> AppResult<()> {
        let write: Symbol<WriteImageFn> = self.symbol(b"Write_image")?;
        let buffer = frame_buffer(mask);
        let status = unsafe {
            write(
                BOARD_ID,
                buffer.as_ptr(),
                buffer.len() as u32,
                i32::from(options.wait_for_trigger),
                i32::from(options.external_pulse),
                options.timeout_ms,
            )
        };
        if status != 0 {
            return Err(SlmError::DeviceUnavailable(format!(
                "Write_image returned status {status}"
            )));
        }
        Ok(())
    }

    fn temperature_c(&mut self) -> AppResult<f64> {
        let read: Symbol<ReadTemperatureFn> = self.symbol(b"Read_SLM_temperature")?;
        let celsius = unsafe { read(BOARD_ID) };
        if celsius < 0.0 {
            return Err(SlmError::DeviceUnavailable(
                "temperature read returned sentinel".into(),
            ));
        }
        Ok(celsius)
    }

    fn dimensions(&mut self) -> AppResult<(u32, u32)> {
        let width_fn: Symbol<GetDimensionFn> = self.symbol(b"Get_image_width")?;
        let height_fn: Symbol<GetDimensionFn> = self.symbol(b"Get_image_height")?;
        let (width, height) = unsafe { (width_fn(BOARD_ID), height_fn(BOARD_ID)) };
        if width <= 0 || height <= 0 {
            return Err(SlmError::DeviceUnavailable(format!(
                "dimension read returned {width}x{height}"
            )));
        }
        Ok((width as u32, height as u32))
    }
}
