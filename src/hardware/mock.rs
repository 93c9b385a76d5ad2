//! Mock hardware implementations.
//!
//! Simulated devices for running the full pipeline without physical
//! hardware: the CLI wires these in by default, and every test above the
//! hardware boundary uses them. Failure injection mirrors the ways the real
//! bench misbehaves: a disconnected board, writes that start failing partway
//! through a sweep, a meter with a narrow correction range.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use rand::Rng;

use crate::error::{AppResult, SlmError};
use crate::mask::GrayMask;
use crate::params::MaskParameters;

use super::power_meter::{PowerMeter, ScpiTransport};
use super::slm::{BoardInfo, SlmDevice, WriteOptions};

/// Simulated SLM board.
///
/// Records every frame written to it so tests can assert on the exact
/// sequence of masks a sweep produced.
pub struct MockSlm {
    dimensions: (u32, u32),
    temperature_c: f64,
    disconnected: bool,
    /// Writes start failing once this many have succeeded.
    fail_writes_after: Option<usize>,
    writes_accepted: usize,
    frames: Vec<GrayMask>,
    lut_loaded: Option<PathBuf>,
}

impl MockSlm {
    /// Creates a mock board with the given active area.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            dimensions: (width, height),
            temperature_c: 24.5,
            disconnected: false,
            fail_writes_after: None,
            writes_accepted: 0,
            frames: Vec::new(),
            lut_loaded: None,
        }
    }

    /// Mock board sized for the default parameter set.
    pub fn with_default_dimensions() -> Self {
        let (width, height) = MaskParameters::default().dimensions;
        Self::new(width, height)
    }

    /// Overrides the reported cell temperature.
    pub fn with_temperature(mut self, celsius: f64) -> Self {
        self.temperature_c = celsius;
        self
    }

    /// Simulates an unplugged board: every call fails.
    pub fn set_disconnected(&mut self, disconnected: bool) {
        self.disconnected = disconnected;
    }

    /// Makes writes fail after `n` successful ones.
    pub fn fail_writes_after(&mut self, n: usize) {
        self.fail_writes_after = Some(n);
    }

    /// Frames written so far, oldest first.
    pub fn frames(&self) -> &[GrayMask] {
        &self.frames
    }

    /// The most recently written frame, if any.
    pub fn last_frame(&self) -> Option<&GrayMask> {
        self.frames.last()
    }

    /// The LUT file loaded, if any.
    pub fn lut_loaded(&self) -> Option<&Path> {
        self.lut_loaded.as_deref()
    }

    fn ensure_connected(&self) -> AppResult<()> {
        if self.disconnected {
            Err(SlmError::DeviceUnavailable("board not found".into()))
        } else {
            Ok(())
        }
    }
}

impl SlmDevice for MockSlm {
    fn connect(&mut self) -> AppResult<BoardInfo> {
        self.ensure_connected()?;
        Ok(BoardInfo {
            boards: 1,
            status: 0,
        })
    }

    fn load_lookup_table(&mut self, path: &Path) -> AppResult<()> {
        self.ensure_connected()?;
        self.lut_loaded = Some(path.to_path_buf());
        Ok(())
    }

    fn write_mask(&mut self, mask: &GrayMask, _options: &WriteOptions) -> AppResult<()> {
        self.ensure_connected()?;
        let (height, width) = mask.dim();
        if (width as u32, height as u32) != self.dimensions {
            return Err(SlmError::Validation(format!(
                "mask is {}x{} but the active area is {}x{}",
                width, height, self.dimensions.0, self.dimensions.1
            )));
        }
        if let Some(limit) = self.fail_writes_after {
            if self.writes_accepted >= limit {
                return Err(SlmError::DeviceUnavailable("write failed".into()));
            }
        }
        self.writes_accepted += 1;
        self.frames.push(mask.clone());
        Ok(())
    }

    fn temperature_c(&mut self) -> AppResult<f64> {
        self.ensure_connected()?;
        Ok(self.temperature_c)
    }

    fn dimensions(&mut self) -> AppResult<(u32, u32)> {
        self.ensure_connected()?;
        Ok(self.dimensions)
    }
}

/// Simulated power meter.
///
/// Returns a 1 mW baseline with ±5% noise by default; tests that need a
/// deterministic response install one with [`MockPowerMeter::with_response`].
pub struct MockPowerMeter {
    wavelength_range_nm: (f64, f64),
    wavelength_nm: Option<f64>,
    average_count: u32,
    base_power_watts: f64,
    response: Option<Box<dyn FnMut() -> f64 + Send>>,
    beeped: bool,
}

impl MockPowerMeter {
    /// Creates a meter supporting correction wavelengths in `[400, 1100)` nm.
    pub fn new() -> Self {
        Self {
            wavelength_range_nm: (400.0, 1100.0),
            wavelength_nm: None,
            average_count: 1,
            base_power_watts: 1.0e-3,
            response: None,
            beeped: false,
        }
    }

    /// Overrides the supported correction wavelength range (half-open).
    pub fn with_wavelength_range(mut self, min_nm: f64, max_nm: f64) -> Self {
        self.wavelength_range_nm = (min_nm, max_nm);
        self
    }

    /// Installs a deterministic response in watts, replacing the noisy
    /// baseline.
    pub fn with_response<F>(mut self, response: F) -> Self
    where
        F: FnMut() -> f64 + Send + 'static,
    {
        self.response = Some(Box::new(response));
        self
    }

    /// Correction wavelength currently applied, if any.
    pub fn wavelength_nm(&self) -> Option<f64> {
        self.wavelength_nm
    }

    /// Averaging count currently applied.
    pub fn average_count(&self) -> u32 {
        self.average_count
    }

    /// Whether the beeper was chirped.
    pub fn beeped(&self) -> bool {
        self.beeped
    }
}

impl Default for MockPowerMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerMeter for MockPowerMeter {
    fn identify(&mut self) -> AppResult<String> {
        Ok("Mock Instruments,PM-SIM,00000001,0.1".to_string())
    }

    fn configure_power_mode(&mut self) -> AppResult<()> {
        Ok(())
    }

    fn set_average_count(&mut self, count: u32) -> AppResult<()> {
        self.average_count = count;
        Ok(())
    }

    fn wavelength_range_nm(&mut self) -> AppResult<(f64, f64)> {
        Ok(self.wavelength_range_nm)
    }

    fn set_wavelength_nm(&mut self, nm: f64) -> AppResult<()> {
        let (min, max) = self.wavelength_range_nm;
        if !(nm >= min && nm < max) {
            return Err(SlmError::Instrument(format!(
                "wavelength {nm} nm outside [{min}, {max}) nm"
            )));
        }
        self.wavelength_nm = Some(nm);
        Ok(())
    }

    fn read_power_watts(&mut self) -> AppResult<f64> {
        if let Some(response) = self.response.as_mut() {
            return Ok(response());
        }
        let noise = rand::thread_rng().gen_range(-0.05..0.05);
        Ok(self.base_power_watts * (1.0 + noise))
    }

    fn beep(&mut self) -> AppResult<()> {
        self.beeped = true;
        Ok(())
    }
}

/// Scripted SCPI transport: replies are served in order, every command sent
/// is recorded.
#[derive(Default)]
pub struct ScriptedTransport {
    /// Commands sent through the transport, in order.
    pub sent: Vec<String>,
    replies: VecDeque<String>,
}

impl ScriptedTransport {
    /// Queues canned replies for the queries the test will issue.
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Vec::new(),
            replies: replies.into_iter().map(Into::into).collect(),
        }
    }
}

impl ScpiTransport for ScriptedTransport {
    fn write_line(&mut self, command: &str) -> AppResult<()> {
        self.sent.push(command.to_string());
        Ok(())
    }

    fn query_line(&mut self, command: &str) -> AppResult<String> {
        self.sent.push(command.to_string());
        self.replies
            .pop_front()
            .ok_or_else(|| SlmError::Instrument(format!("no scripted reply for {command:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::grating::binary_grating;

    #[test]
    fn mock_slm_records_frames() {
        let mut slm = MockSlm::new(16, 8);
        let mask = binary_grating((16, 8), 2, 255);
        slm.write_mask(&mask, &WriteOptions::default()).unwrap();
        assert_eq!(slm.frames().len(), 1);
        assert_eq!(slm.last_frame().unwrap(), &mask);
    }

    #[test]
    fn mock_slm_rejects_wrong_shape() {
        let mut slm = MockSlm::new(16, 8);
        let mask = binary_grating((8, 16), 2, 255);
        assert!(slm.write_mask(&mask, &WriteOptions::default()).is_err());
    }

    #[test]
    fn disconnected_board_fails_every_call() {
        let mut slm = MockSlm::new(16, 8);
        slm.set_disconnected(true);
        assert!(matches!(
            slm.connect(),
            Err(SlmError::DeviceUnavailable(_))
        ));
        assert!(slm.temperature_c().is_err());
        assert!(slm.dimensions().is_err());
    }

    #[test]
    fn write_failures_kick_in_after_threshold() {
        let mut slm = MockSlm::new(4, 4);
        slm.fail_writes_after(2);
        let mask = binary_grating((4, 4), 1, 10);
        assert!(slm.write_mask(&mask, &WriteOptions::default()).is_ok());
        assert!(slm.write_mask(&mask, &WriteOptions::default()).is_ok());
        assert!(slm.write_mask(&mask, &WriteOptions::default()).is_err());
        assert_eq!(slm.frames().len(), 2);
    }

    #[test]
    fn mock_meter_validates_wavelength() {
        let mut meter = MockPowerMeter::new().with_wavelength_range(400.0, 700.0);
        assert!(meter.set_wavelength_nm(532.0).is_ok());
        assert_eq!(meter.wavelength_nm(), Some(532.0));
        // Half-open: the max itself is rejected.
        assert!(meter.set_wavelength_nm(700.0).is_err());
    }

    #[test]
    fn mock_meter_noise_stays_within_bounds() {
        let mut meter = MockPowerMeter::new();
        for _ in 0..100 {
            let p = meter.read_power_watts().unwrap();
            assert!(p > 0.9e-3 && p < 1.1e-3);
        }
    }

    #[test]
    fn deterministic_response_overrides_noise() {
        let mut meter = MockPowerMeter::new().with_response(|| 2.5e-3);
        assert_eq!(meter.read_power_watts().unwrap(), 2.5e-3);
    }
}
