//! The calibration sweep state machine.
//!
//! Lifecycle: `Idle → Configuring → StreamingPreview → Sweeping(region) →
//! Done`, with `Aborted` reachable from any non-idle state via the shared
//! [`AbortFlag`] or an unrecoverable device error during configuration.
//!
//! Execution is synchronous and blocking throughout: one mask write, one
//! settling sleep, one meter read per gray level, with no overlap. A failed
//! write or read at a single level is logged and recorded as missing data;
//! the level is never retried and the sweep moves on.

use std::fs;
use std::path::PathBuf;
use std::thread;

use chrono::Utc;
use log::{info, warn};

use crate::error::{AppResult, SlmError};
use crate::hardware::power_meter::PowerMeter;
use crate::hardware::slm::{SlmDevice, WriteOptions};
use crate::mask::grating::{binary_grating, regional_grating};
use crate::mask::GrayMask;
use crate::validation::is_wavelength_supported;

use super::{
    AbortFlag, CalibrationSample, CalibrationSession, RegionId, SweepConfig, SweepState,
    SweepSummary,
};

/// Gray level used for the alignment grating streamed before a sweep.
const ALIGNMENT_GRAY: u8 = 255;

/// Drives one SLM and one power meter through a calibration sweep.
pub struct SweepController<'a> {
    slm: &'a mut dyn SlmDevice,
    meter: &'a mut dyn PowerMeter,
    state: SweepState,
    session: Option<CalibrationSession>,
    abort: AbortFlag,
}

impl<'a> SweepController<'a> {
    /// Creates an idle controller over the two instruments.
    pub fn new(slm: &'a mut dyn SlmDevice, meter: &'a mut dyn PowerMeter) -> Self {
        Self {
            slm,
            meter,
            state: SweepState::Idle,
            session: None,
            abort: AbortFlag::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> SweepState {
        self.state
    }

    /// The live session, if one is configured.
    pub fn session(&self) -> Option<&CalibrationSession> {
        self.session.as_ref()
    }

    /// A cancellation handle sharing this controller's flag.
    pub fn abort_flag(&self) -> AbortFlag {
        self.abort.clone()
    }

    /// Uses an externally created abort flag, so cancellation can be wired
    /// up before the controller exists.
    pub fn with_abort_flag(mut self, flag: AbortFlag) -> Self {
        self.abort = flag;
        self
    }

    /// Validates the configuration against the meter, pushes the meter
    /// setup, and creates the session.
    ///
    /// # Errors
    ///
    /// [`SlmError::Validation`] when the wavelength falls outside the
    /// meter's half-open supported range (the caller re-prompts);
    /// [`SlmError::DeviceUnavailable`] when the SLM cannot report its
    /// dimensions, since a sweep cannot be planned without a frame size.
    pub fn configure(&mut self, config: SweepConfig) -> AppResult<()> {
        match self.state {
            SweepState::Idle | SweepState::Configuring => {}
            _ => {
                return Err(SlmError::InvalidState(format!(
                    "cannot configure while {:?}",
                    self.state
                )))
            }
        }
        config.validate()?;

        let (min_nm, max_nm) = self.meter.wavelength_range_nm()?;
        if !is_wavelength_supported(config.wavelength_nm, min_nm, max_nm) {
            return Err(SlmError::Validation(format!(
                "wavelength {} nm outside the meter's supported range [{min_nm}, {max_nm}) nm",
                config.wavelength_nm
            )));
        }

        let dimensions = self.slm.dimensions()?;

        let identity = self.meter.identify()?;
        info!("power meter connected: {identity}");
        self.meter.beep()?;
        self.meter.configure_power_mode()?;
        self.meter.set_average_count(config.average_count)?;
        self.meter.set_wavelength_nm(config.wavelength_nm)?;

        let regions = config.regions();
        info!(
            "calibration session configured: {} nm, {:?}, {} region(s), {}x{} frame",
            config.wavelength_nm,
            config.mode,
            regions.len(),
            dimensions.0,
            dimensions.1
        );
        self.session = Some(CalibrationSession {
            config,
            regions,
            dimensions,
            started_at: Utc::now(),
        });
        self.state = SweepState::Configuring;
        Ok(())
    }

    /// Writes the full-frame, full-gray alignment grating so the operator
    /// can align the optics, and keeps streaming it until the sweep starts.
    pub fn stream_alignment_pattern(&mut self) -> AppResult<()> {
        let session = self.session.as_ref().ok_or_else(|| {
            SlmError::InvalidState("no session; call configure first".to_string())
        })?;
        let mask = binary_grating(
            session.dimensions,
            session.config.grating_pitch,
            ALIGNMENT_GRAY,
        );
        self.slm.write_mask(&mask, &WriteOptions::default())?;
        self.state = SweepState::StreamingPreview;
        Ok(())
    }

    /// Changes the grating pitch before the sweep begins; if the alignment
    /// pattern is streaming, it is rewritten immediately.
    pub fn set_grating_pitch(&mut self, pitch: u32) -> AppResult<()> {
        match self.state {
            SweepState::Configuring | SweepState::StreamingPreview => {}
            _ => {
                return Err(SlmError::InvalidState(
                    "pitch is only mutable before the sweep begins".to_string(),
                ))
            }
        }
        if pitch == 0 {
            return Err(SlmError::Validation(
                "grating pitch must be at least 1 pixel".to_string(),
            ));
        }
        if let Some(session) = self.session.as_mut() {
            session.config.grating_pitch = pitch;
        }
        if self.state == SweepState::StreamingPreview {
            self.stream_alignment_pattern()?;
        }
        Ok(())
    }

    /// Runs the sweep over every region of the session.
    ///
    /// Each region's 256 samples are appended to its CSV file, in ascending
    /// gray-level order, before the next region starts. On abort the partial
    /// CSV is flushed and left in place and the controller finishes in
    /// [`SweepState::Aborted`].
    pub fn run(&mut self) -> AppResult<SweepSummary> {
        let session = match self.state {
            SweepState::Configuring | SweepState::StreamingPreview => {
                self.session.take().ok_or_else(|| {
                    SlmError::InvalidState("no session; call configure first".to_string())
                })?
            }
            _ => {
                return Err(SlmError::InvalidState(format!(
                    "cannot start a sweep while {:?}",
                    self.state
                )))
            }
        };

        let dimensions = session.dimensions;
        let pitch = session.config.grating_pitch;
        let settle = session.config.settle;
        let output_dir = session.config.output_dir.clone();
        fs::create_dir_all(&output_dir)?;

        let mut summary = SweepSummary {
            regions_completed: 0,
            samples_recorded: 0,
            samples_missing: 0,
            files: Vec::new(),
        };

        for region in session.regions.iter().copied() {
            self.state = SweepState::Sweeping(region);
            info!("sweeping region {region}");

            let path = output_dir.join(format!("region_{}.csv", region.file_stem()));
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(["gray_level", "power"])?;

            for gray_level in 0..=u8::MAX {
                if self.abort.is_raised() {
                    writer.flush()?;
                    warn!("sweep aborted at region {region}, gray level {gray_level}");
                    self.state = SweepState::Aborted;
                    return Err(SlmError::Aborted);
                }

                match self.measure_level(dimensions, pitch, gray_level, region, settle) {
                    Ok(sample) => {
                        // The CSV carries milliwatts; the in-memory sample
                        // stays in watts.
                        writer
                            .serialize((sample.gray_level, sample.power_watts * 1e3))?;
                        summary.samples_recorded += 1;
                    }
                    Err(e) => {
                        warn!("region {region}, gray level {gray_level} skipped: {e}");
                        summary.samples_missing += 1;
                    }
                }
            }

            writer.flush()?;
            summary.regions_completed += 1;
            summary.files.push(path);
        }

        info!(
            "sweep complete: {} region(s), {} samples, {} missing",
            summary.regions_completed, summary.samples_recorded, summary.samples_missing
        );
        self.state = SweepState::Done;
        Ok(summary)
    }

    /// Writes one grating, waits out the settling interval, and reads the
    /// meter.
    fn measure_level(
        &mut self,
        dimensions: (u32, u32),
        pitch: u32,
        gray_level: u8,
        region: RegionId,
        settle: std::time::Duration,
    ) -> AppResult<CalibrationSample> {
        let mask: GrayMask = match region {
            RegionId::All => binary_grating(dimensions, pitch, gray_level),
            RegionId::Tile(index) => regional_grating(dimensions, pitch, gray_level, index),
        };
        self.slm.write_mask(&mask, &WriteOptions::default())?;
        thread::sleep(settle);
        let power_watts = self.meter.read_power_watts()?;
        Ok(CalibrationSample {
            gray_level: u16::from(gray_level),
            region,
            power_watts,
        })
    }

    /// Paths the configured session will write, in sweep order.
    pub fn planned_files(&self) -> Vec<PathBuf> {
        self.session
            .as_ref()
            .map(|session| {
                session
                    .regions
                    .iter()
                    .map(|region| {
                        session
                            .config
                            .output_dir
                            .join(format!("region_{}.csv", region.file_stem()))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::{MockPowerMeter, MockSlm};
    use std::path::Path;
    use std::time::Duration;

    fn test_config(mode: super::super::SweepMode, dir: &Path) -> SweepConfig {
        SweepConfig {
            wavelength_nm: 532.0,
            mode,
            grating_pitch: 4,
            settle: Duration::ZERO,
            average_count: 100,
            output_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn wavelength_outside_range_is_rejected_before_device_io() {
        let dir = tempfile::tempdir().unwrap();
        let mut slm = MockSlm::new(64, 64);
        let mut meter = MockPowerMeter::new().with_wavelength_range(400.0, 700.0);
        let mut controller = SweepController::new(&mut slm, &mut meter);
        let mut config = test_config(super::super::SweepMode::Global, dir.path());
        config.wavelength_nm = 700.0; // half-open: the max itself is invalid
        let err = controller.configure(config).unwrap_err();
        assert!(matches!(err, SlmError::Validation(_)));
        assert_eq!(controller.state(), SweepState::Idle);
    }

    #[test]
    fn configure_pushes_meter_setup() {
        let dir = tempfile::tempdir().unwrap();
        let mut slm = MockSlm::new(64, 64);
        let mut meter = MockPowerMeter::new().with_wavelength_range(400.0, 700.0);
        {
            let mut controller = SweepController::new(&mut slm, &mut meter);
            controller
                .configure(test_config(super::super::SweepMode::Global, dir.path()))
                .unwrap();
            assert_eq!(controller.state(), SweepState::Configuring);
        }
        assert_eq!(meter.wavelength_nm(), Some(532.0));
        assert_eq!(meter.average_count(), 100);
        assert!(meter.beeped());
    }

    #[test]
    fn alignment_pattern_streams_full_gray_grating() {
        let dir = tempfile::tempdir().unwrap();
        let mut slm = MockSlm::new(16, 8);
        let mut meter = MockPowerMeter::new();
        let mut controller = SweepController::new(&mut slm, &mut meter);
        controller
            .configure(test_config(super::super::SweepMode::Global, dir.path()))
            .unwrap();
        controller.stream_alignment_pattern().unwrap();
        assert_eq!(controller.state(), SweepState::StreamingPreview);
        drop(controller);
        let frame = slm.last_frame().unwrap();
        assert_eq!(frame[[0, 0]], 255);
        assert_eq!(frame.dim(), (8, 16));
    }

    #[test]
    fn pitch_change_rewrites_the_streaming_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let mut slm = MockSlm::new(16, 8);
        let mut meter = MockPowerMeter::new();
        let mut controller = SweepController::new(&mut slm, &mut meter);
        controller
            .configure(test_config(super::super::SweepMode::Global, dir.path()))
            .unwrap();
        controller.stream_alignment_pattern().unwrap();
        controller.set_grating_pitch(2).unwrap();
        drop(controller);
        assert_eq!(slm.frames().len(), 2);
        // Pitch 2: column 2 falls in the second (dark) stripe.
        assert_eq!(slm.last_frame().unwrap()[[0, 2]], 0);
    }

    #[test]
    fn run_without_configure_is_an_invalid_state() {
        let mut slm = MockSlm::new(8, 8);
        let mut meter = MockPowerMeter::new();
        let mut controller = SweepController::new(&mut slm, &mut meter);
        assert!(matches!(
            controller.run(),
            Err(SlmError::InvalidState(_))
        ));
    }

    #[test]
    fn abort_before_first_level_leaves_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut slm = MockSlm::new(16, 8);
        let mut meter = MockPowerMeter::new();
        let mut controller = SweepController::new(&mut slm, &mut meter);
        controller
            .configure(test_config(super::super::SweepMode::Global, dir.path()))
            .unwrap();
        controller.abort_flag().raise();
        assert!(matches!(controller.run(), Err(SlmError::Aborted)));
        assert_eq!(controller.state(), SweepState::Aborted);
        // The header-only CSV is left in place for the caller to detect.
        let path = dir.path().join("region_0.csv");
        assert!(path.exists());
    }

    #[test]
    fn failed_writes_become_missing_samples() {
        let dir = tempfile::tempdir().unwrap();
        let mut slm = MockSlm::new(16, 8);
        slm.fail_writes_after(10);
        let mut meter = MockPowerMeter::new();
        let mut controller = SweepController::new(&mut slm, &mut meter);
        controller
            .configure(test_config(super::super::SweepMode::Global, dir.path()))
            .unwrap();
        let summary = controller.run().unwrap();
        assert_eq!(controller.state(), SweepState::Done);
        assert_eq!(summary.samples_recorded, 10);
        assert_eq!(summary.samples_missing, 246);
        assert_eq!(summary.regions_completed, 1);
    }
}
