//! Calibration sweep subsystem.
//!
//! Drives the SLM through all 256 gray levels (optionally once per spatial
//! region) while sampling optical power, producing the raw per-region CSV
//! tables a downstream LUT builder consumes. The sweep is an offline,
//! blocking procedure: masks are written, the liquid crystal is given a
//! fixed settling interval, and the meter is read, strictly in sequence.
//!
//! [`sweep::SweepController`] holds the state machine; this module defines
//! the session value types it operates on.

pub mod sweep;

pub use sweep::SweepController;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, SlmError};
use crate::mask::grating::REGION_COUNT;
use crate::validation::{is_finite, is_valid_period};

fn default_settle() -> Duration {
    Duration::from_millis(50)
}
fn default_average_count() -> u32 {
    100
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("calibration")
}
fn default_grating_pitch() -> u32 {
    4
}

/// Whether the sweep addresses the whole frame once or each of the 64
/// regions in turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// One sweep over the full active area.
    Global,
    /// One sweep per tile of the 8x8 partition. Requires the illumination
    /// to overfill the SLM (operational precondition, not enforced here).
    Regional,
}

impl FromStr for SweepMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "global" => Ok(Self::Global),
            "regional" => Ok(Self::Regional),
            other => Err(format!("unknown sweep mode {other:?} (global|regional)")),
        }
    }
}

/// Identifies one sweep target: the whole frame or one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionId {
    /// The full active area (global mode).
    All,
    /// One tile of the 8x8 partition, row-major index `0..64`.
    Tile(u8),
}

impl RegionId {
    /// Key used in the region's CSV file name. Global sweeps are keyed "0".
    pub fn file_stem(&self) -> String {
        match self {
            Self::All => "0".to_string(),
            Self::Tile(index) => index.to_string(),
        }
    }
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Tile(index) => write!(f, "{index}"),
        }
    }
}

/// Operator-supplied configuration for one calibration session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Calibration wavelength in nm; must lie in the meter's supported
    /// correction range.
    pub wavelength_nm: f64,

    /// Global or regional sweep.
    pub mode: SweepMode,

    /// Stripe width of the calibration grating in pixels. Mutable until the
    /// sweep begins.
    #[serde(default = "default_grating_pitch")]
    pub grating_pitch: u32,

    /// Settling interval between writing a mask and reading the meter, to
    /// let the liquid crystal settle.
    #[serde(with = "humantime_serde", default = "default_settle")]
    pub settle: Duration,

    /// Meter averaging count applied during configuration.
    #[serde(default = "default_average_count")]
    pub average_count: u32,

    /// Directory receiving the per-region CSV files.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl SweepConfig {
    /// Checks the operator inputs that do not need the meter.
    pub fn validate(&self) -> AppResult<()> {
        is_finite(self.wavelength_nm)
            .map_err(|e| SlmError::Validation(format!("wavelength: {e}")))?;
        if self.wavelength_nm <= 0.0 {
            return Err(SlmError::Validation(
                "wavelength must be positive".to_string(),
            ));
        }
        is_valid_period(self.grating_pitch)
            .map_err(|e| SlmError::Validation(format!("grating pitch: {e}")))?;
        if self.average_count == 0 {
            return Err(SlmError::Validation(
                "average count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The ordered region set this configuration sweeps.
    pub fn regions(&self) -> Vec<RegionId> {
        match self.mode {
            SweepMode::Global => vec![RegionId::All],
            SweepMode::Regional => (0..REGION_COUNT).map(RegionId::Tile).collect(),
        }
    }
}

/// A live calibration session. Created when a sweep is configured, destroyed
/// when it completes or aborts; nothing persists beyond the emitted CSVs.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    /// Operator configuration (the grating pitch may still change before the
    /// sweep starts).
    pub config: SweepConfig,
    /// Ordered regions remaining to sweep.
    pub regions: Vec<RegionId>,
    /// Device-reported frame size.
    pub dimensions: (u32, u32),
    /// When the session was configured.
    pub started_at: DateTime<Utc>,
}

/// One recorded measurement: immutable once taken.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationSample {
    /// Gray level written to the region, `0..=255`.
    pub gray_level: u16,
    /// Region the sample belongs to.
    pub region: RegionId,
    /// Meter reading in watts.
    pub power_watts: f64,
}

/// Sweep controller states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// No session.
    Idle,
    /// Session created, meter configured, sweep not started.
    Configuring,
    /// Alignment grating is being streamed to the device.
    StreamingPreview,
    /// Sweeping the named region.
    Sweeping(RegionId),
    /// All regions swept; session torn down.
    Done,
    /// Cancelled by the operator or an unrecoverable device error; partial
    /// CSVs remain on disk.
    Aborted,
}

/// Cooperative cancellation handle for a sweep.
///
/// Cloned handles share one flag; the sweep checks it at the top of every
/// gray-level iteration.
#[derive(Debug, Clone, Default)]
pub struct AbortFlag(Arc<AtomicBool>);

impl AbortFlag {
    /// Creates a new, lowered flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a finished sweep produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepSummary {
    /// Regions fully swept.
    pub regions_completed: usize,
    /// Samples written across all CSV files.
    pub samples_recorded: usize,
    /// Gray levels skipped because a write or read failed.
    pub samples_missing: usize,
    /// CSV files emitted, in sweep order.
    pub files: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: SweepMode) -> SweepConfig {
        SweepConfig {
            wavelength_nm: 532.0,
            mode,
            grating_pitch: 4,
            settle: Duration::ZERO,
            average_count: 100,
            output_dir: PathBuf::from("out"),
        }
    }

    #[test]
    fn global_mode_has_one_region() {
        assert_eq!(config(SweepMode::Global).regions(), vec![RegionId::All]);
    }

    #[test]
    fn regional_mode_has_sixty_four_ordered_regions() {
        let regions = config(SweepMode::Regional).regions();
        assert_eq!(regions.len(), 64);
        assert_eq!(regions[0], RegionId::Tile(0));
        assert_eq!(regions[63], RegionId::Tile(63));
    }

    #[test]
    fn global_region_is_keyed_zero() {
        assert_eq!(RegionId::All.file_stem(), "0");
        assert_eq!(RegionId::Tile(17).file_stem(), "17");
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("GLOBAL".parse::<SweepMode>().unwrap(), SweepMode::Global);
        assert_eq!(
            "regional".parse::<SweepMode>().unwrap(),
            SweepMode::Regional
        );
        assert!("both".parse::<SweepMode>().is_err());
    }

    #[test]
    fn zero_pitch_rejected() {
        let mut cfg = config(SweepMode::Global);
        cfg.grating_pitch = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_wavelength_rejected() {
        let mut cfg = config(SweepMode::Global);
        cfg.wavelength_nm = 0.0;
        assert!(cfg.validate().is_err());
        cfg.wavelength_nm = f64::NAN;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn abort_flag_is_shared_between_clones() {
        let flag = AbortFlag::new();
        let clone = flag.clone();
        assert!(!clone.is_raised());
        flag.raise();
        assert!(clone.is_raised());
    }
}
