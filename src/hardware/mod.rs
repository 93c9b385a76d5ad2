//! Hardware boundary: device traits, SCPI plumbing, and mock implementations.
//!
//! The core never talks to vendor SDKs or instrument buses directly. It sees
//! two small traits:
//!
//! - [`slm::SlmDevice`], the spatial light modulator session (connect, write
//!   a mask, read temperature and dimensions, load a LUT);
//! - [`power_meter::PowerMeter`], the optical power meter the calibration
//!   sweep samples.
//!
//! Everything above this module is fully testable against the mocks in
//! [`mock`]. Platform adapters live behind feature flags:
//! `meadowlark_hardware` compiles the Blink SDK adapter, `instrument_serial`
//! compiles the serial SCPI transport.

pub mod mock;
pub mod power_meter;
pub mod slm;

#[cfg(feature = "meadowlark_hardware")]
pub mod meadowlark;
