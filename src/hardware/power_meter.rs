//! Optical power meter boundary and SCPI implementation.
//!
//! The calibration sweep needs very little from the meter: identity, scalar
//! power mode, averaging, a correction wavelength inside the supported range,
//! and instantaneous readings in watts. [`PowerMeter`] captures exactly that.
//!
//! [`ScpiPowerMeter`] implements the trait for PM100-class instruments over
//! any line-oriented transport. The transport itself is a second seam so
//! tests can script the conversation; a `serialport`-backed transport is
//! compiled behind the `instrument_serial` feature.

use crate::error::{AppResult, SlmError};

/// An optical power meter.
///
/// All readings are in **watts**; implementations convert from device-native
/// units before returning.
pub trait PowerMeter: Send {
    /// Queries the instrument identity (`*IDN?`).
    fn identify(&mut self) -> AppResult<String>;

    /// Switches the meter to scalar power measurement mode.
    fn configure_power_mode(&mut self) -> AppResult<()>;

    /// Sets the measurement averaging count.
    fn set_average_count(&mut self, count: u32) -> AppResult<()>;

    /// Reports the supported correction wavelength range in nm, half-open
    /// `[min, max)`.
    fn wavelength_range_nm(&mut self) -> AppResult<(f64, f64)>;

    /// Sets the correction wavelength in nm.
    fn set_wavelength_nm(&mut self, nm: f64) -> AppResult<()>;

    /// Reads the instantaneous optical power in watts.
    fn read_power_watts(&mut self) -> AppResult<f64>;

    /// Chirps the instrument beeper. Optional; the default does nothing.
    fn beep(&mut self) -> AppResult<()> {
        Ok(())
    }
}

/// A line-oriented command/response channel to an SCPI instrument.
pub trait ScpiTransport: Send {
    /// Sends one command, no response expected.
    fn write_line(&mut self, command: &str) -> AppResult<()>;

    /// Sends one query and returns the instrument's reply line.
    fn query_line(&mut self, command: &str) -> AppResult<String>;
}

/// PM100-style SCPI power meter over an arbitrary transport.
pub struct ScpiPowerMeter<T: ScpiTransport> {
    transport: T,
}

impl<T: ScpiTransport> ScpiPowerMeter<T> {
    /// Wraps a transport.
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Consumes the meter and returns the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn query_f64(&mut self, command: &str) -> AppResult<f64> {
        let reply = self.transport.query_line(command)?;
        reply
            .trim()
            .parse::<f64>()
            .map_err(|_| SlmError::Instrument(format!("malformed reply to {command:?}: {reply:?}")))
    }
}

impl<T: ScpiTransport> PowerMeter for ScpiPowerMeter<T> {
    fn identify(&mut self) -> AppResult<String> {
        Ok(self.transport.query_line("*IDN?")?.trim().to_string())
    }

    fn configure_power_mode(&mut self) -> AppResult<()> {
        self.transport.write_line("CONF:POW")
    }

    fn set_average_count(&mut self, count: u32) -> AppResult<()> {
        self.transport.write_line(&format!("SENS:AVER:COUN {count}"))
    }

    fn wavelength_range_nm(&mut self) -> AppResult<(f64, f64)> {
        let min = self.query_f64("SENS:CORR:WAV? MIN")?;
        let max = self.query_f64("SENS:CORR:WAV? MAX")?;
        Ok((min, max))
    }

    fn set_wavelength_nm(&mut self, nm: f64) -> AppResult<()> {
        self.transport.write_line(&format!("SENS:CORR:WAV {nm}"))
    }

    fn read_power_watts(&mut self) -> AppResult<f64> {
        self.query_f64("READ?")
    }

    fn beep(&mut self) -> AppResult<()> {
        self.transport.write_line("SYST:BEEP:IMM")
    }
}

/// Serial-port SCPI transport for meters reachable over a serial bridge.
#[cfg(feature = "instrument_serial")]
pub mod serial {
    use super::ScpiTransport;
    use crate::error::{AppResult, SlmError};
    use std::io::{BufRead, BufReader, Write};
    use std::time::Duration;

    /// Line-oriented SCPI over a serial port.
    pub struct SerialScpiTransport {
        reader: BufReader<Box<dyn serialport::SerialPort>>,
    }

    impl SerialScpiTransport {
        /// Opens `path` at the given baud rate with a 2 s read timeout.
        pub fn open(path: &str, baud_rate: u32) -> AppResult<Self> {
            let port = serialport::new(path, baud_rate)
                .timeout(Duration::from_secs(2))
                .open()
                .map_err(|e| SlmError::Instrument(format!("open {path}: {e}")))?;
            Ok(Self {
                reader: BufReader::new(port),
            })
        }
    }

    impl ScpiTransport for SerialScpiTransport {
        fn write_line(&mut self, command: &str) -> AppResult<()> {
            let port = self.reader.get_mut();
            port.write_all(command.as_bytes())?;
            port.write_all(b"\n")?;
            port.flush()?;
            Ok(())
        }

        fn query_line(&mut self, command: &str) -> AppResult<String> {
            self.write_line(command)?;
            let mut line = String::new();
            self.reader.read_line(&mut line)?;
            if line.is_empty() {
                return Err(SlmError::Instrument(format!("no reply to {command:?}")));
            }
            Ok(line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::ScriptedTransport;

    #[test]
    fn identify_queries_idn() {
        let transport = ScriptedTransport::new(["Thorlabs,PM100D,P0000000,1.0"]);
        let mut meter = ScpiPowerMeter::new(transport);
        let idn = meter.identify().unwrap();
        assert_eq!(idn, "Thorlabs,PM100D,P0000000,1.0");
        assert_eq!(meter.into_transport().sent, vec!["*IDN?"]);
    }

    #[test]
    fn setup_issues_documented_commands() {
        let transport = ScriptedTransport::default();
        let mut meter = ScpiPowerMeter::new(transport);
        meter.configure_power_mode().unwrap();
        meter.set_average_count(100).unwrap();
        meter.set_wavelength_nm(532.0).unwrap();
        meter.beep().unwrap();
        assert_eq!(
            meter.into_transport().sent,
            vec![
                "CONF:POW",
                "SENS:AVER:COUN 100",
                "SENS:CORR:WAV 532",
                "SYST:BEEP:IMM"
            ]
        );
    }

    #[test]
    fn wavelength_range_parses_min_and_max() {
        let transport = ScriptedTransport::new(["400.0\n", "1100.0\n"]);
        let mut meter = ScpiPowerMeter::new(transport);
        let (min, max) = meter.wavelength_range_nm().unwrap();
        assert_eq!(min, 400.0);
        assert_eq!(max, 1100.0);
        assert_eq!(
            meter.into_transport().sent,
            vec!["SENS:CORR:WAV? MIN", "SENS:CORR:WAV? MAX"]
        );
    }

    #[test]
    fn read_power_parses_scientific_notation() {
        let transport = ScriptedTransport::new(["1.2345e-3\n"]);
        let mut meter = ScpiPowerMeter::new(transport);
        assert_eq!(meter.read_power_watts().unwrap(), 1.2345e-3);
    }

    #[test]
    fn malformed_reply_is_an_instrument_error() {
        let transport = ScriptedTransport::new(["not-a-number\n"]);
        let mut meter = ScpiPowerMeter::new(transport);
        let err = meter.read_power_watts().unwrap_err();
        assert!(matches!(err, SlmError::Instrument(_)));
    }
}
