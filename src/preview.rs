//! Live preview pipeline and temperature polling.
//!
//! The original bench tool regenerated its mask inside GUI trace callbacks.
//! Here that wiring is explicit and toolkit-free: whatever observes
//! parameter edits calls [`PreviewPipeline::refresh`], which renders the
//! mask and pushes it to the device if one is attached. Rendering always
//! succeeds headless; a device failure is downgraded to status text, never
//! an error.
//!
//! Refreshes are synchronous: rapid successive edits each run the full
//! pipeline to completion before the next starts. Masks are small 2-D
//! arrays, so no debouncing or cancellation is needed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, warn};

use crate::error::AppResult;
use crate::hardware::slm::{SlmDevice, WriteOptions};
use crate::mask::compositor::generate;
use crate::mask::GrayMask;
use crate::params::MaskParameters;

/// Outcome of the device push of one refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceStatus {
    /// The mask reached the hardware.
    Written,
    /// No device is attached; the pipeline ran headless.
    Detached,
    /// The device refused the write; status text for the operator.
    Unavailable(String),
}

/// One rendered preview frame.
#[derive(Debug, Clone)]
pub struct PreviewFrame {
    /// The freshly generated mask.
    pub mask: GrayMask,
    /// What happened on the device side.
    pub device: DeviceStatus,
}

/// Renders masks on parameter changes and pushes them to an optional device.
pub struct PreviewPipeline {
    device: Option<Box<dyn SlmDevice>>,
}

impl PreviewPipeline {
    /// A pipeline with no device: pure rendering.
    pub fn detached() -> Self {
        Self { device: None }
    }

    /// A pipeline that pushes every rendered mask to `device`.
    pub fn with_device(device: Box<dyn SlmDevice>) -> Self {
        Self {
            device: Some(device),
        }
    }

    /// Renders `params` and pushes the mask to the device, if any.
    ///
    /// # Errors
    ///
    /// Only parameter validation can fail; device trouble is reported in
    /// [`PreviewFrame::device`], keeping the synthesis path alive headless.
    pub fn refresh(&mut self, params: &MaskParameters) -> AppResult<PreviewFrame> {
        let mask = generate(params)?;
        let device = match self.device.as_mut() {
            None => DeviceStatus::Detached,
            Some(device) => match device.write_mask(&mask, &WriteOptions::default()) {
                Ok(()) => DeviceStatus::Written,
                Err(e) => {
                    warn!("preview write failed, continuing headless: {e}");
                    DeviceStatus::Unavailable(e.to_string())
                }
            },
        };
        Ok(PreviewFrame { mask, device })
    }

    /// Access to the attached device, if any.
    pub fn device_mut(&mut self) -> Option<&mut (dyn SlmDevice + 'static)> {
        self.device.as_deref_mut()
    }
}

/// Repeating fire-and-forget board temperature reader.
///
/// Polls on its own thread, independent of the generation and sweep paths;
/// readings and failures are logged, never surfaced as errors. Dropping the
/// poller signals the thread to stop without waiting for it.
pub struct TemperaturePoller {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TemperaturePoller {
    /// Starts polling `device` every `interval`.
    pub fn spawn(device: Arc<Mutex<dyn SlmDevice>>, interval: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_signal = Arc::clone(&stop);
        let handle = thread::spawn(move || loop {
            if stop_signal.load(Ordering::SeqCst) {
                break;
            }
            match device.lock() {
                Ok(mut device) => match device.temperature_c() {
                    Ok(celsius) => info!("SLM temperature: {celsius:.1} C"),
                    Err(e) => warn!("temperature read failed: {e}"),
                },
                Err(_) => break,
            }
            thread::sleep(interval);
        });
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stops the poller and waits for its thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for TemperaturePoller {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hardware::mock::MockSlm;

    fn small_params() -> MaskParameters {
        MaskParameters {
            dimensions: (16, 8),
            ..Default::default()
        }
    }

    #[test]
    fn detached_pipeline_still_renders() {
        let mut pipeline = PreviewPipeline::detached();
        let frame = pipeline.refresh(&small_params()).unwrap();
        assert_eq!(frame.device, DeviceStatus::Detached);
        assert_eq!(frame.mask.dim(), (8, 16));
    }

    #[test]
    fn attached_pipeline_pushes_to_device() {
        let mut pipeline = PreviewPipeline::with_device(Box::new(MockSlm::new(16, 8)));
        let frame = pipeline.refresh(&small_params()).unwrap();
        assert_eq!(frame.device, DeviceStatus::Written);
    }

    #[test]
    fn device_failure_downgrades_to_status() {
        let mut slm = MockSlm::new(16, 8);
        slm.set_disconnected(true);
        let mut pipeline = PreviewPipeline::with_device(Box::new(slm));
        let frame = pipeline.refresh(&small_params()).unwrap();
        assert!(matches!(frame.device, DeviceStatus::Unavailable(_)));
        // The mask itself was still produced.
        assert_eq!(frame.mask.dim(), (8, 16));
    }

    #[test]
    fn invalid_parameters_are_still_an_error() {
        let mut pipeline = PreviewPipeline::detached();
        let params = MaskParameters {
            dimensions: (0, 8),
            ..Default::default()
        };
        assert!(pipeline.refresh(&params).is_err());
    }

    #[test]
    fn poller_reads_until_stopped() {
        let device: Arc<Mutex<dyn SlmDevice>> = Arc::new(Mutex::new(MockSlm::new(4, 4)));
        let mut poller = TemperaturePoller::spawn(device, Duration::from_millis(1));
        thread::sleep(Duration::from_millis(10));
        poller.stop();
    }
}
