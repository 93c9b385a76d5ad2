//! CLI entry point.
//!
//! Headless frontend over the library: renders masks, runs calibration
//! sweeps, and monitors board temperature. Mock hardware is wired in by
//! default so every command works without instruments attached; pass
//! `--dll` (with the `meadowlark_hardware` feature) to drive a real board.
//!
//! # Usage
//!
//! Render the default parameter set and export it:
//! ```bash
//! slm_bessel render --dat mask.dat
//! ```
//!
//! Run a global calibration sweep at 532 nm:
//! ```bash
//! slm_bessel calibrate --wavelength 532 --mode global --pitch 4
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use slm_bessel::calibration::{SweepConfig, SweepController, SweepMode};
use slm_bessel::config::Settings;
use slm_bessel::error::SlmError;
use slm_bessel::export::export_dat;
use slm_bessel::hardware::mock::{MockPowerMeter, MockSlm};
use slm_bessel::hardware::slm::{frame_buffer, SlmDevice};
use slm_bessel::params::MaskParameters;
use slm_bessel::preview::{PreviewPipeline, TemperaturePoller};

#[derive(Parser)]
#[command(name = "slm_bessel")]
#[command(about = "Phase-mask synthesis and calibration for phase-only SLMs", long_about = None)]
struct Cli {
    /// Settings TOML file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the vendor Blink_C_wrapper library (requires the
    /// meadowlark_hardware feature)
    #[arg(long, global = true)]
    dll: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a mask and optionally export or upload it
    Render {
        /// Parameter JSON file (defaults to the settings' seed parameters)
        #[arg(long)]
        params: Option<PathBuf>,

        /// Write the lens-design .dat table here
        #[arg(long)]
        dat: Option<PathBuf>,

        /// Write the raw column-major frame buffer here
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Push the mask to the device
        #[arg(long)]
        upload: bool,
    },

    /// Sweep all gray levels against the power meter
    Calibrate {
        /// Calibration wavelength in nm
        #[arg(long)]
        wavelength: f64,

        /// Sweep mode: global or regional
        #[arg(long, default_value = "global")]
        mode: String,

        /// Grating pitch in pixels
        #[arg(long, default_value_t = 4)]
        pitch: u32,

        /// Directory for the per-region CSV files (defaults to the settings'
        /// output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Periodically read the board temperature
    Monitor {
        /// Polling interval in seconds
        #[arg(long, default_value_t = 5)]
        interval_secs: u64,
    },
}

fn open_device(settings: &Settings, dll: Option<&PathBuf>) -> Result<Box<dyn SlmDevice>> {
    if let Some(dll_path) = dll {
        #[cfg(feature = "meadowlark_hardware")]
        {
            use slm_bessel::hardware::meadowlark::MeadowlarkSlm;
            let mut device = MeadowlarkSlm::open(dll_path, settings.sdk.bit_depth)?;
            let info = device.connect()?;
            info!("connected: {} board(s), status {}", info.boards, info.status);
            if let Some(lut) = &settings.lut_file {
                device.load_lookup_table(lut)?;
            }
            return Ok(Box::new(device));
        }
        #[cfg(not(feature = "meadowlark_hardware"))]
        {
            let _ = dll_path;
            return Err(SlmError::FeatureNotEnabled("meadowlark_hardware".to_string()).into());
        }
    }
    let (width, height) = settings.parameters.dimensions;
    info!("no device specified; using a simulated {width}x{height} board");
    Ok(Box::new(MockSlm::new(width, height)))
}

fn render(
    settings: &Settings,
    device: Box<dyn SlmDevice>,
    params_path: Option<&PathBuf>,
    dat: Option<&PathBuf>,
    raw: Option<&PathBuf>,
    upload: bool,
) -> Result<()> {
    let mut params = match params_path {
        Some(path) => MaskParameters::load_json(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => settings.parameters.clone(),
    };

    let mut pipeline = if upload {
        PreviewPipeline::with_device(device)
    } else {
        PreviewPipeline::detached()
    };

    // Device-reported dimensions override the requested frame size.
    if let Some(device) = pipeline.device_mut() {
        if let Ok(dimensions) = device.dimensions() {
            params = params.with_device_dimensions(dimensions);
        }
    }

    let frame = pipeline.refresh(&params)?;
    info!("rendered {}x{} mask; device: {:?}", params.dimensions.0, params.dimensions.1, frame.device);

    if let Some(path) = dat {
        export_dat(&frame.mask, settings.pixel_size_mm, path)?;
        info!("wrote {}", path.display());
    }
    if let Some(path) = raw {
        std::fs::write(path, frame_buffer(&frame.mask))?;
        info!("wrote {}", path.display());
    }
    Ok(())
}

fn calibrate(
    settings: &Settings,
    mut device: Box<dyn SlmDevice>,
    wavelength: f64,
    mode: &str,
    pitch: u32,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let mode: SweepMode = mode.parse().map_err(SlmError::Validation)?;
    let mut meter = MockPowerMeter::new();

    let config = SweepConfig {
        wavelength_nm: wavelength,
        mode,
        grating_pitch: pitch,
        settle: settings.settle,
        average_count: settings.average_count,
        output_dir: output_dir.unwrap_or_else(|| settings.output_dir.clone()),
    };

    let mut controller = SweepController::new(device.as_mut(), &mut meter);
    controller.configure(config)?;
    controller.stream_alignment_pattern()?;
    let summary = controller.run()?;

    println!(
        "swept {} region(s): {} samples recorded, {} missing",
        summary.regions_completed, summary.samples_recorded, summary.samples_missing
    );
    for file in &summary.files {
        println!("  {}", file.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let settings =
        Settings::load(cli.config.as_deref()).context("loading settings")?;

    match &cli.command {
        Commands::Render {
            params,
            dat,
            raw,
            upload,
        } => {
            let device = open_device(&settings, cli.dll.as_ref())?;
            render(
                &settings,
                device,
                params.as_ref(),
                dat.as_ref(),
                raw.as_ref(),
                *upload,
            )
        }
        Commands::Calibrate {
            wavelength,
            mode,
            pitch,
            output_dir,
        } => {
            let device = open_device(&settings, cli.dll.as_ref())?;
            calibrate(
                &settings,
                device,
                *wavelength,
                mode,
                *pitch,
                output_dir.clone(),
            )
        }
        Commands::Monitor { interval_secs } => {
            let device = open_device(&settings, cli.dll.as_ref())?;
            let shared: Arc<Mutex<dyn SlmDevice>> = Arc::new(Mutex::new(device));
            let _poller =
                TemperaturePoller::spawn(shared, Duration::from_secs(*interval_secs));
            info!("monitoring; stop with Ctrl-C");
            loop {
                std::thread::sleep(Duration::from_secs(60));
            }
        }
    }
}
