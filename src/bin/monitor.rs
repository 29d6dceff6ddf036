//! Live sensor monitor
//!
//! Sanity-check run before a burn: samples at the configured rate,
//! converts through the session calibration and republishes to the console
//! at a throttled refresh. Readings are NOT clamped at zero here; drift
//! below the zero point should stay visible. Nothing is logged.
//!
//! Usage:
//!   monitor --config static_fire.toml
//!   monitor --config static_fire.toml --simulate

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use static_fire_daq::{
    monitor, CalibrationModel, Channel, ChannelReader, Config, Converter, DaqError, MonitorUpdate,
    Sampler, SimReader, StreamControl, TickOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "monitor")]
#[command(about = "Live converted-value display, no logging", long_about = None)]
struct Args {
    /// Session configuration file (calibration + test settings)
    #[arg(short, long, default_value = "static_fire.toml")]
    config: PathBuf,

    /// Display refresh rate in Hz
    #[arg(long, default_value_t = 5.0)]
    refresh_hz: f64,

    /// Use the simulated DAQ instead of real hardware
    #[arg(long)]
    simulate: bool,
}

fn open_reader(
    simulate: bool,
    channels: &[Channel],
    calibration: &CalibrationModel,
) -> Result<Box<dyn ChannelReader>, DaqError> {
    if simulate {
        // Gentle wobble around zero load so drift stays visible
        let calibration = calibration.clone();
        return Ok(Box::new(SimReader::with_profile(move |channel, elapsed| {
            let physical = match channel {
                Channel::Thrust => 4.0 * (elapsed * 0.8).sin(),
                Channel::Pressure => 1.5 * (elapsed * 0.5).sin(),
                Channel::Temperature => 25.0 + 0.2 * (elapsed * 0.3).sin(),
            };
            calibration.invert(channel, physical).unwrap_or(0.0)
        })));
    }
    #[cfg(feature = "hardware")]
    {
        Ok(Box::new(static_fire_daq::LjmReader::open(channels)?))
    }
    #[cfg(not(feature = "hardware"))]
    {
        let _ = channels;
        Err(DaqError::HardwareUnavailable(
            "built without the `hardware` feature; rebuild with --features hardware \
             or run with --simulate"
                .into(),
        ))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    let calibration = config.calibration()?;
    let channels = config.channels();

    let reader = open_reader(args.simulate, &channels, &calibration)?;
    println!("Connected: {}", reader.describe());
    println!("\n--- LIVE SENSOR MONITOR ---");
    println!("Verify that readings make sense before firing. Ctrl+C to quit.\n");

    let running = Arc::new(AtomicBool::new(true));
    let stop = running.clone();
    ctrlc::set_handler(move || stop.store(false, Ordering::SeqCst))?;

    let scales: Result<Vec<(Channel, f64)>, DaqError> = channels
        .iter()
        .map(|&channel| {
            let full = calibration.convert(channel, channel.input_range_volts())?;
            Ok((channel, full.abs().max(1.0)))
        })
        .collect();
    let (publisher, rx) = monitor::channel(64);
    let display = monitor::spawn_console_sink(rx, args.refresh_hz, scales?);

    let mut sampler = Sampler::new(
        reader,
        channels.clone(),
        config.sample_rate_hz,
        config.read_retries,
        config.max_consecutive_gaps,
    )?;
    // Unclamped: negative drift must be visible in a sanity check
    let converter = Converter::new(&calibration, false);

    let mut pipeline_err: Option<DaqError> = None;
    let run_result = sampler.run(|outcome| {
        match outcome {
            TickOutcome::Frame(frame) => match converter.convert(&frame) {
                Ok(converted) => publisher.publish(MonitorUpdate::Frame(converted)),
                Err(e) => {
                    pipeline_err = Some(e);
                    return StreamControl::Break;
                }
            },
            TickOutcome::Gap { tick, .. } => publisher.publish(MonitorUpdate::Gap { tick }),
        }
        if running.load(Ordering::SeqCst) {
            StreamControl::Continue
        } else {
            StreamControl::Break
        }
    });

    drop(publisher);
    let _ = display.join();

    if let Some(e) = pipeline_err {
        return Err(e.into());
    }
    run_result?;

    println!("Check complete.");
    Ok(())
}
