//! Static-fire burn logger
//!
//! Waits armed until thrust crosses the ignition trigger, logs every
//! converted frame to an append-only CSV burn log while feeding the live
//! display, auto-stops once thrust stays below the burnout trigger, then
//! prints the static-fire report.
//!
//! Usage:
//!   burn-logger --config static_fire.toml
//!   burn-logger --config static_fire.toml --simulate --output test_burn.csv

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use static_fire_daq::{
    analysis, monitor, BurnGate, CalibrationModel, Channel, ChannelReader, Config, Converter,
    DaqError, GateAction, LogRecord, LogWriter, MonitorUpdate, Sampler, SimReader, StreamControl,
    TickOutcome,
};

#[derive(Parser, Debug)]
#[command(name = "burn-logger")]
#[command(about = "Trigger-gated static-fire logging run", long_about = None)]
struct Args {
    /// Session configuration file (calibration + test settings)
    #[arg(short, long, default_value = "static_fire.toml")]
    config: PathBuf,

    /// Output log file (default: Motor_Data_<timestamp>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use the simulated DAQ instead of real hardware
    #[arg(long)]
    simulate: bool,

    /// Disable the live display
    #[arg(long)]
    no_monitor: bool,

    /// Live display refresh rate in Hz
    #[arg(long, default_value_t = 5.0)]
    refresh_hz: f64,
}

/// Synthetic burn for `--simulate`: 2 s quiet, a 3 s thrust/pressure curve,
/// then quiet again. Voltages come from inverting the session calibration
/// so the converted values look like a real K-class burn.
fn demo_profile(calibration: CalibrationModel) -> impl FnMut(Channel, f64) -> f64 + Send {
    move |channel, elapsed| {
        let burn = (2.0..5.0).contains(&elapsed);
        let shape = if burn {
            ((elapsed - 2.0) / 3.0 * std::f64::consts::PI).sin().max(0.0)
        } else {
            0.0
        };
        let physical = match channel {
            Channel::Thrust => 650.0 * shape,
            Channel::Pressure => 420.0 * shape,
            Channel::Temperature => 25.0 + 3.0 * shape,
        };
        calibration.invert(channel, physical).unwrap_or(0.0)
    }
}

fn open_reader(
    simulate: bool,
    channels: &[Channel],
    calibration: &CalibrationModel,
) -> Result<Box<dyn ChannelReader>, DaqError> {
    if simulate {
        return Ok(Box::new(SimReader::with_profile(demo_profile(
            calibration.clone(),
        ))));
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

/// Full-scale physical value per channel, for the display bar graphs
fn full_scales(
    calibration: &CalibrationModel,
    channels: &[Channel],
) -> Result<Vec<(Channel, f64)>, DaqError> {
    channels
        .iter()
        .map(|&channel| {
            let full = calibration.convert(channel, channel.input_range_volts())?;
            Ok((channel, full.abs().max(1.0)))
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let config = Config::load(&args.config)?;
    let calibration = config.calibration()?;
    let channels = config.channels();

    let output = args.output.unwrap_or_else(|| {
        PathBuf::from(format!(
            "Motor_Data_{}.csv",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ))
    });

    let reader = open_reader(args.simulate, &channels, &calibration)?;
    println!("Connected: {}", reader.describe());
    for channel in &channels {
        println!("  - {}", channel);
    }

    let running = Arc::new(AtomicBool::new(true));
    let stop = running.clone();
    ctrlc::set_handler(move || {
        println!("\nStop requested, finishing current tick...");
        stop.store(false, Ordering::SeqCst);
    })?;

    let (publisher, display) = if args.no_monitor {
        (None, None)
    } else {
        let (publisher, rx) = monitor::channel(64);
        let scales = full_scales(&calibration, &channels)?;
        let handle = monitor::spawn_console_sink(rx, args.refresh_hz, scales);
        (Some(publisher), Some(handle))
    };

    let mut log = LogWriter::create(&output, &channels, config.sample_rate_hz, config.flush_every)?;
    println!("Log file: {}", output.display());
    println!("\n--- READY FOR FIRE ---");
    println!(
        "Waiting for thrust > {:.1} N at {} Hz (Ctrl+C to stop)",
        config.ignition_trigger, config.sample_rate_hz
    );

    let mut sampler = Sampler::new(
        reader,
        channels.clone(),
        config.sample_rate_hz,
        config.read_retries,
        config.max_consecutive_gaps,
    )?;
    // The burn record clamps negative noise at zero
    let converter = Converter::new(&calibration, true);

    let mut gate = BurnGate::new(
        config.ignition_trigger,
        config.burnout_trigger,
        config.burnout_hold_ticks(),
    );
    let mut seq = 0u64;
    let mut kept: Vec<LogRecord> = Vec::new();
    let mut pipeline_err: Option<DaqError> = None;

    let run_result = sampler.run(|outcome| {
        match outcome {
            TickOutcome::Frame(frame) => {
                let converted = match converter.convert(&frame) {
                    Ok(converted) => converted,
                    Err(e) => {
                        pipeline_err = Some(e);
                        return StreamControl::Break;
                    }
                };
                let thrust = converted.value(Channel::Thrust).unwrap_or(0.0);

                let action = gate.observe(thrust);
                if action != GateAction::Idle {
                    if seq == 0 {
                        println!("\n*** IGNITION DETECTED, LOGGING STARTED ***");
                    }
                    let record = LogRecord {
                        seq,
                        frame: converted.clone(),
                    };
                    // The append commits before any stop signal is honored,
                    // so an in-flight frame is never lost on shutdown
                    if let Err(e) = log.append(&record) {
                        pipeline_err = Some(e);
                        return StreamControl::Break;
                    }
                    kept.push(record);
                    seq += 1;
                }

                if let Some(publisher) = &publisher {
                    publisher.publish(MonitorUpdate::Frame(converted));
                }

                if action == GateAction::Stop {
                    println!("\n*** BURNOUT DETECTED, STOPPING ***");
                    return StreamControl::Break;
                }
            }
            TickOutcome::Gap { tick, time_s } => {
                if gate.recording() {
                    if let Err(e) = log.append_gap(tick, time_s) {
                        pipeline_err = Some(e);
                        return StreamControl::Break;
                    }
                }
                if let Some(publisher) = &publisher {
                    publisher.publish(MonitorUpdate::Gap { tick });
                }
            }
        }
        if running.load(Ordering::SeqCst) {
            StreamControl::Continue
        } else {
            StreamControl::Break
        }
    });

    // Commit everything already appended before surfacing any error
    let finish_result = log.finish();

    drop(publisher);
    if let Some(handle) = display {
        let _ = handle.join();
    }

    if let Some(e) = pipeline_err {
        eprintln!("\nAcquisition halted: {}", e);
        return Err(e.into());
    }
    let ticks = run_result?;
    finish_result?;

    if log.records_written() == 0 {
        log.discard()?;
        println!("\nNo burn detected; nothing recorded.");
        return Ok(());
    }

    // Trim trailing below-threshold noise from the report only; the log
    // keeps every appended record, and an operator abort trims nothing
    let trailing = gate.report_trim() as usize;
    if trailing > 0 && kept.len() > trailing {
        kept.truncate(kept.len() - trailing);
    }

    if let Some(stats) = analysis::analyze(&kept, config.burnout_trigger) {
        println!("\n{}", analysis::format_report(&stats));
    }
    println!(
        "\nTicks: {} | Records logged: {} | File: {}",
        ticks,
        log.records_written(),
        output.display()
    );

    Ok(())
}
