//! Calibration tool
//!
//! Displays live raw voltages so the operator can verify wiring, and
//! optionally runs the two-point wizard: capture a zero-load point and a
//! known-load point, derive `slope = known / (loaded - zero)`, and print a
//! ready-to-paste config snippet.
//!
//! Usage:
//!   calibrate                          live voltage display
//!   calibrate --wizard --channel thrust --known 981.0

use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use static_fire_daq::{
    CalibrationEntry, Channel, ChannelReader, DaqError, SimReader,
};

#[derive(Parser, Debug)]
#[command(name = "calibrate")]
#[command(about = "Live voltage display and two-point calibration wizard", long_about = None)]
struct Args {
    /// Run the two-point wizard instead of the live display
    #[arg(long)]
    wizard: bool,

    /// Channel to calibrate in wizard mode
    #[arg(long, default_value = "thrust")]
    channel: String,

    /// Physical value of the known applied load (N, psi or C)
    #[arg(long, required_if_eq("wizard", "true"))]
    known: Option<f64>,

    /// Readings to average per calibration point
    #[arg(long, default_value_t = 20)]
    samples: usize,

    /// Use the simulated DAQ instead of real hardware
    #[arg(long)]
    simulate: bool,
}

fn open_reader(simulate: bool, channels: &[Channel]) -> Result<Box<dyn ChannelReader>, DaqError> {
    if simulate {
        // Idle voltages matching the reference wiring
        return Ok(Box::new(SimReader::fixed(&[
            (Channel::Thrust, 1.2648),
            (Channel::Pressure, 0.0243),
            (Channel::Temperature, 0.2130),
        ])));
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

/// Average `count` readings spaced 20 ms apart
fn average_voltage(
    reader: &mut dyn ChannelReader,
    channel: Channel,
    count: usize,
) -> Result<f64, DaqError> {
    let mut sum = 0.0;
    for _ in 0..count {
        sum += reader.read_voltage(channel)?;
        std::thread::sleep(Duration::from_millis(20));
    }
    Ok(sum / count.max(1) as f64)
}

fn wait_for_enter(prompt: &str) {
    print!("{}", prompt);
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok();
}

fn run_wizard(
    reader: &mut dyn ChannelReader,
    channel: Channel,
    known: f64,
    samples: usize,
) -> Result<(), DaqError> {
    println!("Two-point calibration for {}", channel);
    println!("{}", "-".repeat(45));

    wait_for_enter("Remove all load from the sensor, then press Enter... ");
    let zero_volts = average_voltage(reader, channel, samples)?;
    println!("  zero point: {:.4} V", zero_volts);

    wait_for_enter(&format!(
        "Apply the known load ({:.2} {}), then press Enter... ",
        known,
        channel.unit()
    ));
    let loaded_volts = average_voltage(reader, channel, samples)?;
    println!("  loaded point: {:.4} V", loaded_volts);

    let entry = CalibrationEntry::from_two_points(zero_volts, loaded_volts, known)?;
    println!("\nPaste this into your session config:\n");
    println!("[{}]", channel.label());
    println!("zero_volts = {:.6}", entry.zero_volts);
    println!("slope = {:.6}", entry.slope);
    Ok(())
}

fn run_live(reader: &mut dyn ChannelReader, running: &AtomicBool) -> Result<(), DaqError> {
    println!("\n--- LIVE VOLTAGE DISPLAY ---");
    println!("Verify the raw readings before calibrating. Ctrl+C to quit.\n");
    println!(
        "{:<20} | {:<20} | {:<20}",
        "THRUST (AIN0)", "PRESSURE (AIN2)", "TEMP (AIN4)"
    );
    println!("{}", "-".repeat(66));

    while running.load(Ordering::SeqCst) {
        let mut fields = Vec::new();
        for channel in Channel::ALL {
            match reader.read_voltage(channel) {
                Ok(voltage) => fields.push(format!("{:<20.4}", voltage)),
                Err(DaqError::ReadTimeout(_)) | Err(DaqError::DeviceDisconnected(_)) => {
                    fields.push(format!("{:<20}", "---"))
                }
                Err(e) => return Err(e),
            }
        }
        print!("\r{}", fields.join(" | "));
        io::stdout().flush().ok();
        std::thread::sleep(Duration::from_millis(200));
    }

    println!("\n\n--- CALIBRATION DONE ---");
    println!("Use these voltages to update the session config, or rerun with --wizard.");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let mut reader = open_reader(args.simulate, &Channel::ALL)?;
    println!("Connected: {}", reader.describe());

    if args.wizard {
        let channel: Channel = args.channel.parse()?;
        let known = args
            .known
            .ok_or_else(|| DaqError::Config("--known is required with --wizard".into()))?;
        run_wizard(reader.as_mut(), channel, known, args.samples)?;
    } else {
        let running = Arc::new(AtomicBool::new(true));
        let stop = running.clone();
        ctrlc::set_handler(move || stop.store(false, Ordering::SeqCst))?;
        run_live(reader.as_mut(), &running)?;
    }

    Ok(())
}
