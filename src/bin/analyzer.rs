//! Post-run burn log analyzer
//!
//! Reads a recorded burn log and prints the static-fire report: total
//! impulse, motor class, burn time and peak values.
//!
//! Usage:
//!   analyzer --input Motor_Data_20260830_140211.csv
//!   analyzer --input burn.csv --burnout-trigger 15.0

use std::path::PathBuf;

use clap::Parser;

use static_fire_daq::{analysis, LogReader};

#[derive(Parser, Debug)]
#[command(name = "analyzer")]
#[command(about = "Analyze a recorded static-fire burn log", long_about = None)]
struct Args {
    /// Input burn log
    #[arg(short, long)]
    input: PathBuf,

    /// Thrust (N) bounding the active burn window
    #[arg(long, default_value_t = 10.0)]
    burnout_trigger: f64,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let log = LogReader::open(&args.input)?;
    let metadata = log.metadata();

    println!("Log file   : {}", args.input.display());
    println!("Recorded   : {}", metadata.start_time);
    println!("Sample rate: {} Hz", metadata.sample_rate_hz);
    println!(
        "Channels   : {}",
        metadata
            .channels
            .iter()
            .map(|c| format!("{} ({})", c.label(), c.unit()))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Records    : {}", log.records().len());
    if !log.gaps().is_empty() {
        println!("Gaps       : {}", log.gaps().len());
    }

    match analysis::analyze(log.records(), args.burnout_trigger) {
        Some(stats) => println!("\n{}", analysis::format_report(&stats)),
        None => {
            eprintln!("No records in log.");
            std::process::exit(1);
        }
    }

    Ok(())
}
