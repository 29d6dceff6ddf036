//! Static-fire data acquisition pipeline for a LabJack T7
//!
//! Samples thrust, pressure and (optionally) temperature voltages at a
//! fixed rate during a rocket-motor burn, converts them to physical units
//! through per-channel linear calibration, and fans the converted frames
//! out to an append-only burn log and a throttled live display.
//!
//! # Quick Start
//!
//! ## Simulated acquisition
//! ```no_run
//! use static_fire_daq::{Channel, Converter, SimReader, Sampler, StreamControl, TickOutcome};
//! use static_fire_daq::Config;
//!
//! let config = Config::load("static_fire.toml")?;
//! let calibration = config.calibration()?;
//!
//! let reader = SimReader::fixed(&[(Channel::Thrust, 1.27), (Channel::Pressure, 0.03)]);
//! let mut sampler = Sampler::new(
//!     reader,
//!     vec![Channel::Thrust, Channel::Pressure],
//!     config.sample_rate_hz,
//!     config.read_retries,
//!     config.max_consecutive_gaps,
//! )?;
//!
//! let converter = Converter::new(&calibration, false);
//! let mut seen = 0u32;
//! sampler.run(|outcome| {
//!     if let TickOutcome::Frame(frame) = outcome {
//!         if let Ok(converted) = converter.convert(&frame) {
//!             println!("thrust: {:.1} N", converted.value(Channel::Thrust).unwrap_or(0.0));
//!         }
//!     }
//!     seen += 1;
//!     if seen < 100 { StreamControl::Continue } else { StreamControl::Break }
//! })?;
//! # Ok::<(), static_fire_daq::DaqError>(())
//! ```
//!
//! ## Logging converted frames
//! ```no_run
//! use static_fire_daq::{Channel, LogRecord, LogWriter};
//! # fn frames() -> Vec<static_fire_daq::ConvertedFrame> { Vec::new() }
//!
//! let channels = [Channel::Thrust, Channel::Pressure];
//! let mut log = LogWriter::create("burn.csv", &channels, 200, 50)?;
//! for (seq, frame) in frames().into_iter().enumerate() {
//!     log.append(&LogRecord { seq: seq as u64, frame })?;
//! }
//! log.finish()?;
//! # Ok::<(), static_fire_daq::DaqError>(())
//! ```
//!
//! ## Reading a burn back
//! ```no_run
//! use static_fire_daq::{analysis, LogReader};
//!
//! let log = LogReader::open("burn.csv")?;
//! if let Some(stats) = analysis::analyze(log.records(), 10.0) {
//!     println!("{}", analysis::format_report(&stats));
//! }
//! # Ok::<(), static_fire_daq::DaqError>(())
//! ```

pub mod analysis;
pub mod calibration;
pub mod channel;
pub mod config;
pub mod convert;
pub mod error;
#[cfg(feature = "hardware")]
mod ffi;
pub mod flight_log;
pub mod monitor;
pub mod reader;
pub mod sampler;
pub mod trigger;

// Re-export public API
pub use calibration::{CalibrationEntry, CalibrationModel};
pub use channel::Channel;
pub use config::Config;
pub use convert::{ConvertedFrame, Converter, LogRecord};
pub use error::{DaqError, Result};
pub use flight_log::{LogMetadata, LogReader, LogWriter};
pub use monitor::{MonitorPublisher, MonitorUpdate};
#[cfg(feature = "hardware")]
pub use reader::LjmReader;
pub use reader::{ChannelReader, SimReader};
pub use sampler::{RawSample, SampleFrame, Sampler, StreamControl, TickOutcome};
pub use trigger::{BurnGate, GateAction};
