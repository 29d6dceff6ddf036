//! Error types for the static-fire acquisition pipeline

use std::path::PathBuf;

use thiserror::Error;

use crate::channel::Channel;

/// Error type for acquisition, calibration and logging operations
#[derive(Error, Debug)]
pub enum DaqError {
    /// Bad or missing configuration; fatal before acquisition starts
    #[error("configuration error: {0}")]
    Config(String),

    /// Device not found, not claimed, or persistently failing; fatal
    #[error("DAQ hardware unavailable: {0}")]
    HardwareUnavailable(String),

    /// A single read did not complete in time; retried before escalating
    #[error("read timed out on channel {0}")]
    ReadTimeout(Channel),

    /// The device dropped off the bus mid-read; retried before escalating
    #[error("device disconnected while reading channel {0}")]
    DeviceDisconnected(Channel),

    /// One tick's frame could not be completed within the retry budget;
    /// recorded as a gap, acquisition continues
    #[error("incomplete frame for tick {tick}: channel {channel} failed after {attempts} attempts")]
    PartialFrame {
        tick: u64,
        channel: Channel,
        attempts: u32,
    },

    /// The log path is already claimed by another writer
    #[error("log already open: {0}")]
    LogAlreadyOpen(PathBuf),

    /// A log append or flush failed; fatal, acquisition halts
    #[error("log write failed: {0}")]
    LogWrite(String),

    /// A recorded log could not be parsed back
    #[error("log parse error: {0}")]
    LogFormat(String),

    /// Programmer/configuration mismatch; must not occur in a correctly
    /// configured session
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Result type for acquisition pipeline operations
pub type Result<T> = std::result::Result<T, DaqError>;
