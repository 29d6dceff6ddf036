//! Session configuration
//!
//! A TOML file supplies the per-channel calibration plus the test settings
//! (sample rate, ignition/burnout triggers, retry budgets, flush cadence).
//! Everything is loaded and validated once before acquisition starts; the
//! resulting values are immutable for the session.
//!
//! ```toml
//! sample_rate_hz = 200
//! ignition_trigger = 20.0
//! burnout_trigger = 10.0
//!
//! [thrust]
//! zero_volts = 1.2648
//! slope = 9659.0769
//!
//! [pressure]
//! zero_volts = 0.0243
//! slope = 625.0
//!
//! [temperature]
//! zero_volts = 0.0
//! slope = 100.0
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationEntry, CalibrationModel};
use crate::channel::Channel;
use crate::error::{DaqError, Result};

fn default_sample_rate() -> u32 {
    200
}

fn default_ignition_trigger() -> f64 {
    20.0
}

fn default_burnout_trigger() -> f64 {
    10.0
}

fn default_burnout_hold_secs() -> f64 {
    0.5
}

fn default_flush_every() -> usize {
    50
}

fn default_read_retries() -> u32 {
    3
}

fn default_max_consecutive_gaps() -> u32 {
    5
}

/// Validated session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Acquisition rate in Hz
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: u32,

    /// Thrust (N) above which the burn logger starts recording
    #[serde(default = "default_ignition_trigger")]
    pub ignition_trigger: f64,

    /// Thrust (N) below which the motor counts as burned out
    #[serde(default = "default_burnout_trigger")]
    pub burnout_trigger: f64,

    /// How long thrust must stay below the burnout trigger before the
    /// logger auto-stops
    #[serde(default = "default_burnout_hold_secs")]
    pub burnout_hold_secs: f64,

    /// Flush the log to the OS every this many records
    #[serde(default = "default_flush_every")]
    pub flush_every: usize,

    /// Additional read attempts per channel within one tick
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    /// Consecutive gap ticks before acquisition aborts
    #[serde(default = "default_max_consecutive_gaps")]
    pub max_consecutive_gaps: u32,

    /// Load cell calibration (AIN0)
    pub thrust: CalibrationEntry,

    /// Pressure transducer calibration (AIN2)
    pub pressure: CalibrationEntry,

    /// Temperature probe calibration (AIN4); omit if no probe is wired
    pub temperature: Option<CalibrationEntry>,
}

impl Config {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| DaqError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_toml(&text)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| DaqError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 || self.sample_rate_hz > 1000 {
            return Err(DaqError::Config(format!(
                "sample rate must be 1-1000 Hz, got {}",
                self.sample_rate_hz
            )));
        }
        if self.burnout_trigger > self.ignition_trigger {
            return Err(DaqError::Config(format!(
                "burnout trigger ({} N) above ignition trigger ({} N)",
                self.burnout_trigger, self.ignition_trigger
            )));
        }
        if self.burnout_hold_secs <= 0.0 {
            return Err(DaqError::Config("burnout hold must be positive".into()));
        }
        if self.flush_every == 0 {
            return Err(DaqError::Config("flush_every must be at least 1".into()));
        }
        // Slope/finiteness checks happen when the model is built
        self.calibration().map(|_| ())
    }

    /// Channels configured for this session, in acquisition order
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = vec![Channel::Thrust, Channel::Pressure];
        if self.temperature.is_some() {
            channels.push(Channel::Temperature);
        }
        channels
    }

    /// Build the immutable calibration model for this session
    pub fn calibration(&self) -> Result<CalibrationModel> {
        let mut entries = vec![
            (Channel::Thrust, self.thrust),
            (Channel::Pressure, self.pressure),
        ];
        if let Some(temperature) = self.temperature {
            entries.push((Channel::Temperature, temperature));
        }
        CalibrationModel::new(entries)
    }

    /// Scheduled interval between ticks
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sample_rate_hz as f64)
    }

    /// Ticks thrust must stay below the burnout trigger before auto-stop
    pub fn burnout_hold_ticks(&self) -> u64 {
        (self.burnout_hold_secs * self.sample_rate_hz as f64).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        sample_rate_hz = 200
        ignition_trigger = 20.0
        burnout_trigger = 10.0

        [thrust]
        zero_volts = 1.2648
        slope = 9659.0769

        [pressure]
        zero_volts = 0.0243
        slope = 625.0

        [temperature]
        zero_volts = 0.0
        slope = 100.0
    "#;

    #[test]
    fn test_full_config_parses() {
        let config = Config::from_toml(FULL).unwrap();
        assert_eq!(config.sample_rate_hz, 200);
        assert_eq!(config.channels(), Channel::ALL.to_vec());
        assert_eq!(config.flush_every, 50);
        assert_eq!(config.burnout_hold_ticks(), 100);
    }

    #[test]
    fn test_temperature_optional() {
        let config = Config::from_toml(
            r#"
            [thrust]
            zero_volts = 1.0
            slope = 1000.0

            [pressure]
            zero_volts = 0.0
            slope = 625.0
        "#,
        )
        .unwrap();
        assert_eq!(config.channels(), vec![Channel::Thrust, Channel::Pressure]);
        assert!(config.calibration().unwrap().entry(Channel::Temperature).is_err());
    }

    #[test]
    fn test_zero_slope_rejected_at_load() {
        let result = Config::from_toml(
            r#"
            [thrust]
            zero_volts = 1.0
            slope = 0.0

            [pressure]
            zero_volts = 0.0
            slope = 625.0
        "#,
        );
        assert!(matches!(result, Err(DaqError::Config(_))));
    }

    #[test]
    fn test_missing_channel_rejected() {
        let result = Config::from_toml(
            r#"
            [thrust]
            zero_volts = 1.0
            slope = 1000.0
        "#,
        );
        assert!(matches!(result, Err(DaqError::Config(_))));
    }

    #[test]
    fn test_bad_rate_rejected() {
        let text = format!("sample_rate_hz = 2000\n{}", &FULL[FULL.find("[thrust]").unwrap()..]);
        assert!(matches!(Config::from_toml(&text), Err(DaqError::Config(_))));
    }

    #[test]
    fn test_inverted_triggers_rejected() {
        let text = format!(
            "ignition_trigger = 5.0\nburnout_trigger = 10.0\n{}",
            &FULL[FULL.find("[thrust]").unwrap()..]
        );
        assert!(matches!(Config::from_toml(&text), Err(DaqError::Config(_))));
    }
}
