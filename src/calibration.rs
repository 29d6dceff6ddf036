//! Per-channel linear calibration
//!
//! Each channel carries a `{zero, slope}` pair mapping raw voltage to
//! physical units: `physical = (voltage - zero) * slope`. The pairs come
//! from the session config or from the two-point calibration wizard, and
//! are immutable once the model is built.

use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::{DaqError, Result};

/// Linear calibration for one channel
///
/// `zero_volts` is the voltage under zero load; `slope` is physical units
/// per volt. The slope must be non-zero and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    /// Voltage reading under zero physical load
    pub zero_volts: f64,
    /// Physical units per volt
    pub slope: f64,
}

impl CalibrationEntry {
    pub fn new(zero_volts: f64, slope: f64) -> Self {
        Self { zero_volts, slope }
    }

    /// Convert a raw voltage to physical units
    #[inline]
    pub fn convert(&self, voltage: f64) -> f64 {
        (voltage - self.zero_volts) * self.slope
    }

    /// Convert a physical value back to the voltage that would produce it
    #[inline]
    pub fn invert(&self, physical: f64) -> f64 {
        physical / self.slope + self.zero_volts
    }

    /// Derive a calibration from a zero-load reading and a known applied load
    ///
    /// `zero_volts` is the averaged voltage with nothing on the sensor,
    /// `loaded_volts` the averaged voltage with `known_physical` applied.
    /// Fails if the two voltages are indistinguishable.
    pub fn from_two_points(zero_volts: f64, loaded_volts: f64, known_physical: f64) -> Result<Self> {
        let span = loaded_volts - zero_volts;
        if span.abs() < 1e-9 {
            return Err(DaqError::Config(format!(
                "calibration points too close: {:.6} V vs {:.6} V",
                zero_volts, loaded_volts
            )));
        }
        Ok(Self {
            zero_volts,
            slope: known_physical / span,
        })
    }

    fn validate(&self, channel: Channel) -> Result<()> {
        if self.slope == 0.0 {
            return Err(DaqError::Config(format!("channel {} has zero slope", channel)));
        }
        if !self.slope.is_finite() || !self.zero_volts.is_finite() {
            return Err(DaqError::Config(format!(
                "channel {} has non-finite calibration ({} V zero, {} per volt)",
                channel, self.zero_volts, self.slope
            )));
        }
        Ok(())
    }
}

/// Immutable calibration model covering every configured channel
///
/// Built once at startup and shared by reference with the sampler and the
/// conversion stage; there is no mutable calibration state after load.
#[derive(Debug, Clone)]
pub struct CalibrationModel {
    entries: Vec<(Channel, CalibrationEntry)>,
}

impl CalibrationModel {
    /// Build and validate a model from per-channel entries
    ///
    /// Fails with a config error if no channels are configured, a channel
    /// appears twice, or any entry has a zero or non-finite slope.
    pub fn new(entries: Vec<(Channel, CalibrationEntry)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(DaqError::Config("no channels configured".into()));
        }
        for (i, (channel, entry)) in entries.iter().enumerate() {
            entry.validate(*channel)?;
            if entries[..i].iter().any(|(c, _)| c == channel) {
                return Err(DaqError::Config(format!(
                    "channel {} configured more than once",
                    channel
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Configured channels in acquisition order
    pub fn channels(&self) -> Vec<Channel> {
        self.entries.iter().map(|(c, _)| *c).collect()
    }

    /// Calibration entry for one channel
    ///
    /// An unknown channel here is a programmer error: channel sets are
    /// fixed at configuration time.
    pub fn entry(&self, channel: Channel) -> Result<&CalibrationEntry> {
        self.entries
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, e)| e)
            .ok_or_else(|| {
                DaqError::InvariantViolation(format!("no calibration entry for channel {}", channel))
            })
    }

    /// Convert a raw voltage on `channel` to physical units
    pub fn convert(&self, channel: Channel, voltage: f64) -> Result<f64> {
        Ok(self.entry(channel)?.convert(voltage))
    }

    /// Map a physical value on `channel` back to voltage (display/debug)
    pub fn invert(&self, channel: Channel, physical: f64) -> Result<f64> {
        Ok(self.entry(channel)?.invert(physical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> CalibrationModel {
        CalibrationModel::new(vec![
            (Channel::Thrust, CalibrationEntry::new(1.2648, 9659.0769)),
            (Channel::Pressure, CalibrationEntry::new(0.0243, 625.0)),
            (Channel::Temperature, CalibrationEntry::new(0.0, 100.0)),
        ])
        .unwrap()
    }

    #[test]
    fn test_worked_example() {
        // zero = 0.50 V, slope = 100 unit/V, 0.75 V reads 25.0 units
        let entry = CalibrationEntry::new(0.50, 100.0);
        assert!((entry.convert(0.75) - 25.0).abs() < 1e-12);
    }

    #[test]
    fn test_convert_invert_round_trip() {
        let m = model();
        for channel in Channel::ALL {
            for voltage in [-3.0, 0.0, 0.0243, 1.2648, 4.75, 9.99] {
                let physical = m.convert(channel, voltage).unwrap();
                let back = m.invert(channel, physical).unwrap();
                assert!(
                    (back - voltage).abs() < 1e-9,
                    "{} round trip: {} -> {} -> {}",
                    channel,
                    voltage,
                    physical,
                    back
                );
            }
        }
    }

    #[test]
    fn test_zero_slope_rejected() {
        let result = CalibrationModel::new(vec![(
            Channel::Thrust,
            CalibrationEntry::new(1.0, 0.0),
        )]);
        assert!(matches!(result, Err(DaqError::Config(_))));
    }

    #[test]
    fn test_duplicate_channel_rejected() {
        let result = CalibrationModel::new(vec![
            (Channel::Thrust, CalibrationEntry::new(1.0, 10.0)),
            (Channel::Thrust, CalibrationEntry::new(1.1, 11.0)),
        ]);
        assert!(matches!(result, Err(DaqError::Config(_))));
    }

    #[test]
    fn test_unknown_channel_is_invariant_violation() {
        let m = CalibrationModel::new(vec![(
            Channel::Thrust,
            CalibrationEntry::new(1.0, 10.0),
        )])
        .unwrap();
        assert!(matches!(
            m.convert(Channel::Pressure, 1.0),
            Err(DaqError::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_from_two_points() {
        // 0 N at 1.25 V, 500 N at 1.30 V -> 10000 N/V
        let entry = CalibrationEntry::from_two_points(1.25, 1.30, 500.0).unwrap();
        assert!((entry.slope - 10000.0).abs() < 1e-6);
        assert!((entry.convert(1.30) - 500.0).abs() < 1e-6);
        assert!((entry.convert(1.25)).abs() < 1e-9);
    }

    #[test]
    fn test_from_two_points_identical_rejected() {
        assert!(CalibrationEntry::from_two_points(1.25, 1.25, 500.0).is_err());
    }
}
