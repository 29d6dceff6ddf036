//! Conversion stage: raw frames to physical units
//!
//! A pure transform over complete sample frames. No I/O and no retries;
//! the only failure mode is a frame referencing a channel the calibration
//! model does not know, which is a programmer error and fatal.

use crate::calibration::CalibrationModel;
use crate::channel::Channel;
use crate::sampler::SampleFrame;

pub use crate::error::Result;

/// A frame's readings in physical units, immutable once produced
#[derive(Debug, Clone)]
pub struct ConvertedFrame {
    pub tick: u64,
    pub time_s: f64,
    /// One value per configured channel, in acquisition order
    pub values: Vec<(Channel, f64)>,
}

impl ConvertedFrame {
    /// Physical value for one channel, if present
    pub fn value(&self, channel: Channel) -> Option<f64> {
        self.values
            .iter()
            .find(|(c, _)| *c == channel)
            .map(|(_, v)| *v)
    }

    /// Channels in this frame, in order
    pub fn channels(&self) -> Vec<Channel> {
        self.values.iter().map(|(c, _)| *c).collect()
    }
}

/// A converted frame plus its position in the log
#[derive(Debug, Clone)]
pub struct LogRecord {
    /// Strictly increasing, assigned by the logging loop
    pub seq: u64,
    pub frame: ConvertedFrame,
}

/// Applies the calibration model to sample frames
///
/// With `clamp_negative` set, channels that clamp at zero (thrust,
/// pressure) are floored at 0.0 to hide amplifier noise; the live monitor
/// runs unclamped so negative drift stays visible.
pub struct Converter<'a> {
    model: &'a CalibrationModel,
    clamp_negative: bool,
}

impl<'a> Converter<'a> {
    pub fn new(model: &'a CalibrationModel, clamp_negative: bool) -> Self {
        Self {
            model,
            clamp_negative,
        }
    }

    /// Convert a complete raw frame to physical units
    pub fn convert(&self, frame: &SampleFrame) -> Result<ConvertedFrame> {
        let mut values = Vec::with_capacity(frame.samples.len());
        for sample in &frame.samples {
            let mut physical = self.model.convert(sample.channel, sample.voltage)?;
            if self.clamp_negative && sample.channel.clamps_at_zero() && physical < 0.0 {
                physical = 0.0;
            }
            values.push((sample.channel, physical));
        }
        Ok(ConvertedFrame {
            tick: frame.tick,
            time_s: frame.time_s,
            values,
        })
    }
}
