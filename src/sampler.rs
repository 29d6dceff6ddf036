//! Fixed-rate frame acquisition
//!
//! The sampler owns the channel reader and drives the tick loop. Each tick
//! reads every configured channel in fixed order and stamps all readings
//! with the tick's *scheduled* time, so inter-channel skew cannot
//! accumulate over a run. Tick deadlines are computed from the loop start
//! plus `tick * period`, never from "now + period", so transient processing
//! delays do not drift the schedule.
//!
//! A channel read that fails is retried within the same tick up to the
//! configured budget. If the budget is exhausted the whole tick becomes a
//! gap: consumers see [`TickOutcome::Gap`] instead of a partially-filled
//! frame. Gaps on enough consecutive ticks escalate to
//! `HardwareUnavailable` and terminate acquisition.

use std::time::{Duration, Instant};

use log::{debug, warn};

use crate::channel::Channel;
use crate::error::{DaqError, Result};
use crate::reader::ChannelReader;

/// One channel's raw reading within a tick
#[derive(Debug, Clone, Copy)]
pub struct RawSample {
    pub channel: Channel,
    pub voltage: f64,
    /// Scheduled tick time, seconds since acquisition start
    pub time_s: f64,
}

/// All configured channels' readings for one tick, sharing one logical
/// timestamp
#[derive(Debug, Clone)]
pub struct SampleFrame {
    pub tick: u64,
    pub time_s: f64,
    /// Exactly one sample per configured channel, in acquisition order
    pub samples: Vec<RawSample>,
}

impl SampleFrame {
    /// Raw voltage for one channel, if present
    pub fn voltage(&self, channel: Channel) -> Option<f64> {
        self.samples
            .iter()
            .find(|s| s.channel == channel)
            .map(|s| s.voltage)
    }
}

/// What one tick produced: a complete frame, or a gap marker
#[derive(Debug, Clone)]
pub enum TickOutcome {
    Frame(SampleFrame),
    Gap { tick: u64, time_s: f64 },
}

/// Control flow for the streaming callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamControl {
    /// Keep sampling
    Continue,
    /// Stop after this tick
    Break,
}

/// Fixed-rate, drift-compensated multi-channel sampler
pub struct Sampler<R: ChannelReader> {
    reader: R,
    channels: Vec<Channel>,
    period: Duration,
    read_retries: u32,
    max_consecutive_gaps: u32,
}

impl<R: ChannelReader> Sampler<R> {
    /// Create a sampler over `reader` for the given channels and rate
    ///
    /// `read_retries` is the number of additional attempts per channel
    /// within a tick; `max_consecutive_gaps` is how many gap ticks in a row
    /// are tolerated before acquisition aborts.
    pub fn new(
        reader: R,
        channels: Vec<Channel>,
        rate_hz: u32,
        read_retries: u32,
        max_consecutive_gaps: u32,
    ) -> Result<Self> {
        if rate_hz == 0 || rate_hz > 1000 {
            return Err(DaqError::Config(format!(
                "sample rate must be 1-1000 Hz, got {}",
                rate_hz
            )));
        }
        if channels.is_empty() {
            return Err(DaqError::Config("no channels to sample".into()));
        }
        if max_consecutive_gaps == 0 {
            return Err(DaqError::Config("gap tolerance must be at least 1".into()));
        }
        Ok(Self {
            reader,
            channels,
            period: Duration::from_secs_f64(1.0 / rate_hz as f64),
            read_retries,
            max_consecutive_gaps,
        })
    }

    /// The reader, for out-of-loop reads (calibration wizard)
    pub fn reader_mut(&mut self) -> &mut R {
        &mut self.reader
    }

    /// Give the reader back, tearing down the sampler
    pub fn into_reader(self) -> R {
        self.reader
    }

    /// Read every channel for one tick, retrying individual failures
    ///
    /// All samples carry `time_s`, the tick's scheduled instant. Transient
    /// read errors are retried up to the budget; exhaustion yields
    /// `PartialFrame` so the tick can be recorded as a gap. Any other error
    /// propagates unchanged.
    fn acquire_frame(&mut self, tick: u64, time_s: f64) -> Result<SampleFrame> {
        let mut samples = Vec::with_capacity(self.channels.len());
        let attempts = 1 + self.read_retries;

        for &channel in &self.channels {
            let mut last_err = None;
            for attempt in 0..attempts {
                match self.reader.read_voltage(channel) {
                    Ok(voltage) => {
                        samples.push(RawSample {
                            channel,
                            voltage,
                            time_s,
                        });
                        last_err = None;
                        break;
                    }
                    Err(e @ (DaqError::ReadTimeout(_) | DaqError::DeviceDisconnected(_))) => {
                        debug!(
                            "tick {}: {} attempt {}/{} failed: {}",
                            tick,
                            channel,
                            attempt + 1,
                            attempts,
                            e
                        );
                        last_err = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }
            if last_err.is_some() {
                return Err(DaqError::PartialFrame {
                    tick,
                    channel,
                    attempts,
                });
            }
        }

        Ok(SampleFrame {
            tick,
            time_s,
            samples,
        })
    }

    /// Run the tick loop, handing each outcome to `callback`
    ///
    /// The callback receives complete frames and gap markers and returns
    /// [`StreamControl`] to keep or stop the loop. Returns the number of
    /// ticks executed, or an error once gaps exceed the consecutive
    /// tolerance (`HardwareUnavailable`) or a non-transient error occurs.
    pub fn run<F>(&mut self, mut callback: F) -> Result<u64>
    where
        F: FnMut(TickOutcome) -> StreamControl,
    {
        let start = Instant::now();
        let period_secs = self.period.as_secs_f64();
        let mut tick = 0u64;
        let mut consecutive_gaps = 0u32;

        loop {
            let time_s = tick as f64 * period_secs;

            match self.acquire_frame(tick, time_s) {
                Ok(frame) => {
                    consecutive_gaps = 0;
                    if callback(TickOutcome::Frame(frame)) == StreamControl::Break {
                        tick += 1;
                        break;
                    }
                }
                Err(e @ DaqError::PartialFrame { .. }) => {
                    consecutive_gaps += 1;
                    warn!("{} ({} consecutive)", e, consecutive_gaps);
                    if consecutive_gaps >= self.max_consecutive_gaps {
                        return Err(DaqError::HardwareUnavailable(format!(
                            "{} consecutive ticks failed, last: {}",
                            consecutive_gaps, e
                        )));
                    }
                    if callback(TickOutcome::Gap { tick, time_s }) == StreamControl::Break {
                        tick += 1;
                        break;
                    }
                }
                Err(e) => return Err(e),
            }

            tick += 1;

            // Deadline anchored to the loop start, not to "now"
            let deadline = start + Duration::from_secs_f64(tick as f64 * period_secs);
            let now = Instant::now();
            if deadline > now {
                std::thread::sleep(deadline - now);
            }
            // Running behind: proceed immediately, the schedule catches up
        }

        Ok(tick)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SimReader;

    fn two_channel_reader() -> SimReader {
        SimReader::fixed(&[(Channel::Thrust, 1.5), (Channel::Pressure, 0.5)])
    }

    fn channels() -> Vec<Channel> {
        vec![Channel::Thrust, Channel::Pressure]
    }

    #[test]
    fn test_ten_ticks_evenly_spaced() {
        let mut sampler = Sampler::new(two_channel_reader(), channels(), 100, 3, 5).unwrap();
        let mut frames = Vec::new();
        let started = Instant::now();
        let ticks = sampler
            .run(|outcome| {
                if let TickOutcome::Frame(frame) = outcome {
                    frames.push(frame);
                }
                if frames.len() >= 10 {
                    StreamControl::Break
                } else {
                    StreamControl::Continue
                }
            })
            .unwrap();
        let elapsed = started.elapsed().as_secs_f64();

        assert_eq!(ticks, 10);
        assert_eq!(frames.len(), 10);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.tick, i as u64);
            assert!((frame.time_s - i as f64 * 0.01).abs() < 1e-12);
            assert_eq!(frame.samples.len(), 2);
            // All samples in a frame share the logical timestamp
            assert!(frame.samples.iter().all(|s| s.time_s == frame.time_s));
        }
        // Drift-compensated: 10 ticks span 9 periods of real time, with
        // headroom for scheduler jitter on the final sleep
        assert!(
            elapsed > 0.085 && elapsed < 0.13,
            "elapsed {:.4}s out of range",
            elapsed
        );
    }

    #[test]
    fn test_retry_within_budget_keeps_frame_complete() {
        let mut reader = two_channel_reader();
        reader.inject_timeouts(Channel::Pressure, 3);
        let mut sampler = Sampler::new(reader, channels(), 1000, 3, 5).unwrap();

        let mut outcomes = Vec::new();
        sampler
            .run(|outcome| {
                outcomes.push(outcome);
                StreamControl::Break
            })
            .unwrap();

        assert_eq!(outcomes.len(), 1);
        match &outcomes[0] {
            TickOutcome::Frame(frame) => {
                assert_eq!(frame.voltage(Channel::Pressure), Some(0.5));
                assert_eq!(frame.voltage(Channel::Thrust), Some(1.5));
            }
            TickOutcome::Gap { .. } => panic!("expected a complete frame"),
        }
    }

    #[test]
    fn test_exhausted_retries_produce_gap() {
        let mut reader = two_channel_reader();
        // 4 failures beat the 1+3 attempt budget on the first tick only
        reader.inject_timeouts(Channel::Thrust, 4);
        let mut sampler = Sampler::new(reader, channels(), 1000, 3, 5).unwrap();

        let mut outcomes = Vec::new();
        sampler
            .run(|outcome| {
                outcomes.push(outcome);
                if outcomes.len() >= 2 {
                    StreamControl::Break
                } else {
                    StreamControl::Continue
                }
            })
            .unwrap();

        assert!(matches!(outcomes[0], TickOutcome::Gap { tick: 0, .. }));
        assert!(matches!(outcomes[1], TickOutcome::Frame(_)));
    }

    #[test]
    fn test_consecutive_gaps_escalate() {
        let mut reader = two_channel_reader();
        // Enough failures for 5 full ticks of exhausted retries
        reader.inject_timeouts(Channel::Thrust, 5 * 4);
        let mut sampler = Sampler::new(reader, channels(), 1000, 3, 5).unwrap();

        let mut gaps = 0;
        let result = sampler.run(|outcome| {
            if matches!(outcome, TickOutcome::Gap { .. }) {
                gaps += 1;
            }
            StreamControl::Continue
        });

        assert!(matches!(result, Err(DaqError::HardwareUnavailable(_))));
        // The escalating tick is not delivered as a gap
        assert_eq!(gaps, 4);
    }

    #[test]
    fn test_good_tick_resets_gap_counter() {
        let mut reader = two_channel_reader();
        // 4 gap ticks, under the tolerance of 5; everything after succeeds
        reader.inject_timeouts(Channel::Thrust, 4 * 4);
        let mut sampler = Sampler::new(reader, channels(), 1000, 3, 5).unwrap();

        let mut seen = 0;
        let result = sampler.run(|_| {
            seen += 1;
            if seen >= 10 {
                StreamControl::Break
            } else {
                StreamControl::Continue
            }
        });
        assert!(result.is_ok());
        assert_eq!(seen, 10);
    }

    #[test]
    fn test_disconnect_counts_as_transient_until_escalation() {
        let mut reader = two_channel_reader();
        reader.inject_disconnects(Channel::Pressure, 2);
        let mut sampler = Sampler::new(reader, channels(), 1000, 3, 5).unwrap();

        let mut frames = 0;
        sampler
            .run(|outcome| {
                if matches!(outcome, TickOutcome::Frame(_)) {
                    frames += 1;
                }
                StreamControl::Break
            })
            .unwrap();
        assert_eq!(frames, 1);
    }

    #[test]
    fn test_invalid_rate_rejected() {
        assert!(Sampler::new(two_channel_reader(), channels(), 0, 3, 5).is_err());
        assert!(Sampler::new(two_channel_reader(), channels(), 1001, 3, 5).is_err());
    }
}
