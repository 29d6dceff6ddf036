//! Channel reader boundary toward the DAQ hardware
//!
//! The acquisition loop only ever sees the [`ChannelReader`] trait: given a
//! channel, return the latest raw voltage or fail. The LabJack T7 binding
//! lives behind the `hardware` feature; [`SimReader`] provides deterministic
//! playback for tests and `--simulate` runs. Every read is treated as
//! fallible; nothing in the core assumes success.

use crate::channel::Channel;
use crate::error::{DaqError, Result};

/// Fallible per-channel voltage source
///
/// Opening and claiming the device happens in the concrete type's
/// constructor; dropping the reader releases the handle.
pub trait ChannelReader {
    /// Latest raw voltage on `channel`
    fn read_voltage(&mut self, channel: Channel) -> Result<f64>;

    /// Short human-readable description of the device
    fn describe(&self) -> String;
}

impl<T: ChannelReader + ?Sized> ChannelReader for Box<T> {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64> {
        (**self).read_voltage(channel)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Voltage source for a simulated run
enum SimSource {
    /// Fixed voltage per channel
    Fixed(Vec<(Channel, f64)>),
    /// Voltage as a function of (channel, elapsed seconds)
    Profile(Box<dyn FnMut(Channel, f64) -> f64 + Send>),
}

/// Deterministic reader for tests and dry runs
///
/// Plays back fixed per-channel voltages or a time-based profile, and can
/// inject a scripted number of transient failures on a channel to exercise
/// the sampler's retry and escalation paths.
pub struct SimReader {
    source: SimSource,
    started: std::time::Instant,
    faults: Vec<(Channel, u32, bool)>, // (channel, remaining failures, disconnect?)
    reads: u64,
}

impl SimReader {
    /// Reader returning a fixed voltage per channel
    pub fn fixed(levels: &[(Channel, f64)]) -> Self {
        Self {
            source: SimSource::Fixed(levels.to_vec()),
            started: std::time::Instant::now(),
            faults: Vec::new(),
            reads: 0,
        }
    }

    /// Reader driven by a `(channel, elapsed_secs) -> voltage` profile
    pub fn with_profile<F>(profile: F) -> Self
    where
        F: FnMut(Channel, f64) -> f64 + Send + 'static,
    {
        Self {
            source: SimSource::Profile(Box::new(profile)),
            started: std::time::Instant::now(),
            faults: Vec::new(),
            reads: 0,
        }
    }

    /// Change the fixed voltage of a channel; no-op for profile readers
    pub fn set_level(&mut self, channel: Channel, voltage: f64) {
        if let SimSource::Fixed(levels) = &mut self.source {
            match levels.iter_mut().find(|(c, _)| *c == channel) {
                Some((_, v)) => *v = voltage,
                None => levels.push((channel, voltage)),
            }
        }
    }

    /// Make the next `count` reads of `channel` fail with a timeout
    pub fn inject_timeouts(&mut self, channel: Channel, count: u32) {
        self.faults.push((channel, count, false));
    }

    /// Make the next `count` reads of `channel` fail as disconnected
    pub fn inject_disconnects(&mut self, channel: Channel, count: u32) {
        self.faults.push((channel, count, true));
    }

    /// Total reads attempted, including failed ones
    pub fn reads(&self) -> u64 {
        self.reads
    }

    fn take_fault(&mut self, channel: Channel) -> Option<DaqError> {
        let slot = self
            .faults
            .iter_mut()
            .find(|(c, remaining, _)| *c == channel && *remaining > 0)?;
        slot.1 -= 1;
        let disconnect = slot.2;
        Some(if disconnect {
            DaqError::DeviceDisconnected(channel)
        } else {
            DaqError::ReadTimeout(channel)
        })
    }
}

impl ChannelReader for SimReader {
    fn read_voltage(&mut self, channel: Channel) -> Result<f64> {
        self.reads += 1;
        if let Some(fault) = self.take_fault(channel) {
            return Err(fault);
        }
        match &mut self.source {
            SimSource::Fixed(levels) => levels
                .iter()
                .find(|(c, _)| *c == channel)
                .map(|(_, v)| *v)
                .ok_or_else(|| {
                    DaqError::InvariantViolation(format!(
                        "simulated reader has no level for channel {}",
                        channel
                    ))
                }),
            SimSource::Profile(profile) => {
                let elapsed = self.started.elapsed().as_secs_f64();
                Ok(profile(channel, elapsed))
            }
        }
    }

    fn describe(&self) -> String {
        "simulated DAQ".into()
    }
}

#[cfg(feature = "hardware")]
pub use self::ljm::LjmReader;

#[cfg(feature = "hardware")]
mod ljm {
    use std::ffi::CString;
    use std::os::raw::c_int;

    use log::warn;

    use super::ChannelReader;
    use crate::channel::Channel;
    use crate::error::{DaqError, Result};
    use crate::ffi;

    /// LabJack T7 over USB, addressed by AIN register name
    pub struct LjmReader {
        handle: c_int,
        serial: i32,
    }

    impl LjmReader {
        /// Open the first T7 on USB and configure each channel's input range
        pub fn open(channels: &[Channel]) -> Result<Self> {
            let device = CString::new("T7").unwrap();
            let connection = CString::new("USB").unwrap();
            let identifier = CString::new("ANY").unwrap();
            let mut handle: c_int = 0;

            let status = unsafe {
                ffi::LJM_OpenS(
                    device.as_ptr(),
                    connection.as_ptr(),
                    identifier.as_ptr(),
                    &mut handle,
                )
            };
            if status != ffi::LJME_NOERROR && !ffi::is_warning(status) {
                return Err(DaqError::HardwareUnavailable(format!(
                    "LJM_OpenS failed: {}",
                    ffi::status_to_string(status)
                )));
            }

            let mut reader = Self { handle, serial: 0 };

            let serial_name = CString::new("SERIAL_NUMBER").unwrap();
            let mut serial = 0.0f64;
            let status =
                unsafe { ffi::LJM_eReadName(reader.handle, serial_name.as_ptr(), &mut serial) };
            if status == ffi::LJME_NOERROR {
                reader.serial = serial as i32;
            }

            // ±10 V range handles the amplified signals safely
            for channel in channels {
                let name = CString::new(channel.range_register()).unwrap();
                let status = unsafe {
                    ffi::LJM_eWriteName(reader.handle, name.as_ptr(), channel.input_range_volts())
                };
                if status != ffi::LJME_NOERROR && !ffi::is_warning(status) {
                    return Err(DaqError::HardwareUnavailable(format!(
                        "cannot set {}: {}",
                        channel.range_register(),
                        ffi::status_to_string(status)
                    )));
                }
            }

            Ok(reader)
        }
    }

    impl ChannelReader for LjmReader {
        fn read_voltage(&mut self, channel: Channel) -> Result<f64> {
            let name = CString::new(channel.register()).unwrap();
            let mut value = 0.0f64;
            let status = unsafe { ffi::LJM_eReadName(self.handle, name.as_ptr(), &mut value) };
            if status == ffi::LJME_NOERROR {
                return Ok(value);
            }
            if ffi::is_warning(status) {
                warn!(
                    "LJM warning reading {}: {}",
                    channel.register(),
                    ffi::status_to_string(status)
                );
                return Ok(value);
            }
            // LJM does not distinguish timeout from disconnect at this call
            // level; treat read failures as timeouts and let the sampler's
            // retry/escalation state decide when the link is gone.
            Err(DaqError::ReadTimeout(channel))
        }

        fn describe(&self) -> String {
            format!("LabJack T7 (serial {})", self.serial)
        }
    }

    impl Drop for LjmReader {
        fn drop(&mut self) {
            unsafe {
                ffi::LJM_Close(self.handle);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_levels() {
        let mut reader = SimReader::fixed(&[(Channel::Thrust, 1.5), (Channel::Pressure, 0.2)]);
        assert_eq!(reader.read_voltage(Channel::Thrust).unwrap(), 1.5);
        assert_eq!(reader.read_voltage(Channel::Pressure).unwrap(), 0.2);
        assert!(reader.read_voltage(Channel::Temperature).is_err());
        assert_eq!(reader.reads(), 3);
    }

    #[test]
    fn test_injected_faults_are_consumed() {
        let mut reader = SimReader::fixed(&[(Channel::Thrust, 1.5)]);
        reader.inject_timeouts(Channel::Thrust, 2);
        assert!(matches!(
            reader.read_voltage(Channel::Thrust),
            Err(DaqError::ReadTimeout(Channel::Thrust))
        ));
        assert!(matches!(
            reader.read_voltage(Channel::Thrust),
            Err(DaqError::ReadTimeout(Channel::Thrust))
        ));
        assert_eq!(reader.read_voltage(Channel::Thrust).unwrap(), 1.5);
    }

    #[test]
    fn test_disconnect_fault_kind() {
        let mut reader = SimReader::fixed(&[(Channel::Pressure, 0.2)]);
        reader.inject_disconnects(Channel::Pressure, 1);
        assert!(matches!(
            reader.read_voltage(Channel::Pressure),
            Err(DaqError::DeviceDisconnected(Channel::Pressure))
        ));
    }

    #[test]
    fn test_profile_reader() {
        let mut reader = SimReader::with_profile(|channel, _elapsed| match channel {
            Channel::Thrust => 2.0,
            _ => 0.0,
        });
        assert_eq!(reader.read_voltage(Channel::Thrust).unwrap(), 2.0);
        assert_eq!(reader.read_voltage(Channel::Pressure).unwrap(), 0.0);
    }
}
