//! Sensor channel identities and their LabJack T7 wiring
//!
//! The channel layout is fixed: the load cell amplifier feeds AIN0, the
//! pressure transducer amplifier feeds AIN2 and the (optional) temperature
//! probe feeds AIN4. The odd-numbered inputs are skipped because the
//! amplifiers output to the even terminals.

use std::fmt;
use std::str::FromStr;

use crate::error::DaqError;

/// One logical sensor input, mapped to a physical DAQ terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Load cell + amplifier (gain 201)
    Thrust,
    /// Pressure transducer + amplifier (gain 11)
    Pressure,
    /// Temperature probe (LM35-style, 10 mV/°C)
    Temperature,
}

impl Channel {
    /// All channels in fixed acquisition order
    pub const ALL: [Channel; 3] = [Channel::Thrust, Channel::Pressure, Channel::Temperature];

    /// Lowercase identifier used in config and the log header
    pub fn label(&self) -> &'static str {
        match self {
            Channel::Thrust => "thrust",
            Channel::Pressure => "pressure",
            Channel::Temperature => "temperature",
        }
    }

    /// Physical unit of the converted reading
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::Thrust => "N",
            Channel::Pressure => "psi",
            Channel::Temperature => "C",
        }
    }

    /// Analog input register name on the T7
    pub fn register(&self) -> &'static str {
        match self {
            Channel::Thrust => "AIN0",
            Channel::Pressure => "AIN2",
            Channel::Temperature => "AIN4",
        }
    }

    /// Range configuration register for this input
    pub fn range_register(&self) -> &'static str {
        match self {
            Channel::Thrust => "AIN0_RANGE",
            Channel::Pressure => "AIN2_RANGE",
            Channel::Temperature => "AIN4_RANGE",
        }
    }

    /// Input range in volts; ±10 V handles the amplified signals safely
    pub fn input_range_volts(&self) -> f64 {
        10.0
    }

    /// Whether the burn logger floors this reading at zero to hide
    /// negative amplifier noise. Temperature is left untouched.
    pub fn clamps_at_zero(&self) -> bool {
        matches!(self, Channel::Thrust | Channel::Pressure)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.label(), self.register())
    }
}

impl FromStr for Channel {
    type Err = DaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "thrust" => Ok(Channel::Thrust),
            "pressure" => Ok(Channel::Pressure),
            "temperature" => Ok(Channel::Temperature),
            other => Err(DaqError::Config(format!("unknown channel label: {}", other))),
        }
    }
}
