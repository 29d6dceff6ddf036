//! Post-burn analysis
//!
//! Integrates the thrust curve to total impulse, derives burn time and
//! average thrust from the window where thrust stays above the burnout
//! trigger, and classifies the motor on the standard H..P impulse ladder.

use std::fmt;

use crate::channel::Channel;
use crate::convert::LogRecord;

/// Model-rocket motor class: letter plus percentage within the class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorClass {
    pub letter: char,
    pub percent: u8,
}

impl fmt::Display for MotorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}%", self.letter, self.percent)
    }
}

/// Impulse class boundaries in newton-seconds, doubling per letter
const CLASS_TABLE: [(f64, f64, char); 9] = [
    (160.0, 320.0, 'H'),
    (320.0, 640.0, 'I'),
    (640.0, 1280.0, 'J'),
    (1280.0, 2560.0, 'K'),
    (2560.0, 5120.0, 'L'),
    (5120.0, 10240.0, 'M'),
    (10240.0, 20480.0, 'N'),
    (20480.0, 40960.0, 'O'),
    (40960.0, 81920.0, 'P'),
];

/// Classify a total impulse; `None` below H or above P
pub fn classify_motor(impulse_ns: f64) -> Option<MotorClass> {
    for (low, high, letter) in CLASS_TABLE {
        if impulse_ns >= low && impulse_ns < high {
            let percent = ((impulse_ns - low) / (high - low) * 100.0) as u8;
            return Some(MotorClass { letter, percent });
        }
    }
    None
}

/// Summary statistics of one burn
#[derive(Debug, Clone)]
pub struct BurnStats {
    pub total_impulse_ns: f64,
    pub burn_time_s: f64,
    pub avg_thrust_n: f64,
    pub max_thrust_n: f64,
    pub max_pressure_psi: f64,
    pub max_temperature_c: Option<f64>,
    pub motor_class: Option<MotorClass>,
    pub record_count: usize,
}

/// Trapezoidal integral of `values` over `times`
fn trapezoid(times: &[f64], values: &[f64]) -> f64 {
    times
        .windows(2)
        .zip(values.windows(2))
        .map(|(t, v)| (t[1] - t[0]) * (v[0] + v[1]) / 2.0)
        .sum()
}

/// Analyze a recorded burn
///
/// `burnout_trigger_n` bounds the active burn window: burn time runs from
/// the first to the last sample with thrust above it, which also discards
/// trailing noise after burnout (the log itself keeps every record).
/// Returns `None` when there are no records.
pub fn analyze(records: &[LogRecord], burnout_trigger_n: f64) -> Option<BurnStats> {
    if records.is_empty() {
        return None;
    }

    let times: Vec<f64> = records.iter().map(|r| r.frame.time_s).collect();
    let thrust: Vec<f64> = records
        .iter()
        .map(|r| r.frame.value(Channel::Thrust).unwrap_or(0.0))
        .collect();

    let total_impulse_ns = trapezoid(&times, &thrust);

    let active: Vec<usize> = thrust
        .iter()
        .enumerate()
        .filter(|(_, &f)| f > burnout_trigger_n)
        .map(|(i, _)| i)
        .collect();
    let (burn_time_s, avg_thrust_n) = if active.len() > 2 {
        let burn = times[*active.last().unwrap()] - times[active[0]];
        (burn, total_impulse_ns / burn)
    } else {
        (0.0, 0.0)
    };

    let max_thrust_n = thrust.iter().cloned().fold(0.0, f64::max);
    let max_pressure_psi = records
        .iter()
        .filter_map(|r| r.frame.value(Channel::Pressure))
        .fold(0.0, f64::max);
    let max_temperature_c = records
        .iter()
        .filter_map(|r| r.frame.value(Channel::Temperature))
        .fold(None, |acc: Option<f64>, v| {
            Some(acc.map_or(v, |a| a.max(v)))
        });

    Some(BurnStats {
        total_impulse_ns,
        burn_time_s,
        avg_thrust_n,
        max_thrust_n,
        max_pressure_psi,
        max_temperature_c,
        motor_class: classify_motor(total_impulse_ns),
        record_count: records.len(),
    })
}

/// Formatted static-fire report
pub fn format_report(stats: &BurnStats) -> String {
    let mut report = String::new();
    report.push_str(&format!("{}\n", "=".repeat(40)));
    report.push_str("  STATIC FIRE REPORT\n");
    report.push_str(&format!("{}\n", "=".repeat(40)));
    report.push_str(&format!(
        "Total Impulse  : {:.2} Ns\n",
        stats.total_impulse_ns
    ));
    report.push_str(&format!(
        "Motor Class    : {}\n",
        stats
            .motor_class
            .map(|c| c.to_string())
            .unwrap_or_else(|| "Unclassified".into())
    ));
    report.push_str(&format!("Burn Time      : {:.3} s\n", stats.burn_time_s));
    report.push_str(&format!("Avg Thrust     : {:.2} N\n", stats.avg_thrust_n));
    report.push_str(&format!("Max Thrust     : {:.2} N\n", stats.max_thrust_n));
    report.push_str(&format!(
        "Max Pressure   : {:.2} psi\n",
        stats.max_pressure_psi
    ));
    if let Some(max_temp) = stats.max_temperature_c {
        report.push_str(&format!("Max Temp       : {:.2} C\n", max_temp));
    }
    report.push_str(&format!("Records        : {}\n", stats.record_count));
    report.push_str(&format!("{}", "=".repeat(40)));
    report
}
