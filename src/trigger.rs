//! Ignition and burnout gating
//!
//! The burn logger records nothing while armed; the first tick with thrust
//! above the ignition trigger switches to recording, and recording ends
//! once thrust has stayed below the burnout trigger for the configured
//! hold. The hold tolerates momentary dips (chuffing) without cutting the
//! record short.

/// What the logging loop should do with the current tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateAction {
    /// Armed, waiting for ignition; do not record
    Idle,
    /// Burn in progress; record this tick
    Record,
    /// Burnout hold satisfied; record this tick, then stop
    Stop,
}

/// Thrust-threshold state machine for one logging run
pub struct BurnGate {
    ignition_trigger: f64,
    burnout_trigger: f64,
    hold_ticks: u64,
    recording: bool,
    burned_out: bool,
    low_ticks: u64,
}

impl BurnGate {
    /// `hold_ticks` is how many consecutive below-burnout ticks end the run
    pub fn new(ignition_trigger: f64, burnout_trigger: f64, hold_ticks: u64) -> Self {
        Self {
            ignition_trigger,
            burnout_trigger,
            hold_ticks,
            recording: false,
            burned_out: false,
            low_ticks: 0,
        }
    }

    /// Advance the gate with this tick's thrust reading
    pub fn observe(&mut self, thrust: f64) -> GateAction {
        if !self.recording {
            if thrust > self.ignition_trigger {
                self.recording = true;
                return GateAction::Record;
            }
            return GateAction::Idle;
        }

        if thrust < self.burnout_trigger {
            self.low_ticks += 1;
            if self.low_ticks > self.hold_ticks {
                self.burned_out = true;
                return GateAction::Stop;
            }
        } else {
            self.low_ticks = 0;
        }
        GateAction::Record
    }

    /// Whether ignition has been seen
    pub fn recording(&self) -> bool {
        self.recording
    }

    /// Whether the run ended through a detected burnout
    pub fn burned_out(&self) -> bool {
        self.burned_out
    }

    /// Trailing records to drop from the report. Non-zero only after a
    /// detected burnout; an operator abort keeps everything. The log itself
    /// always keeps every appended record.
    pub fn report_trim(&self) -> u64 {
        if self.burned_out {
            self.low_ticks
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armed_until_ignition() {
        let mut gate = BurnGate::new(20.0, 10.0, 3);
        assert_eq!(gate.observe(0.0), GateAction::Idle);
        assert_eq!(gate.observe(19.9), GateAction::Idle);
        assert!(!gate.recording());
        // The crossing tick itself is recorded
        assert_eq!(gate.observe(20.1), GateAction::Record);
        assert!(gate.recording());
    }

    #[test]
    fn test_momentary_dip_does_not_stop() {
        let mut gate = BurnGate::new(20.0, 10.0, 3);
        gate.observe(100.0);
        assert_eq!(gate.observe(5.0), GateAction::Record);
        assert_eq!(gate.observe(5.0), GateAction::Record);
        // Back above the burnout trigger, the hold counter resets
        assert_eq!(gate.observe(80.0), GateAction::Record);
        assert_eq!(gate.report_trim(), 0);
        assert_eq!(gate.observe(5.0), GateAction::Record);
    }

    #[test]
    fn test_sustained_low_thrust_stops() {
        let mut gate = BurnGate::new(20.0, 10.0, 3);
        gate.observe(100.0);
        assert_eq!(gate.observe(5.0), GateAction::Record);
        assert_eq!(gate.observe(5.0), GateAction::Record);
        assert_eq!(gate.observe(5.0), GateAction::Record);
        assert_eq!(gate.observe(5.0), GateAction::Stop);
        assert!(gate.burned_out());
        // Trailing below-threshold ticks are reported for the trim
        assert_eq!(gate.report_trim(), 4);
    }

    #[test]
    fn test_abort_during_dip_keeps_all_records() {
        let mut gate = BurnGate::new(20.0, 10.0, 3);
        gate.observe(100.0);
        assert_eq!(gate.observe(5.0), GateAction::Record);
        assert_eq!(gate.observe(5.0), GateAction::Record);
        // Operator stops the run here; no burnout was detected, so the
        // report must keep the in-burn records from the dip
        assert!(!gate.burned_out());
        assert_eq!(gate.report_trim(), 0);
    }

    #[test]
    fn test_thrust_below_burnout_before_ignition_stays_idle() {
        let mut gate = BurnGate::new(20.0, 10.0, 3);
        for _ in 0..100 {
            assert_eq!(gate.observe(5.0), GateAction::Idle);
        }
        assert_eq!(gate.report_trim(), 0);
    }
}
