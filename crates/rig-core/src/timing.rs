use std::time::Duration;

/// Shortest hold the step generator will ever use.
pub const MIN_STEP_DELAY: Duration = Duration::from_micros(1);

/// Step frequency and the per-phase hold derived from a commanded speed.
///
/// Each step holds the pulse line high for `delay` and then low for `delay`,
/// so one full pulse period is twice the delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    frequency_hz: f64,
    delay: Duration,
}

impl StepTiming {
    pub fn for_speed(rpm: f64, steps_per_motor_rev: u32) -> Self {
        let mut frequency_hz = rpm * f64::from(steps_per_motor_rev) / 60.0;
        if !(frequency_hz > 0.0) {
            frequency_hz = 1.0;
        }
        // Nanosecond rounding keeps neighbouring speeds distinguishable.
        let nanos = (1.0e9 / frequency_hz).round() as u64;
        let delay = Duration::from_nanos(nanos).max(MIN_STEP_DELAY);
        Self {
            frequency_hz,
            delay,
        }
    }

    pub fn frequency_hz(&self) -> f64 {
        self.frequency_hz
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn pulse_period(&self) -> Duration {
        self.delay * 2
    }
}
