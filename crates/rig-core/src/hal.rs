use std::time::Duration;
use thiserror::Error;

/// Logic level on a digital output line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PinLevel {
    #[default]
    Low,
    High,
}

/// Level on the driver's direction line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// One sample from the power sensor, in the units the sensor reports.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PowerReading {
    pub bus_voltage_v: f64,
    pub shunt_voltage_mv: f64,
    pub current_ma: f64,
}

impl PowerReading {
    /// Bus plus shunt voltage approximates the supply rail.
    pub fn supply_voltage_v(&self) -> f64 {
        self.bus_voltage_v + self.shunt_voltage_mv / 1000.0
    }

    pub fn current_a(&self) -> f64 {
        self.current_ma / 1000.0
    }

    pub fn input_power_w(&self) -> f64 {
        self.supply_voltage_v() * self.current_a()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HalError {
    /// Power sensor did not answer at startup. Not fatal: readings stay meaningless.
    #[error("failed to find power sensor")]
    PowerSensorMissing,
    #[error("load cell not ready")]
    LoadCellNotReady,
    #[error("sensor bus error: {0}")]
    Bus(String),
}

/// Everything the control loop touches on the physical rig.
///
/// Implementations own the step/direction/enable lines, the load-cell
/// amplifier and the power sensor. `hold` is the step generator's only
/// timing primitive; a hosted implementation busy-waits and therefore gives
/// no real-time guarantee, only best-effort symmetry between the two phases.
pub trait RigIO {
    fn begin(&mut self) -> Result<(), HalError>;
    fn set_enabled(&mut self, enabled: bool);
    fn set_direction(&mut self, direction: Direction);
    fn set_pulse(&mut self, level: PinLevel);
    fn hold(&mut self, duration: Duration);
    /// Mass-equivalent load in kilograms, averaged over `samples` conversions.
    fn read_load_kg(&mut self, samples: u8) -> f64;
    fn read_power(&mut self) -> PowerReading;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supply_voltage_adds_shunt_drop() {
        let reading = PowerReading {
            bus_voltage_v: 11.9,
            shunt_voltage_mv: 100.0,
            current_ma: 500.0,
        };
        assert!((reading.supply_voltage_v() - 12.0).abs() < 1e-9);
        assert!((reading.input_power_w() - 6.0).abs() < 1e-9);
    }
}
