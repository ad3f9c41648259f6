use crate::constants::RigConstants;
use crate::hal::{Direction, HalError, PinLevel, PowerReading, RigIO};
use crate::measurement::angular_velocity_rad_s;
use crate::timebase;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct SimParams {
    pub supply_voltage_v: f64,
    pub shunt_ohms: f64,
    /// Coulomb friction seen at the output shaft.
    pub friction_torque_nm: f64,
    pub viscous_nm_per_rpm: f64,
    pub drive_efficiency: f64,
    /// Driver and coil draw while enabled, independent of load.
    pub idle_power_w: f64,
    pub power_sensor_present: bool,
    /// Busy-wait for real time in `hold`; otherwise only advance the sim clock.
    pub realtime: bool,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            supply_voltage_v: 12.0,
            shunt_ohms: 0.1,
            friction_torque_nm: 0.05,
            viscous_nm_per_rpm: 0.004,
            drive_efficiency: 0.6,
            idle_power_w: 1.5,
            power_sensor_present: true,
            realtime: true,
        }
    }
}

/// Simulated gearbox rig.
///
/// Realised motor speed comes from the spacing of rising edges on the
/// pulse line, measured on a sim clock that only advances in `hold`. Loop
/// latency outside the holds is not modelled.
#[derive(Debug, Clone)]
pub struct SimulatedRig {
    params: SimParams,
    steps_per_motor_rev: u32,
    gear_ratio: f64,
    lever_arm_m: f64,
    gravity_m_s2: f64,

    enabled: bool,
    direction: Direction,
    pulse: PinLevel,
    power_configured: bool,

    clock: Duration,
    last_rising_edge: Option<Duration>,
    step_period: Option<Duration>,
    steps: u64,
}

impl SimulatedRig {
    pub fn new(constants: &RigConstants, params: SimParams) -> Self {
        Self {
            params,
            steps_per_motor_rev: constants.steps_per_motor_rev().max(1),
            gear_ratio: constants.gear_ratio,
            lever_arm_m: constants.lever_arm_m,
            gravity_m_s2: constants.gravity_m_s2,
            enabled: false,
            direction: Direction::Forward,
            pulse: PinLevel::Low,
            power_configured: false,
            clock: Duration::ZERO,
            last_rising_edge: None,
            step_period: None,
            steps: 0,
        }
    }

    /// Sim that never sleeps; for tests.
    pub fn instant(constants: &RigConstants) -> Self {
        Self::new(
            constants,
            SimParams {
                realtime: false,
                ..SimParams::default()
            },
        )
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn elapsed(&self) -> Duration {
        self.clock
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn pulse(&self) -> PinLevel {
        self.pulse
    }

    /// Motor speed implied by the last two rising edges.
    pub fn realised_motor_rpm(&self) -> f64 {
        match self.step_period {
            Some(period) if self.enabled && !period.is_zero() => {
                60.0 / (period.as_secs_f64() * f64::from(self.steps_per_motor_rev))
            }
            _ => 0.0,
        }
    }

    fn output_rpm(&self) -> f64 {
        self.realised_motor_rpm() / self.gear_ratio
    }

    fn load_torque_nm(&self) -> f64 {
        let rpm = self.output_rpm();
        if rpm <= 0.0 {
            return 0.0;
        }
        self.params.friction_torque_nm + self.params.viscous_nm_per_rpm * rpm
    }

    fn input_power_w(&self) -> f64 {
        if !self.enabled {
            return 0.0;
        }
        let output_w = self.load_torque_nm() * angular_velocity_rad_s(self.output_rpm());
        self.params.idle_power_w + output_w / self.params.drive_efficiency
    }
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self::new(&RigConstants::default(), SimParams::default())
    }
}

impl RigIO for SimulatedRig {
    fn begin(&mut self) -> Result<(), HalError> {
        if !self.params.power_sensor_present {
            return Err(HalError::PowerSensorMissing);
        }
        self.power_configured = true;
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    fn set_pulse(&mut self, level: PinLevel) {
        if self.pulse == PinLevel::Low && level == PinLevel::High {
            if let Some(last) = self.last_rising_edge {
                self.step_period = Some(self.clock.saturating_sub(last));
            }
            self.last_rising_edge = Some(self.clock);
            if self.enabled {
                self.steps += 1;
            }
        }
        self.pulse = level;
    }

    fn hold(&mut self, duration: Duration) {
        if self.params.realtime {
            timebase::busy_wait(duration);
        }
        self.clock += duration;
    }

    fn read_load_kg(&mut self, samples: u8) -> f64 {
        let samples = samples.max(1);
        let per_sample = self.load_torque_nm() / (self.lever_arm_m * self.gravity_m_s2);
        let total: f64 = (0..samples).map(|_| per_sample).sum();
        total / f64::from(samples)
    }

    fn read_power(&mut self) -> PowerReading {
        if !self.power_configured {
            return PowerReading::default();
        }
        let supply = self.params.supply_voltage_v;
        let current_a = self.input_power_w() / supply;
        let shunt_v = current_a * self.params.shunt_ohms;
        PowerReading {
            bus_voltage_v: supply - shunt_v,
            shunt_voltage_mv: shunt_v * 1000.0,
            current_ma: current_a * 1000.0,
        }
    }
}
