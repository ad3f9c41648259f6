use crate::constants::RigConstants;
use crate::hal::PowerReading;
use std::f64::consts::PI;

/// One record of the rig's derived quantities.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Measurement {
    pub motor_rpm: u32,
    pub gearbox_rpm: f64,
    pub force_n: f64,
    pub torque_nm: f64,
    pub input_power_w: f64,
    pub output_power_w: f64,
    pub efficiency_pct: f64,
}

impl Measurement {
    pub fn derive(
        target_rpm: u32,
        load_kg: f64,
        power: PowerReading,
        constants: &RigConstants,
    ) -> Self {
        let force_n = load_kg * constants.gravity_m_s2;
        let torque_nm = force_n * constants.lever_arm_m;

        let input_power_w = power.input_power_w();

        let gearbox_rpm = output_rpm(target_rpm, constants.gear_ratio);
        let output_power_w = torque_nm * angular_velocity_rad_s(gearbox_rpm);

        let efficiency_pct = efficiency_pct(
            output_power_w,
            input_power_w,
            constants.power_noise_floor_w,
        );

        Self {
            motor_rpm: target_rpm,
            gearbox_rpm,
            force_n,
            torque_nm,
            input_power_w,
            output_power_w,
            efficiency_pct,
        }
    }
}

pub fn output_rpm(motor_rpm: u32, gear_ratio: f64) -> f64 {
    f64::from(motor_rpm) / gear_ratio
}

pub fn angular_velocity_rad_s(rpm: f64) -> f64 {
    rpm * 2.0 * PI / 60.0
}

/// Output over input power as a percentage; exactly zero at or below the noise floor.
pub fn efficiency_pct(output_power_w: f64, input_power_w: f64, noise_floor_w: f64) -> f64 {
    if input_power_w > noise_floor_w {
        output_power_w / input_power_w * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn power(volts: f64, amps: f64) -> PowerReading {
        PowerReading {
            bus_voltage_v: volts,
            shunt_voltage_mv: 0.0,
            current_ma: amps * 1000.0,
        }
    }

    #[test]
    fn output_speed_follows_gear_ratio() {
        let m = Measurement::derive(600, 0.0, PowerReading::default(), &RigConstants::default());
        assert_eq!(m.motor_rpm, 600);
        assert_eq!(m.gearbox_rpm, 40.0);
    }

    #[test]
    fn torque_and_output_power_from_load() {
        let constants = RigConstants::default();
        let m = Measurement::derive(600, 1.0, power(12.0, 1.0), &constants);
        assert!((m.force_n - 9.81).abs() < 1e-9);
        assert!((m.torque_nm - 0.981).abs() < 1e-9);
        let expected_out = 0.981 * 40.0 * 2.0 * PI / 60.0;
        assert!((m.output_power_w - expected_out).abs() < 1e-9);
        assert!((m.input_power_w - 12.0).abs() < 1e-9);
        assert!((m.efficiency_pct - expected_out / 12.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn efficiency_is_zero_below_noise_floor() {
        let m = Measurement::derive(600, 1.0, power(4.0, 0.1), &RigConstants::default());
        assert!((m.input_power_w - 0.4).abs() < 1e-9);
        assert_eq!(m.efficiency_pct, 0.0);
    }

    #[test]
    fn efficiency_is_zero_at_noise_floor() {
        assert_eq!(efficiency_pct(3.0, 0.5, 0.5), 0.0);
        assert_eq!(efficiency_pct(3.0, f64::NAN, 0.5), 0.0);
    }
}
