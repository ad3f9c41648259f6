/// Fixed physical parameters of the gearbox rig.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RigConstants {
    pub steps_per_rev: u32,
    pub microstep_factor: u32,
    /// Motor shaft turns per output shaft turn.
    pub gear_ratio: f64,
    /// Distance from output shaft axis to the load cell contact, metres.
    pub lever_arm_m: f64,
    pub gravity_m_s2: f64,
    pub load_cell_samples: u8,
    /// Efficiency is reported as zero at or below this input power.
    pub power_noise_floor_w: f64,
    /// Target speed before the first command arrives.
    pub initial_rpm: u32,
}

impl Default for RigConstants {
    fn default() -> Self {
        Self {
            steps_per_rev: 200,
            microstep_factor: 1,
            gear_ratio: 15.0,
            lever_arm_m: 0.1,
            gravity_m_s2: 9.81,
            load_cell_samples: 5,
            power_noise_floor_w: 0.5,
            initial_rpm: 100,
        }
    }
}

impl RigConstants {
    pub fn steps_per_motor_rev(&self) -> u32 {
        self.steps_per_rev.saturating_mul(self.microstep_factor)
    }
}
