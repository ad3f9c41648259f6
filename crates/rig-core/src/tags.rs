/// Names a record field across the wire header, metrics and plots.
#[derive(Debug, Clone, Copy)]
pub struct Tag {
    pub header: &'static str,
    pub metric: &'static str,
    pub plot_label: &'static str,
}

pub const MOTOR_RPM: Tag = Tag {
    header: "MotorRPM",
    metric: "gearbox_rig_motor_rpm",
    plot_label: "Motor speed (RPM)",
};

pub const GEARBOX_RPM: Tag = Tag {
    header: "GearboxRPM",
    metric: "gearbox_rig_gearbox_rpm",
    plot_label: "Output speed (RPM)",
};

pub const FORCE_N: Tag = Tag {
    header: "Force(N)",
    metric: "gearbox_rig_force_newtons",
    plot_label: "Force (N)",
};

pub const TORQUE_NM: Tag = Tag {
    header: "Torque(Nm)",
    metric: "gearbox_rig_torque_newton_metres",
    plot_label: "Torque (Nm)",
};

pub const INPUT_POWER_W: Tag = Tag {
    header: "InputPower(W)",
    metric: "gearbox_rig_input_power_watts",
    plot_label: "Input power (W)",
};

pub const OUTPUT_POWER_W: Tag = Tag {
    header: "OutputPower(W)",
    metric: "gearbox_rig_output_power_watts",
    plot_label: "Output power (W)",
};

pub const EFFICIENCY_PCT: Tag = Tag {
    header: "Efficiency(%)",
    metric: "gearbox_rig_efficiency_percent",
    plot_label: "Efficiency (%)",
};

/// Record fields in wire order.
pub const RECORD_TAGS: [Tag; 7] = [
    MOTOR_RPM,
    GEARBOX_RPM,
    FORCE_N,
    TORQUE_NM,
    INPUT_POWER_W,
    OUTPUT_POWER_W,
    EFFICIENCY_PCT,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_tags_have_distinct_headers_and_metrics() {
        for (i, a) in RECORD_TAGS.iter().enumerate() {
            assert!(a.metric.starts_with("gearbox_rig_"), "{}", a.metric);
            for b in &RECORD_TAGS[i + 1..] {
                assert_ne!(a.header, b.header);
                assert_ne!(a.metric, b.metric);
            }
        }
    }
}
