use rig_core::RigConstants;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkKind {
    Stdio,
    Tcp { bind_addr: String },
    Serial { path: String, baud_rate: u32 },
}

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub show_help: bool,
    pub run_seconds: Option<u64>,
    pub max_cycles: Option<u64>,
    pub link: LinkKind,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
    pub metrics_addr: Option<String>,
    pub event_log: Option<PathBuf>,
    pub constants: RigConstants,
    /// Simulated rig: busy-wait the real step delay.
    pub realtime: bool,
    /// Simulated rig: behave as if the power sensor did not answer.
    pub sim_power_sensor_missing: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            run_seconds: None,
            max_cycles: None,
            link: LinkKind::Stdio,
            json_logs: false,
            log_dir: None,
            metrics_addr: None,
            event_log: None,
            constants: RigConstants::default(),
            realtime: true,
            sim_power_sensor_missing: false,
        }
    }
}

pub const DEFAULT_BAUD_RATE: u32 = 9600;

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = RuntimeConfig::default();
        let mut baud_rate = DEFAULT_BAUD_RATE;
        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            match (args[i].as_str(), value) {
                ("--run-seconds", Some(v)) => {
                    cfg.run_seconds = v.parse().ok();
                    i += 1;
                }
                ("--max-cycles", Some(v)) => {
                    cfg.max_cycles = v.parse().ok();
                    i += 1;
                }
                ("--bind", Some(v)) => {
                    cfg.link = LinkKind::Tcp {
                        bind_addr: v.clone(),
                    };
                    i += 1;
                }
                ("--serial", Some(v)) => {
                    cfg.link = LinkKind::Serial {
                        path: v.clone(),
                        baud_rate,
                    };
                    i += 1;
                }
                ("--baud", Some(v)) => {
                    baud_rate = v.parse().unwrap_or(DEFAULT_BAUD_RATE);
                    i += 1;
                }
                ("--json-logs", _) => {
                    cfg.json_logs = true;
                }
                ("--log-dir", Some(v)) => {
                    cfg.log_dir = Some(PathBuf::from(v));
                    i += 1;
                }
                ("--metrics-addr", Some(v)) => {
                    cfg.metrics_addr = Some(v.clone());
                    i += 1;
                }
                ("--event-log", Some(v)) => {
                    cfg.event_log = Some(PathBuf::from(v));
                    i += 1;
                }
                ("--initial-rpm", Some(v)) => {
                    if let Ok(rpm) = v.parse() {
                        cfg.constants.initial_rpm = rpm;
                    }
                    i += 1;
                }
                ("--steps-per-rev", Some(v)) => {
                    if let Ok(steps) = v.parse() {
                        cfg.constants.steps_per_rev = steps;
                    }
                    i += 1;
                }
                ("--microsteps", Some(v)) => {
                    if let Ok(factor) = v.parse() {
                        cfg.constants.microstep_factor = factor;
                    }
                    i += 1;
                }
                ("--gear-ratio", Some(v)) => {
                    if let Some(ratio) = parse_positive(v) {
                        cfg.constants.gear_ratio = ratio;
                    }
                    i += 1;
                }
                ("--lever-arm", Some(v)) => {
                    if let Some(metres) = parse_positive(v) {
                        cfg.constants.lever_arm_m = metres;
                    }
                    i += 1;
                }
                ("--load-samples", Some(v)) => {
                    if let Ok(samples) = v.parse::<u8>() {
                        cfg.constants.load_cell_samples = samples.max(1);
                    }
                    i += 1;
                }
                ("--noise-floor", Some(v)) => {
                    if let Ok(watts) = v.parse::<f64>() {
                        cfg.constants.power_noise_floor_w = watts;
                    }
                    i += 1;
                }
                ("--no-realtime", _) => {
                    cfg.realtime = false;
                }
                ("--sim-no-power-sensor", _) => {
                    cfg.sim_power_sensor_missing = true;
                }
                ("--help" | "-h", _) => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        // --baud may follow --serial.
        if let LinkKind::Serial { baud_rate: rate, .. } = &mut cfg.link {
            *rate = baud_rate;
        }
        cfg
    }

    pub fn print_help() {
        println!(
            r#"gearbox-rig - Stepper-driven gearbox efficiency test rig

USAGE:
    gearbox-rig [OPTIONS]

Speed commands (integer RPM, 100-1200) are read from the link; one record per
cycle is written back:
    MotorRPM,GearboxRPM,Force(N),Torque(Nm),InputPower(W),OutputPower(W),Efficiency(%)

OPTIONS:
    --bind <ADDR>           Serve the record link over TCP instead of stdio
    --serial <PATH>         Use a serial port as the record link
    --baud <RATE>           Serial baud rate [default: 9600]
    --run-seconds <SECS>    Run for a fixed duration then exit
    --max-cycles <N>        Stop after N cycles
    --json-logs             Output logs in JSON format (stderr)
    --log-dir <DIR>         Also write daily-rolling JSON logs to DIR
    --metrics-addr <ADDR>   Enable Prometheus metrics server on address (e.g., 0.0.0.0:9090)
    --event-log <PATH>      Append JSONL events (commands, faults, start/stop) to PATH
    --initial-rpm <RPM>     Target speed before the first command [default: 100]
    --steps-per-rev <N>     Full steps per motor revolution [default: 200]
    --microsteps <N>        Driver microstep factor [default: 1]
    --gear-ratio <R>        Gearbox reduction [default: 15]
    --lever-arm <M>         Load cell lever arm in metres [default: 0.1]
    --load-samples <N>      Load cell samples averaged per reading [default: 5]
    --noise-floor <W>       Input power below which efficiency reads 0 [default: 0.5]
    --no-realtime           Simulated rig: skip the busy-wait step holds
    --sim-no-power-sensor   Simulated rig: power sensor absent at startup
    -h, --help              Print this help message

ENVIRONMENT VARIABLES:
    RUST_LOG                Set log filter (e.g., RUST_LOG=debug,rig_core=trace)

EXAMPLES:
    # Interactive run; type a speed and press enter
    gearbox-rig

    # Serve a host collector over TCP with metrics
    gearbox-rig --bind 127.0.0.1:7100 --metrics-addr 0.0.0.0:9090

    # Short smoke run
    gearbox-rig --max-cycles 1000 --no-realtime
"#
        );
    }
}

fn parse_positive(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("gearbox-rig")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_to_stdio_link() {
        let cfg = RuntimeConfig::from_args(&args(&[]));
        assert_eq!(cfg.link, LinkKind::Stdio);
        assert!(cfg.realtime);
        assert_eq!(cfg.constants, RigConstants::default());
    }

    #[test]
    fn serial_link_picks_up_later_baud() {
        let cfg = RuntimeConfig::from_args(&args(&["--serial", "/dev/ttyUSB0", "--baud", "115200"]));
        assert_eq!(
            cfg.link,
            LinkKind::Serial {
                path: "/dev/ttyUSB0".to_string(),
                baud_rate: 115200
            }
        );
    }

    #[test]
    fn rig_constants_overrides() {
        let cfg = RuntimeConfig::from_args(&args(&[
            "--gear-ratio",
            "20",
            "--microsteps",
            "4",
            "--lever-arm",
            "-1",
            "--max-cycles",
            "50",
            "--no-realtime",
        ]));
        assert_eq!(cfg.constants.gear_ratio, 20.0);
        assert_eq!(cfg.constants.microstep_factor, 4);
        assert_eq!(cfg.constants.lever_arm_m, 0.1);
        assert_eq!(cfg.max_cycles, Some(50));
        assert!(!cfg.realtime);
    }

    #[test]
    fn help_stops_parsing() {
        let cfg = RuntimeConfig::from_args(&args(&["-h", "--bind", "0.0.0.0:1"]));
        assert!(cfg.show_help);
        assert_eq!(cfg.link, LinkKind::Stdio);
    }
}
