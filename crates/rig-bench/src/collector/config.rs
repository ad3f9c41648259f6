use crate::runtime::DEFAULT_BAUD_RATE;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PLOT_EVERY: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Stdin,
    Tcp { addr: String },
    Serial { path: String, baud_rate: u32 },
}

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub show_help: bool,
    pub source: SourceKind,
    pub csv_path: PathBuf,
    pub live_plot_path: PathBuf,
    pub final_plot_path: PathBuf,
    pub plot_every: u64,
    pub read_timeout: Duration,
    /// Speed command sent once the source is open.
    pub speed_rpm: Option<u32>,
    pub json_logs: bool,
    pub log_dir: Option<PathBuf>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            show_help: false,
            source: SourceKind::Stdin,
            csv_path: PathBuf::from("gearbox_data.csv"),
            live_plot_path: PathBuf::from("gearbox_live.png"),
            final_plot_path: PathBuf::from("gearbox_final.png"),
            plot_every: DEFAULT_PLOT_EVERY,
            read_timeout: Duration::from_secs(1),
            speed_rpm: None,
            json_logs: false,
            log_dir: None,
        }
    }
}

impl CollectorConfig {
    pub fn from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_args(&args)
    }

    pub fn from_args(args: &[String]) -> Self {
        let mut cfg = CollectorConfig::default();
        let mut baud_rate = DEFAULT_BAUD_RATE;
        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1);
            match (args[i].as_str(), value) {
                ("--connect", Some(v)) => {
                    cfg.source = SourceKind::Tcp { addr: v.clone() };
                    i += 1;
                }
                ("--serial", Some(v)) => {
                    cfg.source = SourceKind::Serial {
                        path: v.clone(),
                        baud_rate,
                    };
                    i += 1;
                }
                ("--baud", Some(v)) => {
                    baud_rate = v.parse().unwrap_or(DEFAULT_BAUD_RATE);
                    i += 1;
                }
                ("--csv", Some(v)) => {
                    cfg.csv_path = PathBuf::from(v);
                    i += 1;
                }
                ("--live-plot", Some(v)) => {
                    cfg.live_plot_path = PathBuf::from(v);
                    i += 1;
                }
                ("--final-plot", Some(v)) => {
                    cfg.final_plot_path = PathBuf::from(v);
                    i += 1;
                }
                ("--plot-every", Some(v)) => {
                    cfg.plot_every = v.parse::<u64>().unwrap_or(DEFAULT_PLOT_EVERY).max(1);
                    i += 1;
                }
                ("--read-timeout-ms", Some(v)) => {
                    if let Ok(ms) = v.parse::<u64>() {
                        cfg.read_timeout = Duration::from_millis(ms.max(1));
                    }
                    i += 1;
                }
                ("--speed", Some(v)) => {
                    cfg.speed_rpm = v.parse().ok();
                    i += 1;
                }
                ("--json-logs", _) => {
                    cfg.json_logs = true;
                }
                ("--log-dir", Some(v)) => {
                    cfg.log_dir = Some(PathBuf::from(v));
                    i += 1;
                }
                ("--help" | "-h", _) => {
                    cfg.show_help = true;
                    break;
                }
                _ => {}
            }
            i += 1;
        }
        if let SourceKind::Serial { baud_rate: rate, .. } = &mut cfg.source {
            *rate = baud_rate;
        }
        cfg
    }

    pub fn print_help() {
        println!(
            r#"rig-collector - Log and plot gearbox rig records

USAGE:
    rig-collector [OPTIONS]

Reads record lines from the rig (stdin by default), appends every valid
record to a CSV file and redraws the plots every N records. Ctrl-C closes the
log and writes a final snapshot image.

OPTIONS:
    --connect <ADDR>        Read records from a gearbox-rig TCP link
    --serial <PATH>         Read records from a serial port
    --baud <RATE>           Serial baud rate [default: 9600]
    --csv <PATH>            CSV log path [default: gearbox_data.csv]
    --live-plot <PATH>      Periodically refreshed plot [default: gearbox_live.png]
    --final-plot <PATH>     Snapshot written on exit [default: gearbox_final.png]
    --plot-every <N>        Redraw after every N accepted records [default: 10]
    --read-timeout-ms <MS>  Read timeout before re-checking for Ctrl-C [default: 1000]
    --speed <RPM>           Send one speed command after connecting
    --json-logs             Output logs in JSON format
    --log-dir <DIR>         Also write daily-rolling JSON logs to DIR
    -h, --help              Print this help message

EXAMPLES:
    # Pipe the rig straight into the collector
    gearbox-rig | rig-collector

    # Follow a rig served over TCP and set it to 600 RPM
    rig-collector --connect 127.0.0.1:7100 --speed 600
"#
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("rig-collector")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults() {
        let cfg = CollectorConfig::from_args(&args(&[]));
        assert_eq!(cfg.source, SourceKind::Stdin);
        assert_eq!(cfg.plot_every, 10);
        assert_eq!(cfg.csv_path, PathBuf::from("gearbox_data.csv"));
    }

    #[test]
    fn connect_and_speed() {
        let cfg = CollectorConfig::from_args(&args(&[
            "--connect",
            "127.0.0.1:7100",
            "--speed",
            "600",
            "--plot-every",
            "0",
        ]));
        assert_eq!(
            cfg.source,
            SourceKind::Tcp {
                addr: "127.0.0.1:7100".to_string()
            }
        );
        assert_eq!(cfg.speed_rpm, Some(600));
        assert_eq!(cfg.plot_every, 1);
    }
}
