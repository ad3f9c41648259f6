use crate::infra::journal::{EventJournal, JournalEventType};
use crate::runtime::config::{LinkKind, RuntimeConfig};
use crate::runtime::logging::init_tracing;
use crate::runtime::telemetry::{self, RigTelemetry};
use rig_core::{Measurement, RecordStream, SimParams, SimulatedRig, TestRig, TimeBase};
use rig_io::{LinkError, SerialLink, StdioLink, TcpLink};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

enum RigLink {
    Stdio(StdioLink),
    Tcp(TcpLink),
    Serial(SerialLink),
}

impl RigLink {
    fn open(kind: &LinkKind) -> Result<Self, LinkError> {
        Ok(match kind {
            LinkKind::Stdio => Self::Stdio(StdioLink::new()),
            LinkKind::Tcp { bind_addr } => Self::Tcp(TcpLink::bind(bind_addr)?),
            LinkKind::Serial { path, baud_rate } => {
                Self::Serial(SerialLink::open(path, *baud_rate)?)
            }
        })
    }
}

impl RecordStream for RigLink {
    fn poll_input(&mut self) -> io::Result<Option<String>> {
        match self {
            Self::Stdio(l) => l.poll_input(),
            Self::Tcp(l) => l.poll_input(),
            Self::Serial(l) => l.poll_input(),
        }
    }

    fn emit_record(&mut self, record: &Measurement) -> io::Result<()> {
        match self {
            Self::Stdio(l) => l.emit_record(record),
            Self::Tcp(l) => l.emit_record(record),
            Self::Serial(l) => l.emit_record(record),
        }
    }

    fn emit_notice(&mut self, message: &str) -> io::Result<()> {
        match self {
            Self::Stdio(l) => l.emit_notice(message),
            Self::Tcp(l) => l.emit_notice(message),
            Self::Serial(l) => l.emit_notice(message),
        }
    }
}

pub fn run_from_args() -> Result<(), Box<dyn std::error::Error>> {
    let config = RuntimeConfig::from_env();
    if config.show_help {
        RuntimeConfig::print_help();
        return Ok(());
    }
    run(config)
}

pub fn run(config: RuntimeConfig) -> Result<(), Box<dyn std::error::Error>> {
    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref(), "gearbox-rig");

    telemetry::init();
    let _metrics_handle = telemetry::start_metrics_server(&config.metrics_addr);

    let timebase = TimeBase::new();
    let journal = open_journal(config.event_log.as_ref())?;
    let mut observer = RigTelemetry::new(journal, timebase);

    let constants = config.constants;
    observer.journal(
        JournalEventType::SystemStart,
        serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "link": format!("{:?}", config.link),
            "gear_ratio": constants.gear_ratio,
            "steps_per_rev": constants.steps_per_motor_rev(),
            "initial_rpm": constants.initial_rpm,
        }),
    );

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_signal.store(true, Ordering::Relaxed);
    })?;

    if let Some(seconds) = config.run_seconds {
        info!(seconds, "Running for limited duration");
        let stop_timer = Arc::clone(&stop);
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(seconds));
            stop_timer.store(true, Ordering::Relaxed);
        });
    }

    let mut link = RigLink::open(&config.link)?;

    let io = SimulatedRig::new(
        &constants,
        SimParams {
            power_sensor_present: !config.sim_power_sensor_missing,
            realtime: config.realtime,
            ..SimParams::default()
        },
    );

    info!(
        gear_ratio = constants.gear_ratio,
        steps_per_rev = constants.steps_per_motor_rev(),
        initial_rpm = constants.initial_rpm,
        realtime = config.realtime,
        "Starting gearbox rig control loop"
    );

    let mut rig = TestRig::new(io, constants);
    rig.begin(&mut link, &mut observer)?;
    let result = rig.run(&mut link, &mut observer, &stop, config.max_cycles);

    let stats = rig.stats().clone();
    info!(
        cycles_executed = stats.cycles_executed,
        commands_accepted = stats.commands_accepted,
        commands_ignored = stats.commands_ignored,
        max_overrun_us = stats.max_overrun_us,
        steps = rig.io().steps(),
        "Run complete"
    );

    observer.journal(
        JournalEventType::SystemShutdown,
        serde_json::json!({
            "cycles_executed": stats.cycles_executed,
            "commands_accepted": stats.commands_accepted,
            "commands_ignored": stats.commands_ignored,
            "final_rpm": rig.state().target_rpm(),
        }),
    );

    result.map_err(Into::into)
}

fn open_journal(path: Option<&PathBuf>) -> io::Result<Option<Arc<EventJournal>>> {
    let Some(path) = path else {
        return Ok(None);
    };
    match EventJournal::open(path) {
        Ok(journal) => {
            info!(path = %path.display(), "Event journal enabled");
            Ok(Some(Arc::new(journal)))
        }
        Err(e) => {
            warn!(error = %e, path = %path.display(), "Failed to open event journal");
            Err(e)
        }
    }
}
