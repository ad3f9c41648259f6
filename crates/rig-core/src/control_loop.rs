use crate::command::{CommandRejection, SpeedCommand};
use crate::constants::RigConstants;
use crate::hal::{Direction, HalError, PinLevel, RigIO};
use crate::measurement::Measurement;
use crate::timing::StepTiming;
use log::{debug, error, info, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;

pub const POWER_SENSOR_MISSING_NOTICE: &str = "Failed to find power sensor";

/// Line-oriented link to the host.
pub trait RecordStream {
    /// Everything received since the last poll, or `None` when nothing arrived.
    fn poll_input(&mut self) -> io::Result<Option<String>>;
    fn emit_record(&mut self, record: &Measurement) -> io::Result<()>;
    /// Free-text line for the host; collectors drop it as a malformed record.
    fn emit_notice(&mut self, message: &str) -> io::Result<()>;
}

/// Side channel for metrics and journaling. Every hook defaults to a no-op.
pub trait CycleObserver {
    fn on_command(&mut self, _outcome: &CommandOutcome) {}
    fn on_record(&mut self, _record: &Measurement, _timing: &StepTiming) {}
    fn on_sensor_fault(&mut self, _error: &HalError) {}
}

impl CycleObserver for () {}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Accepted { rpm: u32, previous_rpm: u32 },
    Ignored { raw: String, reason: CommandRejection },
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("hardware error: {0}")]
    Hal(#[from] HalError),
    #[error("record stream error: {0}")]
    Stream(#[from] io::Error),
}

/// Everything the loop carries from one iteration to the next.
#[derive(Debug, Clone, Copy)]
pub struct RigState {
    target_rpm: u32,
    timing_stale: bool,
    timing: StepTiming,
}

impl RigState {
    fn new(constants: &RigConstants) -> Self {
        Self {
            target_rpm: constants.initial_rpm,
            timing_stale: true,
            timing: StepTiming::for_speed(
                f64::from(constants.initial_rpm),
                constants.steps_per_motor_rev(),
            ),
        }
    }

    pub fn target_rpm(&self) -> u32 {
        self.target_rpm
    }

    pub fn timing_stale(&self) -> bool {
        self.timing_stale
    }

    pub fn timing(&self) -> &StepTiming {
        &self.timing
    }
}

#[derive(Clone, Default, Debug)]
pub struct ExecutionStats {
    pub cycles_executed: u64,
    pub commands_accepted: u64,
    pub commands_ignored: u64,
    pub last_cycle_us: u64,
    /// Worst excess of a full cycle over the nominal pulse period.
    pub max_overrun_us: u64,
}

/// Measure-and-step loop for the gearbox rig.
pub struct TestRig<IO: RigIO> {
    io: IO,
    constants: RigConstants,
    state: RigState,
    stats: ExecutionStats,
}

impl<IO: RigIO> TestRig<IO> {
    pub fn new(io: IO, constants: RigConstants) -> Self {
        Self {
            io,
            state: RigState::new(&constants),
            constants,
            stats: ExecutionStats::default(),
        }
    }

    /// Enable the driver and bring up the sensors.
    ///
    /// A missing power sensor is reported on the stream and the loop carries
    /// on; any other hardware error is returned.
    pub fn begin<S: RecordStream, O: CycleObserver>(
        &mut self,
        stream: &mut S,
        observer: &mut O,
    ) -> Result<(), LoopError> {
        self.io.set_pulse(PinLevel::Low);
        self.io.set_direction(Direction::Forward);
        self.io.set_enabled(true);

        match self.io.begin() {
            Ok(()) => {
                info!("Rig hardware ready");
                Ok(())
            }
            Err(HalError::PowerSensorMissing) => {
                error!("{}", POWER_SENSOR_MISSING_NOTICE);
                observer.on_sensor_fault(&HalError::PowerSensorMissing);
                stream.emit_notice(POWER_SENSOR_MISSING_NOTICE)?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Accept or ignore one chunk of host input.
    pub fn apply_input(&mut self, raw: &str) -> CommandOutcome {
        let outcome = match SpeedCommand::parse(raw).and_then(|cmd| cmd.validate()) {
            Ok(cmd) => {
                let previous_rpm = self.state.target_rpm;
                self.state.target_rpm = cmd.rpm();
                self.state.timing_stale = true;
                self.stats.commands_accepted += 1;
                CommandOutcome::Accepted {
                    rpm: cmd.rpm(),
                    previous_rpm,
                }
            }
            Err(reason) => {
                self.stats.commands_ignored += 1;
                CommandOutcome::Ignored {
                    raw: raw.trim().to_string(),
                    reason,
                }
            }
        };
        match &outcome {
            CommandOutcome::Accepted { rpm, previous_rpm } => {
                info!("Speed command accepted: {} -> {} RPM", previous_rpm, rpm)
            }
            CommandOutcome::Ignored { raw, reason } => {
                debug!("Ignoring command {:?}: {}", raw, reason)
            }
        }
        outcome
    }

    /// Recompute the step delay if a command is pending. Returns true if it did.
    pub fn refresh_timing(&mut self) -> bool {
        if !self.state.timing_stale {
            return false;
        }
        self.state.timing = StepTiming::for_speed(
            f64::from(self.state.target_rpm),
            self.constants.steps_per_motor_rev(),
        );
        self.state.timing_stale = false;
        debug!(
            "Step timing: {:.1} Hz, delay {} us",
            self.state.timing.frequency_hz(),
            self.state.timing.delay().as_micros()
        );
        true
    }

    pub fn measure(&mut self) -> Measurement {
        let load_kg = self.io.read_load_kg(self.constants.load_cell_samples);
        let power = self.io.read_power();
        Measurement::derive(self.state.target_rpm, load_kg, power, &self.constants)
    }

    /// One full pulse: high for the delay, then low for the delay.
    pub fn step(&mut self) {
        let delay = self.state.timing.delay();
        self.io.set_pulse(PinLevel::High);
        self.io.hold(delay);
        self.io.set_pulse(PinLevel::Low);
        self.io.hold(delay);
    }

    pub fn cycle<S: RecordStream, O: CycleObserver>(
        &mut self,
        stream: &mut S,
        observer: &mut O,
    ) -> Result<Measurement, LoopError> {
        let cycle_start = Instant::now();

        if let Some(raw) = stream.poll_input()?.filter(|raw| !raw.is_empty()) {
            let outcome = self.apply_input(&raw);
            observer.on_command(&outcome);
        }

        self.refresh_timing();

        let record = self.measure();
        stream.emit_record(&record)?;
        observer.on_record(&record, &self.state.timing);

        self.step();

        let cycle_us = cycle_start.elapsed().as_micros() as u64;
        let nominal_us = self.state.timing.pulse_period().as_micros() as u64;
        self.stats.last_cycle_us = cycle_us;
        self.stats.max_overrun_us = self
            .stats
            .max_overrun_us
            .max(cycle_us.saturating_sub(nominal_us));
        self.stats.cycles_executed += 1;

        Ok(record)
    }

    /// Run until `stop` is set or `max_cycles` iterations have completed.
    pub fn run<S: RecordStream, O: CycleObserver>(
        &mut self,
        stream: &mut S,
        observer: &mut O,
        stop: &AtomicBool,
        max_cycles: Option<u64>,
    ) -> Result<(), LoopError> {
        let result = loop {
            if stop.load(Ordering::Relaxed) {
                break Ok(());
            }
            if max_cycles.is_some_and(|max| self.stats.cycles_executed >= max) {
                break Ok(());
            }
            if let Err(e) = self.cycle(stream, observer) {
                warn!("Control loop stopped: {}", e);
                break Err(e);
            }
        };
        self.shutdown();
        result
    }

    /// Leave the pulse line low and the driver disabled.
    pub fn shutdown(&mut self) {
        self.io.set_pulse(PinLevel::Low);
        self.io.set_enabled(false);
    }

    pub fn state(&self) -> &RigState {
        &self.state
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn constants(&self) -> &RigConstants {
        &self.constants
    }

    pub fn io(&self) -> &IO {
        &self.io
    }
}
