use crate::infra::journal::{EventJournal, JournalEventType};
use rig_core::{CommandOutcome, CycleObserver, HalError, Measurement, StepTiming, TimeBase};
use rig_io::metrics::{self, COMMANDS_ACCEPTED, COMMANDS_IGNORED, SENSOR_FAULTS};
use std::sync::Arc;
use std::thread;
use tracing::{info, warn};

pub fn init() {
    metrics::init_metrics();
}

pub fn start_metrics_server(addr: &Option<String>) -> Option<thread::JoinHandle<()>> {
    addr.as_ref().map(|addr| {
        info!(addr = %addr, "Starting metrics server");
        metrics::serve_metrics(addr.clone())
    })
}

/// Feeds loop events to Prometheus and the optional event journal.
pub struct RigTelemetry {
    journal: Option<Arc<EventJournal>>,
    timebase: TimeBase,
}

impl RigTelemetry {
    pub fn new(journal: Option<Arc<EventJournal>>, timebase: TimeBase) -> Self {
        Self { journal, timebase }
    }

    pub fn journal(&self, event_type: JournalEventType, details: serde_json::Value) {
        if let Some(journal) = &self.journal {
            if let Err(e) = journal.log_event(
                self.timebase.now_us(),
                self.timebase.unix_us(),
                event_type,
                details,
            ) {
                warn!(error = %e, "Failed to write event journal");
            }
        }
    }
}

impl CycleObserver for RigTelemetry {
    fn on_command(&mut self, outcome: &CommandOutcome) {
        match outcome {
            CommandOutcome::Accepted { rpm, previous_rpm } => {
                COMMANDS_ACCEPTED.inc();
                self.journal(
                    JournalEventType::CommandAccepted,
                    serde_json::json!({ "rpm": rpm, "previous_rpm": previous_rpm }),
                );
            }
            CommandOutcome::Ignored { raw, reason } => {
                COMMANDS_IGNORED.inc();
                self.journal(
                    JournalEventType::CommandIgnored,
                    serde_json::json!({ "raw": raw, "reason": reason.to_string() }),
                );
            }
        }
    }

    fn on_record(&mut self, record: &Measurement, timing: &StepTiming) {
        metrics::record_cycle(record, timing);
    }

    fn on_sensor_fault(&mut self, error: &HalError) {
        SENSOR_FAULTS.inc();
        self.journal(
            JournalEventType::SensorFault,
            serde_json::json!({ "error": error.to_string() }),
        );
    }
}
