//! Host side of the rig link: log every record to CSV and keep the plots
//! current.

pub mod config;
pub mod plots;
pub mod source;
pub mod store;

use crate::runtime::init_tracing;
use config::CollectorConfig;
use plots::{render_history, PlotError};
use rig_core::Measurement;
use rig_io::{decode_record, LinkError};
use source::{RecordSource, SourceEvent};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use store::CsvLog;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("link error: {0}")]
    Link(#[from] LinkError),
    #[error("plot error: {0}")]
    Plot(#[from] PlotError),
    #[error("failed to install Ctrl-C handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Buffers accepted records, appends them to the CSV log and redraws the
/// live plot every `plot_every` records.
pub struct Collector {
    log: CsvLog,
    history: Vec<Measurement>,
    live_plot: PathBuf,
    final_plot: PathBuf,
    plot_every: u64,
    dropped: u64,
}

impl Collector {
    pub fn new(config: &CollectorConfig) -> Result<Self, CollectorError> {
        Ok(Self {
            log: CsvLog::create(&config.csv_path)?,
            history: Vec::new(),
            live_plot: config.live_plot_path.clone(),
            final_plot: config.final_plot_path.clone(),
            plot_every: config.plot_every.max(1),
            dropped: 0,
        })
    }

    /// Take one raw line. Returns the record when it parsed; anything else
    /// (banners, notices, partial lines) is dropped.
    pub fn ingest(&mut self, line: &str) -> Result<Option<Measurement>, CollectorError> {
        let record = match decode_record(line) {
            Ok(record) => record,
            Err(e) => {
                debug!(line = %line, reason = %e, "Dropped line");
                self.dropped += 1;
                return Ok(None);
            }
        };

        self.history.push(record);
        self.log.append(&record)?;

        if self.log.rows() % self.plot_every == 0 {
            if let Err(e) = render_history(&self.live_plot, &self.history) {
                warn!(error = %e, path = %self.live_plot.display(), "Live plot refresh failed");
            }
        }
        Ok(Some(record))
    }

    pub fn history(&self) -> &[Measurement] {
        &self.history
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Close the log and write the final snapshot.
    pub fn finish(self) -> Result<(), CollectorError> {
        let rows = self.log.rows();
        self.log.close()?;
        render_history(&self.final_plot, &self.history)?;
        info!(
            rows,
            dropped = self.dropped,
            path = %self.final_plot.display(),
            "Final plot written"
        );
        Ok(())
    }
}

pub fn run_from_args() -> Result<(), CollectorError> {
    let config = CollectorConfig::from_env();
    if config.show_help {
        CollectorConfig::print_help();
        return Ok(());
    }
    let _log_guard = init_tracing(config.json_logs, config.log_dir.as_deref(), "rig-collector");

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_signal.store(true, Ordering::Relaxed);
    })?;

    run(&config, &stop)
}

/// Collect until `stop` is raised or the source closes.
pub fn run(config: &CollectorConfig, stop: &AtomicBool) -> Result<(), CollectorError> {
    let mut source = RecordSource::open(&config.source, config.read_timeout)?;
    let mut collector = Collector::new(config)?;

    if let Some(rpm) = config.speed_rpm {
        info!(rpm, "Sending speed command");
        source.send_command(rpm)?;
    }

    info!(source = ?config.source, csv = %config.csv_path.display(), "Collecting records");

    let result = collect(&mut source, &mut collector, stop, config);
    drop(source);

    // The log and final snapshot are written even when the source failed.
    let finished = collector.finish();
    result.and(finished)
}

fn collect(
    source: &mut RecordSource,
    collector: &mut Collector,
    stop: &AtomicBool,
    config: &CollectorConfig,
) -> Result<(), CollectorError> {
    while !stop.load(Ordering::Relaxed) {
        match source.next_line(config.read_timeout)? {
            SourceEvent::Line(line) => {
                collector.ingest(&line)?;
            }
            SourceEvent::Timeout => {}
            SourceEvent::Closed => {
                info!("Source closed");
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn config_in(dir: &TempDir, plot_every: u64) -> CollectorConfig {
        CollectorConfig {
            csv_path: dir.path().join("data.csv"),
            live_plot_path: dir.path().join("live.png"),
            final_plot_path: dir.path().join("final.png"),
            plot_every,
            ..CollectorConfig::default()
        }
    }

    #[test]
    fn malformed_lines_are_dropped_silently() {
        let dir = tempdir().unwrap();
        let mut collector = Collector::new(&config_in(&dir, 10)).unwrap();

        assert!(collector.ingest("Failed to find power sensor").unwrap().is_none());
        assert!(collector.ingest("600,40.00,4.905").unwrap().is_none());
        assert!(collector.ingest("").unwrap().is_none());
        let record = collector
            .ingest("600,40.00,4.905,0.491,6.000,2.055,34.245")
            .unwrap()
            .unwrap();

        assert_eq!(record.motor_rpm, 600);
        assert_eq!(collector.history().len(), 1);
        assert_eq!(collector.dropped(), 3);
    }

    #[test]
    fn live_plot_refreshes_every_nth_record() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 3);
        let mut collector = Collector::new(&config).unwrap();

        collector.ingest("600,40.00,4.905,0.491,6.000,2.055,34.245").unwrap();
        collector.ingest("600,40.00,4.905,0.491,6.000,2.055,34.245").unwrap();
        assert!(!config.live_plot_path.exists());
        collector.ingest("700,46.67,4.905,0.491,6.500,2.397,36.877").unwrap();
        assert!(config.live_plot_path.exists());
    }

    #[test]
    fn finish_closes_log_and_writes_snapshot() {
        let dir = tempdir().unwrap();
        let config = config_in(&dir, 10);
        let mut collector = Collector::new(&config).unwrap();
        collector.ingest("600,40.00,4.905,0.491,6.000,2.055,34.245").unwrap();
        collector.finish().unwrap();

        let csv = std::fs::read_to_string(&config.csv_path).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert_eq!(
            csv.lines().nth(1),
            Some("600,40.00,4.905,0.491,6.000,2.055,34.245")
        );
        assert!(config.final_plot_path.exists());
    }
}
