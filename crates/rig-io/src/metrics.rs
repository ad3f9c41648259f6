//! Prometheus metrics for the gearbox rig.
//!
//! Gauges mirror the latest emitted record; counters track loop and command
//! activity.

use prometheus::{Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};
use rig_core::tags;
use rig_core::{Measurement, StepTiming};
use std::sync::LazyLock;
use std::thread;
use tiny_http::{Response, Server};

/// Global metrics registry
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

fn register_gauge(name: &str, help: &str) -> Gauge {
    let gauge = Gauge::new(name, help).unwrap();
    REGISTRY.register(Box::new(gauge.clone())).unwrap();
    gauge
}

fn register_counter(name: &str, help: &str) -> IntCounter {
    let counter = IntCounter::new(name, help).unwrap();
    REGISTRY.register(Box::new(counter.clone())).unwrap();
    counter
}

// ============================================================================
// Loop Metrics
// ============================================================================

pub static CYCLES_EXECUTED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "gearbox_rig_cycles_executed_total",
        "Measure-and-step cycles executed",
    )
});

pub static COMMANDS_ACCEPTED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "gearbox_rig_commands_accepted_total",
        "Speed commands accepted",
    )
});

pub static COMMANDS_IGNORED: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "gearbox_rig_commands_ignored_total",
        "Speed commands ignored as out of range or non-numeric",
    )
});

pub static SENSOR_FAULTS: LazyLock<IntCounter> = LazyLock::new(|| {
    register_counter(
        "gearbox_rig_sensor_faults_total",
        "Sensor faults reported at startup",
    )
});

const STEP_DELAY_METRIC: &str = "gearbox_rig_step_delay_microseconds";

/// Step delay distribution; one observation per cycle.
pub static STEP_DELAY_US: LazyLock<Histogram> = LazyLock::new(|| {
    let histogram = Histogram::with_opts(
        HistogramOpts::new(
            STEP_DELAY_METRIC,
            "Per-phase step hold in microseconds",
        )
        .buckets(vec![
            125.0, 250.0, 500.0, 750.0, 1000.0, 1500.0, 3000.0, 1_000_000.0,
        ]),
    )
    .unwrap();
    REGISTRY.register(Box::new(histogram.clone())).unwrap();
    histogram
});

// ============================================================================
// Record Metrics
// ============================================================================

pub static MOTOR_RPM: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::MOTOR_RPM.metric, "Commanded motor speed in RPM"));

pub static GEARBOX_RPM: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::GEARBOX_RPM.metric, "Output shaft speed in RPM"));

pub static FORCE_N: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::FORCE_N.metric, "Load cell force in newtons"));

pub static TORQUE_NM: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::TORQUE_NM.metric, "Output torque in newton metres"));

pub static INPUT_POWER_W: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::INPUT_POWER_W.metric, "Electrical input power in watts"));

pub static OUTPUT_POWER_W: LazyLock<Gauge> = LazyLock::new(|| {
    register_gauge(
        tags::OUTPUT_POWER_W.metric,
        "Mechanical output power in watts",
    )
});

pub static EFFICIENCY_PCT: LazyLock<Gauge> =
    LazyLock::new(|| register_gauge(tags::EFFICIENCY_PCT.metric, "Drive efficiency in percent"));

/// Publish one emitted record.
pub fn record_cycle(record: &Measurement, timing: &StepTiming) {
    CYCLES_EXECUTED.inc();
    STEP_DELAY_US.observe(timing.delay().as_secs_f64() * 1.0e6);
    MOTOR_RPM.set(f64::from(record.motor_rpm));
    GEARBOX_RPM.set(record.gearbox_rpm);
    FORCE_N.set(record.force_n);
    TORQUE_NM.set(record.torque_nm);
    INPUT_POWER_W.set(record.input_power_w);
    OUTPUT_POWER_W.set(record.output_power_w);
    EFFICIENCY_PCT.set(record.efficiency_pct);
}

// ============================================================================
// Metrics HTTP Server
// ============================================================================

/// Start the metrics HTTP server on the given address.
/// Returns a join handle for the server thread.
pub fn serve_metrics(bind_addr: String) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let server = match Server::http(&bind_addr) {
            Ok(s) => s,
            Err(e) => {
                tracing::error!("Failed to start metrics server on {}: {}", bind_addr, e);
                return;
            }
        };

        tracing::info!("Metrics server listening on http://{}/metrics", bind_addr);

        for request in server.incoming_requests() {
            match request.url() {
                "/metrics" => {
                    let encoder = TextEncoder::new();
                    let mut buffer = Vec::new();

                    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
                        tracing::warn!("Failed to encode metrics: {}", e);
                        let _ = request.respond(
                            Response::from_string("Internal Server Error").with_status_code(500),
                        );
                        continue;
                    }

                    let response = Response::from_data(buffer).with_header(
                        tiny_http::Header::from_bytes(
                            &b"Content-Type"[..],
                            &b"text/plain; version=0.0.4"[..],
                        )
                        .unwrap(),
                    );
                    let _ = request.respond(response);
                }
                "/health" => {
                    let _ = request.respond(Response::from_string("OK"));
                }
                "/ready" => {
                    if CYCLES_EXECUTED.get() > 0 {
                        let _ = request.respond(Response::from_string("Ready"));
                    } else {
                        let _ = request
                            .respond(Response::from_string("Not Ready").with_status_code(503));
                    }
                }
                _ => {
                    let _ =
                        request.respond(Response::from_string("Not Found").with_status_code(404));
                }
            }
        }
    })
}

/// Initialize all metrics (forces lazy initialization)
pub fn init_metrics() {
    let _ = CYCLES_EXECUTED.get();
    let _ = COMMANDS_ACCEPTED.get();
    let _ = COMMANDS_IGNORED.get();
    let _ = SENSOR_FAULTS.get();
    let _ = STEP_DELAY_US.get_sample_count();
    let _ = MOTOR_RPM.get();
    let _ = GEARBOX_RPM.get();
    let _ = FORCE_N.get();
    let _ = TORQUE_NM.get();
    let _ = INPUT_POWER_W.get();
    let _ = OUTPUT_POWER_W.get();
    let _ = EFFICIENCY_PCT.get();
}
