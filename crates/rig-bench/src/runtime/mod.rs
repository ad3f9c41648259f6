mod app;
mod config;
mod logging;
mod telemetry;

pub use app::{run, run_from_args};
pub use config::{LinkKind, RuntimeConfig, DEFAULT_BAUD_RATE};
pub use logging::init_tracing;
