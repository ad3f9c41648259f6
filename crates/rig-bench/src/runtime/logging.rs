use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "info,rig_bench=debug,rig_core=debug,rig_io=debug";

/// Workspace crates whose targets get debug output by default.
const WORKSPACE_TARGETS: [&str; 3] = ["rig_bench", "rig_core", "rig_io"];

/// Initialize the tracing subscriber with optional JSON output.
///
/// Console output goes to stderr; stdout may be carrying the record stream.
/// With `log_dir` set, a daily rolling file layer is added and the returned
/// guard must be held until exit so buffered lines are flushed.
pub fn init_tracing(
    json_output: bool,
    log_dir: Option<&Path>,
    file_prefix: &str,
) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().json().with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let registry = tracing_subscriber::registry().with(filter).with(file_layer);

    if json_output {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().pretty().with_writer(std::io::stderr))
            .init();
    }

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_names_only_workspace_targets() {
        assert!(EnvFilter::try_new(DEFAULT_FILTER).is_ok());
        for directive in DEFAULT_FILTER.split(',').skip(1) {
            let (target, level) = directive.split_once('=').expect("target=level");
            assert!(WORKSPACE_TARGETS.contains(&target), "unknown target {target}");
            assert_eq!(level, "debug");
        }
    }
}
