use std::process::ExitCode;

fn main() -> ExitCode {
    match rig_bench::collector::run_from_args() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "rig-collector failed");
            eprintln!("rig-collector: {e}");
            ExitCode::FAILURE
        }
    }
}
