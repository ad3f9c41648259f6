use std::process::ExitCode;

fn main() -> ExitCode {
    match rig_bench::runtime::run_from_args() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gearbox-rig failed");
            eprintln!("gearbox-rig: {}", e);
            ExitCode::FAILURE
        }
    }
}
