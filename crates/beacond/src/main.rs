use std::process::ExitCode;

fn main() -> ExitCode {
    match beacond::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "beacond", error = %error, "daemon exited with an error");
            eprintln!("beacond: {error}");
            ExitCode::FAILURE
        }
    }
}
