mod app;

use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let _ = env_logger::builder().is_test(false).try_init();

    let config_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(app::DEFAULT_CONFIG));

    match app::run(&config_path) {
        Ok(app::Outcome::Clean) => ExitCode::SUCCESS,
        Ok(app::Outcome::Fatal) => ExitCode::FAILURE,
        Err(e) => {
            log::error!("startup failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}
