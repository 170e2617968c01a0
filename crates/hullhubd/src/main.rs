use std::process::ExitCode;

use hullhub_config::Config;

fn main() -> ExitCode {
    let config = Config::load();
    match hullhubd::run_daemon(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("hullhubd: {error}");
            ExitCode::FAILURE
        }
    }
}
