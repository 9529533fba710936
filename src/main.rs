//! Binary entrypoint for the `orgscope` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Environment configuration (API URL/token, cache dir) may live in .env.
    dotenvy::dotenv().ok();
    match orgscope::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
