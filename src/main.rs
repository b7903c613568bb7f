//! taskmap - dependency-aware task lists from the command line

use std::process::ExitCode;

fn main() -> ExitCode {
    match taskmap::cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
