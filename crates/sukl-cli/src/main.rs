//! SUKL search CLI
//!
//! Searches the Czech drug registry indexes and prints JSON to stdout.
//!
//! # Usage
//!
//! ```bash
//! sukl-search drugs search paralen --atc N02BE --max-results 5
//! sukl-search drugs get 0012345
//! sukl-search pharmacies search --city Brno --emergency true
//! sukl-search documents search "dávkování u dětí"
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/sukl-search/config.toml)
//! 3. Environment variables (SUKL_*, nested keys with `__`)
//! 4. CLI flags

use std::process::ExitCode;

use clap::Parser;

use sukl_cli::{exit_code, run, user_message, Cli, Output, EXIT_NOT_FOUND};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(Output::Payload(payload)) => match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
        Ok(Output::NotFound { code }) => {
            eprintln!("Not found: {}", code);
            ExitCode::from(EXIT_NOT_FOUND)
        }
        Err(err) => {
            eprintln!("Error: {}", user_message(&err));
            ExitCode::from(exit_code(&err))
        }
    }
}
