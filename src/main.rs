// src/main.rs

//! # did-toolkit
//!
//! Command-line tool for inspecting and updating `did:plc` / `did:web`
//! identities through the account's identity provider.
//!
//! ## Architecture Overview
//! 1. **Wallet Layer**: secp256k1 key generation and encodings
//! 2. **Provider Layer**: `PdsClient` for the account's XRPC endpoints
//! 3. **Directory Layer**: `DirectoryClient` for documents and audit logs
//! 4. **Services Layer**: the update workflow, lookups and command handlers
//!
//! ## Environment Variables
//! - `DIDTOOL_PDS_URL`: (Optional) identity provider (default: https://bsky.social)
//! - `DIDTOOL_PLC_URL`: (Optional) directory (default: https://plc.directory)
//! - `DIDTOOL_PASSWORD`: (Optional) account password, prompted for when unset
//! - `RUST_LOG`: (Optional) log filter (default: `did_toolkit=info`)

use crate::cli::Cli;
use crate::config::Settings;
use crate::utils::prompt::StdinPrompter;
use clap::Parser;
use dotenv::dotenv;
use env_logger::Env;
use std::process::ExitCode;

mod cli;
mod config;
mod directory;     // did:plc directory and did:web hosts
mod errors;
mod models;        // Data structures
mod pds;           // Identity provider client
mod services;      // Workflow, lookups and command handlers
mod utils;         // Helper functions
mod wallet;        // Cryptographic key operations

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load `.env` and set up logging
/// 2. Parse the command line
/// 3. Load settings
/// 4. Run the command
///
/// Exits with status 1 after printing `error: <message>` to stderr on failure.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("did_toolkit=info")).init();

    let cli = Cli::parse();
    let result = match Settings::load() {
        Ok(settings) => {
            log::debug!("loaded {settings:?}");
            let mut stdout = std::io::stdout().lock();
            services::commands::run(cli.command, settings, &mut StdinPrompter, &mut stdout).await
        }
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
