// crates/switchboard-cli/src/main.rs
// ============================================================================
// Module: Switchboard CLI Entry Point
// Description: Command dispatcher for the Switchboard proxy.
// Purpose: Run the proxy server and check configuration from the shell.
// Dependencies: clap, switchboard-config, switchboard-mcp, tokio
// ============================================================================

//! ## Overview
//! The `switchboard` binary serves the aggregation proxy from a TOML
//! configuration file and offers an offline configuration check. Both
//! commands resolve the configuration path the same way: explicit flag,
//! then the `SWITCHBOARD_CONFIG` environment variable, then
//! `switchboard.toml` in the working directory.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use clap::Subcommand;
use switchboard_config::SwitchboardConfig;
use switchboard_mcp::ProxyServer;

// ============================================================================
// SECTION: CLI Definition
// ============================================================================

/// Capability-scoped tool aggregation proxy.
#[derive(Debug, Parser)]
#[command(name = "switchboard", version, about)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the proxy.
    Serve {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Configuration commands.
    Config {
        /// Configuration subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Configuration subcommands.
#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Load and validate the configuration without serving.
    Check {
        /// Path to the configuration file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            config,
        } => serve(config.as_deref()).await,
        Command::Config {
            command: ConfigCommand::Check {
                config,
            },
        } => check(config.as_deref()),
    }
}

/// Loads configuration and serves the proxy until it fails.
async fn serve(path: Option<&std::path::Path>) -> ExitCode {
    let config = match SwitchboardConfig::load(path) {
        Ok(config) => config,
        Err(err) => return fail(&format!("configuration error: {err}")),
    };
    let server = match ProxyServer::from_config(&config) {
        Ok(server) => server,
        Err(err) => return fail(&format!("startup error: {err}")),
    };
    let bound = match server.bind().await {
        Ok(bound) => bound,
        Err(err) => return fail(&format!("bind error: {err}")),
    };
    report(&format!("switchboard listening on {}", bound.local_addr()));
    match bound.serve().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&format!("server error: {err}")),
    }
}

/// Loads and validates configuration, reporting what would be served.
fn check(path: Option<&std::path::Path>) -> ExitCode {
    match SwitchboardConfig::load(path) {
        Ok(config) => {
            report(&format!(
                "configuration ok: {} upstream(s), {} caller(s), bind {}",
                config.upstreams.len(),
                config.callers.len(),
                config.server.bind,
            ));
            ExitCode::SUCCESS
        }
        Err(err) => fail(&format!("configuration error: {err}")),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Prints a status line for the operator.
#[allow(clippy::print_stdout, reason = "Operator-facing CLI output.")]
fn report(message: &str) {
    println!("{message}");
}

/// Prints an error line and returns the failure exit code.
#[allow(clippy::print_stderr, reason = "Operator-facing CLI diagnostics.")]
fn fail(message: &str) -> ExitCode {
    eprintln!("switchboard: {message}");
    ExitCode::FAILURE
}
