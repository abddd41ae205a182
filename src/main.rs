// src/main.rs

use anyhow::Result;
use bitbucket_sync::cli::Cli;
use bitbucket_sync::config::ConfigBuilder;
use bitbucket_sync::constants::REPORT_RULE;
use bitbucket_sync::errors::Error;
#[cfg(feature = "progress")]
use bitbucket_sync::progress::IndicatifProgress;
use bitbucket_sync::progress::{NoOpProgress, ProgressReporter};
use bitbucket_sync::signal::setup_signal_handler;
use bitbucket_sync::{execute, report, Collaborators, RunSummary};
use clap::Parser;
use std::io;
use std::time::Instant;

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG, if set, replaces the default directive entirely.
    let default_directive = if cli.debug {
        "bitbucket_sync=debug"
    } else {
        "bitbucket_sync=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive)),
        )
        .init();

    println!("{}", REPORT_RULE);
    println!("Bitbucket Repository Sync v{}", env!("CARGO_PKG_VERSION"));
    println!("Started : {}", timestamp());
    println!("{}", REPORT_RULE);

    let config = match ConfigBuilder::from_cli(cli).and_then(ConfigBuilder::build) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(EXIT_FAILURE);
        }
    };
    log::debug!("Configuration built successfully: {:?}", config);
    report::write_header(&mut io::stdout(), &config)?;

    let token = setup_signal_handler()?;
    let collaborators = Collaborators::for_config(&config)?;
    let progress = progress_reporter();

    let started = Instant::now();
    let exit_code = match execute(&config, &collaborators, &token, progress.as_ref()) {
        Ok(summary) => {
            report::write_summary(&mut io::stdout(), &summary)?;
            exit_code_for(&summary)
        }
        Err(Error::Auth(e)) => {
            eprintln!("\nError: {}", e);
            eprintln!("Authentication failed. Cannot proceed.");
            eprintln!("\nTroubleshooting:");
            eprintln!(
                "  1. Double-check workspace, username, and api_token in {}",
                config_hint()
            );
            eprintln!("  2. Ensure the token has 'repository:read' scope");
            eprintln!("  3. Confirm the token has not expired or been revoked");
            eprintln!("  4. Run with --debug for detailed logs");
            EXIT_FAILURE
        }
        Err(e) => {
            if let Some(partial) = e.partial_summary() {
                report::write_summary(&mut io::stdout(), partial)?;
            }
            eprintln!("\nError: {}", e);
            match e {
                Error::Interrupted { .. } => EXIT_INTERRUPTED,
                _ => EXIT_FAILURE,
            }
        }
    };

    println!(
        "\nFinished : {} ({:.1?})",
        timestamp(),
        started.elapsed()
    );
    println!("{}", REPORT_RULE);
    std::process::exit(exit_code);
}

fn exit_code_for(summary: &RunSummary) -> i32 {
    if summary.has_failures() {
        EXIT_FAILURE
    } else {
        0
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn config_hint() -> &'static str {
    "your config file (or --api-token / BITBUCKET_API_TOKEN)"
}

/// A progress bar when stderr is a terminal, otherwise nothing.
fn progress_reporter() -> Box<dyn ProgressReporter> {
    #[cfg(feature = "progress")]
    if let Some(bar) = IndicatifProgress::for_terminal() {
        return Box::new(bar);
    }
    Box::new(NoOpProgress)
}
