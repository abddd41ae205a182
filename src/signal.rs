// src/signal.rs

//! Provides signal handling for graceful shutdown.

use crate::cancellation::CancellationToken;
use anyhow::{Context, Result};

/// Sets up a handler for Ctrl+C (SIGINT, and SIGTERM on Unix).
///
/// The first signal cancels the returned token: no further repositories are
/// dispatched, and those already in flight run to completion so nothing is
/// left half-written. A second signal exits immediately with status 130.
///
/// # Errors
/// Returns an error if the signal handler cannot be set.
pub fn setup_signal_handler() -> Result<CancellationToken> {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    ctrlc::set_handler(move || {
        if handler_token.is_cancelled() {
            log::warn!("Second interrupt received, exiting immediately.");
            std::process::exit(130);
        }
        log::warn!("Interrupt received; finishing in-flight repositories before stopping.");
        handler_token.cancel();
    })
    .context("Failed to set Ctrl+C signal handler")?;

    Ok(token)
}
