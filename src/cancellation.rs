//! Cooperative stop signal for a sync run.
//!
//! Cancellation is checked at two points only: before a repository is
//! dispatched to the pool and when a worker picks it up. Work that has
//! started always runs to completion, so no destination is left half-written.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag raised by the Ctrl+C handler (or by a library caller).
///
/// All clones observe the same flag.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::CancellationToken;
///
/// let token = CancellationToken::default();
/// let handler_side = token.clone();
///
/// let mut dispatched = Vec::new();
/// for slug in ["alpha", "beta", "gamma"] {
///     if token.is_cancelled() {
///         break;
///     }
///     dispatched.push(slug);
///     if slug == "beta" {
///         handler_side.cancel();
///     }
/// }
/// assert_eq!(dispatched, ["alpha", "beta"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the flag. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
