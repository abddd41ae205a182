//! Progress reporting for the convergence phase.
//!
//! The engine only sees [`ProgressReporter`]. The binary picks an
//! [`IndicatifProgress`] bar when stderr is a terminal and [`NoOpProgress`]
//! otherwise; library callers usually pass [`NoOpProgress`].
#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives progress events from the engine. Called from worker threads.
///
/// The inventory is paged lazily, so there is no total up front: the length
/// grows by one per dispatched repository and the position by one per
/// finished repository, including those skipped after cancellation.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::progress::ProgressReporter;
/// use std::sync::Mutex;
///
/// #[derive(Default)]
/// struct Tally(Mutex<(u64, u64, Vec<String>)>);
///
/// impl ProgressReporter for Tally {
///     fn inc_length(&self, delta: u64) {
///         self.0.lock().unwrap().0 += delta;
///     }
///     fn inc(&self, delta: u64) {
///         self.0.lock().unwrap().1 += delta;
///     }
///     fn set_message(&self, slug: String) {
///         self.0.lock().unwrap().2.push(slug);
///     }
///     fn finish_with_message(&self, _msg: String) {}
/// }
///
/// let tally = Tally::default();
/// tally.inc_length(1);
/// tally.set_message("alpha".into());
/// tally.inc(1);
/// let (len, pos, seen) = &*tally.0.lock().unwrap();
/// assert_eq!((*len, *pos), (1, 1));
/// assert_eq!(seen, &["alpha"]);
/// ```
pub trait ProgressReporter: Send + Sync {
    fn inc_length(&self, delta: u64);
    fn inc(&self, delta: u64);
    /// The slug a worker has just started on.
    fn set_message(&self, msg: String);
    /// Called once, after the last repository.
    fn finish_with_message(&self, msg: String);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    fn inc_length(&self, _delta: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish_with_message(&self, _msg: String) {}
}

/// A repositories-done bar on stderr.
#[cfg(feature = "progress")]
#[derive(Clone)]
pub struct IndicatifProgress {
    bar: ProgressBar,
}

#[cfg(feature = "progress")]
impl IndicatifProgress {
    /// Creates a progress bar drawn on stderr.
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {bar:30.green/white} {pos}/{len} repos  {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }

    /// Returns a bar only when stderr is an interactive terminal.
    pub fn for_terminal() -> Option<Self> {
        atty::is(atty::Stream::Stderr).then(Self::new)
    }
}

#[cfg(feature = "progress")]
impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "progress")]
impl ProgressReporter for IndicatifProgress {
    fn inc_length(&self, delta: u64) {
        self.bar.inc_length(delta);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish_with_message(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}
