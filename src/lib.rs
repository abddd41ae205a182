//! `bitbucket_sync` is a library and command-line tool for mirroring every
//! repository of a Bitbucket Cloud workspace onto local disk.
//!
//! Each repository is converged to one of two local forms:
//! -   **clone**: a git working copy, cloned on the first run and fast-forwarded
//!     on every later run.
//! -   **zip**: a `.zip` snapshot of a fresh shallow clone, created once and
//!     skipped on later runs.
//!
//! A run is a short pipeline:
//! 1.  **Verify**: one authenticated probe. Bad credentials abort the run before
//!     anything on disk is touched.
//! 2.  **List**: page through the workspace lazily, filtered by project and
//!     deduplicated by slug.
//! 3.  **Converge**: classify what is at each destination and clone, pull,
//!     archive, skip, or refuse, on a bounded worker pool.
//! 4.  **Summarize**: tally the per-repository outcomes.
//!
//! Per-repository failures never stop the run; they are counted and reported.
//! The remote API, git transport, compressor and attribute fixer are traits, so
//! the pipeline can be driven without network access.
//!
//! # Example: Library Usage
//!
//! ```no_run
//! use bitbucket_sync::{run, ConfigBuilder, Mode, OutputFormat};
//!
//! let config = ConfigBuilder::new()
//!     .workspace("acme")
//!     .username("alice")
//!     .api_token("token")
//!     .mode(Mode::Projects)
//!     .project_keys(["PRAC"])
//!     .output_format(OutputFormat::Zip)
//!     .output_dir("backups")
//!     .build()
//!     .unwrap();
//!
//! let summary = run(&config).unwrap();
//! println!("{} created, {} failed", summary.created, summary.failed);
//! ```

pub mod archive;
pub mod auth;
pub mod cancellation;
pub mod cli;
pub mod config;
pub mod constants;
pub mod core_types;
pub mod engine;
pub mod errors;
pub mod fs_attrs;
pub mod git;
pub mod inventory;
pub mod paths;
pub mod prelude;
pub mod progress;
pub mod remote;
pub mod report;
pub mod signal;
pub mod summary;

// Re-export key public types for easier use as a library
pub use cancellation::CancellationToken;
pub use config::{Config, ConfigBuilder, Credentials, Mode, OutputFormat};
pub use core_types::{Action, LocalState, OutcomeRecord, RepositoryDescriptor};
pub use summary::RunSummary;

use crate::archive::{Compressor, ZipCompressor};
use crate::constants::ARCHIVE_CLONE_DEPTH;
use crate::engine::Engine;
use crate::errors::{io_error_with_path, Error, Result};
use crate::fs_attrs::{AttributeFixer, PlatformAttributeFixer};
use crate::git::{Git2Transport, VcsTransport};
use crate::progress::{NoOpProgress, ProgressReporter};
use crate::remote::{BitbucketClient, RemoteListing};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

/// The external services a run depends on.
///
/// [`Collaborators::for_config`] wires the production implementations; tests
/// substitute in-memory fakes.
#[derive(Clone)]
pub struct Collaborators {
    pub listing: Arc<dyn RemoteListing>,
    pub vcs: Arc<dyn VcsTransport>,
    pub compressor: Arc<dyn Compressor>,
    pub fixer: Arc<dyn AttributeFixer>,
    /// Parent of archive scratch directories; the system temp dir if `None`.
    pub scratch_root: Option<PathBuf>,
}

impl Collaborators {
    /// Bitbucket Cloud over reqwest, git over libgit2, zip archives.
    ///
    /// Archive runs clone shallowly since the history is discarded anyway.
    ///
    /// # Errors
    /// Returns `Error::Client` if the HTTP client cannot be built.
    pub fn for_config(config: &Config) -> Result<Self> {
        let vcs: Arc<dyn VcsTransport> = match config.output_format {
            OutputFormat::Zip => Arc::new(Git2Transport::shallow(ARCHIVE_CLONE_DEPTH)),
            OutputFormat::Clone => Arc::new(Git2Transport::new()),
        };
        Ok(Self {
            listing: Arc::new(BitbucketClient::new(config)?),
            vcs,
            compressor: Arc::new(ZipCompressor),
            fixer: Arc::new(PlatformAttributeFixer),
            scratch_root: None,
        })
    }
}

/// Runs the whole pipeline with explicit collaborators.
///
/// # Errors
/// -   `Error::Auth` if the credential check fails. Nothing has been written.
/// -   `Error::Listing` if a page fetch fails part-way. Repositories dispatched
///     before the failure were converged and are tallied in the error.
/// -   `Error::Interrupted` if `token` was cancelled. In-flight repositories
///     were finished and are tallied in the error.
/// -   `Error::Io` if the output directory cannot be created.
pub fn execute(
    config: &Config,
    collaborators: &Collaborators,
    token: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    auth::verify(config, collaborators.listing.as_ref())?;

    fs::create_dir_all(&config.output_dir)
        .map_err(|e| io_error_with_path(e, &config.output_dir))?;

    log::info!("Fetching repositories in workspace '{}'...", config.workspace);
    let engine = Engine::new(
        config,
        collaborators.vcs.as_ref(),
        collaborators.compressor.as_ref(),
        collaborators.fixer.as_ref(),
        collaborators.scratch_root.as_deref(),
    );
    let inventory = inventory::list(config, collaborators.listing.as_ref());
    let run = engine.converge_all(inventory, token, progress)?;

    let summary = summarize_run(&run.records);
    progress.finish_with_message(format!("{} repositories processed", summary.total()));

    if let Some(source) = run.listing_error {
        return Err(Error::Listing {
            source,
            partial: Box::new(summary),
        });
    }
    if run.interrupted {
        return Err(Error::Interrupted {
            partial: Box::new(summary),
        });
    }
    Ok(summary)
}

/// Runs the pipeline with the production collaborators, no progress bar and
/// no cancellation. Usable without a terminal.
///
/// # Errors
/// See [`execute`].
pub fn run(config: &Config) -> Result<RunSummary> {
    let collaborators = Collaborators::for_config(config)?;
    execute(config, &collaborators, &CancellationToken::new(), &NoOpProgress)
}

fn summarize_run(records: &[OutcomeRecord]) -> RunSummary {
    let summary = summary::summarize(records);
    log::debug!(
        "Converged {} repositories ({} failed)",
        summary.total(),
        summary.failed
    );
    summary
}
