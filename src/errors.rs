//! Defines application-specific error types.
//!
//! Errors are split by blast radius. [`Error`] is returned from a run and is
//! fatal to it; [`RepoError`] belongs to a single repository and is recorded
//! in that repository's outcome while the run carries on.

use crate::core_types::LocalState;
use crate::summary::RunSummary;
use std::fmt;
use thiserror::Error;

/// A specialized `Result` type for run-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Run-level errors. Any of these ends the run.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration could not be loaded or failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The credential check failed before any local state was touched.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Pagination failed part-way. `partial` tallies the repositories that
    /// were already converged before the listing broke.
    #[error("{source}")]
    Listing {
        source: ListingError,
        partial: Box<RunSummary>,
    },

    /// The run was cancelled (e.g. Ctrl+C). In-flight repositories were
    /// allowed to finish and are reported in `partial`.
    #[error("Operation cancelled by user (Ctrl+C)")]
    Interrupted { partial: Box<RunSummary> },

    /// Error occurring during file or directory access outside a single repository.
    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        /// The path that caused the I/O error.
        path: String,
        /// The underlying `std::io::Error`.
        #[source]
        source: std::io::Error,
    },

    /// The worker pool could not be created.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    /// The HTTP client for the remote API could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl Error {
    /// The partial summary carried by listing failures and interruptions.
    pub fn partial_summary(&self) -> Option<&RunSummary> {
        match self {
            Error::Listing { partial, .. } | Error::Interrupted { partial } => Some(partial),
            _ => None,
        }
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file '{path}' not found. Copy config.example.json to {path} and fill in your details.")]
    NotFound { path: String },

    #[error("Could not read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in '{path}': {source}")]
    InvalidJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Missing required config fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Config field '{field}' still holds its example placeholder. Update it with your actual credentials.")]
    Placeholder { field: String },

    #[error("Mode is 'projects' but no project_keys are configured")]
    NoProjectKeys,

    #[error("Invalid value for {option}: {reason}")]
    InvalidValue { option: String, reason: String },
}

/// Why the credential check failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication failed: the API token was rejected")]
    Unauthorized,

    #[error("Access denied: the token lacks required scopes (need repository:read)")]
    Forbidden,

    #[error("Workspace '{0}' not found or not accessible")]
    WorkspaceNotFound(String),

    #[error("Could not reach the remote API: {0}")]
    NetworkUnreachable(String),

    #[error("Unexpected status {status} from the remote API: {body}")]
    UnexpectedStatus { status: u16, body: String },
}

/// Failures reported by a [`crate::remote::RemoteListing`] transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("unauthorized (401)")]
    Unauthorized,

    #[error("forbidden (403)")]
    Forbidden,

    #[error("not found (404)")]
    NotFound,

    #[error("HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed listing response: {0}")]
    Decode(String),
}

/// A page fetch failed; the inventory cannot be trusted to be complete.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Repository listing aborted after {pages_fetched} page(s): {source}")]
pub struct ListingError {
    /// Pages successfully fetched before the failure.
    pub pages_fetched: usize,
    #[source]
    pub source: RemoteError,
}

/// Which version-control operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    Clone,
    Pull,
}

impl fmt::Display for TransportOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportOp::Clone => f.write_str("git clone"),
            TransportOp::Pull => f.write_str("git pull"),
        }
    }
}

/// Failures reported by a [`crate::git::VcsTransport`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("local branch '{branch}' has diverged from origin and cannot be fast-forwarded")]
    Diverged { branch: String },

    #[error("{0}")]
    Other(String),
}

/// Per-repository errors. These are recorded as `failed` outcomes.
#[derive(Error, Debug)]
pub enum RepoError {
    #[error("{op} failed: {source}")]
    Transport {
        op: TransportOp,
        #[source]
        source: TransportFailure,
    },

    #[error("Path conflict at '{path}': found {found}, refusing to overwrite")]
    PathConflict { path: String, found: LocalState },

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("Repository slug '{0}' is not a safe path component")]
    UnsafeSlug(String),

    #[error("I/O error accessing path '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the archive pipeline, by stage.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("Could not create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),

    #[error("Clone into scratch directory failed: {0}")]
    Clone(#[source] TransportFailure),

    #[error("Compression failed: {0}")]
    Compress(#[source] std::io::Error),

    #[error("Could not remove scratch directory '{path}': {source}")]
    Cleanup {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Helper function to create an `Error::Io` with path context.
pub fn io_error_with_path<P: AsRef<std::path::Path>>(source: std::io::Error, path: P) -> Error {
    Error::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}

/// Helper function to create a `RepoError::Io` with path context.
pub fn repo_io_error<P: AsRef<std::path::Path>>(source: std::io::Error, path: P) -> RepoError {
    RepoError::Io {
        path: path.as_ref().display().to_string(),
        source,
    }
}
