//! Defines core data structures used throughout the synchronization pipeline.
//!
//! A [`RepositoryDescriptor`] flows from the inventory into the engine, which
//! classifies local state as a [`LocalState`] and produces one
//! [`OutcomeRecord`] per descriptor.

use crate::errors::RepoError;
use std::fmt;
use std::path::PathBuf;

/// Identity of one remote repository.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::core_types::RepositoryDescriptor;
///
/// let repo = RepositoryDescriptor::new("alpha", "https://bitbucket.org/acme/alpha.git")
///     .with_project("PRAC");
/// assert_eq!(repo.slug, "alpha");
/// assert_eq!(repo.project_key.as_deref(), Some("PRAC"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryDescriptor {
    /// Unique short name within the workspace. Used for the local path and as
    /// the deduplication key.
    pub slug: String,
    /// HTTPS URL for version-control transport.
    pub clone_url: String,
    /// Project grouping, if the provider reports one.
    pub project_key: Option<String>,
}

impl RepositoryDescriptor {
    pub fn new(slug: impl Into<String>, clone_url: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            clone_url: clone_url.into(),
            project_key: None,
        }
    }

    pub fn with_project(mut self, key: impl Into<String>) -> Self {
        self.project_key = Some(key.into());
        self
    }
}

/// One page of the paginated remote inventory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub items: Vec<RepositoryDescriptor>,
    /// Opaque continuation marker; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// What currently occupies a repository's destination path.
///
/// Derived fresh for every repository on every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Absent,
    ExistingWorkingCopy,
    ExistingArchive,
    /// Something that is neither a working copy nor an archive.
    ExistingButForeign,
}

impl fmt::Display for LocalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LocalState::Absent => "nothing",
            LocalState::ExistingWorkingCopy => "a git working copy",
            LocalState::ExistingArchive => "an archive",
            LocalState::ExistingButForeign => "unrecognised content",
        };
        f.write_str(label)
    }
}

/// The result category of converging one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
    Skipped,
    Failed,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::Created => "created",
            Action::Updated => "updated",
            Action::Skipped => "skipped",
            Action::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Result of processing one descriptor. Immutable once produced.
#[derive(Debug)]
pub struct OutcomeRecord {
    pub slug: String,
    pub project_key: Option<String>,
    /// The resolved destination path.
    pub destination: PathBuf,
    pub action: Action,
    /// Present iff `action` is [`Action::Failed`].
    pub error: Option<RepoError>,
    /// Non-fatal detail, e.g. a scratch directory that could not be removed
    /// after a successful archive.
    pub warning: Option<String>,
}

impl OutcomeRecord {
    pub(crate) fn succeeded(
        descriptor: &RepositoryDescriptor,
        destination: PathBuf,
        action: Action,
        warning: Option<String>,
    ) -> Self {
        Self {
            slug: descriptor.slug.clone(),
            project_key: descriptor.project_key.clone(),
            destination,
            action,
            error: None,
            warning,
        }
    }

    pub(crate) fn failed(
        descriptor: &RepositoryDescriptor,
        destination: PathBuf,
        error: RepoError,
    ) -> Self {
        Self {
            slug: descriptor.slug.clone(),
            project_key: descriptor.project_key.clone(),
            destination,
            action: Action::Failed,
            error: Some(error),
            warning: None,
        }
    }

    /// The error detail as text, if this outcome failed.
    pub fn error_detail(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }
}
