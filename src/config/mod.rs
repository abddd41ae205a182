//! Defines the core `Config` struct and related types for run configuration.
//!
//! This module consolidates the settings loaded from the JSON config file and
//! the CLI, validated once by [`ConfigBuilder::build`]. The resulting
//! [`Config`] is immutable and threaded by reference through every component.

use crate::errors::ConfigError;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

pub use builder::ConfigBuilder;
pub use file::ConfigFile;
mod builder;
mod file;
mod validation;

/// Which repositories of the workspace are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Mode {
    /// Every repository, laid out flat under the output directory.
    All,
    /// Only repositories of the configured project keys, grouped by project.
    Projects,
}

/// How each repository is materialized locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum OutputFormat {
    /// A git working copy kept current by pulling.
    Clone,
    /// A `.zip` snapshot of a fresh shallow clone, without `.git`.
    Zip,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::All => f.write_str("all"),
            Mode::Projects => f.write_str("projects"),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Clone => f.write_str("clone"),
            OutputFormat::Zip => f.write_str("zip"),
        }
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(Mode::All),
            "projects" => Ok(Mode::Projects),
            other => Err(ConfigError::InvalidValue {
                option: "mode".to_string(),
                reason: format!("expected 'all' or 'projects', got '{}'", other),
            }),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clone" => Ok(OutputFormat::Clone),
            "zip" => Ok(OutputFormat::Zip),
            other => Err(ConfigError::InvalidValue {
                option: "output_format".to_string(),
                reason: format!("expected 'clone' or 'zip', got '{}'", other),
            }),
        }
    }
}

/// Username and API token. The token is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Bitbucket username, used for git HTTPS authentication.
    pub username: String,
    /// Repository or workspace access token.
    pub api_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_token", &"<redacted>")
            .finish()
    }
}

/// Resolved, validated settings for one run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Workspace slug, e.g. `my-company`.
    pub workspace: String,
    pub credentials: Credentials,
    pub mode: Mode,
    /// Project keys to select. Non-empty iff `mode` is [`Mode::Projects`].
    pub project_keys: BTreeSet<String>,
    /// Root of the local layout.
    pub output_dir: PathBuf,
    pub output_format: OutputFormat,
    /// Worker pool size.
    pub jobs: usize,
    /// Base URL of the REST API, without a trailing slash.
    pub api_base_url: String,
    /// Whether verbose logging was requested.
    pub verbose: bool,
}

impl Config {
    /// Creates a valid `Config` for testing purposes.
    ///
    /// This function is hidden from public documentation and is intended for
    /// use in tests and doc tests only.
    #[doc(hidden)]
    pub fn new_for_test(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            workspace: "acme".to_string(),
            credentials: Credentials {
                username: "tester".to_string(),
                api_token: "secret-token".to_string(),
            },
            mode: Mode::All,
            project_keys: BTreeSet::new(),
            output_dir: output_dir.into(),
            output_format: OutputFormat::Clone,
            jobs: 2,
            api_base_url: crate::constants::DEFAULT_API_BASE_URL.to_string(),
            verbose: false,
        }
    }

    /// Whether a repository in `project_key` is selected by this configuration.
    pub fn selects_project(&self, project_key: Option<&str>) -> bool {
        match self.mode {
            Mode::All => true,
            Mode::Projects => project_key.is_some_and(|k| self.project_keys.contains(k)),
        }
    }
}
