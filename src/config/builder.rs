// src/config/builder.rs

use super::{validation, Config, ConfigFile, Credentials, Mode, OutputFormat};
use crate::cli::Cli;
use crate::constants::{DEFAULT_API_BASE_URL, DEFAULT_JOBS, DEFAULT_OUTPUT_DIR};
use crate::errors::ConfigError;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// A builder for creating a [`Config`] programmatically or from the CLI.
///
/// Unset options fall back to the defaults of the original config file:
/// mode `projects`, output directory `downloads`, format `clone`.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::config::{ConfigBuilder, Mode, OutputFormat};
///
/// let config = ConfigBuilder::new()
///     .workspace("acme")
///     .username("alice")
///     .api_token("token")
///     .mode(Mode::Projects)
///     .project_keys(["PRAC"])
///     .output_format(OutputFormat::Zip)
///     .build()
///     .unwrap();
///
/// assert!(config.project_keys.contains("PRAC"));
/// assert_eq!(config.output_dir.to_str(), Some("downloads"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct ConfigBuilder {
    workspace: Option<String>,
    username: Option<String>,
    api_token: Option<String>,
    mode: Option<Mode>,
    project_keys: Option<Vec<String>>,
    output_dir: Option<PathBuf>,
    output_format: Option<OutputFormat>,
    jobs: Option<usize>,
    api_base_url: Option<String>,
    verbose: Option<bool>,
}

impl ConfigBuilder {
    /// Creates a new `ConfigBuilder` with no options set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the config file named by the CLI and applies the CLI overrides on top.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file = ConfigFile::load(Path::new(&cli.config))?;
        let mut builder = Self::new().apply_file(file)?;

        if let Some(mode) = cli.mode {
            builder = builder.mode(mode);
        }
        if let Some(format) = cli.format {
            builder = builder.output_format(format);
        }
        if let Some(dir) = cli.output_dir {
            builder = builder.output_dir(dir);
        }
        if let Some(jobs) = cli.jobs {
            builder = builder.jobs(jobs);
        }
        if let Some(token) = cli.api_token {
            builder = builder.api_token(token);
        }
        Ok(builder.verbose(cli.debug))
    }

    /// Copies every value present in `file` into the builder.
    pub fn apply_file(mut self, file: ConfigFile) -> Result<Self, ConfigError> {
        if let Some(v) = file.workspace {
            self.workspace = Some(v);
        }
        if let Some(v) = file.username {
            self.username = Some(v);
        }
        if let Some(v) = file.api_token {
            self.api_token = Some(v);
        }
        if let Some(v) = file.mode {
            self.mode = Some(v.parse()?);
        }
        if !file.project_keys.is_empty() {
            self.project_keys = Some(file.project_keys);
        }
        if let Some(v) = file.output_dir {
            self.output_dir = Some(PathBuf::from(v.trim()));
        }
        if let Some(v) = file.output_format {
            self.output_format = Some(v.parse()?);
        }
        if let Some(v) = file.jobs {
            self.jobs = Some(v);
        }
        if let Some(v) = file.api_base_url {
            self.api_base_url = Some(v);
        }
        Ok(self)
    }

    pub fn workspace(mut self, workspace: impl Into<String>) -> Self {
        self.workspace = Some(workspace.into());
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn api_token(mut self, api_token: impl Into<String>) -> Self {
        self.api_token = Some(api_token.into());
        self
    }

    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn project_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.project_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = Some(verbose);
        self
    }

    /// Validates the options and builds the final [`Config`].
    ///
    /// # Errors
    /// Returns a `ConfigError` for missing credentials, example placeholders,
    /// a `projects` mode without keys, or out-of-range values.
    pub fn build(self) -> Result<Config, ConfigError> {
        let workspace = trimmed(self.workspace);
        let username = trimmed(self.username);
        let api_token = trimmed(self.api_token);

        validation::check_required(&workspace, &username, &api_token)?;
        validation::check_placeholders(&workspace, &username, &api_token)?;

        let mode = self.mode.unwrap_or(Mode::Projects);
        let mut project_keys: BTreeSet<String> = self
            .project_keys
            .unwrap_or_default()
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        if mode == Mode::All && !project_keys.is_empty() {
            log::debug!(
                "Mode is 'all'; ignoring configured project keys: {:?}",
                project_keys
            );
            project_keys.clear();
        }
        validation::check_project_keys(mode, &project_keys)?;

        let jobs = self.jobs.unwrap_or(DEFAULT_JOBS);
        validation::check_jobs(jobs)?;

        let api_base_url = self
            .api_base_url
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        validation::check_api_base_url(&api_base_url)?;

        let output_dir = self
            .output_dir
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));

        Ok(Config {
            workspace,
            credentials: Credentials {
                username,
                api_token,
            },
            mode,
            project_keys,
            output_dir,
            output_format: self.output_format.unwrap_or(OutputFormat::Clone),
            jobs,
            api_base_url,
            verbose: self.verbose.unwrap_or(false),
        })
    }
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}
