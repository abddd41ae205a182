// src/cli.rs

use crate::config::{Mode, OutputFormat};
use clap::Parser;

/// Batch-clone or archive every repository in a Bitbucket workspace.
///
/// Repositories are either kept as git working copies (cloned on the first
/// run, pulled on later runs) or snapshotted into `.zip` archives that are
/// skipped once they exist. Settings come from a JSON config file; the flags
/// below override it.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Modes:
  all       Download every repository in the workspace
  projects  Download only repos in the project keys listed in the config file

Output formats:
  clone     Keep a full git clone on disk (supports incremental pull)
  zip       Clone to a temp directory, archive to .zip, then delete the clone")]
pub struct Cli {
    /// Path to the JSON config file.
    #[arg(long, value_name = "FILE", default_value = crate::constants::DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Override the mode set in the config file.
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Override the output format set in the config file.
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Override the output directory set in the config file.
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<String>,

    /// Number of repositories processed concurrently.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// API token; takes precedence over the config file.
    #[arg(long, env = "BITBUCKET_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub api_token: Option<String>,

    /// Enable verbose debug logging.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub debug: bool,
}
