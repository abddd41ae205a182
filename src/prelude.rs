//! The `bitbucket_sync` prelude for convenient library usage.
//!
//! Re-exports the types needed to configure and drive a run, plus the
//! collaborator traits for plugging in alternative transports.
//!
//! # Example
//!
//! ```
//! use bitbucket_sync::prelude::*;
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!
//! let config = ConfigBuilder::new()
//!     .workspace("acme")
//!     .username("alice")
//!     .api_token("token")
//!     .mode(Mode::All)
//!     .build()?;
//! let token = CancellationToken::new();
//! assert!(!token.is_cancelled());
//! assert_eq!(config.output_format, OutputFormat::Clone);
//!
//! # Ok(())
//! # }
//! ```

pub use crate::archive::{Compressor, ZipCompressor};
pub use crate::cancellation::CancellationToken;
pub use crate::config::{Config, ConfigBuilder, Credentials, Mode, OutputFormat};
pub use crate::core_types::{Action, ListingPage, LocalState, OutcomeRecord, RepositoryDescriptor};
pub use crate::errors::{Error, RepoError, Result};
pub use crate::fs_attrs::{AttributeFixer, PlatformAttributeFixer};
pub use crate::git::{Git2Transport, VcsTransport};
pub use crate::progress::{NoOpProgress, ProgressReporter};
pub use crate::remote::{BitbucketClient, RemoteListing};
pub use crate::summary::{summarize, RunSummary};
pub use crate::{execute, run, Collaborators};
