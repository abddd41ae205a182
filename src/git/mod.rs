// src/git/mod.rs
//! The Version Control Transport: clone and pull over HTTPS using `git2`.
//!
//! The engine and archiver depend only on [`VcsTransport`]. Credentials are
//! passed per call and handed to libgit2 through a credential callback, so
//! the token never appears in a URL, a remote config or a log line.

mod ops;
mod url;

pub use self::ops::Git2Transport;
pub use self::url::strip_userinfo;

use crate::config::Credentials;
use crate::errors::TransportFailure;
use std::path::Path;

/// Clone and update operations on git working copies.
pub trait VcsTransport: Send + Sync {
    /// Clones `url` into `dest`, which must not exist or be an empty directory.
    fn clone_into(
        &self,
        url: &str,
        credentials: &Credentials,
        dest: &Path,
    ) -> Result<(), TransportFailure>;

    /// Fast-forwards the working copy at `path` to its upstream branch.
    ///
    /// Local commits that are not on the upstream yield
    /// [`TransportFailure::Diverged`]; nothing is merged or reset.
    fn pull(&self, path: &Path, credentials: &Credentials) -> Result<(), TransportFailure>;
}
