//! The Archiver: snapshot a repository into a single `.zip` file.
//!
//! Each archive is built from a fresh clone in a private scratch directory.
//! The scratch directory is held by a [`ScratchDir`] guard, so every exit
//! path (clone failure, compression failure, success, or a panic) reaches
//! the same removal code.

mod compress;

pub use compress::{Compressor, ZipCompressor};

use crate::config::Credentials;
use crate::constants::SCRATCH_PREFIX;
use crate::core_types::RepositoryDescriptor;
use crate::errors::ArchiveError;
use crate::fs_attrs::{remove_dir_with_retry, AttributeFixer};
use crate::git::VcsTransport;
use std::io;
use std::path::{Path, PathBuf};

/// A uniquely named temporary directory that is removed when released or dropped.
///
/// Names are `bitbucket-sync-<slug>-<random>`, so concurrent archives of
/// different repositories, or of the same repository from two processes,
/// never share a directory.
pub struct ScratchDir<'a> {
    path: PathBuf,
    fixer: &'a dyn AttributeFixer,
    released: bool,
}

impl<'a> ScratchDir<'a> {
    /// Creates the directory under `root`, or the system temp dir if `None`.
    pub fn create(
        slug: &str,
        root: Option<&Path>,
        fixer: &'a dyn AttributeFixer,
    ) -> io::Result<Self> {
        let prefix = format!("{}{}-", SCRATCH_PREFIX, slug);
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix);
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };
        let path = dir.keep();
        log::debug!("Created scratch directory '{}'", path.display());
        Ok(Self {
            path,
            fixer,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the directory, reporting a failure after the retry.
    pub fn release(mut self) -> Result<(), ArchiveError> {
        self.released = true;
        remove_dir_with_retry(&self.path, self.fixer).map_err(|source| ArchiveError::Cleanup {
            path: self.path.display().to_string(),
            source,
        })
    }
}

impl Drop for ScratchDir<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = remove_dir_with_retry(&self.path, self.fixer) {
            log::warn!(
                "Could not remove scratch directory '{}': {}",
                self.path.display(),
                e
            );
        }
    }
}

/// Clones into a scratch directory, compresses, and cleans up.
pub struct Archiver<'a> {
    vcs: &'a dyn VcsTransport,
    compressor: &'a dyn Compressor,
    fixer: &'a dyn AttributeFixer,
    scratch_root: Option<&'a Path>,
}

impl<'a> Archiver<'a> {
    pub fn new(
        vcs: &'a dyn VcsTransport,
        compressor: &'a dyn Compressor,
        fixer: &'a dyn AttributeFixer,
    ) -> Self {
        Self {
            vcs,
            compressor,
            fixer,
            scratch_root: None,
        }
    }

    /// Places scratch directories under `root` instead of the system temp dir.
    pub fn with_scratch_root(mut self, root: Option<&'a Path>) -> Self {
        self.scratch_root = root;
        self
    }

    /// Writes a snapshot of `descriptor` to `dest`.
    ///
    /// Returns `Ok(Some(ArchiveError::Cleanup))` when the archive was written
    /// but the scratch directory survived both removal attempts; the archive
    /// still counts as created.
    ///
    /// # Errors
    /// `Scratch`, `Clone` or `Compress` when no archive was produced. `dest`
    /// does not exist in that case.
    pub fn archive(
        &self,
        descriptor: &RepositoryDescriptor,
        credentials: &Credentials,
        dest: &Path,
    ) -> Result<Option<ArchiveError>, ArchiveError> {
        let scratch = ScratchDir::create(&descriptor.slug, self.scratch_root, self.fixer)
            .map_err(ArchiveError::Scratch)?;
        let checkout = scratch.path().join(&descriptor.slug);

        let produced = self
            .vcs
            .clone_into(&descriptor.clone_url, credentials, &checkout)
            .map_err(ArchiveError::Clone)
            .and_then(|()| {
                log::info!("[ZIP] Archiving: {}", descriptor.slug);
                self.compressor
                    .compress(&checkout, dest)
                    .map_err(ArchiveError::Compress)
            });

        match (produced, scratch.release()) {
            (Ok(()), Ok(())) => Ok(None),
            (Ok(()), Err(cleanup)) => Ok(Some(cleanup)),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(cleanup)) => {
                log::warn!("{}", cleanup);
                Err(e)
            }
        }
    }
}
