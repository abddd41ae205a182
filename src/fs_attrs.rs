//! Clearing read-only attributes so git object stores can be deleted.
//!
//! Git marks pack and object files read-only. On Windows that alone makes
//! `remove_dir_all` fail, so scratch clones are made writable before removal.

use std::fs;
use std::io;
use std::path::Path;
use walkdir::WalkDir;

/// Makes every entry beneath a path writable by its owner.
pub trait AttributeFixer: Send + Sync {
    fn make_writable_recursive(&self, root: &Path) -> io::Result<()>;
}

/// Clears the read-only flag with the host platform's permission model.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlatformAttributeFixer;

impl AttributeFixer for PlatformAttributeFixer {
    fn make_writable_recursive(&self, root: &Path) -> io::Result<()> {
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(io::Error::from)?;
            if entry.path_is_symlink() {
                continue;
            }
            let metadata = entry.metadata().map_err(io::Error::from)?;
            let mut permissions = metadata.permissions();
            if make_writable(&mut permissions) {
                fs::set_permissions(entry.path(), permissions)?;
            }
        }
        Ok(())
    }
}

/// Returns whether `permissions` changed.
#[cfg(unix)]
fn make_writable(permissions: &mut fs::Permissions) -> bool {
    use std::os::unix::fs::PermissionsExt;
    let mode = permissions.mode();
    if mode & 0o200 != 0 {
        return false;
    }
    permissions.set_mode(mode | 0o200);
    true
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_writable(permissions: &mut fs::Permissions) -> bool {
    if !permissions.readonly() {
        return false;
    }
    permissions.set_readonly(false);
    true
}

/// Removes a directory tree, retrying once after a second attribute pass.
///
/// A failure of the attribute pass is not fatal on its own; only the outcome
/// of the final removal attempt is returned. A path that does not exist
/// counts as removed.
pub fn remove_dir_with_retry(path: &Path, fixer: &dyn AttributeFixer) -> io::Result<()> {
    let mut last_err = None;
    for attempt in 1..=2 {
        if let Err(e) = fixer.make_writable_recursive(path) {
            log::debug!(
                "Could not clear read-only flags under '{}' (attempt {}): {}",
                path.display(),
                attempt,
                e
            );
        }
        match fs::remove_dir_all(path) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => {
                log::debug!(
                    "Removing '{}' failed (attempt {}): {}",
                    path.display(),
                    attempt,
                    e
                );
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("directory removal failed")))
}
