//! Local state classification and the transition table.

use crate::config::OutputFormat;
use crate::constants::ARCHIVE_EXTENSION;
use crate::core_types::LocalState;
use git2::Repository;
use std::fs;
use std::io;
use std::path::Path;

/// Inspects what occupies `path`.
///
/// An empty directory and a zero-length archive are treated as [`LocalState::Absent`]:
/// both are the residue of an interrupted earlier run, not content worth
/// protecting. Symlinks are never followed.
pub fn classify(path: &Path) -> io::Result<LocalState> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(LocalState::Absent),
        Err(e) => return Err(e),
    };

    if metadata.is_dir() {
        if fs::read_dir(path)?.next().is_none() {
            return Ok(LocalState::Absent);
        }
        return Ok(match Repository::open(path) {
            Ok(repo) if !repo.is_bare() => LocalState::ExistingWorkingCopy,
            _ => LocalState::ExistingButForeign,
        });
    }

    let is_archive = metadata.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
    if is_archive {
        if metadata.len() == 0 {
            return Ok(LocalState::Absent);
        }
        return Ok(LocalState::ExistingArchive);
    }
    Ok(LocalState::ExistingButForeign)
}

/// What the engine does for a (state, format) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Clone,
    Pull,
    Archive,
    Skip,
    Conflict,
}

/// The transition table.
///
/// | state \ format       | clone    | zip      |
/// |----------------------|----------|----------|
/// | `Absent`             | Clone    | Archive  |
/// | `ExistingWorkingCopy`| Pull     | Conflict |
/// | `ExistingArchive`    | Conflict | Skip     |
/// | `ExistingButForeign` | Conflict | Conflict |
pub fn plan(state: LocalState, format: OutputFormat) -> Transition {
    match (state, format) {
        (LocalState::Absent, OutputFormat::Clone) => Transition::Clone,
        (LocalState::Absent, OutputFormat::Zip) => Transition::Archive,
        (LocalState::ExistingWorkingCopy, OutputFormat::Clone) => Transition::Pull,
        (LocalState::ExistingArchive, OutputFormat::Zip) => Transition::Skip,
        _ => Transition::Conflict,
    }
}
