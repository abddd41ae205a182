//! Maps repository descriptors to their local destination paths.
//!
//! Layout under the output directory:
//!
//! | mode       | clone                  | zip                        |
//! |------------|------------------------|----------------------------|
//! | `all`      | `{slug}/`              | `{slug}.zip`               |
//! | `projects` | `{projectKey}/{slug}/` | `{projectKey}/{slug}.zip`  |
//!
//! Resolution is pure; it performs no I/O.

use crate::config::{Config, Mode, OutputFormat};
use crate::constants::ARCHIVE_EXTENSION;
use crate::core_types::RepositoryDescriptor;
use std::path::PathBuf;

/// Resolves the destination path for `descriptor` under `config`.
///
/// In `projects` mode a descriptor always carries a project key, because the
/// inventory drops everything outside the filter set. A descriptor without one
/// is laid out flat.
///
/// # Examples
///
/// ```
/// use bitbucket_sync::config::{Config, Mode, OutputFormat};
/// use bitbucket_sync::core_types::RepositoryDescriptor;
/// use bitbucket_sync::paths::resolve;
/// use std::path::Path;
///
/// let mut config = Config::new_for_test("/backup");
/// config.mode = Mode::Projects;
/// config.output_format = OutputFormat::Zip;
///
/// let repo = RepositoryDescriptor::new("alpha", "https://example.invalid/alpha.git")
///     .with_project("PRAC");
/// assert_eq!(resolve(&repo, &config), Path::new("/backup/PRAC/alpha.zip"));
/// ```
pub fn resolve(descriptor: &RepositoryDescriptor, config: &Config) -> PathBuf {
    let mut path = config.output_dir.clone();
    if config.mode == Mode::Projects {
        if let Some(key) = &descriptor.project_key {
            path.push(key);
        }
    }
    match config.output_format {
        OutputFormat::Clone => path.push(&descriptor.slug),
        OutputFormat::Zip => path.push(format!("{}.{}", descriptor.slug, ARCHIVE_EXTENSION)),
    }
    path
}

/// Whether `name` can be used as exactly one path component.
///
/// Rejects empty names, `.` and `..`, separators, drive prefixes and NUL so a
/// hostile slug or project key can never address anything outside its slot.
pub fn is_safe_component(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':', '\0'])
}
