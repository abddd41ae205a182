// src/archive/compress.rs

use crate::constants::PARTIAL_SUFFIX;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Packs a directory tree into a single archive file.
pub trait Compressor: Send + Sync {
    /// Writes the contents of `src_dir` (not the directory itself) to `dest`.
    ///
    /// On error `dest` must not exist afterwards.
    fn compress(&self, src_dir: &Path, dest: &Path) -> io::Result<()>;
}

/// Deflate-compressed `.zip` archives, excluding `.git` directories.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCompressor;

impl Compressor for ZipCompressor {
    fn compress(&self, src_dir: &Path, dest: &Path) -> io::Result<()> {
        let partial = partial_path(dest);
        let result = write_zip(src_dir, &partial).and_then(|()| fs::rename(&partial, dest));
        if result.is_err() {
            if let Err(e) = fs::remove_file(&partial) {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("Could not remove '{}': {}", partial.display(), e);
                }
            }
        }
        result
    }
}

/// `alpha.zip` -> `alpha.zip.partial`
pub(crate) fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    dest.with_file_name(name)
}

fn write_zip(src_dir: &Path, out: &Path) -> io::Result<()> {
    if !fs::metadata(src_dir)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("'{}' is not a directory", src_dir.display()),
        ));
    }
    let file = File::create(out)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let base_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .large_file(true);

    let walker = WalkDir::new(src_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src_dir)
            .map_err(io::Error::other)?;
        let name = archive_name(relative);
        let metadata = entry.path().symlink_metadata()?;
        let options = base_options.unix_permissions(unix_mode(&metadata));

        let file_type = entry.file_type();
        if file_type.is_dir() {
            zip.add_directory(name, options)?;
        } else if file_type.is_symlink() {
            let target = fs::read_link(entry.path())?;
            zip.add_symlink(name, target.to_string_lossy(), options)?;
        } else if file_type.is_file() {
            zip.start_file(name, options)?;
            let mut input = File::open(entry.path())?;
            io::copy(&mut input, &mut zip)?;
        }
    }

    let mut writer = zip.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Entry names always use `/`, whatever the host separator.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn unix_mode(metadata: &fs::Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn unix_mode(metadata: &fs::Metadata) -> u32 {
    if metadata.is_dir() {
        0o755
    } else if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
