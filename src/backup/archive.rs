//! Zip archive creation.
//!
//! Writes the archive to a randomized temp file in the destination folder
//! and publishes it with an atomic rename, so the final path either does not
//! exist or holds a complete archive.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use itertools::Itertools;
use std::fs::File;
use std::io::{BufWriter, IntoInnerError};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

static MAX_COMPRESSION_LEVEL: u32 = 9;

/// Zip entry names always use `/` separators, regardless of platform.
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .join("/")
}

fn write_entries(
    writer: &mut ZipWriter<BufWriter<File>>,
    source_dir: &Path,
    compression_level: u32,
) -> Result<()> {
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(compression_level as i64));

    let mut entry_count = 0;
    for entry in WalkDir::new(source_dir).follow_links(true) {
        // Unreadable directory entries are skipped, not fatal.
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = match path.strip_prefix(source_dir) {
            Ok(relative) => relative,
            Err(e) => {
                warn!("Skipping {:?}, not under {:?}: {e}", path, source_dir);
                continue;
            }
        };
        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Skipping unreadable file {:?}: {e}", path);
                continue;
            }
        };

        debug!("Adding file: {:?}", relative);
        // Once an entry is started, any failure corrupts the stream and
        // aborts the whole archive.
        writer.start_file(entry_name(relative), options)?;
        std::io::copy(&mut file, writer)?;
        entry_count += 1;
    }
    info!("Added {entry_count} files to archive");
    Ok(())
}

/// Creates `<dest_path_without_ext>.zip` from the contents of `source_dir`.
///
/// Every regular file under `source_dir` (hidden files included) is stored
/// under its path relative to `source_dir`; directories themselves are not
/// stored. Unreadable files are logged and skipped. The destination folder
/// is created if absent. Returns the final archive path.
pub fn create_zip_archive(
    source_dir: &Path,
    dest_path_without_ext: &Path,
    compression_level: u32,
) -> Result<PathBuf> {
    if compression_level > MAX_COMPRESSION_LEVEL {
        return Err(Error::CompressionLevelOutOfRange(compression_level));
    }
    if !source_dir.is_dir() {
        return Err(Error::SourceNotFound(source_dir.to_path_buf()));
    }

    let dest_dir = dest_path_without_ext
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dest_dir)?;

    let base_name = dest_path_without_ext
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".into());

    // Randomized suffix avoids collisions between concurrent or interrupted
    // runs leaving temp files behind.
    let (file, temp_path) = tempfile::Builder::new()
        .prefix(&format!("{base_name}.tmp."))
        .tempfile_in(dest_dir)?
        .into_parts();

    let mut writer = ZipWriter::new(BufWriter::new(file));
    let written = write_entries(&mut writer, source_dir, compression_level).and_then(|_| {
        writer
            .finish()?
            .into_inner()
            .map_err(IntoInnerError::into_error)?;
        Ok(())
    });

    if let Err(e) = written {
        if let Err(cleanup_err) = temp_path.close() {
            warn!("Failed to clean up temp file: {cleanup_err}");
        }
        return Err(e);
    }

    let mut final_path = dest_path_without_ext.as_os_str().to_os_string();
    final_path.push(".zip");
    let final_path = PathBuf::from(final_path);

    match temp_path.persist(&final_path) {
        Ok(_) => Ok(final_path),
        Err(e) => {
            let tempfile::PathPersistError { error, path } = e;
            if let Err(cleanup_err) = path.close() {
                warn!("Failed to clean up temp file: {cleanup_err}");
            }
            Err(error.into())
        }
    }
}
