//! Backup orchestration with concurrent execution prevention.
//!
//! A single [`BackupManager`] serializes all backup entry points for the
//! process: filename rendering, archive creation, and retention enforcement
//! run under one run flag that is released on every exit path.

use crate::backup::result_error::error::Error;
use crate::backup::result_error::result::Result;
use crate::backup::settings::BackupSettings;
use crate::backup::{archive, retention, template};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;
use validator::Validate;

#[derive(Debug, PartialEq, Eq)]
pub enum BackupOutcome {
    /// The backup completed; holds the final archive path.
    Created(PathBuf),
    /// Another backup was already in flight, nothing was done.
    Skipped,
}

/// Resets the run flag when dropped, so the manager returns to idle on
/// success, failure, and panic alike.
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug, Default)]
pub struct BackupManager {
    running: AtomicBool,
}

impl BackupManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a backup is currently in flight. External triggers (e.g. a
    /// shutdown hook) use this to avoid redundant firing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Runs one backup of `vault_dir`: renders the filename, writes the
    /// archive, then applies the retention policy to the same folder.
    ///
    /// At most one backup runs per manager at a time; a call that finds
    /// another one in flight returns [`BackupOutcome::Skipped`] immediately
    /// with no side effects.
    pub fn execute(
        &self,
        vault_dir: &Path,
        vault_name: &str,
        settings: &BackupSettings,
    ) -> Result<BackupOutcome> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Backup already in progress, skipping");
            return Ok(BackupOutcome::Skipped);
        }
        let _guard = RunGuard(&self.running);

        if settings.backup_dir().as_os_str().is_empty() {
            return Err(Error::DestinationUnset);
        }
        settings.validate()?;

        let filename = template::render(settings.filename_template(), vault_name, &Local::now());
        let dest = settings.backup_dir().join(&filename);

        info!("Starting backup of {:?} as {:?}", vault_dir, filename);
        let archive_path =
            archive::create_zip_archive(vault_dir, &dest, *settings.compression_level())?;
        info!("Created backup file: {:?}", archive_path);

        let deleted = retention::apply_retention(
            settings.backup_dir(),
            settings.filename_template(),
            settings,
        )?;
        if deleted > 0 {
            info!("Removed {deleted} out of retention backup(s)");
        }

        Ok(BackupOutcome::Created(archive_path))
    }
}
