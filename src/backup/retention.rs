//! Backup discovery and retention management.
//!
//! Archives are re-identified on disk by matching filenames against the
//! compiled template, never by parsing dates back out of them; creation
//! times come from file metadata. The keep-set evaluation is a pure
//! function over the discovered records, deletion happens afterwards as a
//! best-effort batch.

use crate::backup::result_error::result::Result;
use crate::backup::settings::{BackupSettings, RetentionMode};
use crate::backup::template;
use chrono::{DateTime, Duration, Utc};
use getset::Getters;
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One discovered archive on disk. Constructed fresh on every listing,
/// never cached; deleting a record does not touch the file.
#[derive(Clone, Debug, Getters)]
#[getset(get = "pub")]
pub struct BackupRecord {
    filename: String,
    path: PathBuf,
    size: u64,
    /// Last-modification time, used as a proxy for creation time.
    created: DateTime<Utc>,
}

/// Lists archives in `folder` whose names the template could have produced,
/// newest first. A nonexistent folder yields an empty list, not an error.
pub fn list_backups(folder: &Path, filename_template: &str) -> Result<Vec<BackupRecord>> {
    if !folder.exists() {
        return Ok(Vec::new());
    }

    let matcher = template::compile(filename_template)?;
    let mut records = Vec::new();

    for entry in std::fs::read_dir(folder)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable directory entry: {e}");
                continue;
            }
        };
        let filename = entry.file_name().to_string_lossy().into_owned();
        if !matcher.is_match(&filename) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!("Skipping {filename:?}, cannot read metadata: {e}");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }
        let created = match metadata.modified() {
            Ok(modified) => DateTime::<Utc>::from(modified),
            Err(e) => {
                warn!("Skipping {filename:?}, no modification time: {e}");
                continue;
            }
        };

        records.push(BackupRecord {
            filename,
            path: entry.path(),
            size: metadata.len(),
            created,
        });
    }

    Ok(records
        .into_iter()
        .sorted_by_key(|r| Reverse(r.created))
        .collect())
}

/// Computes the set of archive paths the retention policy preserves.
/// Pure function of its inputs, performs no I/O.
///
/// Zero-valued parameters mean "unlimited" in `keep_last_n`, `keep_days`,
/// and `and` modes. In `or` mode a zero rule is inert and contributes
/// nothing to the union, except when both are zero, which keeps everything.
pub fn backups_to_keep(
    records: &[BackupRecord],
    settings: &BackupSettings,
    now: DateTime<Utc>,
) -> HashSet<PathBuf> {
    let sorted: Vec<&BackupRecord> = records
        .iter()
        .sorted_by_key(|r| Reverse(r.created))
        .collect();

    let keep_last_n = *settings.keep_last_n() as usize;
    let keep_days = *settings.keep_days();
    let cutoff = now - Duration::days(keep_days as i64);
    let within_days = |r: &BackupRecord| r.created >= cutoff;

    match settings.retention_mode() {
        RetentionMode::KeepLastN => {
            let n = if keep_last_n == 0 { sorted.len() } else { keep_last_n };
            sorted.iter().take(n).map(|r| r.path.clone()).collect()
        }
        RetentionMode::KeepDays => {
            if keep_days == 0 {
                sorted.iter().map(|r| r.path.clone()).collect()
            } else {
                sorted
                    .iter()
                    .filter(|r| within_days(r))
                    .map(|r| r.path.clone())
                    .collect()
            }
        }
        RetentionMode::And => {
            let n = if keep_last_n == 0 { sorted.len() } else { keep_last_n };
            sorted
                .iter()
                .take(n)
                .filter(|r| keep_days == 0 || within_days(r))
                .map(|r| r.path.clone())
                .collect()
        }
        RetentionMode::Or => {
            if keep_last_n == 0 && keep_days == 0 {
                return sorted.iter().map(|r| r.path.clone()).collect();
            }
            let mut keep = HashSet::new();
            if keep_last_n > 0 {
                keep.extend(sorted.iter().take(keep_last_n).map(|r| r.path.clone()));
            }
            if keep_days > 0 {
                keep.extend(
                    sorted
                        .iter()
                        .filter(|r| within_days(r))
                        .map(|r| r.path.clone()),
                );
            }
            keep
        }
    }
}

/// Deletes every archive in `folder` the retention policy does not keep.
/// Individual deletion failures are logged and skipped; the returned count
/// covers successful deletions only.
pub fn apply_retention(
    folder: &Path,
    filename_template: &str,
    settings: &BackupSettings,
) -> Result<usize> {
    let records = list_backups(folder, filename_template)?;
    let keep = backups_to_keep(&records, settings, Utc::now());

    let mut deleted = 0;
    for record in &records {
        if keep.contains(&record.path) {
            continue;
        }
        match std::fs::remove_file(&record.path) {
            Ok(()) => {
                info!("Removed out of retention backup {:?}", record.filename);
                deleted += 1;
            }
            // the folder is not ours exclusively, files can vanish under us
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Backup {:?} already gone", record.filename);
            }
            Err(e) => {
                warn!("Failed to delete backup {:?}: {e}", record.filename);
            }
        }
    }

    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::settings::BackupSettings;
    use std::fs::File;
    use tempfile::TempDir;

    fn record(name: &str, age_days: i64, now: DateTime<Utc>) -> BackupRecord {
        BackupRecord {
            filename: name.to_string(),
            path: PathBuf::from(format!("/backups/{name}")),
            size: 1024,
            created: now - Duration::days(age_days),
        }
    }

    /// Five records aged 0..=4 days, newest first.
    fn sample_records(now: DateTime<Utc>) -> Vec<BackupRecord> {
        (0..5)
            .map(|age| record(&format!("b{age}.zip"), age, now))
            .collect()
    }

    fn settings(mode: RetentionMode, keep_last_n: u32, keep_days: u32) -> BackupSettings {
        BackupSettings::builder()
            .retention_mode(mode)
            .keep_last_n(keep_last_n)
            .keep_days(keep_days)
            .build()
    }

    fn kept_names(keep: &HashSet<PathBuf>) -> Vec<String> {
        keep.iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .sorted()
            .collect()
    }

    #[test]
    fn test_keep_last_n_keeps_newest_two() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::KeepLastN, 2, 0), now);
        assert_eq!(kept_names(&keep), vec!["b0.zip", "b1.zip"]);
    }

    #[test]
    fn test_keep_last_n_zero_keeps_all() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::KeepLastN, 0, 0), now);
        assert_eq!(keep.len(), 5);
    }

    #[test]
    fn test_keep_days_keeps_window() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::KeepDays, 0, 2), now);
        assert_eq!(kept_names(&keep), vec!["b0.zip", "b1.zip", "b2.zip"]);
    }

    #[test]
    fn test_keep_days_zero_keeps_all() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::KeepDays, 0, 0), now);
        assert_eq!(keep.len(), 5);
    }

    #[test]
    fn test_and_intersects() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::And, 2, 2), now);
        assert_eq!(kept_names(&keep), vec!["b0.zip", "b1.zip"]);
    }

    #[test]
    fn test_and_zero_side_is_unlimited() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::And, 0, 2), now);
        assert_eq!(kept_names(&keep), vec!["b0.zip", "b1.zip", "b2.zip"]);

        let keep = backups_to_keep(&records, &settings(RetentionMode::And, 2, 0), now);
        assert_eq!(kept_names(&keep), vec!["b0.zip", "b1.zip"]);
    }

    #[test]
    fn test_or_unions() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::Or, 2, 2), now);
        assert_eq!(kept_names(&keep), vec!["b0.zip", "b1.zip", "b2.zip"]);
    }

    #[test]
    fn test_or_single_zero_rule_is_inert() {
        let now = Utc::now();
        let records = sample_records(now);
        // keep_days=0 contributes nothing, only the count rule applies
        let keep = backups_to_keep(&records, &settings(RetentionMode::Or, 2, 0), now);
        assert_eq!(kept_names(&keep), vec!["b0.zip", "b1.zip"]);
    }

    #[test]
    fn test_or_both_zero_keeps_all() {
        let now = Utc::now();
        let records = sample_records(now);
        let keep = backups_to_keep(&records, &settings(RetentionMode::Or, 0, 0), now);
        assert_eq!(keep.len(), 5);
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let now = Utc::now();
        let records = sample_records(now);
        let s = settings(RetentionMode::Or, 2, 2);
        assert_eq!(
            backups_to_keep(&records, &s, now),
            backups_to_keep(&records, &s, now)
        );
    }

    #[test]
    fn test_list_backups_nonexistent_folder() {
        let records = list_backups(Path::new("/nonexistent/folder"), "{{vault}}_{{date}}");
        assert!(records.unwrap().is_empty());
    }

    #[test]
    fn test_list_backups_matches_template_only() {
        let dir = TempDir::new().unwrap();
        File::create(dir.path().join("vault_2024-01-02.zip")).unwrap();
        File::create(dir.path().join("vault_2024-01-03.zip")).unwrap();
        File::create(dir.path().join("unrelated.txt")).unwrap();
        File::create(dir.path().join("vault_2024-01-03.zip.old")).unwrap();

        let records = list_backups(dir.path(), "vault_{{date}}").unwrap();
        let names: Vec<_> = records.iter().map(|r| r.filename().clone()).sorted().collect();
        assert_eq!(names, vec!["vault_2024-01-02.zip", "vault_2024-01-03.zip"]);
    }

    #[test]
    fn test_list_backups_newest_first() {
        let dir = TempDir::new().unwrap();
        let old = dir.path().join("vault_old.zip");
        let new = dir.path().join("vault_new.zip");
        File::create(&old).unwrap();
        File::create(&new).unwrap();

        let past = std::time::SystemTime::now() - std::time::Duration::from_secs(3600);
        File::options().write(true).open(&old).unwrap().set_modified(past).unwrap();

        let records = list_backups(dir.path(), "vault_{{datetime}}").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].filename(), "vault_new.zip");
        assert_eq!(records[1].filename(), "vault_old.zip");
        assert!(records[0].created() >= records[1].created());
    }

    #[test]
    fn test_apply_retention_deletes_and_counts() {
        let dir = TempDir::new().unwrap();
        let mut paths = Vec::new();
        for i in 0..4 {
            let path = dir.path().join(format!("vault_{i}.zip"));
            File::create(&path).unwrap();
            let age = std::time::SystemTime::now() - std::time::Duration::from_secs(i * 60);
            File::options().write(true).open(&path).unwrap().set_modified(age).unwrap();
            paths.push(path);
        }
        File::create(dir.path().join("keepme.txt")).unwrap();

        let deleted = apply_retention(
            dir.path(),
            "vault_{{time}}",
            &settings(RetentionMode::KeepLastN, 2, 0),
        )
        .unwrap();

        assert_eq!(deleted, 2);
        assert!(paths[0].exists());
        assert!(paths[1].exists());
        assert!(!paths[2].exists());
        assert!(!paths[3].exists());
        // files that are not ours are never touched
        assert!(dir.path().join("keepme.txt").exists());
    }

    #[test]
    fn test_apply_retention_keeps_everything_when_unlimited() {
        let dir = TempDir::new().unwrap();
        for i in 0..3 {
            File::create(dir.path().join(format!("vault_{i}.zip"))).unwrap();
        }

        let deleted = apply_retention(
            dir.path(),
            "vault_{{time}}",
            &settings(RetentionMode::Or, 0, 0),
        )
        .unwrap();

        assert_eq!(deleted, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 3);
    }
}
