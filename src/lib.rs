//! # vault-backup
//!
//! A backup tool that creates point-in-time zip archives of a directory
//! tree, names them from a configurable filename template, and prunes old
//! archives according to a retention policy.
//!
//! ## Features
//!
//! - **Atomic Archives**: temp-file-then-rename publishing, a reader never
//!   observes a half-written archive at the final path
//! - **Filename Templates**: `{{vault}}`, `{{date}}`, `{{time}}`,
//!   `{{datetime}}` placeholders with optional strftime formats
//! - **Retention Management**: keep-last-N / keep-days policies, combinable
//!   with `and`/`or` semantics
//! - **Scheduled Backups**: cron-based `watch` mode in the CLI
//! - **Run Guard**: at most one backup per process at a time
//!
//! ## Quick Start
//!
//! ```no_run
//! use vault_backup::backup::manager::{BackupManager, BackupOutcome};
//! use vault_backup::backup::settings::BackupSettings;
//!
//! let settings = BackupSettings::builder()
//!     .backup_dir("/backups")
//!     .build();
//!
//! let manager = BackupManager::new();
//! match manager.execute("/home/me/vault".as_ref(), "my-vault", &settings)? {
//!     BackupOutcome::Created(path) => println!("backup at {:?}", path),
//!     BackupOutcome::Skipped => println!("a backup is already running"),
//! }
//! # Ok::<(), vault_backup::backup::result_error::error::Error>(())
//! ```

pub mod backup;
