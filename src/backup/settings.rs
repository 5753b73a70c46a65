//! Configuration for backup runs.
//!
//! [`BackupSettings`] is the value handed into every core operation; the
//! core never mutates it and holds no settings state of its own.
//! [`AppConfig`] is the CLI-facing config file layer wrapping it.

use crate::backup::validate::{validate_cron_str, validate_dir_exist, validate_filename_template};
use bon::Builder;
use derive_more::Display;
use getset::Getters;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::Validate;

/// Policy for selecting which archives survive pruning.
#[derive(Clone, Copy, Debug, Default, Display, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetentionMode {
    /// Keep the newest `keep_last_n` archives; 0 keeps all.
    KeepLastN,
    /// Keep archives newer than `keep_days` days; 0 keeps all.
    KeepDays,
    /// Keep archives satisfying both rules (a zero rule is unlimited).
    And,
    /// Keep archives satisfying either nonzero rule. Both rules zero keeps
    /// all; a single zero rule contributes nothing to the union.
    #[default]
    Or,
}

fn default_filename_template() -> String {
    "{{vault}}_{{datetime:%Y-%m-%d_%H%M%S}}".to_string()
}

fn default_compression_level() -> u32 {
    6
}

fn default_keep_last_n() -> u32 {
    10
}

fn default_keep_days() -> u32 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct BackupSettings {
    /// Folder archives are written to. Empty means not configured; the
    /// orchestrator fails fast on it before creating anything.
    #[serde(default)]
    #[builder(default, into)]
    backup_dir: PathBuf,
    #[validate(custom(function = validate_filename_template))]
    #[serde(default = "default_filename_template")]
    #[builder(default = default_filename_template(), into)]
    filename_template: String,
    #[validate(range(min = 0, max = 9))]
    #[serde(default = "default_compression_level")]
    #[builder(default = default_compression_level())]
    compression_level: u32,
    #[serde(default)]
    #[builder(default)]
    retention_mode: RetentionMode,
    #[serde(default = "default_keep_last_n")]
    #[builder(default = default_keep_last_n())]
    keep_last_n: u32,
    #[serde(default = "default_keep_days")]
    #[builder(default = default_keep_days())]
    keep_days: u32,
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Top level config file for the CLI binary.
///
/// Resolving which vault to back up (and when) is a host concern; the core
/// only ever sees the contained [`BackupSettings`].
#[derive(Clone, Debug, Serialize, Deserialize, Validate, Builder, Getters)]
#[serde(deny_unknown_fields)]
#[getset(get = "pub")]
pub struct AppConfig {
    #[validate(custom(function = validate_dir_exist))]
    #[builder(into)]
    vault_dir: PathBuf,
    /// Display name used for `{{vault}}`; defaults to the vault directory
    /// name.
    #[serde(default)]
    #[builder(into)]
    vault_name: Option<String>,
    /// Cron expression for `watch` mode.
    #[serde(default)]
    #[validate(custom(function = validate_cron_str))]
    #[builder(into)]
    schedule: Option<String>,
    /// Fire one backup immediately when `watch` starts.
    #[serde(default)]
    #[builder(default)]
    run_on_start: bool,
    #[validate(nested)]
    backup: BackupSettings,
}

impl AppConfig {
    pub fn resolved_vault_name(&self) -> String {
        match &self.vault_name {
            Some(name) => name.clone(),
            None => self
                .vault_dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "vault".to_string()),
        }
    }
}
