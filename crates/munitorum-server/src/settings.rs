//! Server configuration, deserialised from `config.toml` and `MUNITORUM__*`
//! environment variables.

use std::path::{Path, PathBuf};

use munitorum_ingest::MigrationOptions;
use serde::Deserialize;

use crate::auth::AuthConfig;

/// Runtime server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_bind")]
  pub bind:        String,
  #[serde(default = "default_database")]
  pub database:    PathBuf,
  #[serde(default = "default_reports_dir")]
  pub reports_dir: PathBuf,
  /// Without credentials the raw-parser and admin routes are open.
  #[serde(default)]
  pub auth:        Option<AuthConfig>,
  #[serde(default)]
  pub mfm:         MfmSettings,
  #[serde(default)]
  pub import:      FileTask,
  #[serde(default)]
  pub verify:      FileTask,
  #[serde(default)]
  pub generate:    GenerateSettings,
}

fn default_bind() -> String { "127.0.0.1:8080".to_owned() }

fn default_database() -> PathBuf { PathBuf::from("mfm.db") }

fn default_reports_dir() -> PathBuf { PathBuf::from("logs") }

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      bind:        default_bind(),
      database:    default_database(),
      reports_dir: default_reports_dir(),
      auth:        None,
      mfm:         MfmSettings::default(),
      import:      FileTask::default(),
      verify:      FileTask::default(),
      generate:    GenerateSettings::default(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MfmSettings {
  #[serde(default)]
  pub migration: MigrationSettings,
}

/// `[mfm.migration]`
#[derive(Debug, Clone, Deserialize)]
pub struct MigrationSettings {
  /// Run a migration at startup.
  #[serde(default)]
  pub enabled:            bool,
  #[serde(default = "default_migration_directory")]
  pub directory:          PathBuf,
  /// Also the overwrite policy for startup imports.
  #[serde(default, rename = "overwrite-existing")]
  pub overwrite_existing: bool,
}

fn default_migration_directory() -> PathBuf { PathBuf::from("data/mfm") }

impl Default for MigrationSettings {
  fn default() -> Self {
    Self {
      enabled:            false,
      directory:          default_migration_directory(),
      overwrite_existing: false,
    }
  }
}

impl MigrationSettings {
  pub fn options(&self) -> MigrationOptions {
    MigrationOptions {
      directory: self.directory.clone(),
      overwrite: self.overwrite_existing,
    }
  }
}

/// `[import.mfm]` and `[verify.mfm]`: raw bulletin files to process at
/// startup.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileTask {
  #[serde(default)]
  pub mfm: MfmFiles,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MfmFiles {
  #[serde(default)]
  pub files: Vec<PathBuf>,
}

/// `[generate.mfm]`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateSettings {
  #[serde(default)]
  pub mfm: FeedbackSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedbackSettings {
  /// Write a parser feedback report for every imported or verified file.
  #[serde(default)]
  pub feedback: bool,
}

/// Load configuration from `path` (optional) and the environment.
///
/// Environment keys use `__` between sections, e.g.
/// `MUNITORUM__MFM__MIGRATION__ENABLED=true`; file lists are
/// comma-separated.
pub fn load(path: &Path) -> Result<ServerConfig, config::ConfigError> {
  config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(
      config::Environment::with_prefix("MUNITORUM")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("import.mfm.files")
        .with_list_parse_key("verify.mfm.files")
        .try_parsing(true),
    )
    .build()?
    .try_deserialize()
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
