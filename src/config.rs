//! CLI + config-file configuration (§10.2).
//!
//! Grounded in `original_source/src/sync2smugmug/configuration.py`
//! (`ConnectionParams`, `Config`, `get_config_files`,
//! `load_config_from_files`, `make_config`): a `clap`-derived command
//! line, with any flag the user didn't pass falling back to
//! `sync2smugmug.conf` / `sync2smugmug.my.conf` (read in that order,
//! later files winning), a simple `key=value` format.

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;

use crate::error::ConfigError;
use crate::policy::SyncAction;

#[derive(Debug, Clone)]
pub struct ConnectionParams {
    pub account: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
    pub test_upload: bool,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub sync: SyncAction,
    pub connection_params: ConnectionParams,
    pub base_dir: PathBuf,
    pub force_refresh: bool,
    pub dry_run: bool,
    /// Validated if present, but otherwise inert here — Mac Photos library ingestion
    /// itself is a separate collaborator this crate doesn't implement.
    pub mac_photos_library_location: Option<PathBuf>,
}

/// One-to-one with the original's `configargparse` flags (§10.2).
#[derive(Parser, Debug)]
#[command(name = "sync2smugmug", about = "Synchronize a local photo tree with a SmugMug-style photo-hosting service")]
pub struct Cli {
    /// Type of sync to perform (one of the available presets)
    #[arg(long, value_parser = clap::builder::PossibleValuesParser::new(crate::policy::SyncAction::presets()))]
    pub sync: Option<String>,

    /// Full path to the local pictures folder
    #[arg(long)]
    pub base_dir: Option<PathBuf>,

    /// Nickname of the service account
    #[arg(long)]
    pub account: Option<String>,

    #[arg(long)]
    pub consumer_key: Option<String>,

    #[arg(long)]
    pub consumer_secret: Option<String>,

    #[arg(long)]
    pub access_token: Option<String>,

    #[arg(long)]
    pub access_token_secret: Option<String>,

    /// Full path for a Mac Photos library (validated if given, otherwise unused)
    #[arg(long)]
    pub mac_photos_library_location: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub force_refresh: bool,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub test_upload: bool,

    /// `tracing`'s default directive when `RUST_LOG` isn't set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// `sync2smugmug.conf`, then `sync2smugmug.my.conf`, resolved next to the binary's working
/// directory (matching the original's "repo root" convention closely enough for a crate
/// that has no fixed install location).
fn config_file_paths() -> Vec<PathBuf> {
    vec![PathBuf::from("sync2smugmug.conf"), PathBuf::from("sync2smugmug.my.conf")]
}

/// Parse all existing `key=value` config files, later files overriding earlier ones.
/// Lines that are empty, start with `#`/`;`, or have no `=` are ignored.
pub fn load_config_from_files() -> HashMap<String, String> {
    let mut values = HashMap::new();

    for path in config_file_paths() {
        let Ok(contents) = std::fs::read_to_string(&path) else {
            continue;
        };

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if let Some((key, value)) = line.split_once('=') {
                let value = value.trim();
                if !value.is_empty() {
                    values.insert(key.trim().to_string(), value.to_string());
                }
            }
        }
    }

    values
}

fn get_value(file_config: &HashMap<String, String>, cli_value: Option<String>, key: &str) -> Result<String, ConfigError> {
    cli_value
        .or_else(|| file_config.get(key).cloned())
        .ok_or_else(|| ConfigError::MissingParameter(key.to_string()))
}

fn get_path_value(file_config: &HashMap<String, String>, cli_value: Option<PathBuf>, key: &str) -> Result<PathBuf, ConfigError> {
    if let Some(value) = cli_value {
        return Ok(value);
    }

    file_config
        .get(key)
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::MissingParameter(key.to_string()))
}

impl Config {
    /// Merge `cli` with whatever config files are present, validating the result. CLI
    /// flags always win over file values (§10.2).
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        let file_config = load_config_from_files();

        let base_dir = get_path_value(&file_config, cli.base_dir, "base_dir")?;
        if !base_dir.exists() {
            return Err(ConfigError::BaseDirMissing(base_dir));
        }

        let sync_name = get_value(&file_config, cli.sync, "sync")?;
        let sync = SyncAction::from_preset(&sync_name)?;

        let mac_photos_library_location = cli
            .mac_photos_library_location
            .or_else(|| file_config.get("mac_photos_library_location").map(PathBuf::from));
        if let Some(location) = &mac_photos_library_location {
            if !location.exists() {
                return Err(ConfigError::MacPhotosLibraryMissing(location.clone()));
            }
        }

        let connection_params = ConnectionParams {
            account: get_value(&file_config, cli.account, "account")?,
            consumer_key: get_value(&file_config, cli.consumer_key, "consumer_key")?,
            consumer_secret: get_value(&file_config, cli.consumer_secret, "consumer_secret")?,
            access_token: get_value(&file_config, cli.access_token, "access_token")?,
            access_token_secret: get_value(&file_config, cli.access_token_secret, "access_token_secret")?,
            test_upload: cli.test_upload,
        };

        Ok(Self {
            sync,
            connection_params,
            base_dir,
            force_refresh: cli.force_refresh,
            dry_run: cli.dry_run,
            mac_photos_library_location,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn bare_cli() -> Cli {
        Cli {
            sync: None,
            base_dir: None,
            account: None,
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
            mac_photos_library_location: None,
            force_refresh: false,
            dry_run: false,
            test_upload: false,
            log_level: "info".into(),
        }
    }

    #[test]
    fn missing_required_cli_value_is_a_config_error() {
        let err = Config::from_cli(bare_cli()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(_)));
    }

    #[test]
    fn nonexistent_base_dir_is_a_config_error() {
        let mut cli = bare_cli();
        cli.sync = Some("local_backup".into());
        cli.base_dir = Some(PathBuf::from("/does/not/exist/anywhere"));
        cli.account = Some("acct".into());
        cli.consumer_key = Some("ck".into());
        cli.consumer_secret = Some("cs".into());
        cli.access_token = Some("tok".into());
        cli.access_token_secret = Some("tsec".into());

        let err = Config::from_cli(cli).unwrap_err();
        assert!(matches!(err, ConfigError::BaseDirMissing(_)));
    }

    #[test]
    fn cli_values_fully_satisfy_config_without_files() {
        let dir = tempdir().unwrap();
        let mut cli = bare_cli();
        cli.sync = Some("local_backup".into());
        cli.base_dir = Some(dir.path().to_path_buf());
        cli.account = Some("acct".into());
        cli.consumer_key = Some("ck".into());
        cli.consumer_secret = Some("cs".into());
        cli.access_token = Some("tok".into());
        cli.access_token_secret = Some("tsec".into());

        let config = Config::from_cli(cli).unwrap();
        assert_eq!(config.connection_params.account, "acct");
        assert!(config.sync.download);
    }

    #[test]
    fn nonexistent_mac_photos_library_location_is_a_config_error() {
        let dir = tempdir().unwrap();
        let mut cli = bare_cli();
        cli.sync = Some("local_backup".into());
        cli.base_dir = Some(dir.path().to_path_buf());
        cli.account = Some("acct".into());
        cli.consumer_key = Some("ck".into());
        cli.consumer_secret = Some("cs".into());
        cli.access_token = Some("tok".into());
        cli.access_token_secret = Some("tsec".into());
        cli.mac_photos_library_location = Some(PathBuf::from("/does/not/exist/anywhere"));

        let err = Config::from_cli(cli).unwrap_err();
        assert!(matches!(err, ConfigError::MacPhotosLibraryMissing(_)));
    }
}
