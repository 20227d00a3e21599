//! What the sync policy is guiding the synchronization to do.
//!
//! Grounded in `original_source/sync2smugmug/policy.py`.

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncAction {
    pub download: bool,
    pub upload: bool,
    pub delete_on_disk: bool,
    pub delete_online: bool,
}

impl SyncAction {
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "local_backup" => Ok(Self {
                download: true,
                ..Default::default()
            }),
            "local_backup_clean" => Ok(Self {
                download: true,
                delete_on_disk: true,
                ..Default::default()
            }),
            "online_backup" => Ok(Self {
                upload: true,
                ..Default::default()
            }),
            "online_backup_clean" => Ok(Self {
                upload: true,
                delete_online: true,
                ..Default::default()
            }),
            // The duplicate-cleanup optimizer reuses the engine's scanner/dispatcher but
            // performs no upload/download/delete itself (optimization proper is out of
            // scope here; see `original_source/sync2smugmug/policy.py`'s `test` preset,
            // whose `SyncAction` likewise carries no upload/download/delete flags).
            "optimize" => Ok(Self::default()),
            other => Err(ConfigError::InvalidPreset(other.to_string())),
        }
    }

    pub fn presets() -> &'static [&'static str] {
        &[
            "local_backup",
            "local_backup_clean",
            "online_backup",
            "online_backup_clean",
            "optimize",
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_preset_is_a_config_error() {
        assert!(SyncAction::from_preset("bogus").is_err());
    }

    #[test]
    fn clean_presets_turn_on_delete() {
        let a = SyncAction::from_preset("online_backup_clean").unwrap();
        assert!(a.upload && a.delete_online && !a.download);

        let b = SyncAction::from_preset("local_backup_clean").unwrap();
        assert!(b.download && b.delete_on_disk && !b.upload);
    }

    #[test]
    fn optimize_preset_performs_no_transfer_or_delete() {
        let a = SyncAction::from_preset("optimize").unwrap();
        assert_eq!(a, SyncAction::default());
        assert!(SyncAction::presets().contains(&"optimize"));
    }
}
