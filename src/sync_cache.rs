//! Per-album sync-state cache — the "sync triplet" (§4.3).
//!
//! Grounded in `original_source/sync2smugmug/disk.py` (`SyncData`,
//! `DiskAlbumInfo.remember_sync`) and `sync.py` (`albums_already_synced`).

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::model::Album;

pub const SYNC_DATA_FILENAME: &str = "smugmug_sync.json";
pub const DELTA: f64 = 360.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SyncTriplet {
    pub sync_time: f64,
    pub online_time: f64,
    pub disk_time: f64,
}

/// Load the sync triplet from `<album_dir>/smugmug_sync.json`. A missing file means "never
/// synced" (`Ok(None)`); a malformed file is deleted and also treated as "never synced".
pub fn load(album_dir: &Path) -> Option<SyncTriplet> {
    let path = album_dir.join(SYNC_DATA_FILENAME);
    let contents = fs::read_to_string(&path).ok()?;

    match serde_json::from_str(&contents) {
        Ok(triplet) => Some(triplet),
        Err(_) => {
            let _ = fs::remove_file(&path);
            None
        }
    }
}

fn mtime_epoch(path: &Path) -> std::io::Result<f64> {
    let modified = fs::metadata(path)?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64())
}

fn now_epoch() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// `remember_sync(online_time)`: `None` resets (deletes the file); `Some(t)` records
/// `sync_time = now()`, `online_time = t`, `disk_time = mtime(album_dir)`.
pub fn remember_sync(album_dir: &Path, online_time: Option<f64>) -> std::io::Result<Option<SyncTriplet>> {
    let path = album_dir.join(SYNC_DATA_FILENAME);

    match online_time {
        None => {
            if path.exists() {
                fs::remove_file(&path)?;
            }
            Ok(None)
        }
        Some(online_time) => {
            let triplet = SyncTriplet {
                sync_time: now_epoch(),
                online_time,
                disk_time: mtime_epoch(album_dir)?,
            };

            let tmp_path = path.with_extension("json.tmp");
            fs::write(&tmp_path, serde_json::to_vec(&triplet)?)?;
            fs::rename(&tmp_path, &path)?;

            Ok(Some(triplet))
        }
    }
}

/// `albums_already_synced(disk_album, online_album, force)` (§4.3).
pub fn albums_already_synced(disk_album: &Album, online_album: &Album, force: bool) -> bool {
    if force {
        return false;
    }

    let Some(disk_info) = &disk_album.disk_info else {
        return false;
    };
    let Some(online_info) = &online_album.online_info else {
        return false;
    };
    let Some(triplet) = &disk_info.sync_triplet else {
        return false;
    };

    if (triplet.online_time - online_info.last_updated).abs() > DELTA {
        return false;
    }

    match mtime_epoch(&disk_info.disk_path) {
        Ok(current_disk_time) => (triplet.disk_time - current_disk_time).abs() <= DELTA,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_never_synced() {
        let dir = tempdir().unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn malformed_file_deletes_itself() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SYNC_DATA_FILENAME);
        fs::write(&path, "not json").unwrap();

        assert!(load(dir.path()).is_none());
        assert!(!path.exists());
    }

    #[test]
    fn remember_sync_round_trips() {
        let dir = tempdir().unwrap();
        let triplet = remember_sync(dir.path(), Some(1000.0)).unwrap().unwrap();
        assert_eq!(triplet.online_time, 1000.0);

        let reloaded = load(dir.path()).unwrap();
        assert_eq!(reloaded.online_time, 1000.0);
    }

    #[test]
    fn remember_sync_none_deletes_file() {
        let dir = tempdir().unwrap();
        remember_sync(dir.path(), Some(1.0)).unwrap();
        remember_sync(dir.path(), None).unwrap();
        assert!(load(dir.path()).is_none());
    }

    #[test]
    fn delta_threshold_is_inclusive_at_exactly_360() {
        let dir = tempdir().unwrap();
        let disk_info_path = dir.path();
        let triplet = SyncTriplet {
            sync_time: 0.0,
            online_time: 1000.0,
            disk_time: mtime_epoch(disk_info_path).unwrap(),
        };

        let mut disk_album = Album::new(std::path::PathBuf::from("A"));
        disk_album.disk_info = Some(crate::model::DiskAlbumInfo {
            disk_path: disk_info_path.to_path_buf(),
            sync_triplet: Some(triplet),
        });

        let mut online_album = Album::new(std::path::PathBuf::from("A"));
        online_album.online_info = Some(crate::model::OnlineAlbumInfo {
            uri: "/x".into(),
            images_uri: "/x!images".into(),
            last_updated: 1000.0 + DELTA,
            image_count: 0,
        });

        assert!(albums_already_synced(&disk_album, &online_album, false));

        online_album.online_info.as_mut().unwrap().last_updated = 1000.0 + DELTA + 1.0;
        assert!(!albums_already_synced(&disk_album, &online_album, false));
    }
}
