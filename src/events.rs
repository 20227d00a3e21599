//! Event taxonomy for the two sync directions (§6).
//!
//! Grounded in `original_source/sync2smugmug/events.py`. An `EventGroup`
//! names which five canonical events drive a sync direction and
//! whether that direction is allowed to delete.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::dispatcher::EventBus;
use crate::model::{Album, Folder};
use crate::policy::SyncAction;
use crate::service::ServiceBackend;

/// Which direction a sync event group drives, and whether deletes are permitted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventGroup {
    /// Source of truth is disk; events push to the service (upload).
    Online,
    /// Source of truth is the service; events push to disk (download).
    Disk,
}

impl EventGroup {
    pub fn delete_permitted(self, sync_action: &SyncAction) -> bool {
        match self {
            EventGroup::Online => sync_action.delete_online,
            EventGroup::Disk => sync_action.delete_on_disk,
        }
    }
}

#[derive(Clone)]
pub struct FolderEventData {
    pub source_folder: Folder,
    pub target_parent_path: PathBuf,
}

#[derive(Clone)]
pub struct AlbumEventData {
    pub source_album: Album,
    pub target_parent_path: PathBuf,
}

#[derive(Clone)]
pub struct SyncAlbumImagesEventData {
    pub disk_album: Album,
    pub online_album: Album,
    pub sync_action: SyncAction,
}

#[derive(Clone)]
pub struct DeleteFolderEventData {
    pub target: Folder,
    pub parent_path: PathBuf,
}

#[derive(Clone)]
pub struct DeleteAlbumEventData {
    pub target: Album,
    pub parent_path: PathBuf,
}

/// Payload carried by every fired event: which handler runs and the node-specific data
/// (§6, §7). Rust's enum exhaustiveness gives the same "one of five kinds" guarantee the
/// original's string-keyed handler registry enforced at runtime, so dispatch (§13) matches
/// on this enum plus `EventContext::group` instead of looking handlers up by name.
#[derive(Clone)]
pub enum EventData {
    FolderAdd(FolderEventData),
    AlbumAdd(AlbumEventData),
    FolderDelete(DeleteFolderEventData),
    AlbumDelete(DeleteAlbumEventData),
    AlbumSync(SyncAlbumImagesEventData),
}

impl EventData {
    /// Stable label for the per-event-kind summary counters (§6).
    pub fn kind(&self) -> &'static str {
        match self {
            EventData::FolderAdd(_) => "folder_add",
            EventData::AlbumAdd(_) => "album_add",
            EventData::FolderDelete(_) => "folder_delete",
            EventData::AlbumDelete(_) => "album_delete",
            EventData::AlbumSync(_) => "album_sync",
        }
    }
}

/// Everything a handler needs: which direction it's running in, the service connection,
/// the shared mutable target tree, the bus to fan further events out through, and the
/// dry-run flag.
pub struct EventContext {
    pub group: EventGroup,
    pub client: Arc<dyn ServiceBackend>,
    pub target_tree: Arc<Mutex<Folder>>,
    pub bus: Arc<EventBus>,
    pub dry_run: bool,
}
