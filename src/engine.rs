//! Tree reconciliation engine (§5).
//!
//! Grounded in `original_source/src/sync2smugmug/sync.py`
//! (`synchronize`, `synchronize_folders`, `synchronize_albums`,
//! `compare_disk_and_online_albums`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::dispatcher::PassSummary;
use crate::events::{
    AlbumEventData, DeleteAlbumEventData, DeleteFolderEventData, EventContext, EventData, EventGroup, FolderEventData,
    SyncAlbumImagesEventData,
};
use crate::model::{Album, Folder};
use crate::online;
use crate::policy::SyncAction;
use crate::service::ServiceBackend;
use crate::sync_cache;

/// Synchronize `on_disk` and `on_line` according to `sync_action`. Upload takes the disk
/// tree as source of truth; download takes the service tree. Running both in one
/// invocation (as the CLI allows) performs them as two independent passes. Returns the
/// combined submitted/processed totals and per-event-kind counts, for the end-of-run
/// summary (§6, §11).
pub async fn synchronize(
    on_disk: Folder,
    on_line: Folder,
    sync_action: &SyncAction,
    client: Arc<dyn ServiceBackend>,
    dry_run: bool,
    force_refresh: bool,
) -> Result<PassSummary> {
    let mut summary = PassSummary::default();

    if sync_action.upload {
        let target_tree = Arc::new(Mutex::new(on_line.clone()));
        summary.merge(run_pass(on_disk.clone(), target_tree, EventGroup::Online, sync_action, Arc::clone(&client), dry_run, force_refresh).await?);
    }

    if sync_action.download {
        let target_tree = Arc::new(Mutex::new(on_disk.clone()));
        summary.merge(run_pass(on_line.clone(), target_tree, EventGroup::Disk, sync_action, client, dry_run, force_refresh).await?);
    }

    if !sync_action.upload && !sync_action.download {
        tracing::warn!("Neither download nor upload was requested");
    }

    info!("Synchronization complete.");
    Ok(summary)
}

async fn run_pass(
    source: Folder,
    target_tree: Arc<Mutex<Folder>>,
    group: EventGroup,
    sync_action: &SyncAction,
    client: Arc<dyn ServiceBackend>,
    dry_run: bool,
    force_refresh: bool,
) -> Result<PassSummary> {
    let bus = crate::dispatcher::EventBus::new();
    let ctx = Arc::new(EventContext {
        group,
        client,
        target_tree,
        bus: Arc::clone(&bus),
        dry_run,
    });

    synchronize_folders(&source, true, Arc::clone(&ctx), *sync_action, force_refresh).await?;
    bus.join().await?;

    let summary = bus.summary().await;
    info!("{:?} pass done: {} events processed", group, summary.total_processed);
    debug_assert_eq!(summary.total_submitted, summary.total_processed);

    Ok(summary)
}

/// Recursively sync `source_folder` into the shared target tree. `target_exists` tells
/// us whether a same-path node exists yet in the target (false triggers a whole-subtree
/// `FOLDER_ADD`; true recurses into children).
async fn synchronize_folders(
    source_folder: &Folder,
    target_exists: bool,
    ctx: Arc<EventContext>,
    sync_action: SyncAction,
    force_refresh: bool,
) -> Result<()> {
    ctx.bus.join().await?;

    if !source_folder.relative_path.as_os_str().is_empty() {
        debug!("Synchronizing {}", source_folder.relative_path.display());
    }

    if !target_exists {
        let target_parent_path = source_folder
            .relative_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        info!("[++] {}", source_folder.relative_path.display());

        let event = EventData::FolderAdd(FolderEventData {
            source_folder: source_folder.clone(),
            target_parent_path,
        });
        ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
        return Ok(());
    }

    let target_path = source_folder.relative_path.clone();

    let mut album_names: Vec<&String> = source_folder.albums.keys().collect();
    album_names.sort();
    for album_name in album_names {
        let source_album = &source_folder.albums[album_name];
        if source_album.image_count == 0 {
            continue;
        }

        let target_album = {
            let tree = ctx.target_tree.lock().await;
            tree.find_folder(&target_path)
                .and_then(|f| f.albums.get(album_name))
                .cloned()
        };

        synchronize_albums(source_album, target_album, target_path.clone(), Arc::clone(&ctx), &sync_action, force_refresh).await?;
    }

    let mut folder_names: Vec<&String> = source_folder.sub_folders.keys().collect();
    folder_names.sort();
    for folder_name in folder_names {
        let source_sub_folder = &source_folder.sub_folders[folder_name];
        let target_sub_exists = {
            let tree = ctx.target_tree.lock().await;
            tree.find_folder(&target_path).map(|f| f.sub_folders.contains_key(folder_name)).unwrap_or(false)
        };

        Box::pin(synchronize_folders(source_sub_folder, target_sub_exists, Arc::clone(&ctx), sync_action, force_refresh)).await?;
    }

    if ctx.group.delete_permitted(&sync_action) {
        let (sub_folders_to_delete, albums_to_delete) = {
            let tree = ctx.target_tree.lock().await;
            let Some(target_folder) = tree.find_folder(&target_path) else {
                return Ok(());
            };

            let sub_folders_to_delete: Vec<Folder> = target_folder
                .sub_folders
                .iter()
                .filter(|(name, _)| !source_folder.sub_folders.contains_key(*name))
                .map(|(_, f)| f.clone())
                .collect();

            let albums_to_delete: Vec<Album> = target_folder
                .albums
                .iter()
                .filter(|(name, _)| !source_folder.albums.contains_key(*name))
                .map(|(_, a)| a.clone())
                .collect();

            (sub_folders_to_delete, albums_to_delete)
        };

        for folder in sub_folders_to_delete {
            info!("[--] {}", folder.relative_path.display());
            let event = EventData::FolderDelete(DeleteFolderEventData {
                target: folder,
                parent_path: target_path.clone(),
            });
            ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
        }

        for album in albums_to_delete {
            info!("[--] {}", album.relative_path.display());
            let event = EventData::AlbumDelete(DeleteAlbumEventData {
                target: album,
                parent_path: target_path.clone(),
            });
            ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
        }
    }

    Ok(())
}

async fn synchronize_albums(
    source_album: &Album,
    target_album: Option<Album>,
    target_parent_path: PathBuf,
    ctx: Arc<EventContext>,
    sync_action: &SyncAction,
    force_refresh: bool,
) -> Result<()> {
    let Some(target_album) = target_album else {
        info!("[++] {}", source_album.relative_path.display());
        let event = EventData::AlbumAdd(AlbumEventData {
            source_album: source_album.clone(),
            target_parent_path,
        });
        ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
        return Ok(());
    };

    let (mut disk_album, mut online_album) = if source_album.is_on_disk() {
        (source_album.clone(), target_album)
    } else {
        (target_album, source_album.clone())
    };

    let (content_is_the_same, it_was_quick) =
        compare_disk_and_online_albums(&mut disk_album, &mut online_album, ctx.client.as_ref(), force_refresh).await?;

    if !content_is_the_same {
        info!("[<>] {} != {}", disk_album.relative_path.display(), online_album.relative_path.display());

        let event = EventData::AlbumSync(SyncAlbumImagesEventData {
            disk_album: disk_album.clone(),
            online_album: online_album.clone(),
            sync_action: *sync_action,
        });
        ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
    } else {
        debug!("[==] {}", source_album.relative_path.display());
    }

    let needs_sync_data = match &disk_album.disk_info {
        Some(info) => info.sync_triplet.is_none(),
        None => true,
    };

    if needs_sync_data || !it_was_quick {
        if let (Some(disk_info), Some(online_info)) = (&disk_album.disk_info, &online_album.online_info) {
            sync_cache::remember_sync(&disk_info.disk_path, Some(online_info.last_updated))?;
        }
    }

    Ok(())
}

/// Smart disk/online album comparison (§5, §12): use the sync triplet to shortcut entire
/// comparisons when possible, falling back to shallow metadata and then a full per-image
/// comparison only as a last resort, since image enumeration is the slowest service call.
///
/// Returns `(albums_are_the_same, was_this_a_quick_comparison)`.
pub async fn compare_disk_and_online_albums(
    disk_album: &mut Album,
    online_album: &mut Album,
    client: &dyn ServiceBackend,
    force_refresh: bool,
) -> Result<(bool, bool)> {
    if sync_cache::albums_already_synced(disk_album, online_album, force_refresh) {
        return Ok((true, true));
    }

    if disk_album.relative_path != online_album.relative_path {
        return Ok((false, true));
    }

    if disk_album.image_count != online_album.image_count {
        return Ok((false, true));
    }

    info!("[^^] Loading images for comparison {}", online_album.relative_path.display());

    if online_album.requires_image_load() {
        online::load_album_images(client, online_album).await?;
    }
    if disk_album.requires_image_load() {
        crate::scan::local::load_album_images(disk_album);
    }

    let mut disk_images = disk_album.images.clone().unwrap_or_default();
    let mut online_images = online_album.images.clone().unwrap_or_default();
    disk_images.sort_by_key(|i| i.relative_path());
    online_images.sort_by_key(|i| i.relative_path());

    for (disk_image, online_image) in disk_images.iter().zip(online_images.iter()) {
        if !crate::model::images_are_the_same(disk_image, online_image) {
            return Ok((false, false));
        }
    }

    Ok((true, false))
}

/// End-to-end reconciliation scenarios (§8), driving `synchronize` against a real disk
/// scan and [`crate::service::fake::FakeBackend`] standing in for the service.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fake::FakeBackend;
    use std::fs;
    use tempfile::tempdir;

    fn empty_online_root(fake: &FakeBackend) -> Folder {
        let mut root = Folder::new(PathBuf::new());
        root.online_info = Some(fake.root_folder_info());
        root
    }

    fn disk_root(base_dir: &Path) -> Folder {
        let mut root = Folder::new(PathBuf::new());
        root.disk_info = Some(crate::model::DiskFolderInfo {
            disk_path: base_dir.to_path_buf(),
        });
        root
    }

    #[tokio::test]
    async fn empty_local_downloads_one_remote_album() {
        let fake = FakeBackend::new();
        let album_info = fake.add_album(fake.root_uri(), "2023_07_01", 5_000.0);
        fake.add_image(&album_info.uri, "a.jpg", b"one", false);
        fake.add_image(&album_info.uri, "b.jpg", b"two", false);

        let mut on_line = empty_online_root(&fake);
        let mut album = Album::new(PathBuf::from("2023_07_01"));
        album.online_info = Some(album_info.clone());
        album.image_count = 2;
        on_line.albums.insert("2023_07_01".to_string(), album);

        let dir = tempdir().unwrap();
        let on_disk = disk_root(dir.path());

        let client: Arc<dyn ServiceBackend> = Arc::new(fake);
        let sync_action = crate::policy::SyncAction::from_preset("local_backup").unwrap();
        let summary = synchronize(on_disk, on_line, &sync_action, client, false, false).await.unwrap();

        assert_eq!(summary.total_submitted, summary.total_processed);
        assert_eq!(*summary.event_counts.get("album_add").unwrap(), 1);

        let album_dir = dir.path().join("2023_07_01");
        assert!(album_dir.join("a.jpg").exists());
        assert!(album_dir.join("b.jpg").exists());
        assert_eq!(fs::read(album_dir.join("a.jpg")).unwrap(), b"one");
        assert!(album_dir.join(crate::sync_cache::SYNC_DATA_FILENAME).exists());
    }

    #[tokio::test]
    async fn remote_folder_with_album_downloads_through_a_new_local_folder() {
        let fake = FakeBackend::new();
        let sub_folder_info = fake.add_folder(fake.root_uri(), "2023");
        let album_info = fake.add_album(&sub_folder_info.uri, "2023_07_01", 1_000.0);
        fake.add_image(&album_info.uri, "a.jpg", b"nested", false);

        let mut on_line = empty_online_root(&fake);
        let mut sub_folder = Folder::new(PathBuf::from("2023"));
        sub_folder.online_info = Some(sub_folder_info);
        let mut album = Album::new(PathBuf::from("2023").join("2023_07_01"));
        album.online_info = Some(album_info);
        album.image_count = 1;
        sub_folder.albums.insert("2023_07_01".to_string(), album);
        on_line.sub_folders.insert("2023".to_string(), sub_folder);

        let dir = tempdir().unwrap();
        let on_disk = disk_root(dir.path());

        let client_arc = Arc::new(fake);
        let client: Arc<dyn ServiceBackend> = client_arc.clone();
        let sync_action = crate::policy::SyncAction::from_preset("local_backup").unwrap();
        let summary = synchronize(on_disk, on_line, &sync_action, client, false, false).await.unwrap();

        assert_eq!(*summary.event_counts.get("folder_add").unwrap(), 1);
        assert_eq!(*summary.event_counts.get("album_add").unwrap(), 1);

        let image_path = dir.path().join("2023").join("2023_07_01").join("a.jpg");
        assert!(image_path.exists());
        assert_eq!(fs::read(&image_path).unwrap(), b"nested");

        let downloads = client_arc.downloads();
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].1, image_path);
    }

    #[tokio::test]
    async fn new_local_album_is_uploaded_through_a_new_folder() {
        let dir = tempdir().unwrap();
        let album_dir = dir.path().join("A").join("2023_07_01");
        fs::create_dir_all(&album_dir).unwrap();
        for name in ["1.jpg", "2.jpg", "3.jpg"] {
            fs::write(album_dir.join(name), b"content").unwrap();
        }

        let on_disk = crate::scan::local::scan(dir.path()).unwrap().folder;

        let fake = FakeBackend::new();
        let on_line = empty_online_root(&fake);

        let client: Arc<dyn ServiceBackend> = Arc::new(fake);
        let sync_action = crate::policy::SyncAction::from_preset("online_backup").unwrap();
        let summary = synchronize(on_disk, on_line, &sync_action, client, false, false).await.unwrap();

        assert_eq!(summary.total_submitted, summary.total_processed);
        assert_eq!(*summary.event_counts.get("folder_add").unwrap(), 1);
        assert_eq!(*summary.event_counts.get("album_add").unwrap(), 1);

        let triplet_path = album_dir.join(crate::sync_cache::SYNC_DATA_FILENAME);
        assert!(triplet_path.exists());
    }

    #[tokio::test]
    async fn already_synced_albums_emit_no_events() {
        let dir = tempdir().unwrap();
        let album_dir = dir.path().join("2023_07_01");
        fs::create_dir_all(&album_dir).unwrap();
        fs::write(album_dir.join("1.jpg"), b"content").unwrap();

        let fake = FakeBackend::new();
        let album_info = fake.add_album(fake.root_uri(), "2023_07_01", 0.0);
        fake.add_image(&album_info.uri, "1.jpg", b"content", false);
        let last_updated = fake.album_last_updated(&album_info.uri);

        // Record a sync triplet that matches the remote's current state and the disk
        // album's current mtime, so the quick path short-circuits the comparison.
        crate::sync_cache::remember_sync(&album_dir, Some(last_updated)).unwrap();

        let on_disk = crate::scan::local::scan(dir.path()).unwrap().folder;

        let mut on_line = empty_online_root(&fake);
        let mut album = Album::new(PathBuf::from("2023_07_01"));
        album.online_info = Some(album_info);
        album.image_count = 1;
        on_line.albums.insert("2023_07_01".to_string(), album);

        let client: Arc<dyn ServiceBackend> = Arc::new(fake);
        let sync_action = crate::policy::SyncAction::from_preset("online_backup").unwrap();
        let summary = synchronize(on_disk, on_line, &sync_action, client, false, false).await.unwrap();

        assert_eq!(summary.total_submitted, 0);
        assert_eq!(summary.total_processed, 0);
    }

    #[tokio::test]
    async fn extra_disk_image_triggers_album_sync_upload() {
        let dir = tempdir().unwrap();
        let album_dir = dir.path().join("2023_07_01");
        fs::create_dir_all(&album_dir).unwrap();
        fs::write(album_dir.join("1.jpg"), b"content").unwrap();
        fs::write(album_dir.join("2.jpg"), b"extra").unwrap();

        let fake = FakeBackend::new();
        let album_info = fake.add_album(fake.root_uri(), "2023_07_01", 0.0);
        fake.add_image(&album_info.uri, "1.jpg", b"content", false);

        let on_disk = crate::scan::local::scan(dir.path()).unwrap().folder;

        let mut on_line = empty_online_root(&fake);
        let mut album = Album::new(PathBuf::from("2023_07_01"));
        album.online_info = Some(album_info.clone());
        album.image_count = 1;
        on_line.albums.insert("2023_07_01".to_string(), album);

        let client_arc = Arc::new(fake);
        let client: Arc<dyn ServiceBackend> = client_arc.clone();
        let sync_action = crate::policy::SyncAction::from_preset("online_backup").unwrap();
        let summary = synchronize(on_disk, on_line, &sync_action, client, false, false).await.unwrap();

        assert_eq!(*summary.event_counts.get("album_sync").unwrap(), 1);
        assert!(!summary.event_counts.contains_key("album_add"));

        let uploads = client_arc.uploads();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, "2.jpg");
    }

    #[tokio::test]
    async fn online_backup_clean_deletes_remote_album_missing_on_disk() {
        let dir = tempdir().unwrap();
        // No local album on disk at all (deleted since the last run).

        let fake = FakeBackend::new();
        let album_info = fake.add_album(fake.root_uri(), "2023_07_01", 0.0);
        fake.add_image(&album_info.uri, "1.jpg", b"content", false);

        let on_disk = disk_root(dir.path());

        let mut on_line = empty_online_root(&fake);
        let mut album = Album::new(PathBuf::from("2023_07_01"));
        album.online_info = Some(album_info.clone());
        album.image_count = 1;
        on_line.albums.insert("2023_07_01".to_string(), album);

        let client_arc = Arc::new(fake);
        let client: Arc<dyn ServiceBackend> = client_arc.clone();
        let sync_action = crate::policy::SyncAction::from_preset("online_backup_clean").unwrap();
        let summary = synchronize(on_disk, on_line, &sync_action, client, false, false).await.unwrap();

        assert_eq!(*summary.event_counts.get("album_delete").unwrap(), 1);
        assert_eq!(client_arc.deletes(), vec![album_info.uri.clone()]);
    }

    #[tokio::test]
    async fn dry_run_fires_events_but_performs_no_side_effects() {
        let dir = tempdir().unwrap();
        let album_dir = dir.path().join("2023_07_01");
        fs::create_dir_all(&album_dir).unwrap();
        fs::write(album_dir.join("1.jpg"), b"content").unwrap();

        let on_disk = crate::scan::local::scan(dir.path()).unwrap().folder;

        let fake = FakeBackend::new();
        let on_line = empty_online_root(&fake);

        let client_arc = Arc::new(fake);
        let client: Arc<dyn ServiceBackend> = client_arc.clone();
        let sync_action = crate::policy::SyncAction::from_preset("online_backup").unwrap();
        let summary = synchronize(on_disk, on_line, &sync_action, client, true, false).await.unwrap();

        assert_eq!(*summary.event_counts.get("album_add").unwrap(), 1);
        assert!(client_arc.uploads().is_empty());
        assert!(!album_dir.join(crate::sync_cache::SYNC_DATA_FILENAME).exists());
    }
}
