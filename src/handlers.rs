//! Canonical event handlers (§7).
//!
//! Grounded in `original_source/sync2smugmug/handlers.py`. Dispatch is
//! a static match over [`EventData`] + [`EventGroup`] rather than a
//! runtime string-keyed registry (see [`crate::events`] for why), but
//! each arm below is a direct translation of one `@event_manager.subscribe`
//! handler.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::events::{
    AlbumEventData, DeleteAlbumEventData, DeleteFolderEventData, EventContext, EventData, EventGroup, FolderEventData,
    SyncAlbumImagesEventData,
};
use crate::model::{Album, DiskFolderInfo, Folder};
use crate::online;
use crate::scan::local;
use crate::sync_cache;
use crate::transfer;

pub async fn dispatch(event_data: EventData, ctx: Arc<EventContext>) -> Result<bool> {
    match event_data {
        EventData::FolderAdd(data) => match ctx.group {
            EventGroup::Online => upload_folder(data, ctx).await,
            EventGroup::Disk => download_folder(data, ctx).await,
        },
        EventData::AlbumAdd(data) => match ctx.group {
            EventGroup::Online => upload_album(data, ctx).await,
            EventGroup::Disk => download_album(data, ctx).await,
        },
        EventData::FolderDelete(data) => match ctx.group {
            EventGroup::Online => delete_folder_online(data, ctx).await,
            EventGroup::Disk => delete_folder_on_disk(data, ctx).await,
        },
        EventData::AlbumDelete(data) => match ctx.group {
            EventGroup::Online => delete_album_online(data, ctx).await,
            EventGroup::Disk => delete_album_on_disk(data, ctx).await,
        },
        EventData::AlbumSync(data) => sync_album(data, ctx).await,
    }
}

/// `OnlineEventGroup.FOLDER_ADD` — upload a whole disk subtree as a new service folder.
async fn upload_folder(data: FolderEventData, ctx: Arc<EventContext>) -> Result<bool> {
    let parent_online_info = {
        let tree = ctx.target_tree.lock().await;
        let parent = tree
            .find_folder(&data.target_parent_path)
            .ok_or_else(|| anyhow::anyhow!("target parent {:?} missing from tree", data.target_parent_path))?;
        parent.online_info.clone().ok_or_else(|| anyhow::anyhow!("target parent has no online info"))?
    };

    let online_info = if ctx.dry_run {
        None
    } else {
        Some(online::create_folder(ctx.client.as_ref(), &parent_online_info, &data.source_folder.name()).await?)
    };

    let relative_path = data.target_parent_path.join(data.source_folder.name());
    let mut folder = Folder::new(relative_path.clone());
    folder.online_info = online_info;
    let name = folder.name();

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.target_parent_path) {
            parent.sub_folders.insert(name, folder);
        }
    }

    for sub_folder in data.source_folder.sub_folders.values() {
        let event = EventData::FolderAdd(FolderEventData {
            source_folder: sub_folder.clone(),
            target_parent_path: relative_path.clone(),
        });
        ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
    }

    for album in data.source_folder.albums.values() {
        let event = EventData::AlbumAdd(AlbumEventData {
            source_album: album.clone(),
            target_parent_path: relative_path.clone(),
        });
        ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
    }

    Ok(true)
}

/// `DiskEventGroup.FOLDER_ADD` — download a whole service subtree into a new disk folder.
async fn download_folder(data: FolderEventData, ctx: Arc<EventContext>) -> Result<bool> {
    let parent_disk_path = {
        let tree = ctx.target_tree.lock().await;
        let parent = tree
            .find_folder(&data.target_parent_path)
            .ok_or_else(|| anyhow::anyhow!("target parent {:?} missing from tree", data.target_parent_path))?;
        parent.disk_info.clone().ok_or_else(|| anyhow::anyhow!("target parent has no disk info"))?.disk_path
    };

    let disk_info = local::create_folder(&parent_disk_path, &data.source_folder.name(), ctx.dry_run)?;
    let relative_path = data.target_parent_path.join(data.source_folder.name());
    let mut folder = Folder::new(relative_path.clone());
    folder.disk_info = Some(DiskFolderInfo {
        disk_path: disk_info.disk_path,
    });
    let name = folder.name();

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.target_parent_path) {
            parent.sub_folders.insert(name, folder);
        }
    }

    for sub_folder in data.source_folder.sub_folders.values() {
        let event = EventData::FolderAdd(FolderEventData {
            source_folder: sub_folder.clone(),
            target_parent_path: relative_path.clone(),
        });
        ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
    }

    for album in data.source_folder.albums.values() {
        let event = EventData::AlbumAdd(AlbumEventData {
            source_album: album.clone(),
            target_parent_path: relative_path.clone(),
        });
        ctx.bus.fire_event(event, Arc::clone(&ctx)).await;
    }

    Ok(true)
}

/// `DiskEventGroup.FOLDER_DELETE`
async fn delete_folder_on_disk(data: DeleteFolderEventData, ctx: Arc<EventContext>) -> Result<bool> {
    if !ctx.dry_run {
        if let Some(disk_info) = &data.target.disk_info {
            std::fs::remove_dir_all(&disk_info.disk_path)?;
        }
    }

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.parent_path) {
            parent.sub_folders.remove(&data.target.name());
        }
    }

    info!("Deleted folder {} (dry_run={})", data.target.relative_path.display(), ctx.dry_run);
    Ok(true)
}

/// `DiskEventGroup.ALBUM_DELETE`
async fn delete_album_on_disk(data: DeleteAlbumEventData, ctx: Arc<EventContext>) -> Result<bool> {
    if !ctx.dry_run {
        if let Some(disk_info) = &data.target.disk_info {
            std::fs::remove_dir_all(&disk_info.disk_path)?;
        }
    }

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.parent_path) {
            parent.albums.remove(&data.target.name());
        }
    }

    info!("Deleted album {} (dry_run={})", data.target.relative_path.display(), ctx.dry_run);
    Ok(true)
}

/// `OnlineEventGroup.FOLDER_DELETE`
async fn delete_folder_online(data: DeleteFolderEventData, ctx: Arc<EventContext>) -> Result<bool> {
    let changed = match &data.target.online_info {
        Some(info) => online::delete(ctx.client.as_ref(), &info.uri, ctx.dry_run).await?,
        None => false,
    };

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.parent_path) {
            parent.sub_folders.remove(&data.target.name());
        }
    }

    info!("Deleted folder {} (dry_run={})", data.target.relative_path.display(), ctx.dry_run);
    Ok(changed)
}

/// `OnlineEventGroup.ALBUM_DELETE`
async fn delete_album_online(data: DeleteAlbumEventData, ctx: Arc<EventContext>) -> Result<bool> {
    let changed = match &data.target.online_info {
        Some(info) => online::delete(ctx.client.as_ref(), &info.uri, ctx.dry_run).await?,
        None => false,
    };

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.parent_path) {
            parent.albums.remove(&data.target.name());
        }
    }

    info!("Deleted album {} (dry_run={})", data.target.relative_path.display(), ctx.dry_run);
    Ok(changed)
}

/// `OnlineEventGroup.ALBUM_ADD` — create the album on the service, then upload every image.
async fn upload_album(data: AlbumEventData, ctx: Arc<EventContext>) -> Result<bool> {
    let parent_online_info = {
        let tree = ctx.target_tree.lock().await;
        let parent = tree
            .find_folder(&data.target_parent_path)
            .ok_or_else(|| anyhow::anyhow!("target parent {:?} missing from tree", data.target_parent_path))?;
        parent.online_info.clone().ok_or_else(|| anyhow::anyhow!("target parent has no online info"))?
    };

    let disk_album = data.source_album;
    let online_info = if ctx.dry_run {
        None
    } else {
        Some(online::create_album(ctx.client.as_ref(), &parent_online_info, &disk_album.name()).await?)
    };

    let mut album = Album::new(disk_album.relative_path.clone());
    album.online_info = online_info.clone();

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.target_parent_path) {
            let name = album.name();
            parent.albums.insert(name, album);
        }
    }

    if ctx.dry_run {
        return Ok(true);
    }

    let mut online_album = Album::new(disk_album.relative_path.clone());
    online_album.online_info = online_info.clone();
    online_album.images = Some(Vec::new());

    let changed = transfer::upload_missing_images(ctx.client.as_ref(), &disk_album, &mut online_album, ctx.dry_run).await?;

    if changed {
        if let Some(disk_info) = &disk_album.disk_info {
            sync_cache::remember_sync(&disk_info.disk_path, online_album.online_info.as_ref().map(|i| i.last_updated))?;
        }
    }

    Ok(true)
}

/// `DiskEventGroup.ALBUM_ADD` — create the album directory, then download every image.
async fn download_album(data: AlbumEventData, ctx: Arc<EventContext>) -> Result<bool> {
    let parent_disk_path = {
        let tree = ctx.target_tree.lock().await;
        let parent = tree
            .find_folder(&data.target_parent_path)
            .ok_or_else(|| anyhow::anyhow!("target parent {:?} missing from tree", data.target_parent_path))?;
        parent.disk_info.clone().ok_or_else(|| anyhow::anyhow!("target parent has no disk info"))?.disk_path
    };

    let mut online_album = data.source_album;
    if online_album.requires_image_load() {
        online::load_album_images(ctx.client.as_ref(), &mut online_album).await?;
    }

    let disk_info = local::create_album(&parent_disk_path, &online_album.name(), ctx.dry_run)?;

    let mut disk_album = Album::new(online_album.relative_path.clone());
    disk_album.disk_info = Some(disk_info.clone());

    {
        let mut tree = ctx.target_tree.lock().await;
        if let Some(parent) = tree.find_folder_mut(&data.target_parent_path) {
            let name = disk_album.name();
            parent.albums.insert(name, disk_album.clone());
        }
    }

    let changed = transfer::download_missing_images(ctx.client.as_ref(), &online_album, &mut disk_album, ctx.dry_run).await?;

    if changed && !ctx.dry_run {
        if let Some(online_info) = &online_album.online_info {
            sync_cache::remember_sync(&disk_info.disk_path, Some(online_info.last_updated))?;
        }
    }

    Ok(changed)
}

/// `DiskEventGroup.ALBUM_SYNC` (the only sync action, shared by both directions; §7).
async fn sync_album(data: SyncAlbumImagesEventData, ctx: Arc<EventContext>) -> Result<bool> {
    let mut disk_album = data.disk_album;
    let mut online_album = data.online_album;
    let mut changed = false;

    if online_album.requires_image_load() {
        online::load_album_images(ctx.client.as_ref(), &mut online_album).await?;
    }
    if disk_album.requires_image_load() {
        local::load_album_images(&mut disk_album);
    }

    if data.sync_action.download {
        changed |= transfer::download_missing_images(ctx.client.as_ref(), &online_album, &mut disk_album, ctx.dry_run).await?;
    }

    if data.sync_action.upload {
        changed |= transfer::upload_missing_images(ctx.client.as_ref(), &disk_album, &mut online_album, ctx.dry_run).await?;
    }

    if data.sync_action.delete_on_disk {
        let online_images = online_album.images.as_deref().unwrap_or(&[]);
        for image in disk_album.images.as_deref().unwrap_or(&[]) {
            if !online_images.iter().any(|o| crate::model::images_are_the_same(o, image)) {
                local::delete_image_from_disk(image, ctx.dry_run)?;
            }
        }
    }

    if data.sync_action.delete_online {
        let disk_images = disk_album.images.as_deref().unwrap_or(&[]);
        for image in online_album.images.as_deref().unwrap_or(&[]) {
            if !disk_images.iter().any(|d| crate::model::images_are_the_same(d, image)) {
                if let Some(info) = &image.online_info {
                    online::delete(ctx.client.as_ref(), &info.uri, ctx.dry_run).await?;
                }
            }
        }
    }

    if changed {
        local::load_album_images(&mut disk_album);
        online::load_album_images(ctx.client.as_ref(), &mut online_album).await?;
    }

    if !ctx.dry_run {
        if let (Some(disk_info), Some(online_info)) = (&disk_album.disk_info, &online_album.online_info) {
            sync_cache::remember_sync(&disk_info.disk_path, Some(online_info.last_updated))?;
        }
    }

    Ok(changed)
}
