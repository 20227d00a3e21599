//! Domain-level operations against the service, layered over the raw transport (§3, §10.1).
//!
//! Grounded in `original_source/sync2smugmug/online/online.py`
//! (`OnlineConnection`), which wraps `smugmug.py`'s transport in the
//! same way this wraps [`ServiceBackend`]. Every function here takes
//! `&dyn ServiceBackend` rather than the concrete `ServiceClient` so
//! tests can substitute an in-memory fake (§12).

use std::path::{Path, PathBuf};

use serde_json::json;

use crate::error::ServiceError;
use crate::model::{Album, Image, OnlineAlbumInfo, OnlineFolderInfo, OnlineImageInfo};
use crate::service::types::{AlbumRecord, FolderRecord, ImageRecord, LargestVideoResponse};
use crate::service::ServiceBackend;

fn from_value<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, ServiceError> {
    serde_json::from_value(value).map_err(|e| ServiceError::MalformedResponse(e.to_string()))
}

/// Fetch a folder record and turn it into an [`OnlineFolderInfo`].
pub async fn get_folder(client: &dyn ServiceBackend, folder_relative_uri: &str) -> Result<OnlineFolderInfo, ServiceError> {
    let record = fetch_folder_record(client, folder_relative_uri).await?;
    Ok(folder_info_from_record(&record))
}

pub async fn fetch_folder_record(client: &dyn ServiceBackend, relative_uri: &str) -> Result<FolderRecord, ServiceError> {
    #[derive(serde::Deserialize)]
    struct Wrapper {
        #[serde(rename = "Folder")]
        folder: FolderRecord,
    }
    let wrapper: Wrapper = from_value(client.get(relative_uri).await?)?;
    Ok(wrapper.folder)
}

pub fn folder_info_from_record(record: &FolderRecord) -> OnlineFolderInfo {
    OnlineFolderInfo {
        uri: record.uri.clone(),
        sub_folders_uri: record.sub_folders_uri(),
        albums_uri: record.albums_uri(),
        node_uri: record.node_uri(),
    }
}

pub async fn iter_sub_folders(client: &dyn ServiceBackend, folder: &OnlineFolderInfo) -> Result<Vec<FolderRecord>, ServiceError> {
    let Some(uri) = &folder.sub_folders_uri else {
        return Ok(Vec::new());
    };
    let items = client.paginate(uri, "Folder", 100).await?;
    items.into_iter().map(from_value).collect()
}

pub async fn iter_albums(client: &dyn ServiceBackend, folder: &OnlineFolderInfo) -> Result<Vec<AlbumRecord>, ServiceError> {
    let Some(uri) = &folder.albums_uri else {
        return Ok(Vec::new());
    };
    let items = client.paginate(uri, "Album", 100).await?;
    items.into_iter().map(from_value).collect()
}

pub async fn iter_album_images(client: &dyn ServiceBackend, album: &OnlineAlbumInfo) -> Result<Vec<ImageRecord>, ServiceError> {
    let items = client.paginate(&album.images_uri, "AlbumImage", 100).await?;
    items.into_iter().map(from_value).collect()
}

/// Create a sub-folder on the service under `parent` (§7, `FOLDER_ADD`/Online).
pub async fn create_folder(client: &dyn ServiceBackend, parent: &OnlineFolderInfo, folder_name: &str) -> Result<OnlineFolderInfo, ServiceError> {
    let Some(sub_folders_uri) = &parent.sub_folders_uri else {
        return Err(ServiceError::MalformedResponse(format!("{} has no Folders uri", parent.uri)));
    };

    let body = json!({
        "Name": folder_name,
        "UrlName": crate::service::ServiceClient::encode_uri_name(folder_name),
        "Privacy": "Unlisted",
    });

    let response = client.post_json(sub_folders_uri, &body).await?;
    let record: FolderRecord = from_value(
        response
            .get("Folder")
            .cloned()
            .ok_or_else(|| ServiceError::MalformedResponse("missing Folder in response".into()))?,
    )?;

    Ok(folder_info_from_record(&record))
}

/// Create an album on the service under `parent` (§7, `ALBUM_ADD`/Online). The service's
/// API 400s on a direct POST to `FolderAlbums`, so — as in the original — this goes
/// through the `Node!children` endpoint and then re-fetches the resulting album record.
pub async fn create_album(client: &dyn ServiceBackend, parent: &OnlineFolderInfo, album_name: &str) -> Result<OnlineAlbumInfo, ServiceError> {
    let Some(node_uri) = &parent.node_uri else {
        return Err(ServiceError::MalformedResponse(format!("{} has no Node uri", parent.uri)));
    };

    let body = json!({ "Name": album_name, "Type": "Album" });
    let response = client.post_json(&format!("{node_uri}!children"), &body).await?;

    let album_uri = response
        .get("Node")
        .and_then(|n| n.get("Uris"))
        .and_then(|u| u.get("Album"))
        .and_then(|a| a.get("Uri"))
        .and_then(|u| u.as_str())
        .ok_or_else(|| ServiceError::MalformedResponse("missing Node.Uris.Album.Uri".into()))?
        .to_string();

    // The service needs a moment of eventual consistency before the Node it just created
    // resolves to a full Album record.
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    #[derive(serde::Deserialize)]
    struct Wrapper {
        #[serde(rename = "Album")]
        album: AlbumRecord,
    }
    let wrapper: Wrapper = from_value(client.get(&album_uri).await?)?;
    Ok(album_info_from_record(&wrapper.album))
}

pub fn album_info_from_record(record: &AlbumRecord) -> OnlineAlbumInfo {
    OnlineAlbumInfo {
        uri: record.uri.clone(),
        images_uri: record.images_uri(),
        last_updated: record.last_updated_epoch(),
        image_count: record.image_count,
    }
}

pub async fn delete(client: &dyn ServiceBackend, uri: &str, dry_run: bool) -> Result<bool, ServiceError> {
    if dry_run {
        return Ok(false);
    }
    client.delete(uri).await?;
    Ok(true)
}

/// Populate `album.images` from the service, skipping images still `Processing` (§3, §4.5).
pub async fn load_album_images(client: &dyn ServiceBackend, album: &mut Album) -> Result<(), ServiceError> {
    let Some(online_info) = album.online_info.clone() else {
        return Ok(());
    };

    let records = iter_album_images(client, &online_info).await?;
    let mut images = Vec::with_capacity(records.len());
    for record in records {
        if record.processing {
            continue;
        }

        let mut image = Image::new(album.relative_path.clone(), record.file_name.clone());
        image.online_info = Some(OnlineImageInfo {
            uri: record.uri.clone(),
            archived_uri: record.archived_uri.clone(),
            size: record.size(),
            is_video: record.is_video,
        });
        images.push(image);
    }

    album.images = Some(images);
    Ok(())
}

async fn download_url_for(client: &dyn ServiceBackend, image: &Image) -> Result<String, ServiceError> {
    let online_info = image
        .online_info
        .as_ref()
        .ok_or_else(|| ServiceError::MalformedResponse("image has no online info".into()))?;

    if online_info.is_video {
        let response: LargestVideoResponse = from_value(client.get(&format!("{}!largestvideo", online_info.uri)).await?)?;
        Ok(response.largest_video.url)
    } else {
        // The archived copy holds the original, full-quality photo; the base image uri
        // may point at a resized rendition.
        Ok(online_info.archived_uri.clone().unwrap_or_else(|| online_info.uri.clone()))
    }
}

/// Download `images` (assumed missing on disk) into `to_folder` (§4.6a, §7). Transfers
/// within the album run one at a time; concurrency across albums comes from the
/// dispatcher's semaphore instead.
pub async fn download_images(client: &dyn ServiceBackend, images: &[Image], to_folder: &Path, dry_run: bool) -> Result<(), ServiceError> {
    if dry_run {
        return Ok(());
    }

    for image in images {
        let image_uri = download_url_for(client, image).await?;
        let local_path = to_folder.join(&image.filename);
        client.download(&image_uri, &local_path).await?;
    }

    Ok(())
}

/// Upload `image_paths` into the album at `to_album_uri` (§7). Transfers within the album
/// run one at a time; concurrency across albums comes from the dispatcher's semaphore
/// instead.
pub async fn upload_images(client: &dyn ServiceBackend, image_paths: &[(PathBuf, String)], to_album_uri: &str, dry_run: bool) -> Result<(), ServiceError> {
    if dry_run {
        return Ok(());
    }

    for (path, name) in image_paths {
        client.upload(to_album_uri, name, path).await?;
    }

    Ok(())
}
