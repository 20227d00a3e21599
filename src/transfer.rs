//! Image transfer primitive shared by every handler that moves images (§7, §9).
//!
//! Grounded in `original_source/sync2smugmug/online/online.py`
//! (`download_missing_images`, `upload_missing_images`): diff the two
//! albums' image lists by relative path, then transfer only what's
//! missing on the target side.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::error::ServiceError;
use crate::model::Album;
use crate::online;
use crate::scan::local;
use crate::service::ServiceBackend;

/// Download every image present in `online_album` but missing from `disk_album`, then
/// reload `disk_album`'s image list to reflect what landed on disk.
pub async fn download_missing_images(
    client: &dyn ServiceBackend,
    online_album: &Album,
    disk_album: &mut Album,
    dry_run: bool,
) -> Result<bool, ServiceError> {
    let disk_paths: HashSet<PathBuf> = disk_album
        .images
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|i| i.relative_path())
        .collect();

    let missing: Vec<_> = online_album
        .images
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter(|i| !disk_paths.contains(&i.relative_path()))
        .cloned()
        .collect();

    if missing.is_empty() {
        return Ok(false);
    }

    let Some(disk_info) = &disk_album.disk_info else {
        return Err(ServiceError::MalformedResponse("download target has no disk info".into()));
    };

    online::download_images(client, &missing, &disk_info.disk_path, dry_run).await?;
    local::load_album_images(disk_album);

    Ok(true)
}

/// Upload every image present in `disk_album` but missing from `online_album`, then
/// reload `online_album`'s image list to reflect what was just uploaded.
pub async fn upload_missing_images(
    client: &dyn ServiceBackend,
    disk_album: &Album,
    online_album: &mut Album,
    dry_run: bool,
) -> Result<bool, ServiceError> {
    let Some(online_info) = &online_album.online_info else {
        return Err(ServiceError::MalformedResponse("upload target has no online info".into()));
    };
    let online_uri = online_info.uri.clone();

    let online_paths: HashSet<PathBuf> = online_album
        .images
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .map(|i| i.relative_path())
        .collect();

    let to_upload: Vec<(PathBuf, String)> = disk_album
        .images
        .as_deref()
        .unwrap_or(&[])
        .iter()
        .filter(|i| !online_paths.contains(&i.relative_path()))
        .filter_map(|i| i.disk_info.as_ref().map(|d| (d.disk_path.clone(), i.filename.clone())))
        .collect();

    if to_upload.is_empty() {
        return Ok(false);
    }

    online::upload_images(client, &to_upload, &online_uri, dry_run).await?;

    if !dry_run {
        online::load_album_images(client, online_album).await?;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DiskAlbumInfo, DiskImageInfo, Image};
    use crate::service::ServiceClient;
    use std::path::PathBuf;

    #[tokio::test]
    async fn downloading_with_nothing_missing_is_a_no_op() {
        let mut disk_album = Album::new(PathBuf::from("A"));
        disk_album.disk_info = Some(DiskAlbumInfo {
            disk_path: PathBuf::from("/tmp/A"),
            sync_triplet: None,
        });

        let mut image = Image::new(PathBuf::from("A"), "a.jpg".to_string());
        image.disk_info = Some(DiskImageInfo {
            disk_path: PathBuf::from("/tmp/A/a.jpg"),
            size: 10,
        });
        disk_album.images = Some(vec![image.clone()]);

        let mut online_album = Album::new(PathBuf::from("A"));
        online_album.images = Some(vec![image]);

        let client = ServiceClient::for_test();
        let changed = download_missing_images(&client, &online_album, &mut disk_album, true).await.unwrap();
        assert!(!changed);
    }

    #[tokio::test]
    async fn uploading_with_nothing_missing_is_a_no_op() {
        let mut image = Image::new(PathBuf::from("A"), "a.jpg".to_string());
        image.disk_info = Some(DiskImageInfo {
            disk_path: PathBuf::from("/tmp/A/a.jpg"),
            size: 10,
        });

        let mut disk_album = Album::new(PathBuf::from("A"));
        disk_album.images = Some(vec![image.clone()]);

        let mut online_album = Album::new(PathBuf::from("A"));
        online_album.online_info = Some(crate::model::OnlineAlbumInfo {
            uri: "/album/A".into(),
            images_uri: "/album/A!images".into(),
            last_updated: 0.0,
            image_count: 1,
        });
        online_album.images = Some(vec![image]);

        let client = ServiceClient::for_test();
        let changed = upload_missing_images(&client, &disk_album, &mut online_album, true).await.unwrap();
        assert!(!changed);
    }
}
