//! Remote (service-side) tree scanner (§4.2).
//!
//! Grounded in `original_source/src/sync2smugmug/scan/online_scanner.py`
//! (`scan`, `_scan_recursive`): fetch the root folder, then recurse
//! depth-first picking up albums before sub-folders at each level,
//! skipping the dedicated test folder along the way.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::ServiceError;
use crate::model::{Album, Folder, RootFolder};
use crate::online;
use crate::service::ServiceBackend;

/// Discover the entire folder/album hierarchy rooted at `client.root_folder_uri()`.
pub async fn scan(client: &Arc<dyn ServiceBackend>) -> Result<RootFolder, ServiceError> {
    info!("Scanning the service (starting from {})...", client.root_folder_uri());

    let mut root = RootFolder::new();
    root.folder.online_info = Some(online::get_folder(client.as_ref(), client.root_folder_uri()).await?);

    scan_recursive(Arc::clone(client), &mut root.folder, &mut root.stats).await?;

    Ok(root)
}

fn scan_recursive<'a>(
    client: Arc<dyn ServiceBackend>,
    folder: &'a mut Folder,
    stats: &'a mut crate::model::Stats,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ServiceError>> + Send + 'a>> {
    Box::pin(async move {
        let Some(online_info) = folder.online_info.clone() else {
            return Ok(());
        };

        for album_record in online::iter_albums(client.as_ref(), &online_info).await? {
            let album_name = album_record.name.clone();
            let album_relative_path = folder.relative_path.join(&album_name);

            let mut album = Album::new(album_relative_path);
            album.image_count = album_record.image_count;
            album.online_info = Some(online::album_info_from_record(&album_record));

            stats.album_count += 1;
            stats.image_count += album.image_count as u64;
            folder.albums.insert(album_name, album);
        }

        for sub_folder_record in online::iter_sub_folders(client.as_ref(), &online_info).await? {
            let sub_folder_info = online::folder_info_from_record(&sub_folder_record);

            if client.is_test_root_folder_uri(&sub_folder_info.uri) {
                debug!("Skipping test folder {}", sub_folder_info.uri);
                continue;
            }

            let sub_folder_name = sub_folder_record.name.clone();
            let mut sub_folder = Folder::new(folder.relative_path.join(&sub_folder_name));
            sub_folder.online_info = Some(sub_folder_info);

            scan_recursive(Arc::clone(&client), &mut sub_folder, stats).await?;

            stats.folder_count += 1;
            folder.sub_folders.insert(sub_folder_name, sub_folder);
        }

        debug!("{} - scanned ({} albums)", folder.relative_path.display(), folder.albums.len());
        Ok(())
    })
}
