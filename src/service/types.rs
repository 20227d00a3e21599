//! Response shapes for the service's JSON envelope.
//!
//! Grounded in `original_source/sync2smugmug/online/smugmug.py`
//! (`SmugmugFolder`, `SmugmugAlbum`, `SmugmugImage`) — field names
//! mirror the real SmugMug API (§6.1).

use chrono::NaiveDateTime;
use serde::Deserialize;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%z";

fn parse_epoch(s: &str) -> f64 {
    // The service's dates carry a numeric offset (`%z`); fall back to naive parsing if a
    // future response ever omits it so a malformed timestamp doesn't crash the scan.
    chrono::DateTime::parse_from_str(s, DATE_FORMAT)
        .map(|d| d.timestamp() as f64)
        .or_else(|_| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .map(|d| d.and_utc().timestamp() as f64)
        })
        .unwrap_or(0.0)
}

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(rename = "Response")]
    pub response: T,
}

#[derive(Debug, Deserialize)]
pub struct UserResponse {
    #[serde(rename = "User")]
    pub user: UserRecord,
}

#[derive(Debug, Deserialize)]
pub struct UserRecord {
    #[serde(rename = "Uris")]
    pub uris: UserUris,
}

#[derive(Debug, Deserialize)]
pub struct UserUris {
    #[serde(rename = "Folder")]
    pub folder: UriRef,
}

#[derive(Debug, Deserialize)]
pub struct UriRef {
    #[serde(rename = "Uri")]
    pub uri: String,
}

#[derive(Debug, Deserialize)]
pub struct Pages {
    #[serde(rename = "Total")]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct FolderRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Uri")]
    pub uri: String,
    #[serde(rename = "Uris")]
    pub uris: FolderUris,
}

#[derive(Debug, Deserialize)]
pub struct FolderUris {
    #[serde(rename = "Folders")]
    pub folders: Option<UriRef>,
    #[serde(rename = "FolderAlbums")]
    pub folder_albums: Option<UriRef>,
    #[serde(rename = "Node")]
    pub node: Option<UriRef>,
}

impl FolderRecord {
    pub fn sub_folders_uri(&self) -> Option<String> {
        self.uris.folders.as_ref().map(|u| u.uri.clone())
    }

    pub fn albums_uri(&self) -> Option<String> {
        self.uris.folder_albums.as_ref().map(|u| u.uri.clone())
    }

    pub fn node_uri(&self) -> Option<String> {
        self.uris.node.as_ref().map(|u| u.uri.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct AlbumRecord {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Uri")]
    pub uri: String,
    #[serde(rename = "ImageCount")]
    pub image_count: i64,
    #[serde(rename = "LastUpdated")]
    pub last_updated: String,
    #[serde(rename = "ImagesLastUpdated")]
    pub images_last_updated: String,
    #[serde(rename = "Uris")]
    pub uris: AlbumUris,
}

#[derive(Debug, Deserialize)]
pub struct AlbumUris {
    #[serde(rename = "AlbumImages")]
    pub album_images: UriRef,
}

impl AlbumRecord {
    pub fn images_uri(&self) -> String {
        self.uris.album_images.uri.clone()
    }

    /// The epoch of the later of `LastUpdated`/`ImagesLastUpdated`, for easy persistence.
    pub fn last_updated_epoch(&self) -> f64 {
        parse_epoch(&self.last_updated).max(parse_epoch(&self.images_last_updated))
    }
}

#[derive(Debug, Deserialize)]
pub struct ImageRecord {
    #[serde(rename = "FileName")]
    pub file_name: String,
    #[serde(rename = "Uri")]
    pub uri: String,
    #[serde(rename = "IsVideo")]
    pub is_video: bool,
    #[serde(rename = "ArchivedUri")]
    pub archived_uri: Option<String>,
    #[serde(rename = "Processing", default)]
    pub processing: bool,
    #[serde(rename = "OriginalSize")]
    pub original_size: Option<u64>,
    #[serde(rename = "ArchivedSize")]
    pub archived_size: Option<u64>,
    #[serde(rename = "Uris")]
    pub uris: ImageUris,
}

#[derive(Debug, Deserialize, Default)]
pub struct ImageUris {
    #[serde(rename = "LargestVideo")]
    pub largest_video: Option<UriRef>,
}

impl ImageRecord {
    pub fn size(&self) -> Option<u64> {
        self.original_size.or(self.archived_size)
    }
}

#[derive(Debug, Deserialize)]
pub struct LargestVideoResponse {
    #[serde(rename = "LargestVideo")]
    pub largest_video: LargestVideoRecord,
}

#[derive(Debug, Deserialize)]
pub struct LargestVideoRecord {
    #[serde(rename = "Url")]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub stat: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_service_date_format() {
        let epoch = parse_epoch("2023-07-01T10:00:00+0000");
        assert!(epoch > 0.0);
    }
}
