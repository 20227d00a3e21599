//! In-memory double for [`super::ServiceBackend`], used only by tests that drive the
//! engine/dispatcher/handlers end to end without a live connection (§12).
//!
//! URIs are synthesized with suffix conventions (`!folders`, `!folderalbums`, `!node`,
//! `!images`, `!archived`, `!videofile`, `!largestvideo`) so every operation can recover
//! "which node does this URI belong to, and what role does it play" by stripping a known
//! suffix, instead of a side-table of parent pointers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::{json, Value};

use crate::error::ServiceError;
use crate::model::{OnlineAlbumInfo, OnlineFolderInfo, OnlineImageInfo};

use super::backend::{BoxFuture, ServiceBackend};

#[derive(Clone)]
struct FakeFolder {
    name: String,
    uri: String,
    sub_folder_uris: Vec<String>,
    album_uris: Vec<String>,
}

#[derive(Clone)]
struct FakeAlbum {
    name: String,
    uri: String,
    last_updated: f64,
    image_uris: Vec<String>,
}

#[derive(Clone)]
struct FakeImage {
    file_name: String,
    uri: String,
    is_video: bool,
    processing: bool,
    content: Vec<u8>,
}

#[derive(Default)]
struct State {
    folders: HashMap<String, FakeFolder>,
    albums: HashMap<String, FakeAlbum>,
    images: HashMap<String, FakeImage>,
}

pub struct FakeBackend {
    state: Mutex<State>,
    next_id: AtomicU64,
    root_uri: String,
    downloads: Mutex<Vec<(String, PathBuf)>>,
    uploads: Mutex<Vec<(String, String)>>,
    deletes: Mutex<Vec<String>>,
}

fn folder_json(f: &FakeFolder) -> Value {
    json!({
        "Name": f.name,
        "Uri": f.uri,
        "Uris": {
            "Folders": { "Uri": format!("{}!folders", f.uri) },
            "FolderAlbums": { "Uri": format!("{}!folderalbums", f.uri) },
            "Node": { "Uri": format!("{}!node", f.uri) },
        }
    })
}

fn album_json(a: &FakeAlbum) -> Value {
    let stamp = format_epoch(a.last_updated);
    json!({
        "Name": a.name,
        "Uri": a.uri,
        "ImageCount": a.image_uris.len() as i64,
        "LastUpdated": stamp,
        "ImagesLastUpdated": stamp,
        "Uris": { "AlbumImages": { "Uri": format!("{}!images", a.uri) } },
    })
}

fn image_json(i: &FakeImage) -> Value {
    json!({
        "FileName": i.file_name,
        "Uri": i.uri,
        "IsVideo": i.is_video,
        "ArchivedUri": if i.is_video { Value::Null } else { json!(format!("{}!archived", i.uri)) },
        "Processing": i.processing,
        "OriginalSize": i.content.len() as u64,
        "Uris": {},
    })
}

fn format_epoch(epoch: f64) -> String {
    chrono::DateTime::from_timestamp(epoch as i64, 0)
        .unwrap_or_default()
        .format("%Y-%m-%dT%H:%M:%S+0000")
        .to_string()
}

impl FakeBackend {
    pub fn new() -> Self {
        let root_uri = "/api/v2/folder/root".to_string();
        let mut state = State::default();
        state.folders.insert(
            root_uri.clone(),
            FakeFolder {
                name: "root".into(),
                uri: root_uri.clone(),
                sub_folder_uris: Vec::new(),
                album_uris: Vec::new(),
            },
        );
        Self {
            state: Mutex::new(state),
            next_id: AtomicU64::new(1),
            root_uri,
            downloads: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
        }
    }

    fn fresh_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn root_uri(&self) -> &str {
        &self.root_uri
    }

    pub fn root_folder_info(&self) -> OnlineFolderInfo {
        let state = self.state.lock().unwrap();
        let f = state.folders.get(&self.root_uri).expect("root always present");
        folder_info(f)
    }

    /// Seed a sub-folder directly (bypassing `create_folder`), for building the "existing
    /// remote state" half of a test fixture.
    pub fn add_folder(&self, parent_uri: &str, name: &str) -> OnlineFolderInfo {
        let id = self.fresh_id();
        let uri = format!("{parent_uri}/f{id}");
        let folder = FakeFolder {
            name: name.to_string(),
            uri: uri.clone(),
            sub_folder_uris: Vec::new(),
            album_uris: Vec::new(),
        };
        let mut state = self.state.lock().unwrap();
        state.folders.insert(uri.clone(), folder.clone());
        if let Some(parent) = state.folders.get_mut(parent_uri) {
            parent.sub_folder_uris.push(uri);
        }
        folder_info(&folder)
    }

    /// Seed an album directly (bypassing `create_album`).
    pub fn add_album(&self, parent_uri: &str, name: &str, last_updated: f64) -> OnlineAlbumInfo {
        let id = self.fresh_id();
        let uri = format!("{parent_uri}/a{id}");
        let album = FakeAlbum {
            name: name.to_string(),
            uri: uri.clone(),
            last_updated,
            image_uris: Vec::new(),
        };
        let mut state = self.state.lock().unwrap();
        state.albums.insert(uri.clone(), album.clone());
        if let Some(parent) = state.folders.get_mut(parent_uri) {
            parent.album_uris.push(uri);
        }
        album_info(&album)
    }

    /// Seed an image directly into an already-seeded album.
    pub fn add_image(&self, album_uri: &str, file_name: &str, content: &[u8], is_video: bool) -> OnlineImageInfo {
        let id = self.fresh_id();
        let uri = format!("{album_uri}!image{id}");
        let image = FakeImage {
            file_name: file_name.to_string(),
            uri: uri.clone(),
            is_video,
            processing: false,
            content: content.to_vec(),
        };
        let mut state = self.state.lock().unwrap();
        state.images.insert(uri.clone(), image.clone());
        if let Some(album) = state.albums.get_mut(album_uri) {
            album.image_uris.push(uri);
        }
        online_image_info(&image)
    }

    pub fn album_last_updated(&self, album_uri: &str) -> f64 {
        self.state.lock().unwrap().albums.get(album_uri).expect("album seeded").last_updated
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

fn folder_info(f: &FakeFolder) -> OnlineFolderInfo {
    OnlineFolderInfo {
        uri: f.uri.clone(),
        sub_folders_uri: Some(format!("{}!folders", f.uri)),
        albums_uri: Some(format!("{}!folderalbums", f.uri)),
        node_uri: Some(format!("{}!node", f.uri)),
    }
}

fn album_info(a: &FakeAlbum) -> OnlineAlbumInfo {
    OnlineAlbumInfo {
        uri: a.uri.clone(),
        images_uri: format!("{}!images", a.uri),
        last_updated: a.last_updated,
        image_count: a.image_uris.len() as i64,
    }
}

fn online_image_info(i: &FakeImage) -> OnlineImageInfo {
    OnlineImageInfo {
        uri: i.uri.clone(),
        archived_uri: if i.is_video { None } else { Some(format!("{}!archived", i.uri)) },
        size: Some(i.content.len() as u64),
        is_video: i.is_video,
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceBackend for FakeBackend {
    fn root_folder_uri(&self) -> &str {
        &self.root_uri
    }

    fn is_test_root_folder_uri(&self, _uri: &str) -> bool {
        false
    }

    fn get<'a>(&'a self, relative_uri: &'a str) -> BoxFuture<'a, Result<Value, ServiceError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();

            if let Some(image_uri) = relative_uri.strip_suffix("!largestvideo") {
                let image = state
                    .images
                    .get(image_uri)
                    .ok_or_else(|| ServiceError::MalformedResponse(format!("no such image {image_uri}")))?;
                return Ok(json!({ "LargestVideo": { "Url": format!("{}!videofile", image.uri) } }));
            }

            if let Some(folder) = state.folders.get(relative_uri) {
                return Ok(json!({ "Folder": folder_json(folder) }));
            }
            if let Some(album) = state.albums.get(relative_uri) {
                return Ok(json!({ "Album": album_json(album) }));
            }

            Err(ServiceError::MalformedResponse(format!("no such uri {relative_uri}")))
        })
    }

    fn post_json<'a>(&'a self, relative_uri: &'a str, body: &'a Value) -> BoxFuture<'a, Result<Value, ServiceError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();

            if let Some(folder_uri) = relative_uri.strip_suffix("!folders") {
                let name = body["Name"].as_str().unwrap_or_default().to_string();
                let id = self.fresh_id();
                let uri = format!("{folder_uri}/f{id}");
                let new_folder = FakeFolder {
                    name,
                    uri: uri.clone(),
                    sub_folder_uris: Vec::new(),
                    album_uris: Vec::new(),
                };
                state.folders.insert(uri.clone(), new_folder.clone());
                if let Some(parent) = state.folders.get_mut(folder_uri) {
                    parent.sub_folder_uris.push(uri);
                }
                return Ok(json!({ "Folder": folder_json(&new_folder) }));
            }

            if let Some(folder_uri) = relative_uri.strip_suffix("!node!children") {
                let name = body["Name"].as_str().unwrap_or_default().to_string();
                let id = self.fresh_id();
                let uri = format!("{folder_uri}/a{id}");
                let new_album = FakeAlbum {
                    name,
                    uri: uri.clone(),
                    last_updated: id as f64,
                    image_uris: Vec::new(),
                };
                state.albums.insert(uri.clone(), new_album);
                if let Some(parent) = state.folders.get_mut(folder_uri) {
                    parent.album_uris.push(uri.clone());
                }
                return Ok(json!({ "Node": { "Uris": { "Album": { "Uri": uri } } } }));
            }

            Err(ServiceError::MalformedResponse(format!("no such create endpoint {relative_uri}")))
        })
    }

    fn delete<'a>(&'a self, relative_uri: &'a str) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.folders.remove(relative_uri);
            state.albums.remove(relative_uri);
            self.deletes.lock().unwrap().push(relative_uri.to_string());
            Ok(())
        })
    }

    fn download<'a>(&'a self, image_uri: &'a str, local_path: &'a Path) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            let base = image_uri
                .strip_suffix("!archived")
                .or_else(|| image_uri.strip_suffix("!videofile"))
                .unwrap_or(image_uri);

            let content = {
                let state = self.state.lock().unwrap();
                state
                    .images
                    .get(base)
                    .ok_or_else(|| ServiceError::MalformedResponse(format!("no such image {base}")))?
                    .content
                    .clone()
            };

            if let Some(parent) = local_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(local_path, &content)?;
            self.downloads.lock().unwrap().push((image_uri.to_string(), local_path.to_path_buf()));
            Ok(())
        })
    }

    fn upload<'a>(&'a self, album_uri: &'a str, image_name: &'a str, local_path: &'a Path) -> BoxFuture<'a, Result<(), ServiceError>> {
        Box::pin(async move {
            let content = std::fs::read(local_path)?;
            let id = self.fresh_id();
            let uri = format!("{album_uri}!image{id}");
            let image = FakeImage {
                file_name: image_name.to_string(),
                uri: uri.clone(),
                is_video: false,
                processing: false,
                content,
            };

            let mut state = self.state.lock().unwrap();
            state.images.insert(uri.clone(), image);
            if let Some(album) = state.albums.get_mut(album_uri) {
                album.image_uris.push(uri);
                album.last_updated = id as f64;
            }

            self.uploads.lock().unwrap().push((album_uri.to_string(), image_name.to_string()));
            Ok(())
        })
    }

    fn paginate<'a>(&'a self, relative_uri: &'a str, _object_name: &'a str, _page_size: u64) -> BoxFuture<'a, Result<Vec<Value>, ServiceError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();

            if let Some(folder_uri) = relative_uri.strip_suffix("!folders") {
                let folder = state
                    .folders
                    .get(folder_uri)
                    .ok_or_else(|| ServiceError::MalformedResponse(format!("no such folder {folder_uri}")))?;
                return Ok(folder.sub_folder_uris.iter().filter_map(|u| state.folders.get(u)).map(folder_json).collect());
            }

            if let Some(folder_uri) = relative_uri.strip_suffix("!folderalbums") {
                let folder = state
                    .folders
                    .get(folder_uri)
                    .ok_or_else(|| ServiceError::MalformedResponse(format!("no such folder {folder_uri}")))?;
                return Ok(folder.album_uris.iter().filter_map(|u| state.albums.get(u)).map(album_json).collect());
            }

            if let Some(album_uri) = relative_uri.strip_suffix("!images") {
                let album = state
                    .albums
                    .get(album_uri)
                    .ok_or_else(|| ServiceError::MalformedResponse(format!("no such album {album_uri}")))?;
                return Ok(album.image_uris.iter().filter_map(|u| state.images.get(u)).map(image_json).collect());
            }

            Err(ServiceError::MalformedResponse(format!("no such pagination endpoint {relative_uri}")))
        })
    }
}
