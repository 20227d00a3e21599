//! Local disk scanner (§4.1).
//!
//! Grounded in `original_source/sync2smugmug/scan/disk_scanner.py` and
//! `disk.py` (`iter_image_files`, the `Developed/` overlay). Uses
//! `walkdir`, the same crate `bleemesser-photosort` reaches for to walk
//! a photo tree, since this is pure synchronous filesystem I/O.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::model::{image, Album, DiskAlbumInfo, DiskFolderInfo, DiskImageInfo, Folder, Image, RootFolder};
use crate::sync_cache;

const SKIP_NAMES: &[&str] = &["originals", "lightroom", "developed"];

fn should_skip(entry: &Path, base_dir: &Path) -> bool {
    let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
        return true;
    };

    if name.starts_with('.') {
        return true;
    }

    if SKIP_NAMES.iter().any(|s| s.eq_ignore_ascii_case(name)) {
        return true;
    }

    entry
        .strip_prefix(base_dir)
        .unwrap_or(entry)
        .components()
        .any(|c| c.as_os_str() == "Picasa")
}

fn has_images(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false) && image::is_image(&e.path()))
        })
        .unwrap_or(false)
}

fn has_sub_folders(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        })
        .unwrap_or(false)
}

/// Walk `base_dir` depth-first, building a `RootFolder` with fully populated subtree and
/// album-image lists.
pub fn scan(base_dir: &Path) -> std::io::Result<RootFolder> {
    info!("Scanning disk (starting from {})...", base_dir.display());

    let mut root = RootFolder::new();
    root.folder.disk_info = Some(DiskFolderInfo {
        disk_path: base_dir.to_path_buf(),
    });

    // Parents are always visited (and inserted) before their children because `walkdir`
    // yields directories in depth-first pre-order; `min_depth(1)` skips `base_dir` itself.
    let mut folders: std::collections::HashSet<PathBuf> = std::collections::HashSet::new();
    folders.insert(PathBuf::new());

    let walker = WalkDir::new(base_dir)
        .min_depth(1)
        .into_iter()
        .filter_entry(|e| !should_skip(e.path(), base_dir));

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                warn!("Failed to read a directory entry: {}", err);
                continue;
            }
        };

        if !entry.file_type().is_dir() {
            continue;
        }

        let dir_path = entry.path();
        let relative_path = dir_path.strip_prefix(base_dir).unwrap_or(dir_path).to_path_buf();
        let parent_relative = relative_path.parent().unwrap_or(Path::new("")).to_path_buf();

        if !folders.contains(&parent_relative) {
            // Parent subtree was skipped/unreadable; skip this entire subtree too.
            continue;
        }

        if has_images(dir_path) {
            let mut album = Album::new(relative_path.clone());
            let sync_triplet = sync_cache::load(dir_path);
            album.disk_info = Some(DiskAlbumInfo {
                disk_path: dir_path.to_path_buf(),
                sync_triplet,
            });

            load_album_images(&mut album);

            let name = album.name();
            let image_count = album.image_count as u64;
            insert_album(&mut root.folder, &parent_relative, name, album);

            root.stats.album_count += 1;
            root.stats.image_count += image_count;
        } else if has_sub_folders(dir_path) {
            let mut folder = Folder::new(relative_path.clone());
            folder.disk_info = Some(DiskFolderInfo {
                disk_path: dir_path.to_path_buf(),
            });

            let name = folder.name();
            insert_folder(&mut root.folder, &parent_relative, name, folder);

            root.stats.folder_count += 1;
            folders.insert(relative_path);
        } else {
            debug!("Empty directory {}", dir_path.display());
        }
    }

    Ok(root)
}

fn insert_folder(root: &mut Folder, parent_relative: &Path, name: String, folder: Folder) {
    if let Some(parent) = find_folder_mut(root, parent_relative) {
        parent.sub_folders.insert(name, folder);
    }
}

fn insert_album(root: &mut Folder, parent_relative: &Path, name: String, album: Album) {
    if let Some(parent) = find_folder_mut(root, parent_relative) {
        parent.albums.insert(name, album);
    }
}

fn find_folder_mut<'a>(root: &'a mut Folder, relative_path: &Path) -> Option<&'a mut Folder> {
    if relative_path == Path::new("") {
        return Some(root);
    }

    let mut current = root;
    for component in relative_path.components() {
        let name = component.as_os_str().to_string_lossy().into_owned();
        current = current.sub_folders.get_mut(&name)?;
    }
    Some(current)
}

/// Lazily (re)populate an on-disk album's image list, honoring the `Developed/` overlay:
/// a same-named file under a child `Developed/` directory overrides the physical path
/// (and thus the authoritative size) of its sibling, without changing the logical
/// `relative_path`.
pub fn load_album_images(album: &mut Album) {
    let Some(disk_info) = &album.disk_info else {
        return;
    };
    let disk_path = disk_info.disk_path.clone();

    let mut developed: std::collections::HashMap<String, PathBuf> = std::collections::HashMap::new();
    let developed_dir = disk_path.join("Developed");
    if developed_dir.is_dir() {
        if let Ok(entries) = fs::read_dir(&developed_dir) {
            for entry in entries.filter_map(|e| e.ok()) {
                let path = entry.path();
                if image::is_image(&path) {
                    if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                        developed.insert(name.to_string(), path);
                    }
                }
            }
        }
    }

    let mut images = Vec::new();
    if let Ok(entries) = fs::read_dir(&disk_path) {
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) || !image::is_image(&path) {
                continue;
            }

            let filename = path.file_name().unwrap().to_string_lossy().into_owned();
            let effective_path = developed.get(&filename).cloned().unwrap_or_else(|| path.clone());

            let size = fs::metadata(&effective_path).map(|m| m.len()).unwrap_or(0);

            let mut image = Image::new(album.relative_path.clone(), filename);
            image.disk_info = Some(DiskImageInfo {
                disk_path: effective_path,
                size,
            });
            images.push(image);
        }
    }

    album.image_count = images.len() as i64;
    album.images = Some(images);
}

pub fn delete_image_from_disk(image: &Image, dry_run: bool) -> std::io::Result<()> {
    let Some(disk_info) = &image.disk_info else {
        return Ok(());
    };

    if !dry_run {
        fs::remove_file(&disk_info.disk_path)?;
    }

    info!("Deleted image {} (dry_run={})", image.relative_path().display(), dry_run);
    Ok(())
}

pub fn create_folder(parent_disk_path: &Path, folder_name: &str, dry_run: bool) -> std::io::Result<DiskFolderInfo> {
    let folder_disk_path = parent_disk_path.join(folder_name);
    if !dry_run {
        fs::create_dir_all(&folder_disk_path)?;
    }
    Ok(DiskFolderInfo {
        disk_path: folder_disk_path,
    })
}

pub fn create_album(parent_disk_path: &Path, album_name: &str, dry_run: bool) -> std::io::Result<DiskAlbumInfo> {
    let album_disk_path = parent_disk_path.join(album_name);
    if !dry_run {
        fs::create_dir_all(&album_disk_path)?;
    }
    Ok(DiskAlbumInfo {
        disk_path: album_disk_path,
        sync_triplet: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::write(path, b"x").unwrap();
    }

    #[test]
    fn album_only_directory_with_sync_file_is_treated_as_empty() {
        let dir = tempdir().unwrap();
        let album_dir = dir.path().join("2024_01_01");
        fs::create_dir_all(&album_dir).unwrap();
        touch(&album_dir.join(sync_cache::SYNC_DATA_FILENAME));

        let root = scan(dir.path()).unwrap();
        assert_eq!(root.stats.album_count, 0);
        assert_eq!(root.stats.folder_count, 0);
    }

    #[test]
    fn hidden_and_skip_list_dirs_are_never_in_the_model() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join(".hidden")).unwrap();
        fs::create_dir_all(dir.path().join("Originals")).unwrap();
        fs::create_dir_all(dir.path().join("Picasa").join("2024_01_01")).unwrap();
        touch(&dir.path().join("Picasa/2024_01_01/a.jpg"));

        let root = scan(dir.path()).unwrap();
        assert!(root.sub_folders.is_empty());
        assert!(root.albums.is_empty());
    }

    #[test]
    fn album_classification_and_developed_overlay() {
        let dir = tempdir().unwrap();
        let album_dir = dir.path().join("2024_01_01 - Trip");
        fs::create_dir_all(&album_dir).unwrap();
        touch(&album_dir.join("a.jpg"));

        let developed_dir = album_dir.join("Developed");
        fs::create_dir_all(&developed_dir).unwrap();
        fs::write(developed_dir.join("a.jpg"), b"much bigger content").unwrap();

        let root = scan(dir.path()).unwrap();
        let album = root.albums.get("2024_01_01 - Trip").unwrap();
        assert_eq!(album.image_count, 1);

        let image = &album.images.as_ref().unwrap()[0];
        assert_eq!(image.relative_path(), PathBuf::from("2024_01_01 - Trip").join("a.jpg"));
        assert_eq!(
            image.disk_info.as_ref().unwrap().disk_path,
            developed_dir.join("a.jpg")
        );
    }

    #[test]
    fn folder_vs_album_classification() {
        let dir = tempdir().unwrap();
        let folder = dir.path().join("2024");
        let album = folder.join("2024_01_01");
        fs::create_dir_all(&album).unwrap();
        touch(&album.join("a.jpg"));

        let root = scan(dir.path()).unwrap();
        assert_eq!(root.stats.folder_count, 1);
        assert_eq!(root.stats.album_count, 1);
        assert!(root.sub_folders.contains_key("2024"));
        assert!(root.sub_folders["2024"].albums.contains_key("2024_01_01"));
    }
}
