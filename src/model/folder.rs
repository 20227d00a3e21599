//! `Folder` — an interior node of the tree, plus the distinguished `RootFolder`.
//!
//! Grounded in `original_source/sync2smugmug/models.py` (`Folder`, `RootFolder`, `Stats`).

use std::collections::HashMap;
use std::path::PathBuf;

use super::album::Album;

#[derive(Debug, Clone)]
pub struct OnlineFolderInfo {
    pub uri: String,
    pub sub_folders_uri: Option<String>,
    pub albums_uri: Option<String>,
    pub node_uri: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DiskFolderInfo {
    pub disk_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Folder {
    pub relative_path: PathBuf,
    pub disk_info: Option<DiskFolderInfo>,
    pub online_info: Option<OnlineFolderInfo>,
    pub sub_folders: HashMap<String, Folder>,
    pub albums: HashMap<String, Album>,
}

impl Folder {
    pub fn new(relative_path: PathBuf) -> Self {
        Self {
            relative_path,
            disk_info: None,
            online_info: None,
            sub_folders: HashMap::new(),
            albums: HashMap::new(),
        }
    }

    pub fn name(&self) -> String {
        self.relative_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_on_disk(&self) -> bool {
        self.disk_info.is_some()
    }

    pub fn is_online(&self) -> bool {
        self.online_info.is_some()
    }

    /// Navigate to the descendant folder at `relative_path`, or `None` if any segment is
    /// missing. An empty path returns `self`.
    pub fn find_folder(&self, relative_path: &std::path::Path) -> Option<&Folder> {
        let mut current = self;
        for component in relative_path.components() {
            let name = component.as_os_str().to_string_lossy();
            current = current.sub_folders.get(name.as_ref())?;
        }
        Some(current)
    }

    pub fn find_folder_mut(&mut self, relative_path: &std::path::Path) -> Option<&mut Folder> {
        let mut current = self;
        for component in relative_path.components() {
            let name = component.as_os_str().to_string_lossy();
            current = current.sub_folders.get_mut(name.as_ref())?;
        }
        Some(current)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Stats {
    pub folder_count: u64,
    pub album_count: u64,
    pub image_count: u64,
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} folders, {} albums, {} images",
            self.folder_count, self.album_count, self.image_count
        )
    }
}

/// Distinguished root of a scanned tree: zero-length relative path, plus a `Stats`
/// accumulator the scanner fills in as it walks.
#[derive(Debug, Clone)]
pub struct RootFolder {
    pub folder: Folder,
    pub stats: Stats,
}

impl RootFolder {
    pub fn new() -> Self {
        Self {
            folder: Folder::new(PathBuf::new()),
            stats: Stats::default(),
        }
    }
}

impl Default for RootFolder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for RootFolder {
    type Target = Folder;
    fn deref(&self) -> &Folder {
        &self.folder
    }
}

impl std::ops::DerefMut for RootFolder {
    fn deref_mut(&mut self) -> &mut Folder {
        &mut self.folder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_folder_has_empty_relative_path() {
        let root = RootFolder::new();
        assert_eq!(root.relative_path, PathBuf::new());
    }
}
