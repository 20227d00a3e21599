//! `Album` — a leaf folder containing images/videos.
//!
//! Grounded in `original_source/sync2smugmug/models.py` (`Album`,
//! `DATE_ALBUM_PATTERN`) and `disk.py` (`DiskAlbumInfo`, sync triplet).

use std::cmp::Ordering;
use std::path::PathBuf;

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

use super::image::Image;
use crate::sync_cache::SyncTriplet;

fn date_album_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([12][09]\d\d_[0-1]\d_[0-3]\d)( - .*)?$").unwrap())
}

#[derive(Debug, Clone)]
pub struct DiskAlbumInfo {
    pub disk_path: PathBuf,
    pub sync_triplet: Option<SyncTriplet>,
}

#[derive(Debug, Clone)]
pub struct OnlineAlbumInfo {
    pub uri: String,
    pub images_uri: String,
    pub last_updated: f64,
    pub image_count: i64,
}

#[derive(Debug, Clone)]
pub struct Album {
    pub relative_path: PathBuf,
    pub disk_info: Option<DiskAlbumInfo>,
    pub online_info: Option<OnlineAlbumInfo>,
    pub images: Option<Vec<Image>>,
    pub image_count: i64,
}

impl Album {
    pub fn new(relative_path: PathBuf) -> Self {
        Self {
            relative_path,
            disk_info: None,
            online_info: None,
            images: None,
            image_count: 0,
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

    pub fn needs_sync(&self) -> bool {
        !self.is_on_disk() || !self.is_online()
    }

    /// True once every image is materialized; a lazily-loaded (remote) album reports this
    /// as `true` until `images` is populated by `load_album_images`.
    pub fn requires_image_load(&self) -> bool {
        match &self.images {
            None => true,
            Some(images) => (self.image_count as usize) > images.len(),
        }
    }

    pub fn reset_images(&mut self) {
        self.images = None;
    }

    /// Date parsed from the directory name, matching `YYYY_MM_DD( - .*)?`.
    pub fn album_date(&self) -> Option<NaiveDate> {
        let name = self.name();
        let caps = date_album_pattern().captures(&name)?;
        let date_str = caps.get(1)?.as_str();
        NaiveDate::parse_from_str(date_str, "%Y_%m_%d").ok()
    }

    /// `Some(true)` if the name is *only* the date (no richer suffix); `Some(false)` if it has
    /// a `" - ..."` suffix; `None` for non-date albums.
    pub fn name_contains_date_only(&self) -> Option<bool> {
        let name = self.name();
        let caps = date_album_pattern().captures(&name)?;
        Some(caps.get(2).is_none())
    }
}

impl PartialEq for Album {
    fn eq(&self, other: &Self) -> bool {
        self.relative_path == other.relative_path
    }
}
impl Eq for Album {}

impl PartialOrd for Album {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Album {
    fn cmp(&self, other: &Self) -> Ordering {
        if let (Some(d1), Some(d2)) = (self.album_date(), other.album_date()) {
            if d1 != d2 {
                return d1.cmp(&d2);
            }
            let l1 = self.name().len();
            let l2 = other.name().len();
            if l1 != l2 {
                return l1.cmp(&l2);
            }
        }
        self.relative_path.cmp(&other.relative_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_only_album_matches_and_is_not_richer() {
        let a = Album::new(PathBuf::from("2023_07_01"));
        assert_eq!(a.album_date(), NaiveDate::from_ymd_opt(2023, 7, 1));
        assert_eq!(a.name_contains_date_only(), Some(true));
    }

    #[test]
    fn richer_named_album_still_matches_the_date() {
        let a = Album::new(PathBuf::from("2023_07_01 - Trip"));
        assert_eq!(a.album_date(), NaiveDate::from_ymd_opt(2023, 7, 1));
        assert_eq!(a.name_contains_date_only(), Some(false));
    }

    #[test]
    fn non_date_album_has_no_date() {
        let a = Album::new(PathBuf::from("Random Folder"));
        assert_eq!(a.album_date(), None);
        assert_eq!(a.name_contains_date_only(), None);
    }

    #[test]
    fn ordering_prefers_date_then_richer_name() {
        let plain = Album::new(PathBuf::from("2023_07_01"));
        let richer = Album::new(PathBuf::from("2023_07_01 - Trip"));
        assert!(plain < richer);
    }
}
