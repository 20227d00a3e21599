//! `Image` — a single photo or video leaf.
//!
//! Grounded in `original_source/sync2smugmug/models.py` (`Image`,
//! `ImageType`, `supported_image_types`).

use std::path::{Path, PathBuf};

/// Closed enum of image/video suffixes this system understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageType {
    Photo,
    PhotoRequiresConversion,
    Movie,
    MovieRequiresConversion,
}

impl ImageType {
    pub fn is_movie(self) -> bool {
        matches!(self, ImageType::Movie | ImageType::MovieRequiresConversion)
    }

    pub fn requires_conversion(self) -> bool {
        matches!(
            self,
            ImageType::PhotoRequiresConversion | ImageType::MovieRequiresConversion
        )
    }

    fn from_suffix(suffix: &str) -> Option<ImageType> {
        match suffix.to_lowercase().as_str() {
            ".jpg" | ".jpeg" => Some(ImageType::Photo),
            ".heic" => Some(ImageType::PhotoRequiresConversion),
            ".mp4" => Some(ImageType::Movie),
            ".avi" | ".m4v" | ".mov" | ".mts" => Some(ImageType::MovieRequiresConversion),
            _ => None,
        }
    }
}

/// True iff `filename`'s suffix is one of the supported image types.
pub fn is_image(filename: &Path) -> bool {
    suffix_of(filename)
        .map(|s| ImageType::from_suffix(&s).is_some())
        .unwrap_or(false)
}

fn suffix_of(path: &Path) -> Option<String> {
    path.extension().map(|e| format!(".{}", e.to_string_lossy()))
}

#[derive(Debug, Clone)]
pub struct DiskImageInfo {
    /// The physical file backing this image. If a `Developed/` variant exists, this is
    /// that file's path (and its size is authoritative) even though the image's logical
    /// `relative_path` stays under the parent album.
    pub disk_path: PathBuf,
    pub size: u64,
}

#[derive(Debug, Clone)]
pub struct OnlineImageInfo {
    pub uri: String,
    /// The archived/original-quality copy's URI (photos only — videos have no archive).
    pub archived_uri: Option<String>,
    pub size: Option<u64>,
    pub is_video: bool,
}

#[derive(Debug, Clone)]
pub struct Image {
    pub album_relative_path: PathBuf,
    pub filename: String,
    pub disk_info: Option<DiskImageInfo>,
    pub online_info: Option<OnlineImageInfo>,
}

impl Image {
    pub fn new(album_relative_path: PathBuf, filename: String) -> Self {
        Self {
            album_relative_path,
            filename,
            disk_info: None,
            online_info: None,
        }
    }

    pub fn relative_path(&self) -> PathBuf {
        self.album_relative_path.join(&self.filename)
    }

    pub fn is_on_disk(&self) -> bool {
        self.disk_info.is_some()
    }

    pub fn is_online(&self) -> bool {
        self.online_info.is_some()
    }

    /// The suffix-derived type of this image. Panics on an unsupported suffix; scanners are
    /// expected to have already filtered with `is_image` before constructing an `Image`.
    pub fn image_type(&self) -> ImageType {
        suffix_of(Path::new(&self.filename))
            .and_then(|s| ImageType::from_suffix(&s))
            .expect("Image constructed from a non-image filename")
    }
}

impl PartialEq for Image {
    fn eq(&self, other: &Self) -> bool {
        self.relative_path() == other.relative_path()
    }
}
impl Eq for Image {}

/// The contract is "return true iff the caller should treat the two as the same image".
/// Today this is path-equality only; the relation is a tunable an implementer may widen
/// (size, metadata) without changing reconciliation logic (see `spec.md` §9 Open Question).
pub fn images_are_the_same(a: &Image, b: &Image) -> bool {
    a.relative_path() == b.relative_path()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_supported_suffixes() {
        assert!(is_image(Path::new("a.jpg")));
        assert!(is_image(Path::new("a.JPEG")));
        assert!(is_image(Path::new("a.heic")));
        assert!(is_image(Path::new("a.mp4")));
        assert!(is_image(Path::new("a.MOV")));
        assert!(!is_image(Path::new("a.txt")));
        assert!(!is_image(Path::new("a")));
    }

    #[test]
    fn equality_is_by_composite_relative_path() {
        let mut a = Image::new(PathBuf::from("2024_01_01"), "x.jpg".into());
        let mut b = Image::new(PathBuf::from("2024_01_01"), "x.jpg".into());
        a.disk_info = Some(DiskImageInfo {
            disk_path: PathBuf::from("/tmp/x.jpg"),
            size: 10,
        });
        b.online_info = Some(OnlineImageInfo {
            uri: "/api/v2/image/abc".into(),
            archived_uri: None,
            size: Some(20),
            is_video: false,
        });
        assert_eq!(a, b);
        assert!(images_are_the_same(&a, &b));
    }
}
