pub mod album;
pub mod folder;
pub mod image;

pub use album::{Album, DiskAlbumInfo, OnlineAlbumInfo};
pub use folder::{DiskFolderInfo, Folder, OnlineFolderInfo, RootFolder, Stats};
pub use image::{images_are_the_same, DiskImageInfo, Image, OnlineImageInfo};
