//! Shared test utilities for the image-profiles test suite.
//!
//! Provides an isolated storage root, small generated images, and a manager
//! builder so resolver tests read as "given these files and this profile".
//!
//! # Usage
//!
//! ```ignore
//! use crate::test_helpers::*;
//!
//! let fx = MediaFixture::new();
//! fx.write("img/a.png", &png_bytes(40, 30));
//!
//! let manager = fx.manager(profiles, FilterRegistry::with_builtin());
//! let url = manager.get_image_profile_url("/media/img/a.png", "Thumb", None, &[]);
//! assert!(path_of(url.url().unwrap()).starts_with("/media/_Profiles/"));
//! ```

use filetime::FileTime;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

use crate::cache::ProfileCache;
use crate::imaging::FilterRegistry;
use crate::profile::ProfileStore;
use crate::resolver::ImageProfileManager;
use crate::storage::FileSystemStorage;

// =========================================================================
// Images
// =========================================================================

/// Encode a `width`×`height` gradient as PNG.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).unwrap();
    buf.into_inner()
}

// =========================================================================
// Storage fixture
// =========================================================================

/// A temp storage root served at `/media`.
pub struct MediaFixture {
    pub tmp: TempDir,
    pub storage: Arc<FileSystemStorage>,
    pub cache: Arc<ProfileCache>,
}

impl MediaFixture {
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let storage = Arc::new(FileSystemStorage::new(tmp.path().join("media"), "/media"));
        Self {
            tmp,
            storage,
            cache: Arc::new(ProfileCache::new()),
        }
    }

    /// On-disk location of a storage path.
    pub fn disk_path(&self, storage_path: &str) -> PathBuf {
        self.storage.root().join(storage_path)
    }

    pub fn write(&self, storage_path: &str, bytes: &[u8]) -> PathBuf {
        let path = self.disk_path(storage_path);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, bytes).unwrap();
        path
    }

    pub fn read(&self, storage_path: &str) -> Vec<u8> {
        std::fs::read(self.disk_path(storage_path)).unwrap()
    }

    /// Set the modification time to now plus `offset_secs` (may be negative).
    pub fn set_mtime(&self, storage_path: &str, offset_secs: i64) {
        let now = SystemTime::now();
        let delta = Duration::from_secs(offset_secs.unsigned_abs());
        let when = if offset_secs < 0 { now - delta } else { now + delta };
        filetime::set_file_mtime(self.disk_path(storage_path), FileTime::from_system_time(when))
            .unwrap();
    }

    /// A manager over this fixture's storage and cache.
    pub fn manager(&self, profiles: ProfileStore, registry: FilterRegistry) -> ImageProfileManager {
        self.manager_with_cache(profiles, registry, self.cache.clone())
    }

    pub fn manager_with_cache(
        &self,
        profiles: ProfileStore,
        registry: FilterRegistry,
        cache: Arc<ProfileCache>,
    ) -> ImageProfileManager {
        ImageProfileManager::new(self.storage.clone(), cache, Arc::new(profiles))
            .with_registry(registry)
    }
}

/// URL without its `?v=` version suffix.
pub fn path_of(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
