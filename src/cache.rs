//! Filename cache: which output file was produced for a source under a profile.
//!
//! Processing an image through a profile is the expensive part of serving a
//! derivative. The resolver asks this cache first and only runs the filter
//! pipeline when the cache has nothing usable.
//!
//! # Design
//!
//! Entries map `(profile name, decoded source path)` to the storage path of
//! the processed output. They are **advisory**: the resolver re-validates
//! every hit against storage (the output must still exist and must not be
//! older than its source). A stale entry simply gets overwritten.
//!
//! The cache lives in memory behind a [`DashMap`] so concurrent resolutions
//! never contend on a global lock. Profile edits drop every entry of that
//! profile via [`FileNameCache::clear_profile`].
//!
//! ## Storage
//!
//! [`ProfileCache`] can be persisted as a JSON manifest:
//!
//! ```json
//! {
//!   "version": 1,
//!   "profiles": {
//!     "thumbnail": { "/media/img/a.jpg": "_Profiles/1a2b3c4d5e6f7a8b/9c0d1e2f3a4b5c6d/a.jpg" }
//!   }
//! }
//! ```
//!
//! A missing, corrupt or wrong-version manifest loads as an empty cache. That
//! is always safe: outputs left on disk are picked up again by the
//! resolver's warm-start probe.

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

/// Version of the cache manifest format. Bump this to invalidate all
/// existing manifests when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// Lookup and update of processed output paths.
pub trait FileNameCache: Send + Sync {
    /// Cached output path, or `None` when nothing (or an empty path) is cached.
    fn get_file_name(&self, profile: &str, path: &str) -> Option<String>;

    fn update_file_name(&self, profile: &str, path: &str, file_name: &str);

    /// Forget every entry of a profile.
    fn clear_profile(&self, profile: &str);
}

/// On-disk form of the cache.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
struct CacheManifest {
    version: u32,
    profiles: BTreeMap<String, BTreeMap<String, String>>,
}

/// In-memory filename cache with optional JSON persistence.
#[derive(Debug, Default)]
pub struct ProfileCache {
    entries: DashMap<(String, String), String>,
}

impl ProfileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a manifest file. Returns an empty cache if the file doesn't exist
    /// or can't be parsed (version mismatch, corruption).
    pub fn load(path: &Path) -> Self {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Self::new(),
        };
        let manifest: CacheManifest = match serde_json::from_str(&content) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("Ignoring unreadable cache manifest {}: {}", path.display(), e);
                return Self::new();
            }
        };
        if manifest.version != MANIFEST_VERSION {
            log::info!(
                "Ignoring cache manifest {} with version {}",
                path.display(),
                manifest.version
            );
            return Self::new();
        }

        let cache = Self::new();
        for (profile, files) in manifest.profiles {
            for (source, output) in files {
                cache.entries.insert((profile.clone(), source), output);
            }
        }
        cache
    }

    /// Save to a manifest file, creating its parent folder.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut manifest = CacheManifest {
            version: MANIFEST_VERSION,
            profiles: BTreeMap::new(),
        };
        for entry in self.entries.iter() {
            let (profile, source) = entry.key();
            manifest
                .profiles
                .entry(profile.clone())
                .or_default()
                .insert(source.clone(), entry.value().clone());
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&manifest)?;
        std::fs::write(path, json)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FileNameCache for ProfileCache {
    fn get_file_name(&self, profile: &str, path: &str) -> Option<String> {
        self.entries
            .get(&(profile.to_string(), path.to_string()))
            .map(|e| e.value().clone())
            .filter(|name| !name.is_empty())
    }

    fn update_file_name(&self, profile: &str, path: &str, file_name: &str) {
        self.entries
            .insert((profile.to_string(), path.to_string()), file_name.to_string());
    }

    fn clear_profile(&self, profile: &str) {
        self.entries.retain(|(p, _), _| p != profile);
    }
}

/// Outcome counters of a resolver's lifetime.
///
/// Updated from many threads at once, hence the atomics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU32,
    restored: AtomicU32,
    processed: AtomicU32,
    unavailable: AtomicU32,
}

impl CacheStats {
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    /// An output found on disk after the in-memory entry was lost.
    pub fn restore(&self) {
        self.restored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn process(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn unavailable(&self) {
        self.unavailable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn restored(&self) -> u32 {
        self.restored.load(Ordering::Relaxed)
    }

    pub fn processed(&self) -> u32 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn unavailable_count(&self) -> u32 {
        self.unavailable.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u32 {
        self.hits() + self.restored() + self.processed() + self.unavailable_count()
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (hits, restored, processed) = (self.hits(), self.restored(), self.processed());
        if hits > 0 || restored > 0 {
            if restored > 0 {
                write!(
                    f,
                    "{} cached, {} restored, {} processed ({} total)",
                    hits,
                    restored,
                    processed,
                    self.total()
                )?;
            } else {
                write!(
                    f,
                    "{} cached, {} processed ({} total)",
                    hits,
                    processed,
                    self.total()
                )?;
            }
        } else {
            write!(f, "{} processed", processed)?;
        }
        match self.unavailable_count() {
            0 => Ok(()),
            n => write!(f, ", {} unavailable", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const MANIFEST: &str = ".profile-cache.json";

    // =========================================================================
    // Lookup / update
    // =========================================================================

    #[test]
    fn empty_cache_misses() {
        let cache = ProfileCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.get_file_name("thumbnail", "img/a.jpg"), None);
    }

    #[test]
    fn update_then_get() {
        let cache = ProfileCache::new();
        cache.update_file_name("thumbnail", "img/a.jpg", "_Profiles/x/y/a.jpg");
        assert_eq!(
            cache.get_file_name("thumbnail", "img/a.jpg"),
            Some("_Profiles/x/y/a.jpg".to_string())
        );
    }

    #[test]
    fn entries_are_per_profile() {
        let cache = ProfileCache::new();
        cache.update_file_name("thumbnail", "img/a.jpg", "t.jpg");
        cache.update_file_name("banner", "img/a.jpg", "b.jpg");
        assert_eq!(cache.get_file_name("thumbnail", "img/a.jpg").as_deref(), Some("t.jpg"));
        assert_eq!(cache.get_file_name("banner", "img/a.jpg").as_deref(), Some("b.jpg"));
    }

    #[test]
    fn empty_entry_counts_as_miss() {
        let cache = ProfileCache::new();
        cache.update_file_name("thumbnail", "img/a.jpg", "");
        assert_eq!(cache.get_file_name("thumbnail", "img/a.jpg"), None);
    }

    #[test]
    fn update_overwrites() {
        let cache = ProfileCache::new();
        cache.update_file_name("p", "a.jpg", "old.jpg");
        cache.update_file_name("p", "a.jpg", "new.jpg");
        assert_eq!(cache.get_file_name("p", "a.jpg").as_deref(), Some("new.jpg"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_profile_only_drops_that_profile() {
        let cache = ProfileCache::new();
        cache.update_file_name("thumbnail", "a.jpg", "t1.jpg");
        cache.update_file_name("thumbnail", "b.jpg", "t2.jpg");
        cache.update_file_name("banner", "a.jpg", "b1.jpg");

        cache.clear_profile("thumbnail");

        assert_eq!(cache.get_file_name("thumbnail", "a.jpg"), None);
        assert_eq!(cache.get_file_name("thumbnail", "b.jpg"), None);
        assert_eq!(cache.get_file_name("banner", "a.jpg").as_deref(), Some("b1.jpg"));
    }

    // =========================================================================
    // Save / Load
    // =========================================================================

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join(MANIFEST);
        let cache = ProfileCache::new();
        cache.update_file_name("thumbnail", "img/a.jpg", "_Profiles/1/2/a.jpg");
        cache.update_file_name("banner", "img/b.png", "_Profiles/3/4/b.png");

        cache.save(&path).unwrap();
        let loaded = ProfileCache::load(&path);

        assert_eq!(loaded.len(), 2);
        assert_eq!(
            loaded.get_file_name("banner", "img/b.png").as_deref(),
            Some("_Profiles/3/4/b.png")
        );
    }

    #[test]
    fn load_missing_file_returns_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(ProfileCache::load(&tmp.path().join(MANIFEST)).is_empty());
    }

    #[test]
    fn load_corrupt_json_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST);
        fs::write(&path, "not json").unwrap();
        assert!(ProfileCache::load(&path).is_empty());
    }

    #[test]
    fn load_wrong_version_returns_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(MANIFEST);
        let json = format!(
            r#"{{"version": {}, "profiles": {{"p": {{"a.jpg": "out.jpg"}}}}}}"#,
            MANIFEST_VERSION + 1
        );
        fs::write(&path, json).unwrap();
        assert!(ProfileCache::load(&path).is_empty());
    }

    // =========================================================================
    // CacheStats
    // =========================================================================

    #[test]
    fn cache_stats_display_with_hits() {
        let s = CacheStats::default();
        for _ in 0..5 {
            s.hit();
        }
        s.process();
        s.process();
        assert_eq!(format!("{}", s), "5 cached, 2 processed (7 total)");
    }

    #[test]
    fn cache_stats_display_with_restores() {
        let s = CacheStats::default();
        s.hit();
        s.restore();
        s.restore();
        s.process();
        assert_eq!(format!("{}", s), "1 cached, 2 restored, 1 processed (4 total)");
    }

    #[test]
    fn cache_stats_display_no_hits() {
        let s = CacheStats::default();
        s.process();
        s.process();
        s.process();
        assert_eq!(format!("{}", s), "3 processed");
    }

    #[test]
    fn cache_stats_display_unavailable_suffix() {
        let s = CacheStats::default();
        s.process();
        s.unavailable();
        assert_eq!(format!("{}", s), "1 processed, 1 unavailable");
    }
}
