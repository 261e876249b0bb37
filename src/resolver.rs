//! Image profile resolution.
//!
//! [`ImageProfileManager`] turns `(source path, profile name)` into the public
//! URL of a processed image, running the profile's filter chain only when no
//! fresh output exists yet.
//!
//! ```text
//! source  /media/img/a.jpg          profile  Thumbnail
//!    │
//!    ├─ cache hit and fresh ─────────────────────────────┐
//!    ├─ output already on disk (warm start) ─────────────┤
//!    └─ miss or stale                                    │
//!         lock(source) → re-check → read → filters       │
//!         → write → update cache ────────────────────────┤
//!                                                        ▼
//!  /media/_Profiles/<hash(profile)>/<hash(filters)>/<hash(dir)>/a.jpg?v=<ticks>
//! ```
//!
//! ## Freshness
//!
//! An output is fresh when it still exists and the source in storage was not
//! modified after it. Sources outside storage (remote URLs) have no timestamp
//! and count as unchanged. A source that maps to storage but is gone makes
//! the output stale, so the resolver never hands out a URL for a deleted
//! source.
//!
//! ## Output Location
//!
//! The output path is derived from the profile name, its filter chain and
//! the source path alone, so a restarted process finds earlier outputs
//! without any cache:
//!
//! ```text
//! <profiles_folder>/<name_hash(profile)>/<filter_chain_hash>/<name_hash(source dir)>/<file name>
//! ```
//!
//! Editing a profile's filters changes the chain folder. Cache entries and
//! outputs written by the old filters are no longer found, and the next
//! resolution processes the source again.
//!
//! Filters may move the output within its chain folder (a format conversion
//! changes the extension); the cache remembers the final path.

use crate::cache::{CacheStats, FileNameCache};
use crate::fetch::{self, OfflineFetcher, SourceFetcher};
use crate::imaging::{FilterContext, FilterRegistry, FilterState};
use crate::locks::PathLocks;
use crate::paths;
use crate::profile::{ProfileSource, filter_chain_hash};
use crate::storage::{StorageError, StorageProvider};
use crate::tokens::{TemplateTokenizer, TokenContext, Tokenizer};
use crate::types::{ContentItem, FilterRecord, ordered_filters};
use log::{debug, error, info, warn};
use std::fmt;
use std::io::{Read, Write};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use url::Url;

pub const DEFAULT_PROFILES_FOLDER: &str = "_Profiles";

/// Chunk size for writing processed media to storage.
const COPY_BUFFER_SIZE: usize = 8192;

/// 100 ns ticks between 0001-01-01 and the Unix epoch.
const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

/// Result of a resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Public URL of the output, with a `?v=` version suffix when the
    /// output's timestamp could be read.
    Url(String),
    /// No filters were given and the profile name is unknown.
    UnknownProfile,
    /// The source could not be read, or a non-image item has no storage path.
    ImageUnavailable,
}

impl Resolution {
    pub fn url(&self) -> Option<&str> {
        match self {
            Resolution::Url(url) => Some(url),
            _ => None,
        }
    }
}

/// Renders as the URL, or as an empty string for an unknown profile.
/// An unavailable image also renders empty; match on the variant to tell
/// the two apart.
impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Url(url) => f.write_str(url),
            Resolution::UnknownProfile | Resolution::ImageUnavailable => Ok(()),
        }
    }
}

/// One pending run of a filter chain over a source.
struct Job<'a> {
    path: &'a str,
    source: &'a str,
    profile_name: &'a str,
    filters: &'a [FilterRecord],
    chain_folder: &'a str,
    content_item: Option<&'a ContentItem>,
}

/// Resolves image profile URLs. Safe to share between threads.
pub struct ImageProfileManager {
    storage: Arc<dyn StorageProvider>,
    cache: Arc<dyn FileNameCache>,
    profiles: Arc<dyn ProfileSource>,
    registry: FilterRegistry,
    tokenizer: Box<dyn Tokenizer>,
    fetcher: Box<dyn SourceFetcher>,
    base_url: Option<Url>,
    profiles_folder: String,
    locks: PathLocks,
    stats: CacheStats,
}

impl ImageProfileManager {
    /// A manager with the built-in filters, `{Content.*}` tokens and remote
    /// sources disabled.
    pub fn new(
        storage: Arc<dyn StorageProvider>,
        cache: Arc<dyn FileNameCache>,
        profiles: Arc<dyn ProfileSource>,
    ) -> Self {
        Self {
            storage,
            cache,
            profiles,
            registry: FilterRegistry::with_builtin(),
            tokenizer: Box::new(TemplateTokenizer),
            fetcher: Box::new(OfflineFetcher),
            base_url: None,
            profiles_folder: DEFAULT_PROFILES_FOLDER.to_string(),
            locks: PathLocks::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn with_registry(mut self, registry: FilterRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: impl Tokenizer + 'static) -> Self {
        self.tokenizer = Box::new(tokenizer);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl SourceFetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    /// Base URL that `~/` source paths are resolved against.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_profiles_folder(mut self, folder: &str) -> Self {
        self.profiles_folder = folder.to_string();
        self
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Resolve `path` through `profile_name`.
    ///
    /// `custom_filters`, when non-empty, replace the profile's filters; the
    /// profile name then only namespaces the output and the cache entry.
    /// A `content_item` without an image part bypasses processing and gets
    /// the plain storage URL of `path`.
    pub fn get_image_profile_url(
        &self,
        path: &str,
        profile_name: &str,
        content_item: Option<&ContentItem>,
        custom_filters: &[FilterRecord],
    ) -> Resolution {
        let source = paths::url_decode(path);
        let is_image = content_item.is_none_or(|c| c.is_image());

        if !is_image {
            let file_path = self
                .cache
                .get_file_name(profile_name, &source)
                .or_else(|| self.storage.get_storage_path(path));
            return self.resolution_for(file_path);
        }

        let Some(filters) = self.filters_for(profile_name, custom_filters) else {
            warn!("Unknown image profile: {}", profile_name);
            return Resolution::UnknownProfile;
        };
        let chain_folder = self.chain_folder(profile_name, &filters);

        let mut file_path = self.cached_output(profile_name, &source, &chain_folder);
        let mut restored = false;
        if file_path.is_none() {
            let candidate = self.output_path(&chain_folder, &source);
            if self.storage.file_exists(&candidate) {
                debug!("Restored {} for {} from storage", candidate, source);
                self.cache
                    .update_file_name(profile_name, &source, &candidate);
                self.stats.restore();
                restored = true;
                file_path = Some(candidate);
            }
        }

        let fresh = file_path
            .as_deref()
            .is_some_and(|fp| self.is_fresh(path, fp));
        if fresh {
            if !restored {
                self.stats.hit();
            }
        } else {
            let job = Job {
                path,
                source: &source,
                profile_name,
                filters: &filters,
                chain_folder: &chain_folder,
                content_item,
            };
            match self.process(&job) {
                Some(fp) => file_path = Some(fp),
                None => return Resolution::ImageUnavailable,
            }
        }

        self.resolution_for(file_path)
    }

    /// Delete every output of `profile_name` and forget its cache entries.
    /// Returns the number of deleted files.
    pub fn purge_profile(&self, profile_name: &str) -> Result<usize, StorageError> {
        let folder = self
            .storage
            .combine(&self.profiles_folder, &self.profiles.name_hash_code(profile_name));
        self.cache.clear_profile(profile_name);
        let removed = self.storage.delete_folder(&folder)?;
        info!("Purged {} file(s) of profile {}", removed, profile_name);
        Ok(removed)
    }

    /// Deterministic output path of `source` under `profile_name` run with
    /// `filters`.
    pub fn profile_file_path(
        &self,
        profile_name: &str,
        filters: &[FilterRecord],
        source: &str,
    ) -> String {
        self.output_path(&self.chain_folder(profile_name, filters), source)
    }

    /// Custom filters, otherwise the named profile's. `None` for an unknown
    /// profile.
    fn filters_for(
        &self,
        profile_name: &str,
        custom_filters: &[FilterRecord],
    ) -> Option<Vec<FilterRecord>> {
        if custom_filters.is_empty() {
            self.profiles
                .get_profile_by_name(profile_name)
                .map(|p| p.filters)
        } else {
            Some(custom_filters.to_vec())
        }
    }

    /// `<profiles_folder>/<hash(profile)>/<hash(filter chain)>`
    fn chain_folder(&self, profile_name: &str, filters: &[FilterRecord]) -> String {
        let profile_folder = self
            .storage
            .combine(&self.profiles_folder, &self.profiles.name_hash_code(profile_name));
        self.storage
            .combine(&profile_folder, &filter_chain_hash(filters))
    }

    fn output_path(&self, chain_folder: &str, source: &str) -> String {
        let (location, file_name) = paths::split_file_name(source);
        let namespaced = self
            .storage
            .combine(&self.profiles.name_hash_code(location), file_name);
        self.storage.combine(chain_folder, &namespaced)
    }

    /// The cached output, unless an earlier version of the filters wrote it.
    fn cached_output(&self, profile_name: &str, source: &str, chain_folder: &str) -> Option<String> {
        let cached = self.cache.get_file_name(profile_name, source)?;
        if paths::is_within(&cached, chain_folder) {
            Some(cached)
        } else {
            debug!("Filters of {} changed since {} was written", profile_name, cached);
            None
        }
    }

    fn is_fresh(&self, path: &str, file_path: &str) -> bool {
        let output = match self.storage.get_file(file_path) {
            Ok(f) => f,
            Err(_) => {
                debug!("Output {} no longer exists", file_path);
                return false;
            }
        };
        let Some(storage_path) = self.storage.get_storage_path(path) else {
            return true;
        };
        match self.storage.get_file(&storage_path) {
            Ok(source) if source.last_updated > output.last_updated => {
                debug!("Source {} changed after {}", storage_path, file_path);
                false
            }
            Ok(_) => true,
            Err(_) => {
                debug!("Source {} no longer exists", storage_path);
                false
            }
        }
    }

    /// Run the filters under the source's lock. `None` when the source
    /// cannot be read.
    fn process(&self, job: &Job<'_>) -> Option<String> {
        self.locks.with_lock(job.source, || {
            // Another thread may have produced the output while we waited.
            if let Some(fp) = self.cached_output(job.profile_name, job.source, job.chain_folder)
                && self.is_fresh(job.path, &fp)
            {
                self.stats.hit();
                return Some(fp);
            }

            let Some(media) = self.open_source(job.path) else {
                self.stats.unavailable();
                return None;
            };
            self.stats.process();

            let mut context =
                FilterContext::new(media, self.output_path(job.chain_folder, job.source));
            self.run_filters(&mut context, job.filters, job.content_item, job.profile_name);

            if !context.saved
                && let Err(e) = self.write_output(&mut context)
            {
                error!("Failed to write {}: {}", context.file_path, e);
            }

            debug!(
                "Processed {} with {} → {}",
                job.source, job.profile_name, context.file_path
            );
            self.cache
                .update_file_name(job.profile_name, job.source, &context.file_path);
            Some(context.file_path)
        })
    }

    fn run_filters(
        &self,
        context: &mut FilterContext,
        filters: &[FilterRecord],
        content_item: Option<&ContentItem>,
        profile_name: &str,
    ) {
        let tokens = TokenContext::with_content(content_item);
        for filter in ordered_filters(filters) {
            let Some(descriptor) = self.registry.find(&filter.category, &filter.filter_type)
            else {
                warn!(
                    "Skipping unknown filter {}/{} in profile {}",
                    filter.category, filter.filter_type, profile_name
                );
                continue;
            };
            context.state = FilterState::parse(&self.tokenizer.replace(&filter.state, &tokens));
            if let Err(e) = descriptor.apply(context) {
                warn!(
                    "Filter {}/{} failed on {}: {}",
                    filter.category, filter.filter_type, context.file_path, e
                );
            }
        }
    }

    /// Storage first, then remote locations.
    fn open_source(&self, path: &str) -> Option<Vec<u8>> {
        if let Some(storage_path) = self.storage.get_storage_path(path) {
            match self.read_storage(&storage_path) {
                Ok(bytes) => return Some(bytes),
                Err(e) => error!("Cannot read {} (storage path {}): {}", path, storage_path, e),
            }
        }

        match fetch::remote_url(path, self.base_url.as_ref()) {
            Some(url) => match self.fetcher.fetch(&url) {
                Ok(bytes) => Some(bytes),
                Err(e) => {
                    error!("Cannot fetch {}: {}", url, e);
                    None
                }
            },
            None => {
                warn!("Image not available: {}", path);
                None
            }
        }
    }

    fn read_storage(&self, storage_path: &str) -> Result<Vec<u8>, StorageError> {
        let mut reader = self.storage.open_read(storage_path)?;
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    /// Write the media and adopt the path the provider chose.
    fn write_output(&self, context: &mut FilterContext) -> Result<(), StorageError> {
        let mut output = self.storage.open_or_create(&context.file_path)?;
        for chunk in context.media.chunks(COPY_BUFFER_SIZE) {
            output.writer.write_all(chunk)?;
        }
        output.writer.flush()?;
        context.file_path = output.path;
        Ok(())
    }

    fn resolution_for(&self, file_path: Option<String>) -> Resolution {
        match file_path {
            Some(fp) => Resolution::Url(self.versioned_url(&fp)),
            None => {
                self.stats.unavailable();
                Resolution::ImageUnavailable
            }
        }
    }

    fn versioned_url(&self, file_path: &str) -> String {
        let public_url = self.storage.get_public_url(file_path);
        match self.storage.get_file(file_path) {
            Ok(file) => format!("{}?v={}", public_url, ticks(file.last_updated)),
            Err(e) => {
                warn!("No timestamp for {}: {}", file_path, e);
                public_url
            }
        }
    }
}

impl fmt::Debug for ImageProfileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageProfileManager")
            .field("registry", &self.registry)
            .field("base_url", &self.base_url)
            .field("profiles_folder", &self.profiles_folder)
            .finish_non_exhaustive()
    }
}

/// Timestamp as 100 ns ticks since 0001-01-01, the cache-busting version.
pub fn ticks(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(since) => UNIX_EPOCH_TICKS + (since.as_nanos() / 100) as i64,
        Err(e) => UNIX_EPOCH_TICKS - (e.duration().as_nanos() / 100) as i64,
    }
}
