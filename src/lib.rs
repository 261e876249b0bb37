//! # Image Profiles
//!
//! On-demand image processing for a content platform. A **profile** is a
//! named, ordered list of filters (resize, crop, format conversion, or any
//! filter an application registers). Resolving a source image through a
//! profile returns the public URL of the processed output; the filters run
//! only when no fresh output exists yet.
//!
//! # Architecture: Resolve, Then Maybe Process
//!
//! ```text
//! get_image_profile_url("/media/img/a.jpg", "Thumbnail")
//!   1. cache        (profile, source) → output path       hit + fresh → URL
//!   2. warm start   derived output path exists on disk    fresh → URL
//!   3. process      lock source → read → filters → write  → URL
//! ```
//!
//! Every collaborator sits behind a trait, so the resolver can run against
//! any storage, cache, or profile source:
//!
//! - [`storage::StorageProvider`]: files, timestamps, public URLs
//! - [`cache::FileNameCache`]: `(profile, source) → output path`
//! - [`profile::ProfileSource`]: profiles by name, stable name hashes
//! - [`imaging::FilterDescriptor`]: one image operation
//! - [`tokens::Tokenizer`]: `{Content.*}` substitution in filter state
//! - [`fetch::SourceFetcher`]: sources that are not in storage
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`resolver`] | [`ImageProfileManager`](resolver::ImageProfileManager): cache lookup, freshness, processing, purge |
//! | [`storage`] | Storage provider trait and the file-system implementation |
//! | [`cache`] | Filename cache with a JSON manifest, resolution counters |
//! | [`profile`] | Profiles, the profile source trait, name hashing |
//! | [`imaging`] | Filter trait, registry, and the built-in `Transform` filters |
//! | [`tokens`] | Template tokens in filter state |
//! | [`fetch`] | HTTP and app-relative source retrieval |
//! | [`locks`] | Per-source mutual exclusion |
//! | [`config`] | `image-profiles.toml` loading, merging, and validation |
//! | [`types`] | Filter records and content items shared by all modules |
//! | [`paths`] | Storage path helpers |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Deterministic Output Paths
//!
//! Outputs live at
//! `<profiles_folder>/<hash(profile)>/<hash(filters)>/<hash(source dir)>/<file>`.
//! The hashes are truncated SHA-256, stable across processes and releases, so
//! a restarted process finds every earlier output without its cache and two
//! sources with the same file name in different folders never collide. An
//! edited profile hashes to a new folder, so its old outputs are never served.
//!
//! ## Freshness Over Invalidation
//!
//! Nothing invalidates cache entries when a source changes. Each resolution
//! compares the output's timestamp with the source's instead, so editing a
//! source is picked up on the next request and a deleted source is never
//! served from cache.
//!
//! ## Explicit Outcomes
//!
//! [`get_image_profile_url`](resolver::ImageProfileManager::get_image_profile_url)
//! never fails. It returns a [`Resolution`](resolver::Resolution) that tells a
//! URL, an unknown profile and an unavailable image apart. Everything that
//! goes wrong inside the pipeline (an unknown filter, a failing filter, a
//! failed write) is logged and the pipeline carries on.
//!
//! ## Per-Source Locking
//!
//! Processing the same source twice at once would waste work and race on the
//! output file. A lock per source serializes that section; unrelated sources
//! never wait for each other. The lock is process-local: processes sharing a
//! storage may still process the same image concurrently, and the last
//! complete write wins.

pub mod cache;
pub mod config;
pub mod fetch;
pub mod imaging;
pub mod locks;
pub mod output;
pub mod paths;
pub mod profile;
pub mod resolver;
pub mod storage;
pub mod tokens;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
