//! Image profiles: named, ordered filter chains.
//!
//! Profiles are authored by administrators (here: declared in the config
//! file) and are read-only while resolving. Each profile's outputs live in
//! their own folder under the profiles folder, named after a hash of the
//! profile name, so a profile can be purged without touching the others.
//! Below it, a hash of the filter chain separates outputs of different
//! versions of the profile.

use crate::types::{FilterRecord, ordered_filters};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// A named filter chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub name: String,
    pub filters: Vec<FilterRecord>,
}

impl Profile {
    pub fn new(name: &str, filters: Vec<FilterRecord>) -> Self {
        Self {
            name: name.to_string(),
            filters,
        }
    }
}

/// Where the resolver looks profiles up.
pub trait ProfileSource: Send + Sync {
    fn get_profile_by_name(&self, name: &str) -> Option<Profile>;

    /// Stable, path-safe hash of a name, used to namespace output folders.
    ///
    /// Must not change between process restarts: the resolver relies on it to
    /// find outputs written by an earlier run.
    fn name_hash_code(&self, name: &str) -> String {
        name_hash_code(name)
    }
}

/// First 8 bytes of the SHA-256 of `name`, as lower-case hex.
pub fn name_hash_code(name: &str) -> String {
    short_hex(&Sha256::digest(name.as_bytes()))
}

/// Hash of what a filter chain does: category, type and state of each filter
/// in execution order. Positions only matter through that order.
pub fn filter_chain_hash(filters: &[FilterRecord]) -> String {
    let mut hasher = Sha256::new();
    for filter in ordered_filters(filters) {
        for field in [&filter.category, &filter.filter_type, &filter.state] {
            hasher.update((field.len() as u64).to_le_bytes());
            hasher.update(field.as_bytes());
        }
    }
    short_hex(&hasher.finalize())
}

fn short_hex(digest: &[u8]) -> String {
    digest[..8].iter().map(|b| format!("{:02x}", b)).collect()
}

/// Profiles held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Profile>,
}

impl ProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_profiles(profiles: impl IntoIterator<Item = Profile>) -> Self {
        let mut store = Self::new();
        for profile in profiles {
            store.insert(profile);
        }
        store
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// All profiles, sorted by name.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }
}

impl ProfileSource for ProfileStore {
    fn get_profile_by_name(&self, name: &str) -> Option<Profile> {
        self.profiles.get(name).cloned()
    }
}
