//! Shared types passed between the resolver and its collaborators.
//!
//! These are the plain-data shapes of the content platform the resolver is
//! embedded in: filter definitions as stored on a profile, and the content
//! item that may drive a resolution. They are serializable so the CLI can
//! accept them as JSON and the config can declare them in TOML.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Name of the content part that marks a content item as a processable image.
pub const IMAGE_PART: &str = "ImagePart";

/// A single filter step as stored on a profile.
///
/// `state` is a template: it is tokenized against the request context and
/// then parsed as `key=value&key=value` pairs before the filter runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterRecord {
    pub category: String,
    #[serde(rename = "type")]
    pub filter_type: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub state: String,
}

impl FilterRecord {
    pub fn new(category: &str, filter_type: &str, position: i32, state: &str) -> Self {
        Self {
            category: category.to_string(),
            filter_type: filter_type.to_string(),
            position,
            state: state.to_string(),
        }
    }
}

/// Parses the command-line form `Category/Type` or `Category/Type:state`.
/// The position is left at 0.
impl FromStr for FilterRecord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, state) = s.split_once(':').unwrap_or((s, ""));
        match name.split_once('/') {
            Some((category, filter_type))
                if !category.trim().is_empty() && !filter_type.trim().is_empty() =>
            {
                Ok(Self::new(category.trim(), filter_type.trim(), 0, state))
            }
            _ => Err(format!("expected CATEGORY/TYPE[:STATE], got {:?}", s)),
        }
    }
}

/// The content item a resolution is performed for.
///
/// Only what the resolver needs is modelled: the parts attached to the item
/// (to decide whether it is an image at all) and its identity and fields
/// (for token substitution in filter state).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentItem {
    pub id: u64,
    pub content_type: String,
    pub parts: Vec<String>,
    pub fields: BTreeMap<String, String>,
}

impl ContentItem {
    pub fn has_part(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p == name)
    }

    /// Whether the item carries the image aspect required for processing.
    pub fn is_image(&self) -> bool {
        self.has_part(IMAGE_PART)
    }
}

/// Order filters for execution: ascending position, ties keep declaration order.
pub fn ordered_filters(filters: &[FilterRecord]) -> Vec<&FilterRecord> {
    let mut ordered: Vec<&FilterRecord> = filters.iter().collect();
    // sort_by_key is stable
    ordered.sort_by_key(|f| f.position);
    ordered
}
