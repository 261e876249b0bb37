//! Filter descriptor trait and the per-call filter context.
//!
//! A [`FilterDescriptor`] is one named image operation, identified by
//! `(category, type)`. The resolver looks descriptors up in the
//! [`FilterRegistry`](super::registry::FilterRegistry) and calls
//! [`apply`](FilterDescriptor::apply) on a [`FilterContext`] that every filter
//! of the chain shares.

use super::params::FilterState;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
    #[error("Invalid value for {name}: {value:?}")]
    InvalidParameter { name: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FilterError {
    pub fn invalid(name: &str, value: &str) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Mutable record the filters of one resolution operate on.
///
/// Owned by a single resolution call; never shared between calls.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    /// Current encoded image bytes.
    pub media: Vec<u8>,
    /// Storage path the output will be written to. Filters may change it
    /// (e.g. a format conversion changes the extension).
    pub file_path: String,
    /// Parameters of the filter currently running.
    pub state: FilterState,
    /// Set by a filter that already persisted the output itself.
    pub saved: bool,
}

impl FilterContext {
    pub fn new(media: Vec<u8>, file_path: String) -> Self {
        Self {
            media,
            file_path,
            state: FilterState::default(),
            saved: false,
        }
    }
}

/// A named image operation.
///
/// Implementations must leave `context.media` untouched when they return an
/// error, so the pipeline can carry on with the previous image.
pub trait FilterDescriptor: Send + Sync {
    fn category(&self) -> &str;

    fn filter_type(&self) -> &str;

    /// One-line human description, shown by `image-profiles profiles`.
    fn description(&self) -> &str {
        ""
    }

    fn apply(&self, context: &mut FilterContext) -> Result<(), FilterError>;
}

/// Shared descriptors register like owned ones.
impl<T: FilterDescriptor + ?Sized> FilterDescriptor for Arc<T> {
    fn category(&self) -> &str {
        (**self).category()
    }

    fn filter_type(&self) -> &str {
        (**self).filter_type()
    }

    fn description(&self) -> &str {
        (**self).description()
    }

    fn apply(&self, context: &mut FilterContext) -> Result<(), FilterError> {
        (**self).apply(context)
    }
}
