//! Catalog of filter descriptors.

use super::filter::FilterDescriptor;
use super::operations::{CropFilter, FormatFilter, ResizeFilter};

/// Filters known to the resolver, looked up by `(category, type)`.
#[derive(Default)]
pub struct FilterRegistry {
    descriptors: Vec<Box<dyn FilterDescriptor>>,
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in `Transform` filters.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ResizeFilter);
        registry.register(CropFilter);
        registry.register(FormatFilter);
        registry
    }

    /// Add a descriptor. A later registration with the same `(category, type)`
    /// shadows the earlier one.
    pub fn register(&mut self, descriptor: impl FilterDescriptor + 'static) {
        self.descriptors.push(Box::new(descriptor));
    }

    pub fn describe_filters(&self) -> impl Iterator<Item = &dyn FilterDescriptor> {
        self.descriptors.iter().map(|d| d.as_ref())
    }

    /// Exact, case-sensitive lookup.
    pub fn find(&self, category: &str, filter_type: &str) -> Option<&dyn FilterDescriptor> {
        self.descriptors
            .iter()
            .rev()
            .find(|d| d.category() == category && d.filter_type() == filter_type)
            .map(|d| d.as_ref())
    }
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(
                self.descriptors
                    .iter()
                    .map(|d| format!("{}/{}", d.category(), d.filter_type())),
            )
            .finish()
    }
}
