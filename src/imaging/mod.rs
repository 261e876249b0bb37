//! Image filters, pure Rust, built on the `image` crate.
//!
//! | Filter | Crate / function |
//! |---|---|
//! | **Decode** | `image::guess_format` + `load_from_memory_with_format` |
//! | **Resize** | Lanczos3 `resize_exact`, `crop_imm`, `overlay` for padding |
//! | **Crop** | `DynamicImage::crop_imm` |
//! | **Format** | JPEG/AVIF encoders with quality, `write_to` otherwise |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Parsed filter state and typed parameter values
//! - **Filter**: [`FilterDescriptor`] trait + [`FilterContext`]
//! - **Operations**: The built-in filters
//! - **Registry**: [`FilterRegistry`], lookup by `(category, type)`

pub mod calculations;
mod codec;
pub mod filter;
pub mod operations;
pub mod params;
pub mod registry;

pub use filter::{FilterContext, FilterDescriptor, FilterError};
pub use operations::{CropFilter, FormatFilter, ResizeFilter};
pub use params::{FilterState, Quality};
pub use registry::FilterRegistry;
