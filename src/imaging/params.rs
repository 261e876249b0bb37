//! Parameter types for filters.
//!
//! Filter state arrives as a tokenized `key=value&key=value` string. It is
//! parsed once into a [`FilterState`] and filters pull typed values out of it.
//! Keys are case-insensitive (`Width` and `width` are the same parameter).
//!
//! ## Types
//!
//! - [`FilterState`]: parsed parameter map with typed accessors.
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ResizeMode`]: How a resize fits the source into the requested box.
//! - [`PadColor`]: Canvas color for `pad` resizes.

use super::filter::FilterError;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Parsed filter parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    values: BTreeMap<String, String>,
}

impl FilterState {
    /// Parse form-urlencoded pairs. Later duplicates win; empty keys are dropped.
    pub fn parse(state: &str) -> Self {
        let values = url::form_urlencoded::parse(state.trim().as_bytes())
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (k.to_ascii_lowercase(), v.trim().to_string()))
            .collect();
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Typed parameter. Absent or empty → `Ok(None)`; unparsable → error.
    pub fn get_parsed<T: FromStr>(&self, name: &str) -> Result<Option<T>, FilterError> {
        match self.get(name) {
            None => Ok(None),
            Some(raw) => raw
                .parse::<T>()
                .map(Some)
                .map_err(|_| FilterError::invalid(name, raw)),
        }
    }

    /// A dimension: absent, empty or `0` all mean "not constrained".
    pub fn get_dimension(&self, name: &str) -> Result<Option<u32>, FilterError> {
        Ok(self.get_parsed::<u32>(name)?.filter(|v| *v > 0))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }

    /// Quality from the `quality` parameter, default when absent.
    pub fn from_state(state: &FilterState) -> Result<Self, FilterError> {
        Ok(state
            .get_parsed::<u32>("quality")?
            .map(Self::new)
            .unwrap_or_default())
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// How a resize fits the source into the requested box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResizeMode {
    /// Fit inside the box, keep aspect ratio, never enlarge.
    #[default]
    Max,
    /// Fill the box then center-crop the overflow.
    Crop,
    /// Fit inside the box, then center on a canvas of exactly the box size.
    Pad,
    /// Exactly the box size, aspect ratio ignored.
    Stretch,
}

impl FromStr for ResizeMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "max" => Ok(Self::Max),
            "crop" => Ok(Self::Crop),
            "pad" => Ok(Self::Pad),
            "stretch" => Ok(Self::Stretch),
            _ => Err(()),
        }
    }
}

/// Opaque RGB canvas color parsed from `#rrggbb` / `rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadColor(pub [u8; 3]);

impl Default for PadColor {
    fn default() -> Self {
        Self([255, 255, 255])
    }
}

impl FromStr for PadColor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| ());
        Ok(Self([channel(0)?, channel(2)?, channel(4)?]))
    }
}
