//! CSS filter parameters and the filter compiler.
//!
//! A correction filter is a bag of named numeric parameters. [`compile`] turns
//! it into a single CSS `filter` value. Emission order is the declaration
//! order of [`FilterParam`], never the insertion order of the map, so two
//! equal settings always compile to the same string.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// A CSS filter function the compiler knows how to emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterParam {
    Brightness,
    Contrast,
    Saturate,
    Grayscale,
    Sepia,
    HueRotate,
    Invert,
    Opacity,
    Blur,
}

impl FilterParam {
    /// All recognized parameters in emission order.
    pub const ALL: [FilterParam; 9] = [
        FilterParam::Brightness,
        FilterParam::Contrast,
        FilterParam::Saturate,
        FilterParam::Grayscale,
        FilterParam::Sepia,
        FilterParam::HueRotate,
        FilterParam::Invert,
        FilterParam::Opacity,
        FilterParam::Blur,
    ];

    /// CSS function name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturate => "saturate",
            Self::Grayscale => "grayscale",
            Self::Sepia => "sepia",
            Self::HueRotate => "hue-rotate",
            Self::Invert => "invert",
            Self::Opacity => "opacity",
            Self::Blur => "blur",
        }
    }

    /// Unit suffix appended to the value.
    pub fn unit(self) -> &'static str {
        match self {
            Self::HueRotate => "deg",
            Self::Blur => "px",
            _ => "",
        }
    }

    /// Look up a parameter by its CSS name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    /// Render `name(value unit)` for this parameter.
    pub fn render(self, value: f64) -> String {
        format!("{}({}{})", self.name(), value, self.unit())
    }
}

impl fmt::Display for FilterParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterParam {
    type Err = FilterParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s.trim()).ok_or_else(|| FilterParseError::UnknownParameter(s.to_string()))
    }
}

/// Error type for parsing filter parameters from user input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterParseError {
    #[error("expected NAME=VALUE, got '{0}'")]
    MissingValue(String),
    #[error(
        "unknown filter parameter '{0}' (expected one of: brightness, contrast, saturate, \
         grayscale, sepia, hue-rotate, invert, opacity, blur)"
    )]
    UnknownParameter(String),
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: String, value: String },
}

/// Named numeric filter parameters, as produced by the filter generator.
///
/// Keys are kept verbatim, including ones the compiler doesn't recognize;
/// those are dropped only at compile time. Non-numeric JSON values are dropped
/// when deserializing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, serde_json::Value>",
    into = "BTreeMap<String, f64>"
)]
pub struct FilterSettings {
    values: BTreeMap<String, f64>,
}

impl FilterSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert of a recognized parameter.
    pub fn with(mut self, param: FilterParam, value: f64) -> Self {
        self.values.insert(param.name().to_string(), value);
        self
    }

    /// Insert a raw key; unrecognized names are kept but never compiled.
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.values.insert(name.into(), value);
    }

    pub fn get(&self, param: FilterParam) -> Option<f64> {
        self.values.get(param.name()).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Recognized parameters with finite values, in emission order.
    pub fn recognized(&self) -> impl Iterator<Item = (FilterParam, f64)> + '_ {
        FilterParam::ALL
            .into_iter()
            .filter_map(|p| self.get(p).filter(|v| v.is_finite()).map(|v| (p, v)))
    }

    /// Keys the compiler will ignore.
    pub fn unrecognized(&self) -> impl Iterator<Item = &str> {
        self.values
            .keys()
            .map(String::as_str)
            .filter(|k| FilterParam::from_name(k).is_none())
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FilterSettings {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl From<BTreeMap<String, serde_json::Value>> for FilterSettings {
    fn from(raw: BTreeMap<String, serde_json::Value>) -> Self {
        raw.into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|n| (k, n)))
            .collect()
    }
}

impl From<FilterSettings> for BTreeMap<String, f64> {
    fn from(settings: FilterSettings) -> Self {
        settings.values
    }
}

/// Compile filter settings into a CSS `filter` value.
///
/// `hue-rotate` is emitted in degrees, `blur` in pixels, everything else as a
/// bare factor. Unknown keys and non-finite values are skipped. Empty input
/// compiles to the empty string.
pub fn compile(settings: &FilterSettings) -> String {
    for key in settings.unrecognized() {
        debug!(key, "ignoring unrecognized filter parameter");
    }

    settings
        .recognized()
        .map(|(param, value)| param.render(value))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse `NAME=VALUE` assignments (e.g. from the command line).
///
/// Unlike [`compile`], this rejects unknown names since a human typed them.
pub fn parse_filter_assignments<S: AsRef<str>>(
    assignments: &[S],
) -> Result<FilterSettings, FilterParseError> {
    let mut settings = FilterSettings::new();
    for raw in assignments {
        let raw = raw.as_ref();
        let (name, value) = raw
            .split_once('=')
            .ok_or_else(|| FilterParseError::MissingValue(raw.to_string()))?;
        let param: FilterParam = name.parse()?;
        let trimmed = value.trim();
        let value = trimmed
            .strip_suffix(param.unit())
            .unwrap_or(trimmed)
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| FilterParseError::InvalidValue {
                name: param.name().to_string(),
                value: value.to_string(),
            })?;
        settings = settings.with(param, value);
    }
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_empty() {
        assert_eq!(compile(&FilterSettings::new()), "");
    }

    #[test]
    fn test_compile_units() {
        let settings = FilterSettings::new()
            .with(FilterParam::HueRotate, 90.0)
            .with(FilterParam::Blur, 2.0)
            .with(FilterParam::Brightness, 1.2);
        assert_eq!(
            compile(&settings),
            "brightness(1.2) hue-rotate(90deg) blur(2px)"
        );
    }

    #[test]
    fn test_compile_skips_non_finite() {
        let settings = FilterSettings::new()
            .with(FilterParam::Contrast, f64::NAN)
            .with(FilterParam::Sepia, 0.3);
        assert_eq!(compile(&settings), "sepia(0.3)");
    }

    #[test]
    fn test_deserialize_drops_non_numeric() {
        let settings: FilterSettings =
            serde_json::from_str(r#"{"brightness": 1.1, "contrast": "high", "blur": null}"#)
                .unwrap();
        assert_eq!(settings.len(), 1);
        assert_eq!(settings.get(FilterParam::Brightness), Some(1.1));
    }

    #[test]
    fn test_param_name_roundtrip() {
        for param in FilterParam::ALL {
            assert_eq!(FilterParam::from_name(param.name()), Some(param));
        }
        assert_eq!(FilterParam::from_name("hue_rotate"), None);
    }

    #[test]
    fn test_parse_assignments() {
        let settings =
            parse_filter_assignments(&["brightness=1.2", "hue-rotate=15deg", "blur = 1"]).unwrap();
        assert_eq!(compile(&settings), "brightness(1.2) hue-rotate(15deg) blur(1px)");
    }

    #[test]
    fn test_parse_assignments_errors() {
        assert_eq!(
            parse_filter_assignments(&["brightness"]),
            Err(FilterParseError::MissingValue("brightness".into()))
        );
        assert!(matches!(
            parse_filter_assignments(&["glow=1"]),
            Err(FilterParseError::UnknownParameter(_))
        ));
        assert!(matches!(
            parse_filter_assignments(&["contrast=lots"]),
            Err(FilterParseError::InvalidValue { .. })
        ));
    }
}
