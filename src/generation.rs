//! Contract with the correction-filter generator.
//!
//! Filter combinations come from an external service (an LLM behind an HTTP
//! endpoint in the web app). The engine never calls it; callers
//! ask a [`FilterGenerator`] for combinations, show them, and hand the chosen
//! one to [`crate::engine::AccessibilityEngine::apply_filter`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::filter::{FilterParam, FilterSettings};
use crate::palette::ColorblindnessType;

/// Request sent to the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub colorblindness_type: ColorblindnessType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_preferences: Option<String>,
}

impl GenerationRequest {
    pub fn new(colorblindness_type: ColorblindnessType) -> Self {
        Self {
            colorblindness_type,
            user_preferences: None,
        }
    }

    /// Attach free-text preferences; blank text counts as none.
    pub fn with_preferences(mut self, preferences: impl Into<String>) -> Self {
        let preferences = preferences.into();
        self.user_preferences = Some(preferences).filter(|p| !p.trim().is_empty());
        self
    }
}

/// A named, described set of correction parameters.
///
/// Deserializes from either `parameters` or the service's `filterSettings`;
/// when both are present `parameters` wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCombination")]
pub struct FilterCombination {
    pub name: String,
    pub description: String,
    pub parameters: FilterSettings,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCombination {
    name: String,
    #[serde(default)]
    description: String,
    parameters: Option<FilterSettings>,
    filter_settings: Option<FilterSettings>,
}

impl TryFrom<RawCombination> for FilterCombination {
    type Error = String;

    fn try_from(raw: RawCombination) -> Result<Self, Self::Error> {
        let parameters = raw
            .parameters
            .or(raw.filter_settings)
            .ok_or_else(|| format!("combination '{}' has no parameters", raw.name))?;
        Ok(Self {
            name: raw.name,
            description: raw.description,
            parameters,
        })
    }
}

impl FilterCombination {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: FilterSettings,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// Response body, as returned by the generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub filter_combinations: Vec<FilterCombination>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ResponseShape {
    Wrapped(GenerationResponse),
    Bare(Vec<FilterCombination>),
}

/// Error type for filter generation.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to read generator response {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed generator response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("generator returned no filter combinations")]
    Empty,
    #[error("generator failed: {0}")]
    Service(String),
}

/// Source of correction filter combinations.
pub trait FilterGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<FilterCombination>, GenerationError>;
}

/// Parse a generator response body, either `{"filterCombinations": [...]}` or
/// a bare array. Duplicate names keep their first occurrence.
pub fn parse_response(json: &str) -> Result<Vec<FilterCombination>, GenerationError> {
    let combinations = match serde_json::from_str::<ResponseShape>(json)? {
        ResponseShape::Wrapped(response) => response.filter_combinations,
        ResponseShape::Bare(list) => list,
    };
    let combinations = dedupe_names(combinations);
    if combinations.is_empty() {
        return Err(GenerationError::Empty);
    }
    Ok(combinations)
}

/// Drop combinations whose name was already seen.
pub fn dedupe_names(combinations: Vec<FilterCombination>) -> Vec<FilterCombination> {
    let mut seen = HashSet::new();
    combinations
        .into_iter()
        .filter(|c| {
            let fresh = seen.insert(c.name.clone());
            if !fresh {
                warn!(name = %c.name, "dropping duplicate filter combination");
            }
            fresh
        })
        .collect()
}

/// Ask `generator` for combinations, treating any failure as "none available".
pub fn generate_or_empty<G: FilterGenerator + ?Sized>(
    generator: &G,
    request: &GenerationRequest,
) -> Vec<FilterCombination> {
    match generator.generate(request) {
        Ok(combinations) => {
            info!(
                kind = %request.colorblindness_type,
                count = combinations.len(),
                "filter combinations ready"
            );
            combinations
        }
        Err(e) => {
            warn!(kind = %request.colorblindness_type, error = %e, "filter generation failed");
            Vec::new()
        }
    }
}

/// Generator that replays a response saved from the generation service.
#[derive(Debug, Clone)]
pub struct ResponseFileGenerator {
    path: PathBuf,
}

impl ResponseFileGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FilterGenerator for ResponseFileGenerator {
    fn generate(
        &self,
        _request: &GenerationRequest,
    ) -> Result<Vec<FilterCombination>, GenerationError> {
        let json = std::fs::read_to_string(&self.path).map_err(|source| GenerationError::Io {
            path: self.path.clone(),
            source,
        })?;
        parse_response(&json)
    }
}

/// Offline generator with hand-tuned combinations per deficiency.
///
/// Preferences re-rank the presets: ones using a parameter the text asks for
/// (e.g. "more contrast", "warmer") come first.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresetGenerator;

type Preset = (&'static str, &'static str, &'static [(FilterParam, f64)]);

const PROTANOPIA_PRESETS: &[Preset] = &[
    (
        "Red Boost",
        "Saturates and nudges reds toward orange so they separate from greens.",
        &[
            (FilterParam::Contrast, 1.1),
            (FilterParam::Saturate, 1.4),
            (FilterParam::HueRotate, -10.0),
        ],
    ),
    (
        "High Contrast",
        "Raises contrast so edges carry the information hue no longer does.",
        &[(FilterParam::Brightness, 1.05), (FilterParam::Contrast, 1.35)],
    ),
    (
        "Warm Shift",
        "Warms the image, moving dark reds into a more visible range.",
        &[
            (FilterParam::Saturate, 1.2),
            (FilterParam::Sepia, 0.25),
            (FilterParam::HueRotate, -20.0),
        ],
    ),
    (
        "Soft Lift",
        "Gentle brightening for dim reds without oversaturating.",
        &[
            (FilterParam::Brightness, 1.1),
            (FilterParam::Contrast, 1.15),
            (FilterParam::Saturate, 0.9),
        ],
    ),
];

const DEUTERANOPIA_PRESETS: &[Preset] = &[
    (
        "Green Lift",
        "Rotates greens toward cyan so they stand apart from reds.",
        &[(FilterParam::Saturate, 1.3), (FilterParam::HueRotate, 15.0)],
    ),
    (
        "Crisp Contrast",
        "Stronger contrast for red/green pairs of similar lightness.",
        &[(FilterParam::Brightness, 1.05), (FilterParam::Contrast, 1.3)],
    ),
    (
        "Cool Shift",
        "Cools the palette, spreading greens and reds across blue-yellow.",
        &[
            (FilterParam::Contrast, 1.1),
            (FilterParam::Saturate, 1.15),
            (FilterParam::HueRotate, 25.0),
        ],
    ),
    (
        "Muted Calm",
        "Reduces saturation and adds contrast for long reading sessions.",
        &[
            (FilterParam::Contrast, 1.2),
            (FilterParam::Saturate, 0.8),
            (FilterParam::Sepia, 0.1),
        ],
    ),
];

const TRITANOPIA_PRESETS: &[Preset] = &[
    (
        "Blue Rescue",
        "Rotates blues toward violet and boosts saturation.",
        &[(FilterParam::Saturate, 1.25), (FilterParam::HueRotate, -30.0)],
    ),
    (
        "Bright Contrast",
        "Brighter and punchier so blue/yellow pairs differ in lightness.",
        &[(FilterParam::Brightness, 1.1), (FilterParam::Contrast, 1.3)],
    ),
    (
        "Amber Tint",
        "Adds a light amber tint that separates yellows from whites.",
        &[
            (FilterParam::Saturate, 1.1),
            (FilterParam::Sepia, 0.3),
            (FilterParam::HueRotate, -15.0),
        ],
    ),
    (
        "Neutral Gray Lift",
        "Partially desaturates and adds contrast to lean on lightness cues.",
        &[(FilterParam::Contrast, 1.25), (FilterParam::Grayscale, 0.2)],
    ),
];

/// Words in free-text preferences that point at a parameter.
const PREFERENCE_KEYWORDS: &[(&str, FilterParam)] = &[
    ("contrast", FilterParam::Contrast),
    ("bright", FilterParam::Brightness),
    ("dark", FilterParam::Brightness),
    ("saturat", FilterParam::Saturate),
    ("vivid", FilterParam::Saturate),
    ("gray", FilterParam::Grayscale),
    ("grey", FilterParam::Grayscale),
    ("warm", FilterParam::Sepia),
    ("sepia", FilterParam::Sepia),
    ("hue", FilterParam::HueRotate),
    ("invert", FilterParam::Invert),
];

impl PresetGenerator {
    fn presets(kind: ColorblindnessType) -> &'static [Preset] {
        match kind {
            ColorblindnessType::Protanopia => PROTANOPIA_PRESETS,
            ColorblindnessType::Deuteranopia => DEUTERANOPIA_PRESETS,
            ColorblindnessType::Tritanopia => TRITANOPIA_PRESETS,
        }
    }

    fn wanted_params(preferences: Option<&str>) -> Vec<FilterParam> {
        let Some(text) = preferences else {
            return Vec::new();
        };
        let text = text.to_lowercase();
        PREFERENCE_KEYWORDS
            .iter()
            .filter(|(word, _)| text.contains(word))
            .map(|&(_, param)| param)
            .collect()
    }
}

impl FilterGenerator for PresetGenerator {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<FilterCombination>, GenerationError> {
        let wanted = Self::wanted_params(request.user_preferences.as_deref());

        let mut combinations: Vec<FilterCombination> = Self::presets(request.colorblindness_type)
            .iter()
            .map(|(name, description, params)| {
                let parameters = params
                    .iter()
                    .fold(FilterSettings::new(), |s, &(p, v)| s.with(p, v));
                FilterCombination::new(*name, *description, parameters)
            })
            .collect();

        // Stable sort keeps preset order among equally relevant entries
        combinations.sort_by_key(|c| {
            let hits = wanted
                .iter()
                .filter(|p| c.parameters.get(**p).is_some())
                .count();
            std::cmp::Reverse(hits)
        });

        Ok(combinations)
    }
}
