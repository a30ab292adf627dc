//! Colorblindness simulation palettes and the palette applier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::Document;

/// Color vision deficiency targeted by a simulation or a correction filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorblindnessType {
    /// Red-blind
    Protanopia,
    /// Green-blind
    Deuteranopia,
    /// Blue-blind
    Tritanopia,
}

impl ColorblindnessType {
    pub const ALL: [ColorblindnessType; 3] = [
        ColorblindnessType::Protanopia,
        ColorblindnessType::Deuteranopia,
        ColorblindnessType::Tritanopia,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Protanopia => "protanopia",
            Self::Deuteranopia => "deuteranopia",
            Self::Tritanopia => "tritanopia",
        }
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Protanopia => "Protanopia (Red-Blind)",
            Self::Deuteranopia => "Deuteranopia (Green-Blind)",
            Self::Tritanopia => "Tritanopia (Blue-Blind)",
        }
    }

    /// RGB simulation matrix, rows are output channels.
    pub fn simulation_matrix(self) -> [[f32; 3]; 3] {
        match self {
            Self::Protanopia => [[0.567, 0.433, 0.0], [0.558, 0.442, 0.0], [0.0, 0.242, 0.758]],
            Self::Deuteranopia => [[0.625, 0.375, 0.0], [0.7, 0.3, 0.0], [0.0, 0.3, 0.7]],
            Self::Tritanopia => [[0.95, 0.05, 0.0], [0.0, 0.433, 0.567], [0.0, 0.475, 0.525]],
        }
    }
}

impl fmt::Display for ColorblindnessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selected simulation palette. `Default` means no simulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaletteSelection {
    #[default]
    #[serde(rename = "default")]
    Default,
    #[serde(rename = "protanopiaSim", alias = "protanopia")]
    ProtanopiaSim,
    #[serde(rename = "deuteranopiaSim", alias = "deuteranopia")]
    DeuteranopiaSim,
    #[serde(rename = "tritanopiaSim", alias = "tritanopia")]
    TritanopiaSim,
}

/// Prefix shared by every simulation marker.
pub const MARKER_PREFIX: &str = "simulate-";

impl PaletteSelection {
    pub const ALL: [PaletteSelection; 4] = [
        PaletteSelection::Default,
        PaletteSelection::ProtanopiaSim,
        PaletteSelection::DeuteranopiaSim,
        PaletteSelection::TritanopiaSim,
    ];

    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::ProtanopiaSim => "protanopiaSim",
            Self::DeuteranopiaSim => "deuteranopiaSim",
            Self::TritanopiaSim => "tritanopiaSim",
        }
    }

    /// Parse a stored value, accepting the bare type names older releases wrote.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value.trim() {
            "default" => Some(Self::Default),
            "protanopiaSim" | "protanopia" => Some(Self::ProtanopiaSim),
            "deuteranopiaSim" | "deuteranopia" => Some(Self::DeuteranopiaSim),
            "tritanopiaSim" | "tritanopia" => Some(Self::TritanopiaSim),
            _ => None,
        }
    }

    /// The deficiency this palette simulates, if any.
    pub fn simulated(self) -> Option<ColorblindnessType> {
        match self {
            Self::Default => None,
            Self::ProtanopiaSim => Some(ColorblindnessType::Protanopia),
            Self::DeuteranopiaSim => Some(ColorblindnessType::Deuteranopia),
            Self::TritanopiaSim => Some(ColorblindnessType::Tritanopia),
        }
    }

    pub fn is_simulation(self) -> bool {
        self != Self::Default
    }

    /// Document marker for this palette, e.g. `simulate-protanopia`.
    pub fn marker(self) -> Option<String> {
        self.simulated()
            .map(|kind| format!("{MARKER_PREFIX}{}", kind.as_str()))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "Default Palette",
            Self::ProtanopiaSim => "Protanopia Simulation",
            Self::DeuteranopiaSim => "Deuteranopia Simulation",
            Self::TritanopiaSim => "Tritanopia Simulation",
        }
    }
}

impl fmt::Display for PaletteSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaletteSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_stored(s).ok_or_else(|| format!("unknown palette '{s}'"))
    }
}

/// Make `selection` the only simulation marker on the document.
///
/// Every palette marker is removed first, so repeated calls with the same
/// selection leave the document unchanged. Nothing besides markers is touched.
pub fn apply_palette<D: Document + ?Sized>(doc: &mut D, selection: PaletteSelection) {
    for palette in PaletteSelection::ALL {
        if palette == selection {
            continue;
        }
        if let Some(marker) = palette.marker() {
            doc.remove_marker(&marker);
        }
    }
    if let Some(marker) = selection.marker() {
        doc.add_marker(&marker);
    }
    debug!(palette = %selection, "applied palette marker");
}
