//! CLI argument definitions.
//!
//! Only struct/enum definitions live here; command handling is in `cli`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::palette::{ColorblindnessType, PaletteSelection};

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default)
    #[default]
    Text,
    /// JSON
    Json,
    /// YAML
    Yaml,
}

/// CLI-compatible palette enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PaletteArg {
    /// No simulation
    Default,
    /// Simulate red-blind vision
    #[value(alias = "protanopia-sim")]
    Protanopia,
    /// Simulate green-blind vision
    #[value(alias = "deuteranopia-sim")]
    Deuteranopia,
    /// Simulate blue-blind vision
    #[value(alias = "tritanopia-sim")]
    Tritanopia,
}

impl From<PaletteArg> for PaletteSelection {
    fn from(arg: PaletteArg) -> Self {
        match arg {
            PaletteArg::Default => PaletteSelection::Default,
            PaletteArg::Protanopia => PaletteSelection::ProtanopiaSim,
            PaletteArg::Deuteranopia => PaletteSelection::DeuteranopiaSim,
            PaletteArg::Tritanopia => PaletteSelection::TritanopiaSim,
        }
    }
}

/// CLI-compatible colorblindness type enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorblindnessArg {
    /// Red-blind
    Protanopia,
    /// Green-blind
    Deuteranopia,
    /// Blue-blind
    Tritanopia,
}

impl From<ColorblindnessArg> for ColorblindnessType {
    fn from(arg: ColorblindnessArg) -> Self {
        match arg {
            ColorblindnessArg::Protanopia => ColorblindnessType::Protanopia,
            ColorblindnessArg::Deuteranopia => ColorblindnessType::Deuteranopia,
            ColorblindnessArg::Tritanopia => ColorblindnessType::Tritanopia,
        }
    }
}

/// Colorblindness simulation and correction filters with persistent preferences.
#[derive(Parser, Debug)]
#[command(name = "chromatic-harmony")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Load configuration from TOML file
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Preference store file (JSON)
    #[arg(long, value_name = "FILE", global = true)]
    pub store: Option<PathBuf>,

    /// Log file path (default: chromatic-harmony.log)
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error (default: info)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the current accessibility state
    Status,

    /// Flip accessibility mode on or off
    Toggle,

    /// Turn accessibility mode on
    Enable,

    /// Turn accessibility mode off
    Disable,

    /// Select a colorblindness simulation palette
    Palette {
        #[arg(value_enum)]
        palette: PaletteArg,
    },

    /// Apply a named correction filter
    Apply {
        /// Filter name
        name: String,

        /// Filter parameter, repeatable (e.g. --param contrast=1.2 --param hue-rotate=15)
        #[arg(
            short,
            long = "param",
            value_name = "NAME=VALUE",
            required_unless_present = "from",
            conflicts_with = "from"
        )]
        params: Vec<String>,

        /// Take the parameters of NAME from a saved generator response
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,
    },

    /// Clear the active correction filter
    Clear,

    /// Generate correction filter combinations
    Generate {
        /// Colorblindness type to target
        #[arg(value_enum)]
        kind: ColorblindnessArg,

        /// Free-text preferences (e.g. "more contrast, warmer")
        #[arg(short, long)]
        preferences: Option<String>,

        /// Read combinations from a saved generator response instead of the built-in presets
        #[arg(long, value_name = "FILE")]
        from: Option<PathBuf>,

        /// Apply the Nth combination (1-based) after generating
        #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
        apply: Option<u32>,
    },

    /// Render an HTML preview of the current document state
    Preview {
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Forget all stored preferences
    Reset,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    /// Flags that override configuration, as `(dotted.key, value)` pairs.
    pub fn config_overrides(&self) -> Vec<(&'static str, String)> {
        let mut overrides = Vec::new();
        if let Some(path) = &self.store {
            overrides.push(("store.path", path.display().to_string()));
        }
        if let Some(path) = &self.log_file {
            overrides.push(("logging.file", path.display().to_string()));
        }
        if let Some(level) = &self.log_level {
            overrides.push(("logging.level", level.clone()));
        }
        overrides
    }
}
