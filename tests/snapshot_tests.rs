//! Snapshot tests for compiled preset filters.
//!
//! Presets are hand-tuned; these tests catch accidental edits to their values
//! or to the compiler's output format.

use chromatic_harmony::filter::compile;
use chromatic_harmony::generation::{FilterGenerator, GenerationRequest, PresetGenerator};
use chromatic_harmony::palette::ColorblindnessType;

fn preset_listing(kind: ColorblindnessType) -> String {
    PresetGenerator
        .generate(&GenerationRequest::new(kind))
        .unwrap()
        .iter()
        .map(|c| format!("{}: {}", c.name, compile(&c.parameters)))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn snapshot_protanopia_presets() {
    insta::assert_snapshot!(
        "protanopia_presets",
        preset_listing(ColorblindnessType::Protanopia)
    );
}

#[test]
fn snapshot_deuteranopia_presets() {
    insta::assert_snapshot!(
        "deuteranopia_presets",
        preset_listing(ColorblindnessType::Deuteranopia)
    );
}

#[test]
fn snapshot_tritanopia_presets() {
    insta::assert_snapshot!(
        "tritanopia_presets",
        preset_listing(ColorblindnessType::Tritanopia)
    );
}
