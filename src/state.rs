//! Accessibility state and its pure transition function.
//!
//! Nothing in here touches storage or the document. [`transition`] takes the
//! current state and an [`Action`] and describes everything that should
//! happen: the next state, the store writes, the events to emit, and the
//! outcome reported to the caller. The engine carries those effects out.

use serde::Serialize;
use tracing::warn;

use crate::filter::{FilterSettings, compile};
use crate::palette::PaletteSelection;
use crate::store::{
    ACTIVE_FILTER_NAME_KEY, ALL_KEYS, APPLIED_FILTER_TRANSFORM_KEY, MODE_ENABLED_KEY,
    SELECTED_PALETTE_KEY,
};

/// Everything the engine tracks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccessibilityState {
    /// Global switch; when off nothing is visible.
    pub enabled: bool,
    pub palette: PaletteSelection,
    pub active_filter_name: Option<String>,
    /// Cached compile output for the active filter, empty when none.
    pub compiled_transform: String,
}

impl AccessibilityState {
    /// Build state from stored values.
    ///
    /// Each key is read independently; missing or unparsable values fall back
    /// to defaults. A stored filter next to a stored simulation palette is
    /// dropped so the loaded state never breaks mutual exclusion.
    pub fn from_stored<F>(mut lookup: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let enabled = match lookup(MODE_ENABLED_KEY) {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(key = MODE_ENABLED_KEY, value = %raw, "ignoring unparsable stored value");
                false
            }),
            None => false,
        };

        let palette = match lookup(SELECTED_PALETTE_KEY) {
            Some(raw) => PaletteSelection::from_stored(&raw).unwrap_or_else(|| {
                warn!(key = SELECTED_PALETTE_KEY, value = %raw, "ignoring unparsable stored value");
                PaletteSelection::Default
            }),
            None => PaletteSelection::Default,
        };

        let compiled_transform = lookup(APPLIED_FILTER_TRANSFORM_KEY).unwrap_or_default();
        let active_filter_name = lookup(ACTIVE_FILTER_NAME_KEY).and_then(|n| filter_name(&n));

        Self {
            enabled,
            palette,
            active_filter_name,
            compiled_transform,
        }
        .normalized()
    }

    /// Restore mutual exclusion between simulation and correction.
    pub fn normalized(mut self) -> Self {
        if self.palette.is_simulation() && self.has_active_filter() {
            warn!(
                palette = %self.palette,
                filter = ?self.active_filter_name,
                "dropping stored filter that conflicts with simulation palette"
            );
            self.active_filter_name = None;
            self.compiled_transform.clear();
        }
        self
    }

    pub fn has_active_filter(&self) -> bool {
        self.active_filter_name.is_some() || !self.compiled_transform.is_empty()
    }

    /// Transform that should be on the content element right now.
    pub fn visible_transform(&self) -> &str {
        if self.enabled && !self.palette.is_simulation() {
            &self.compiled_transform
        } else {
            ""
        }
    }

    /// Palette whose marker should be on the document right now.
    pub fn visible_palette(&self) -> PaletteSelection {
        if self.enabled {
            self.palette
        } else {
            PaletteSelection::Default
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// A user intent.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ToggleMode,
    SetMode(bool),
    SetPalette(PaletteSelection),
    ApplyFilter {
        name: String,
        settings: FilterSettings,
    },
    ClearFilter,
    Reset,
}

/// A single store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Set(&'static str, String),
    Remove(&'static str),
}

/// Why a filter was cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClearReason {
    /// The caller asked for it.
    Requested,
    /// A simulation palette was selected while the filter was active.
    SimulationSelected,
    Reset,
}

/// Why a mutation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockReason {
    /// Correction filters can't be applied while a simulation is shown.
    SimulationActive,
}

impl std::fmt::Display for BlockReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SimulationActive => write!(f, "blocked: simulation active"),
        }
    }
}

/// Notification sent to engine subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum EngineEvent {
    ModeChanged { enabled: bool },
    PaletteChanged { palette: PaletteSelection },
    FilterApplied { name: String, transform: String },
    FilterCleared { reason: ClearReason },
    Blocked { reason: BlockReason },
}

/// What a mutator reports back to its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    /// State changed.
    Applied,
    /// The action was valid but changed nothing.
    Unchanged,
    /// The action was refused; state is untouched.
    Blocked(BlockReason),
}

impl Outcome {
    pub fn is_blocked(self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

/// Result of applying an [`Action`] to a state.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: AccessibilityState,
    pub writes: Vec<StoreWrite>,
    pub events: Vec<EngineEvent>,
    pub outcome: Outcome,
}

impl Transition {
    fn unchanged(state: &AccessibilityState) -> Self {
        Self {
            state: state.clone(),
            writes: Vec::new(),
            events: Vec::new(),
            outcome: Outcome::Unchanged,
        }
    }

    fn blocked(state: &AccessibilityState, reason: BlockReason) -> Self {
        Self {
            state: state.clone(),
            writes: Vec::new(),
            events: vec![EngineEvent::Blocked { reason }],
            outcome: Outcome::Blocked(reason),
        }
    }
}

fn clear_filter_writes() -> [StoreWrite; 2] {
    [
        StoreWrite::Remove(ACTIVE_FILTER_NAME_KEY),
        StoreWrite::Set(APPLIED_FILTER_TRANSFORM_KEY, String::new()),
    ]
}

/// Compute the effects of `action` on `state`.
pub fn transition(state: &AccessibilityState, action: Action) -> Transition {
    match action {
        Action::ToggleMode => set_mode(state, !state.enabled),
        Action::SetMode(enabled) => set_mode(state, enabled),
        Action::SetPalette(palette) => set_palette(state, palette),
        Action::ApplyFilter { name, settings } => apply_filter(state, name, &settings),
        Action::ClearFilter => clear_filter(state, ClearReason::Requested),
        Action::Reset => reset(state),
    }
}

fn set_mode(state: &AccessibilityState, enabled: bool) -> Transition {
    if state.enabled == enabled {
        return Transition::unchanged(state);
    }
    Transition {
        state: AccessibilityState {
            enabled,
            ..state.clone()
        },
        writes: vec![StoreWrite::Set(MODE_ENABLED_KEY, enabled.to_string())],
        events: vec![EngineEvent::ModeChanged { enabled }],
        outcome: Outcome::Applied,
    }
}

fn set_palette(state: &AccessibilityState, palette: PaletteSelection) -> Transition {
    let must_clear = palette.is_simulation() && state.has_active_filter();
    if state.palette == palette && !must_clear {
        return Transition::unchanged(state);
    }

    let mut next = state.clone();
    let mut writes = Vec::new();
    let mut events = Vec::new();

    if must_clear {
        next.active_filter_name = None;
        next.compiled_transform.clear();
        writes.extend(clear_filter_writes());
        events.push(EngineEvent::FilterCleared {
            reason: ClearReason::SimulationSelected,
        });
    }

    next.palette = palette;
    writes.push(StoreWrite::Set(SELECTED_PALETTE_KEY, palette.as_str().to_string()));
    if state.palette != palette {
        events.push(EngineEvent::PaletteChanged { palette });
    }

    Transition {
        state: next,
        writes,
        events,
        outcome: Outcome::Applied,
    }
}

fn apply_filter(state: &AccessibilityState, name: String, settings: &FilterSettings) -> Transition {
    if state.palette.is_simulation() {
        return Transition::blocked(state, BlockReason::SimulationActive);
    }

    let transform = compile(settings);
    let stored_name = filter_name(&name);
    if state.active_filter_name == stored_name && state.compiled_transform == transform {
        return Transition::unchanged(state);
    }

    // An empty name is stored as an absent key, the same way it loads back
    let name_write = match &stored_name {
        Some(n) => StoreWrite::Set(ACTIVE_FILTER_NAME_KEY, n.clone()),
        None => StoreWrite::Remove(ACTIVE_FILTER_NAME_KEY),
    };

    Transition {
        state: AccessibilityState {
            active_filter_name: stored_name,
            compiled_transform: transform.clone(),
            ..state.clone()
        },
        writes: vec![
            name_write,
            StoreWrite::Set(APPLIED_FILTER_TRANSFORM_KEY, transform.clone()),
        ],
        events: vec![EngineEvent::FilterApplied { name, transform }],
        outcome: Outcome::Applied,
    }
}

/// Filter names are optional; the empty string means none.
fn filter_name(raw: &str) -> Option<String> {
    Some(raw).filter(|n| !n.is_empty()).map(str::to_string)
}

fn clear_filter(state: &AccessibilityState, reason: ClearReason) -> Transition {
    if !state.has_active_filter() {
        return Transition::unchanged(state);
    }
    Transition {
        state: AccessibilityState {
            active_filter_name: None,
            compiled_transform: String::new(),
            ..state.clone()
        },
        writes: clear_filter_writes().into(),
        events: vec![EngineEvent::FilterCleared { reason }],
        outcome: Outcome::Applied,
    }
}

fn reset(state: &AccessibilityState) -> Transition {
    let defaults = AccessibilityState::default();
    let mut events = Vec::new();

    if state.has_active_filter() {
        events.push(EngineEvent::FilterCleared {
            reason: ClearReason::Reset,
        });
    }
    if state.palette != defaults.palette {
        events.push(EngineEvent::PaletteChanged {
            palette: defaults.palette,
        });
    }
    if state.enabled != defaults.enabled {
        events.push(EngineEvent::ModeChanged {
            enabled: defaults.enabled,
        });
    }

    Transition {
        state: defaults,
        writes: ALL_KEYS.into_iter().map(StoreWrite::Remove).collect(),
        outcome: if events.is_empty() {
            Outcome::Unchanged
        } else {
            Outcome::Applied
        },
        events,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::filter::FilterParam;

    fn filtered_state() -> AccessibilityState {
        AccessibilityState {
            enabled: true,
            palette: PaletteSelection::Default,
            active_filter_name: Some("Vivid".into()),
            compiled_transform: "saturate(1.5)".into(),
        }
    }

    #[test]
    fn test_from_stored_defaults() {
        let state = AccessibilityState::from_stored(|_| None);
        assert_eq!(state, AccessibilityState::default());
    }

    #[test]
    fn test_from_stored_reads_each_key() {
        let stored: HashMap<&str, &str> = HashMap::from([
            (MODE_ENABLED_KEY, "true"),
            (SELECTED_PALETTE_KEY, "default"),
            (APPLIED_FILTER_TRANSFORM_KEY, "contrast(1.4)"),
            (ACTIVE_FILTER_NAME_KEY, "Crisp"),
        ]);
        let state = AccessibilityState::from_stored(|k| stored.get(k).map(|v| v.to_string()));

        assert!(state.enabled);
        assert_eq!(state.active_filter_name.as_deref(), Some("Crisp"));
        assert_eq!(state.visible_transform(), "contrast(1.4)");
    }

    #[test]
    fn test_from_stored_bad_values_fall_back() {
        let state = AccessibilityState::from_stored(|k| match k {
            MODE_ENABLED_KEY => Some("yes".into()),
            SELECTED_PALETTE_KEY => Some("achromatopsia".into()),
            _ => None,
        });
        assert!(!state.enabled);
        assert_eq!(state.palette, PaletteSelection::Default);
    }

    #[test]
    fn test_from_stored_restores_mutual_exclusion() {
        let state = AccessibilityState::from_stored(|k| match k {
            SELECTED_PALETTE_KEY => Some("protanopiaSim".into()),
            ACTIVE_FILTER_NAME_KEY => Some("Vivid".into()),
            APPLIED_FILTER_TRANSFORM_KEY => Some("saturate(1.5)".into()),
            _ => None,
        });
        assert_eq!(state.palette, PaletteSelection::ProtanopiaSim);
        assert_eq!(state.active_filter_name, None);
        assert_eq!(state.compiled_transform, "");
    }

    #[test]
    fn test_visibility_rules() {
        let mut state = filtered_state();
        assert_eq!(state.visible_transform(), "saturate(1.5)");
        assert_eq!(state.visible_palette(), PaletteSelection::Default);

        state.enabled = false;
        assert_eq!(state.visible_transform(), "");

        let simulating = AccessibilityState {
            enabled: true,
            palette: PaletteSelection::TritanopiaSim,
            ..Default::default()
        };
        assert_eq!(simulating.visible_transform(), "");
        assert_eq!(simulating.visible_palette(), PaletteSelection::TritanopiaSim);
    }

    #[test]
    fn test_toggle_writes_mode() {
        let t = transition(&AccessibilityState::default(), Action::ToggleMode);
        assert!(t.state.enabled);
        assert_eq!(
            t.writes,
            vec![StoreWrite::Set(MODE_ENABLED_KEY, "true".into())]
        );
        assert_eq!(t.events, vec![EngineEvent::ModeChanged { enabled: true }]);
    }

    #[test]
    fn test_set_mode_same_value_is_unchanged() {
        let t = transition(&AccessibilityState::default(), Action::SetMode(false));
        assert_eq!(t.outcome, Outcome::Unchanged);
        assert!(t.writes.is_empty());
    }

    #[test]
    fn test_simulation_clears_filter() {
        let t = transition(
            &filtered_state(),
            Action::SetPalette(PaletteSelection::ProtanopiaSim),
        );
        assert_eq!(t.state.active_filter_name, None);
        assert_eq!(t.state.compiled_transform, "");
        assert_eq!(t.state.palette, PaletteSelection::ProtanopiaSim);
        assert_eq!(
            t.events,
            vec![
                EngineEvent::FilterCleared {
                    reason: ClearReason::SimulationSelected
                },
                EngineEvent::PaletteChanged {
                    palette: PaletteSelection::ProtanopiaSim
                },
            ]
        );
        assert!(t.writes.contains(&StoreWrite::Remove(ACTIVE_FILTER_NAME_KEY)));
        assert!(
            t.writes
                .contains(&StoreWrite::Set(APPLIED_FILTER_TRANSFORM_KEY, String::new()))
        );
    }

    #[test]
    fn test_default_palette_keeps_filter() {
        let mut state = filtered_state();
        state.palette = PaletteSelection::Default;
        let t = transition(&state, Action::SetPalette(PaletteSelection::Default));
        assert_eq!(t.outcome, Outcome::Unchanged);
        assert_eq!(t.state.active_filter_name.as_deref(), Some("Vivid"));
    }

    #[test]
    fn test_apply_filter_blocked_during_simulation() {
        let state = AccessibilityState {
            enabled: true,
            palette: PaletteSelection::DeuteranopiaSim,
            ..Default::default()
        };
        let settings = FilterSettings::new().with(FilterParam::Brightness, 1.2);
        let t = transition(
            &state,
            Action::ApplyFilter {
                name: "x".into(),
                settings,
            },
        );
        assert_eq!(t.outcome, Outcome::Blocked(BlockReason::SimulationActive));
        assert_eq!(t.state, state);
        assert!(t.writes.is_empty());
    }

    #[test]
    fn test_apply_filter_compiles_and_persists() {
        let settings = FilterSettings::new()
            .with(FilterParam::HueRotate, 30.0)
            .with(FilterParam::Contrast, 1.1);
        let t = transition(
            &AccessibilityState::default(),
            Action::ApplyFilter {
                name: "Shift".into(),
                settings: settings.clone(),
            },
        );
        assert_eq!(t.state.compiled_transform, compile(&settings));
        assert_eq!(t.state.compiled_transform, "contrast(1.1) hue-rotate(30deg)");
        assert_eq!(
            t.writes,
            vec![
                StoreWrite::Set(ACTIVE_FILTER_NAME_KEY, "Shift".into()),
                StoreWrite::Set(
                    APPLIED_FILTER_TRANSFORM_KEY,
                    "contrast(1.1) hue-rotate(30deg)".into()
                ),
            ]
        );
    }

    #[test]
    fn test_apply_filter_with_empty_name_removes_name_key() {
        let t = transition(
            &filtered_state(),
            Action::ApplyFilter {
                name: String::new(),
                settings: FilterSettings::new().with(FilterParam::Brightness, 1.2),
            },
        );
        assert_eq!(t.outcome, Outcome::Applied);
        assert_eq!(t.state.active_filter_name, None);
        assert_eq!(t.state.compiled_transform, "brightness(1.2)");
        assert_eq!(t.writes[0], StoreWrite::Remove(ACTIVE_FILTER_NAME_KEY));

        let again = transition(
            &t.state,
            Action::ApplyFilter {
                name: String::new(),
                settings: FilterSettings::new().with(FilterParam::Brightness, 1.2),
            },
        );
        assert_eq!(again.outcome, Outcome::Unchanged);
    }

    #[test]
    fn test_clear_filter_allowed_during_simulation() {
        let state = AccessibilityState {
            palette: PaletteSelection::TritanopiaSim,
            compiled_transform: "sepia(0.2)".into(),
            ..Default::default()
        };
        let t = transition(&state, Action::ClearFilter);
        assert_eq!(t.outcome, Outcome::Applied);
        assert!(!t.state.has_active_filter());
    }

    #[test]
    fn test_reset_removes_all_keys() {
        let t = transition(&filtered_state(), Action::Reset);
        assert_eq!(t.state, AccessibilityState::default());
        assert_eq!(t.writes.len(), ALL_KEYS.len());
        assert!(t.writes.iter().all(|w| matches!(w, StoreWrite::Remove(_))));
    }
}
