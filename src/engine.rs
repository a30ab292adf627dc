//! The accessibility state engine.
//!
//! Owns the current [`AccessibilityState`], a [`Store`] and a [`Document`].
//! Every mutator runs the pure [`transition`], then persists, notifies
//! subscribers and re-applies the document. Store failures are logged and
//! otherwise ignored: the in-memory state and the document always move on.

use tracing::{debug, info, warn};

#[cfg(debug_assertions)]
use tracing::instrument;

use crate::document::Document;
use crate::filter::FilterSettings;
use crate::palette::{PaletteSelection, apply_palette};
use crate::state::{AccessibilityState, Action, EngineEvent, Outcome, StoreWrite, transition};
use crate::store::{Store, StoreError, legacy_key};

/// Handle returned by [`AccessibilityEngine::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&EngineEvent)>;

/// Stateful core tying state, persistence and document together.
pub struct AccessibilityEngine<S: Store, D: Document> {
    store: S,
    document: D,
    state: AccessibilityState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    persistence_failures: usize,
}

impl<S: Store, D: Document> std::fmt::Debug for AccessibilityEngine<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessibilityEngine")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("persistence_failures", &self.persistence_failures)
            .finish_non_exhaustive()
    }
}

impl<S: Store, D: Document> AccessibilityEngine<S, D> {
    /// Load state from `store`, then apply it to `document`.
    ///
    /// The document is not written until the loaded state is final, so a
    /// restart never shows a default frame before the saved preferences.
    pub fn new(store: S, document: D) -> Self {
        let mut persistence_failures = 0;
        let state = AccessibilityState::from_stored(|key| {
            match read_with_legacy_fallback(&store, key) {
                Ok(value) => value,
                Err(e) => {
                    persistence_failures += 1;
                    warn!(key, error = %e, "preference store unreadable, using default");
                    None
                }
            }
        });

        info!(
            enabled = state.enabled,
            palette = %state.palette,
            filter = ?state.active_filter_name,
            "loaded accessibility state"
        );

        let mut engine = Self {
            store,
            document,
            state,
            listeners: Vec::new(),
            next_subscription: 0,
            persistence_failures,
        };
        engine.apply_document();
        engine
    }

    pub fn state(&self) -> &AccessibilityState {
        &self.state
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Tear the engine down, handing back its store and document.
    pub fn into_parts(self) -> (S, D) {
        (self.store, self.document)
    }

    /// Transform currently visible on the content element.
    pub fn visible_transform(&self) -> &str {
        self.state.visible_transform()
    }

    /// Number of store operations that failed since startup.
    pub fn persistence_failures(&self) -> usize {
        self.persistence_failures
    }

    /// Register a listener for engine events.
    pub fn subscribe(&mut self, listener: impl FnMut(&EngineEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Flip the global accessibility switch.
    pub fn toggle_mode(&mut self) -> Outcome {
        self.dispatch(Action::ToggleMode)
    }

    /// Set the global accessibility switch explicitly.
    pub fn set_mode(&mut self, enabled: bool) -> Outcome {
        self.dispatch(Action::SetMode(enabled))
    }

    /// Select a simulation palette. A non-default palette clears any active
    /// correction filter first.
    pub fn set_palette(&mut self, palette: PaletteSelection) -> Outcome {
        self.dispatch(Action::SetPalette(palette))
    }

    /// Apply a named correction filter, or clear it with `None`.
    ///
    /// Applying is refused with [`Outcome::Blocked`] while a simulation
    /// palette is selected; clearing is always allowed.
    pub fn apply_filter(&mut self, name: &str, settings: Option<&FilterSettings>) -> Outcome {
        match settings {
            Some(settings) => self.dispatch(Action::ApplyFilter {
                name: name.to_string(),
                settings: settings.clone(),
            }),
            None => self.dispatch(Action::ClearFilter),
        }
    }

    /// Forget every preference.
    pub fn reset(&mut self) -> Outcome {
        self.dispatch(Action::Reset)
    }

    /// Run an action through the transition function and carry out its effects.
    #[cfg_attr(debug_assertions, instrument(skip(self), fields(enabled = self.state.enabled)))]
    pub fn dispatch(&mut self, action: Action) -> Outcome {
        let t = transition(&self.state, action);

        match t.outcome {
            Outcome::Blocked(reason) => warn!(%reason, "accessibility action refused"),
            Outcome::Unchanged => debug!("accessibility action changed nothing"),
            Outcome::Applied => info!(
                enabled = t.state.enabled,
                palette = %t.state.palette,
                filter = ?t.state.active_filter_name,
                "accessibility state updated"
            ),
        }

        self.state = t.state;
        for write in &t.writes {
            self.persist(write);
        }
        for event in &t.events {
            self.notify(event);
        }
        if t.outcome == Outcome::Applied {
            self.apply_document();
        }
        t.outcome
    }

    fn persist(&mut self, write: &StoreWrite) {
        let result = match write {
            StoreWrite::Set(key, value) => self.store.set(key, value),
            StoreWrite::Remove(key) => self.remove_with_legacy(key),
        };
        if let Err(e) = result {
            self.persistence_failures += 1;
            warn!(error = %e, "preference not saved, continuing in memory");
        }
    }

    fn remove_with_legacy(&mut self, key: &str) -> Result<(), StoreError> {
        self.store.remove(key)?;
        if let Some(legacy) = legacy_key(key) {
            self.store.remove(legacy)?;
        }
        Ok(())
    }

    fn notify(&mut self, event: &EngineEvent) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    fn apply_document(&mut self) {
        apply_palette(&mut self.document, self.state.visible_palette());
        self.document
            .set_content_transform(self.state.visible_transform());
    }
}

fn read_with_legacy_fallback<S: Store>(store: &S, key: &str) -> Result<Option<String>, StoreError> {
    if let Some(value) = store.get(key)? {
        return Ok(Some(value));
    }
    match legacy_key(key) {
        Some(legacy) => store.get(legacy),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::document::MemoryDocument;
    use crate::filter::FilterParam;
    use crate::state::ClearReason;
    use crate::store::{MODE_ENABLED_KEY, MemoryStore, SELECTED_PALETTE_KEY};

    fn engine() -> AccessibilityEngine<MemoryStore, MemoryDocument> {
        AccessibilityEngine::new(MemoryStore::new(), MemoryDocument::default())
    }

    #[test]
    fn test_subscribers_receive_events() {
        let mut engine = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = engine.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        engine.toggle_mode();
        engine.apply_filter(
            "Warm",
            Some(&FilterSettings::new().with(FilterParam::Sepia, 0.2)),
        );
        engine.set_palette(PaletteSelection::ProtanopiaSim);

        assert_eq!(
            *seen.borrow(),
            vec![
                EngineEvent::ModeChanged { enabled: true },
                EngineEvent::FilterApplied {
                    name: "Warm".into(),
                    transform: "sepia(0.2)".into()
                },
                EngineEvent::FilterCleared {
                    reason: ClearReason::SimulationSelected
                },
                EngineEvent::PaletteChanged {
                    palette: PaletteSelection::ProtanopiaSim
                },
            ]
        );

        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.toggle_mode();
        assert_eq!(seen.borrow().len(), 4);
    }

    #[test]
    fn test_legacy_keys_are_read_and_cleaned_up() {
        let store: MemoryStore = [
            ("colorblindModeEnabled", "true"),
            ("selectedPalette", "deuteranopia"),
        ]
        .into_iter()
        .collect();
        let mut engine = AccessibilityEngine::new(store, MemoryDocument::default());

        assert!(engine.state().enabled);
        assert_eq!(engine.state().palette, PaletteSelection::DeuteranopiaSim);
        assert_eq!(
            engine.document().simulation_marker(),
            Some("simulate-deuteranopia")
        );

        engine.set_palette(PaletteSelection::Default);
        engine.reset();
        assert!(engine.store().entries().is_empty());
    }

    #[test]
    fn test_current_key_wins_over_legacy() {
        let store: MemoryStore = [(MODE_ENABLED_KEY, "false"), ("colorblindModeEnabled", "true")]
            .into_iter()
            .collect();
        let engine = AccessibilityEngine::new(store, MemoryDocument::default());
        assert!(!engine.state().enabled);
    }

    #[test]
    fn test_unchanged_action_does_not_touch_document() {
        let mut engine = engine();
        let writes = engine.document().writes();
        assert_eq!(engine.set_palette(PaletteSelection::Default), Outcome::Unchanged);
        assert_eq!(engine.document().writes(), writes);
        assert_eq!(engine.store().get(SELECTED_PALETTE_KEY).unwrap(), None);
    }
}
