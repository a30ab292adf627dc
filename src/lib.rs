//! Colorblindness simulation and correction-filter state engine.
//!
//! The [`engine::AccessibilityEngine`] tracks an accessibility mode, a
//! simulation palette and an active correction filter, persists every change
//! through a [`store::Store`], and applies the result to a
//! [`document::Document`].

pub mod cli;
pub mod cli_args;
pub mod config;
pub mod document;
pub mod engine;
pub mod filter;
pub mod generation;
pub mod logging;
pub mod palette;
pub mod state;
pub mod store;

pub use engine::AccessibilityEngine;
pub use filter::{FilterParam, FilterSettings, compile};
pub use palette::{ColorblindnessType, PaletteSelection};
pub use state::{AccessibilityState, BlockReason, EngineEvent, Outcome};
