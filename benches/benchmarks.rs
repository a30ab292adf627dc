//! Performance benchmarks for the accessibility engine.
//!
//! Measures the hot paths:
//! - Filter compilation
//! - Pure state transitions
//! - Full engine dispatch against an in-memory store and document

use chromatic_harmony::document::MemoryDocument;
use chromatic_harmony::engine::AccessibilityEngine;
use chromatic_harmony::filter::{FilterParam, FilterSettings, compile};
use chromatic_harmony::palette::PaletteSelection;
use chromatic_harmony::state::{AccessibilityState, Action, transition};
use chromatic_harmony::store::MemoryStore;
use criterion::{Criterion, black_box, criterion_group, criterion_main};

fn full_settings() -> FilterSettings {
    FilterParam::ALL
        .into_iter()
        .enumerate()
        .fold(FilterSettings::new(), |s, (i, p)| s.with(p, 1.0 + i as f64 / 10.0))
}

fn bench_compile(c: &mut Criterion) {
    let settings = full_settings();
    c.bench_function("compile_all_parameters", |b| {
        b.iter(|| compile(black_box(&settings)))
    });
}

fn bench_transition(c: &mut Criterion) {
    let state = AccessibilityState {
        enabled: true,
        palette: PaletteSelection::Default,
        active_filter_name: Some("Vivid".into()),
        compiled_transform: "saturate(1.4)".into(),
    };
    let settings = full_settings();

    c.bench_function("transition_apply_filter", |b| {
        b.iter(|| {
            transition(
                black_box(&state),
                Action::ApplyFilter {
                    name: "Everything".into(),
                    settings: settings.clone(),
                },
            )
        })
    });

    c.bench_function("transition_simulation_clears_filter", |b| {
        b.iter(|| {
            transition(
                black_box(&state),
                Action::SetPalette(PaletteSelection::DeuteranopiaSim),
            )
        })
    });
}

fn bench_engine(c: &mut Criterion) {
    let settings = full_settings();
    let mut engine = AccessibilityEngine::new(MemoryStore::new(), MemoryDocument::default());
    engine.set_mode(true);

    c.bench_function("engine_filter_then_simulation", |b| {
        b.iter(|| {
            engine.apply_filter("Everything", Some(black_box(&settings)));
            engine.set_palette(PaletteSelection::ProtanopiaSim);
            engine.set_palette(PaletteSelection::Default);
        })
    });
}

criterion_group!(benches, bench_compile, bench_transition, bench_engine);
criterion_main!(benches);
