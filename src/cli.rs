//! Command handling for the `chromatic-harmony` binary.

use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use color_eyre::eyre::{Result, WrapErr, bail, eyre};
use serde::Serialize;
use tracing::info;

use crate::cli_args::{Cli, Command, OutputFormat};
use crate::config::AppConfig;
use crate::document::{MemoryDocument, render_preview};
use crate::engine::AccessibilityEngine;
use crate::filter::{FilterSettings, compile, parse_filter_assignments};
use crate::generation::{
    FilterCombination, GenerationRequest, PresetGenerator, ResponseFileGenerator,
    generate_or_empty, parse_response,
};
use crate::palette::PaletteSelection;
use crate::state::Outcome;
use crate::store::JsonFileStore;

type CliEngine = AccessibilityEngine<JsonFileStore, MemoryDocument>;

/// Snapshot of the engine printed by every state-changing command.
#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub enabled: bool,
    pub palette: PaletteSelection,
    pub active_filter: Option<String>,
    pub compiled_transform: String,
    pub visible_transform: String,
    pub simulation_marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl StatusReport {
    pub fn from_engine(engine: &CliEngine, notice: Option<String>) -> Self {
        let state = engine.state();
        Self {
            enabled: state.enabled,
            palette: state.palette,
            active_filter: state.active_filter_name.clone(),
            compiled_transform: state.compiled_transform.clone(),
            visible_transform: engine.visible_transform().to_string(),
            simulation_marker: engine.document().simulation_marker().map(str::to_string),
            notice,
        }
    }

    fn to_text(&self) -> String {
        let mut lines = vec![
            format!(
                "Accessibility mode: {}",
                if self.enabled { "on" } else { "off" }
            ),
            format!("Palette: {}", self.palette.label()),
            format!(
                "Active filter: {}",
                self.active_filter.as_deref().unwrap_or("none")
            ),
        ];
        if !self.compiled_transform.is_empty() {
            lines.push(format!("Compiled transform: {}", self.compiled_transform));
        }
        lines.push(format!(
            "Visible transform: {}",
            if self.visible_transform.is_empty() {
                "none"
            } else {
                &self.visible_transform
            }
        ));
        if let Some(marker) = &self.simulation_marker {
            lines.push(format!("Simulation marker: {marker}"));
        }
        lines.join("\n")
    }
}

/// A generated combination as printed by `generate`.
#[derive(Debug, Serialize)]
struct CombinationReport<'a> {
    index: usize,
    name: &'a str,
    description: &'a str,
    transform: String,
}

fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    let out = match format {
        OutputFormat::Text => text(),
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).wrap_err("Failed to serialize output to JSON")?
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).wrap_err("Failed to serialize output to YAML")?
        }
    };
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", out.trim_end())?;
    Ok(())
}

fn notice_for(outcome: Outcome, cleared_by_palette: bool) -> Option<String> {
    match outcome {
        Outcome::Blocked(reason) => Some(format!(
            "{reason}; select the default palette before applying a filter"
        )),
        Outcome::Applied if cleared_by_palette => {
            Some("active filter cleared because a simulation palette was selected".to_string())
        }
        Outcome::Unchanged => Some("nothing changed".to_string()),
        Outcome::Applied => None,
    }
}

fn report(cli: &Cli, engine: &CliEngine, notice: Option<String>) -> Result<()> {
    if let Some(notice) = &notice {
        eprintln!("{notice}");
    }
    let report = StatusReport::from_engine(engine, notice);
    emit(cli.format, &report, || report.to_text())
}

fn find_in_response(path: &Path, name: &str) -> Result<FilterSettings> {
    let json = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
    let combinations = parse_response(&json)
        .wrap_err_with(|| format!("Failed to read combinations from {}", path.display()))?;
    combinations
        .into_iter()
        .find(|c| c.name == name)
        .map(|c| c.parameters)
        .ok_or_else(|| eyre!("No filter named '{}' in {}", name, path.display()))
}

fn print_combinations(cli: &Cli, combinations: &[FilterCombination]) -> Result<()> {
    let reports: Vec<CombinationReport<'_>> = combinations
        .iter()
        .enumerate()
        .map(|(i, c)| CombinationReport {
            index: i + 1,
            name: &c.name,
            description: &c.description,
            transform: compile(&c.parameters),
        })
        .collect();

    emit(cli.format, &reports, || {
        reports
            .iter()
            .map(|r| {
                format!(
                    "{}. {}\n   {}\n   filter: {}",
                    r.index, r.name, r.description, r.transform
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    })
}

/// Run a parsed command line against the configured store.
pub fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let store = JsonFileStore::open(config.store_path());
    info!(store = %store.path().display(), "using preference store");
    let document = MemoryDocument::new(config.document.content_selector.clone());
    let mut engine = AccessibilityEngine::new(store, document);

    match &cli.command {
        Command::Status => report(cli, &engine, None),
        Command::Toggle => {
            let outcome = engine.toggle_mode();
            report(cli, &engine, notice_for(outcome, false))
        }
        Command::Enable => {
            let outcome = engine.set_mode(true);
            report(cli, &engine, notice_for(outcome, false))
        }
        Command::Disable => {
            let outcome = engine.set_mode(false);
            report(cli, &engine, notice_for(outcome, false))
        }
        Command::Palette { palette } => {
            let had_filter = engine.state().has_active_filter();
            let palette = PaletteSelection::from(*palette);
            let outcome = engine.set_palette(palette);
            let cleared = had_filter && !engine.state().has_active_filter();
            report(cli, &engine, notice_for(outcome, cleared))
        }
        Command::Apply { name, params, from } => {
            let settings = match from {
                Some(path) => find_in_response(path, name)?,
                None => parse_filter_assignments(params.as_slice()).wrap_err("Invalid filter parameter")?,
            };
            let outcome = engine.apply_filter(name, Some(&settings));
            let mut notice = notice_for(outcome, false);
            if notice.is_none() && !engine.state().enabled {
                notice = Some("filter saved; enable accessibility mode to see it".to_string());
            }
            report(cli, &engine, notice)
        }
        Command::Clear => {
            let outcome = engine.apply_filter("", None);
            report(cli, &engine, notice_for(outcome, false))
        }
        Command::Generate {
            kind,
            preferences,
            from,
            apply,
        } => {
            let mut request = GenerationRequest::new((*kind).into());
            if let Some(preferences) = preferences {
                request = request.with_preferences(preferences.as_str());
            }

            let combinations = match from {
                Some(path) => generate_or_empty(&ResponseFileGenerator::new(path), &request),
                None => generate_or_empty(&PresetGenerator, &request),
            };
            if combinations.is_empty() {
                bail!("Filter generation failed: no combinations available");
            }
            print_combinations(cli, &combinations)?;

            if let Some(n) = apply {
                let chosen = combinations.get(*n as usize - 1).ok_or_else(|| {
                    eyre!(
                        "--apply {} is out of range (1-{})",
                        n,
                        combinations.len()
                    )
                })?;
                let outcome = engine.apply_filter(&chosen.name, Some(&chosen.parameters));
                if let Some(notice) = notice_for(outcome, false) {
                    eprintln!("{notice}");
                } else {
                    eprintln!("Applied '{}'", chosen.name);
                }
            }
            Ok(())
        }
        Command::Preview { output } => {
            let html = render_preview(engine.document(), &config.document.title);
            match output {
                Some(path) => {
                    std::fs::write(path, &html)
                        .wrap_err_with(|| format!("Failed to write to {}", path.display()))?;
                    eprintln!("Wrote preview to {}", path.display());
                }
                None => print!("{html}"),
            }
            Ok(())
        }
        Command::Reset => {
            let outcome = engine.reset();
            report(cli, &engine, notice_for(outcome, false))
        }
        Command::Completions { shell } => {
            clap_complete::generate(
                *shell,
                &mut Cli::command(),
                "chromatic-harmony",
                &mut io::stdout(),
            );
            Ok(())
        }
    }
}
