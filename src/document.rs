//! The document the engine renders into.
//!
//! A document has root-level markers (used for simulation overlays) and one
//! designated content element carrying an inline CSS `filter`. Global chrome
//! such as the mode toggle lives outside that element and is never filtered.

use std::collections::BTreeSet;

use crate::palette::{ColorblindnessType, MARKER_PREFIX};

/// Default selector for the designated content element.
pub const DEFAULT_CONTENT_SELECTOR: &str = ".content-wrapper";

/// Sink for the engine's visual output.
pub trait Document {
    /// Add a root marker. Adding an existing marker is a no-op.
    fn add_marker(&mut self, marker: &str);

    /// Remove a root marker. Removing a missing marker is a no-op.
    fn remove_marker(&mut self, marker: &str);

    fn has_marker(&self, marker: &str) -> bool;

    /// Set the inline filter on the designated content element.
    fn set_content_transform(&mut self, transform: &str);

    fn content_transform(&self) -> &str;
}

impl<D: Document + ?Sized> Document for &mut D {
    fn add_marker(&mut self, marker: &str) {
        (**self).add_marker(marker)
    }

    fn remove_marker(&mut self, marker: &str) {
        (**self).remove_marker(marker)
    }

    fn has_marker(&self, marker: &str) -> bool {
        (**self).has_marker(marker)
    }

    fn set_content_transform(&mut self, transform: &str) {
        (**self).set_content_transform(transform)
    }

    fn content_transform(&self) -> &str {
        (**self).content_transform()
    }
}

/// In-memory document model.
///
/// Counts writes so callers can check that nothing touched the document
/// before the engine finished loading its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDocument {
    markers: BTreeSet<String>,
    content_selector: String,
    content_transform: String,
    writes: usize,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new(DEFAULT_CONTENT_SELECTOR)
    }
}

impl MemoryDocument {
    pub fn new(content_selector: impl Into<String>) -> Self {
        Self {
            markers: BTreeSet::new(),
            content_selector: content_selector.into(),
            content_transform: String::new(),
            writes: 0,
        }
    }

    pub fn content_selector(&self) -> &str {
        &self.content_selector
    }

    /// Markers in sorted order.
    pub fn markers(&self) -> impl Iterator<Item = &str> {
        self.markers.iter().map(String::as_str)
    }

    /// The active simulation marker, if any.
    pub fn simulation_marker(&self) -> Option<&str> {
        self.markers().find(|m| m.starts_with(MARKER_PREFIX))
    }

    /// Number of mutating calls received so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl Document for MemoryDocument {
    fn add_marker(&mut self, marker: &str) {
        self.writes += 1;
        self.markers.insert(marker.to_string());
    }

    fn remove_marker(&mut self, marker: &str) {
        self.writes += 1;
        self.markers.remove(marker);
    }

    fn has_marker(&self, marker: &str) -> bool {
        self.markers.contains(marker)
    }

    fn set_content_transform(&mut self, transform: &str) {
        self.writes += 1;
        transform.clone_into(&mut self.content_transform);
    }

    fn content_transform(&self) -> &str {
        &self.content_transform
    }
}

fn svg_matrix(kind: ColorblindnessType) -> String {
    let values = kind
        .simulation_matrix()
        .iter()
        .map(|row| format!("{} {} {} 0 0 ", row[0], row[1], row[2]))
        .chain(std::iter::once("0 0 0 1 0".to_string()))
        .collect::<String>();
    format!(
        "    <filter id=\"{kind}\"><feColorMatrix type=\"matrix\" values=\"{values}\"/></filter>\n"
    )
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render a standalone HTML preview of the document state.
///
/// Simulation markers become classes on `<html>` and are styled with inline
/// SVG color-matrix filters; the content transform becomes an inline style on
/// the content element.
pub fn render_preview(doc: &MemoryDocument, title: &str) -> String {
    let selector = doc.content_selector();
    let (tag_attr, content_attr) = match selector.strip_prefix('#') {
        Some(id) => ("id", id),
        None => ("class", selector.trim_start_matches('.')),
    };

    let classes = doc.markers().collect::<Vec<_>>().join(" ");

    let css = ColorblindnessType::ALL
        .iter()
        .map(|kind| {
            format!("    html.{MARKER_PREFIX}{kind} {selector} {{ filter: url(#{kind}); }}\n")
        })
        .collect::<String>();

    let svg = ColorblindnessType::ALL
        .into_iter()
        .map(svg_matrix)
        .collect::<String>();

    let style_attr = if doc.content_transform().is_empty() {
        String::new()
    } else {
        format!(" style=\"filter: {}\"", escape_html(doc.content_transform()))
    };

    let swatches = [
        ("#d62728", "Red"),
        ("#2ca02c", "Green"),
        ("#1f77b4", "Blue"),
        ("#ff7f0e", "Orange"),
        ("#9467bd", "Purple"),
        ("#bcbd22", "Olive"),
    ]
    .iter()
    .map(|(hex, name)| {
        format!(
            "      <div class=\"swatch\" style=\"background: {hex}\">{name}</div>\n"
        )
    })
    .collect::<String>();

    let title = escape_html(title);
    format!(
        r#"<!DOCTYPE html>
<html lang="en" class="{classes}">
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <style>
    .swatch {{ display: inline-block; width: 6rem; height: 4rem; margin: 0.25rem; color: #fff; }}
{css}  </style>
</head>
<body>
  <svg width="0" height="0" style="position: absolute">
{svg}  </svg>
  <div {tag_attr}="{content_attr}"{style_attr}>
{swatches}  </div>
</body>
</html>
"#
    )
}
