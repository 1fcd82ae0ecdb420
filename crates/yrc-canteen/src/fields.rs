//! Domain value extraction from the authenticated dashboard.
//!
//! A [`FieldSpec`] mirrors the portal's current markup with one deep
//! selector, then walks looser fallbacks. A [`CardSpec`] covers dashboards
//! that repeat one container per value and are read by position. Misses
//! become the literal `"0"`; the caller decides what a zero means.

use scraper::Selector;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::strategy::{element_text, Document, Strategy};

/// Value used for any field that could not be located.
pub const MISSING_VALUE: &str = "0";

/// How to find one value on the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Display label, e.g. `คงเหลือ`.
    pub label: String,
    /// Deep selector matching the current markup exactly.
    pub primary: String,
    /// Looser selectors, tried in order when the primary yields nothing.
    #[serde(default)]
    pub fallbacks: Vec<String>,
}

impl FieldSpec {
    fn strategies(&self) -> Vec<Strategy> {
        std::iter::once(self.primary.as_str())
            .chain(self.fallbacks.iter().map(String::as_str))
            .filter_map(Strategy::select)
            .collect()
    }
}

/// Repeated containers read by position (1st, 2nd, 3rd, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSpec {
    /// Selector shared by every container, usually a class marker.
    pub container: String,
    /// Selector for the value inside one container.
    pub value: String,
    /// One label per position; its length fixes how many values are read.
    pub labels: Vec<String>,
}

/// Text of the first strategy that yields something, else `"0"`.
pub fn extract_field(html: &str, spec: &FieldSpec) -> String {
    let doc = Document::new(html);
    extract_field_in(&doc, spec)
}

fn extract_field_in(doc: &Document<'_>, spec: &FieldSpec) -> String {
    let strategies = spec.strategies();
    // Report which selector hit so markup drift shows up in debug logs.
    for (index, strategy) in strategies.iter().enumerate() {
        if let Some(value) = strategy.apply(doc) {
            if index > 0 {
                debug!(field = %spec.label, fallback = index, "primary selector missed");
            }
            return value;
        }
    }
    debug!(field = %spec.label, "no selector matched, defaulting");
    MISSING_VALUE.to_string()
}

/// Extract several fields from one parse of the document.
pub fn extract_fields(html: &str, specs: &[FieldSpec]) -> Vec<String> {
    let doc = Document::new(html);
    specs.iter().map(|spec| extract_field_in(&doc, spec)).collect()
}

/// One raw value per label in `spec.labels`, read from the n-th container.
///
/// Missing containers and empty values default to `"0"`.
pub fn extract_cards(html: &str, spec: &CardSpec) -> Vec<String> {
    let wanted = spec.labels.len();
    let (Ok(container_sel), Ok(value_sel)) =
        (Selector::parse(&spec.container), Selector::parse(&spec.value))
    else {
        warn!(container = %spec.container, value = %spec.value, "invalid card selectors");
        return vec![MISSING_VALUE.to_string(); wanted];
    };

    let doc = Document::new(html);
    let mut values: Vec<String> = doc
        .html()
        .select(&container_sel)
        .take(wanted)
        .map(|card| {
            card.select(&value_sel)
                .map(element_text)
                .find(|text| !text.is_empty())
                .unwrap_or_else(|| MISSING_VALUE.to_string())
        })
        .collect();

    if values.len() < wanted {
        debug!(found = values.len(), wanted, "fewer cards than expected");
        values.resize(wanted, MISSING_VALUE.to_string());
    }
    values
}
