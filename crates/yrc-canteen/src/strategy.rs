//! Ordered extraction strategies over a lazily parsed document.
//!
//! Each [`Strategy`] is a pure lookup `(document) -> Option<String>`. Callers
//! hold them in cheapest-first order and run [`first_match`]; the DOM is only
//! built when a structural strategy is actually reached.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::cell::OnceCell;
use tracing::warn;

/// Raw markup plus its DOM, parsed on first structural access.
pub struct Document<'a> {
    source: &'a str,
    parsed: OnceCell<Html>,
}

impl<'a> Document<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            parsed: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The parsed DOM. html5ever recovers from any malformed input.
    pub fn html(&self) -> &Html {
        self.parsed.get_or_init(|| Html::parse_document(self.source))
    }

    pub fn is_parsed(&self) -> bool {
        self.parsed.get().is_some()
    }
}

/// One way of locating a value.
#[derive(Debug, Clone)]
pub enum Strategy {
    /// Regex over the raw markup. The first capture group is the value.
    Pattern(Regex),
    /// CSS selector against the DOM. Reads `attr` when set, element text otherwise.
    Select {
        selector: Selector,
        attr: Option<String>,
    },
}

impl Strategy {
    /// Compile a textual pattern; `None` (and a warning) if it is invalid.
    pub fn pattern(pattern: &str) -> Option<Self> {
        match Regex::new(pattern) {
            Ok(re) => Some(Strategy::Pattern(re)),
            Err(e) => {
                warn!(pattern, error = %e, "skipping invalid extraction pattern");
                None
            }
        }
    }

    /// Text of the first non-empty element matching `css`.
    pub fn select(css: &str) -> Option<Self> {
        Self::parse_selector(css).map(|selector| Strategy::Select {
            selector,
            attr: None,
        })
    }

    /// Attribute `attr` of the first element matching `css` that carries it.
    pub fn select_attr(css: &str, attr: &str) -> Option<Self> {
        Self::parse_selector(css).map(|selector| Strategy::Select {
            selector,
            attr: Some(attr.to_string()),
        })
    }

    fn parse_selector(css: &str) -> Option<Selector> {
        match Selector::parse(css) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(selector = css, error = %e, "skipping invalid selector");
                None
            }
        }
    }

    /// Whether this strategy needs the DOM.
    pub fn is_structural(&self) -> bool {
        matches!(self, Strategy::Select { .. })
    }

    pub fn apply(&self, doc: &Document<'_>) -> Option<String> {
        match self {
            Strategy::Pattern(re) => re
                .captures(doc.source())
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .filter(|v| !v.is_empty()),
            Strategy::Select { selector, attr } => {
                doc.html().select(selector).find_map(|el| {
                    let value = match attr {
                        Some(name) => el.value().attr(name).map(|v| v.trim().to_string()),
                        None => Some(element_text(el)),
                    };
                    value.filter(|v| !v.is_empty())
                })
            }
        }
    }
}

/// Run strategies in order; the first non-empty result wins.
pub fn first_match(strategies: &[Strategy], doc: &Document<'_>) -> Option<String> {
    strategies.iter().find_map(|s| s.apply(doc))
}

/// Element text with whitespace runs collapsed to single spaces.
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
