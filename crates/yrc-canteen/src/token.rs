//! Anti-forgery token lookup on the login page.
//!
//! Portal versions disagree on attribute order (`name` before `value` or the
//! other way round) and on where the token lives (hidden input or `<meta>`),
//! so both orders are tried textually first. Only when every pattern misses
//! is the page parsed and queried structurally.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::strategy::{first_match, Document, Strategy};
use crate::types::redact;

/// Where a portal version puts its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSpec {
    /// `name` of the hidden `<input>` carrying the token, also the POST field name.
    pub field: String,
    /// `name` of a `<meta>` tag carrying the token in its `content`, if any.
    #[serde(default)]
    pub meta: Option<String>,
}

/// Compiled strategy chain for one [`TokenSpec`].
#[derive(Debug, Clone)]
pub struct TokenExtractor {
    strategies: Vec<Strategy>,
}

impl TokenExtractor {
    pub fn new(spec: &TokenSpec) -> Self {
        let field = regex::escape(&spec.field);
        let mut patterns = vec![
            format!(
                r#"(?i)<input[^>]*?\sname\s*=\s*['"]{field}['"][^>]*?\svalue\s*=\s*['"]([^'"]+)['"]"#
            ),
            format!(
                r#"(?i)<input[^>]*?\svalue\s*=\s*['"]([^'"]+)['"][^>]*?\sname\s*=\s*['"]{field}['"]"#
            ),
        ];
        if let Some(meta) = spec.meta.as_deref().map(regex::escape) {
            patterns.push(format!(
                r#"(?i)<meta[^>]*?\sname\s*=\s*['"]{meta}['"][^>]*?\scontent\s*=\s*['"]([^'"]+)['"]"#
            ));
            patterns.push(format!(
                r#"(?i)<meta[^>]*?\scontent\s*=\s*['"]([^'"]+)['"][^>]*?\sname\s*=\s*['"]{meta}['"]"#
            ));
        }

        let mut strategies: Vec<Strategy> =
            patterns.iter().filter_map(|p| Strategy::pattern(p)).collect();
        strategies.extend(Strategy::select_attr(
            &format!("input[name=\"{}\"]", spec.field),
            "value",
        ));
        if let Some(meta) = &spec.meta {
            strategies.extend(Strategy::select_attr(
                &format!("meta[name=\"{meta}\"]"),
                "content",
            ));
        }

        Self { strategies }
    }

    /// The token, or `None` when no strategy finds one.
    pub fn extract(&self, html: &str) -> Option<String> {
        self.extract_from(&Document::new(html))
    }

    /// Same as [`extract`](Self::extract) over an existing document.
    pub fn extract_from(&self, doc: &Document<'_>) -> Option<String> {
        let token = first_match(&self.strategies, doc);
        match &token {
            Some(t) => debug!(
                token = %redact(t),
                structural = doc.is_parsed(),
                "anti-forgery token found"
            ),
            None => debug!(html_len = doc.source().len(), "no anti-forgery token found"),
        }
        token
    }
}

/// One-shot convenience over [`TokenExtractor`].
pub fn extract_token(html: &str, spec: &TokenSpec) -> Option<String> {
    TokenExtractor::new(spec).extract(html)
}
