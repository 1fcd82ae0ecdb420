//! Core data types shared across the retrieval pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::FailureTag;

/// Opaque value of the portal's session cookie.
///
/// Lives for one retrieval only and is never persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionHandle(String);

impl SessionHandle {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render as a `Cookie` header value for the given cookie name.
    pub fn cookie_header(&self, cookie_name: &str) -> String {
        format!("{cookie_name}={}", self.0)
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SessionHandle").field(&redact(&self.0)).finish()
    }
}

/// Where a response landed once redirects were resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageState {
    NeedsLogin,
    Authenticated,
    Unknown,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageState::NeedsLogin => "needs_login",
            PageState::Authenticated => "authenticated",
            PageState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Login credentials, passed in per call and never stored.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username_len", &self.username.chars().count())
            .field("password_len", &self.password.chars().count())
            .finish()
    }
}

/// The three values of the multi-value variant, already normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub balance: String,
    pub top_up: String,
    pub expense: String,
}

impl Summary {
    pub fn to_vec(&self) -> Vec<String> {
        vec![
            self.balance.clone(),
            self.top_up.clone(),
            self.expense.clone(),
        ]
    }
}

/// Which variant of the retrieval to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Balance,
    Summary,
}

/// Outcome of one retrieval run: all values, or one failure tag. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetrievalResult {
    Balance { value: String },
    Summary { summary: Summary },
    Failed { tag: FailureTag },
}

impl RetrievalResult {
    /// The strings a display host renders: one value, three values, or the tag.
    pub fn display_strings(&self) -> Vec<String> {
        match self {
            RetrievalResult::Balance { value } => vec![value.clone()],
            RetrievalResult::Summary { summary } => summary.to_vec(),
            RetrievalResult::Failed { tag } => vec![tag.to_string()],
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, RetrievalResult::Failed { .. })
    }
}

/// Prefix hint for secrets that may appear in logs.
pub fn redact(secret: &str) -> String {
    let prefix: String = secret.chars().take(4).collect();
    if prefix.len() == secret.len() {
        "…".to_string()
    } else {
        format!("{prefix}…")
    }
}
