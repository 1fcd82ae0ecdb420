//! Error types for the retrieval pipeline.
//!
//! Internal stages return typed errors; the orchestrator folds every one of
//! them into a [`FailureTag`], the short string a display host renders.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Caller-facing failure classification. Terminal for the current run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureTag {
    /// Transport failure while probing the entry page.
    ConnectionError,
    /// The probe succeeded but no session cookie was issued.
    NoSession,
    /// The login page carried no anti-forgery token.
    #[serde(rename = "NoCSRF")]
    NoCsrf,
    /// The login POST failed or answered with a non-success status.
    LoginFailed,
    /// Login reported success but did not renew the session cookie.
    NoSessionAfterLogin,
    /// Verification did not land on the authenticated page.
    NotLoggedIn,
    /// Anything unexpected.
    Error,
}

impl FailureTag {
    pub const ALL: [FailureTag; 7] = [
        FailureTag::ConnectionError,
        FailureTag::NoSession,
        FailureTag::NoCsrf,
        FailureTag::LoginFailed,
        FailureTag::NoSessionAfterLogin,
        FailureTag::NotLoggedIn,
        FailureTag::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FailureTag::ConnectionError => "ConnectionError",
            FailureTag::NoSession => "NoSession",
            FailureTag::NoCsrf => "NoCSRF",
            FailureTag::LoginFailed => "LoginFailed",
            FailureTag::NoSessionAfterLogin => "NoSessionAfterLogin",
            FailureTag::NotLoggedIn => "NotLoggedIn",
            FailureTag::Error => "Error",
        }
    }
}

impl fmt::Display for FailureTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for FailureTag {}

/// Transport-level failures from [`crate::http_client::PortalClient`].
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("redirect {status} without a Location header")]
    MissingLocation { status: u16 },

    #[error("more than {limit} redirects")]
    TooManyRedirects { limit: usize },
}

/// Failures of the page-state probe.
#[derive(thiserror::Error, Debug)]
pub enum ProbeError {
    #[error("probe transport failure: {0}")]
    Transport(#[from] ClientError),

    #[error("portal answered with status {0}")]
    Status(u16),

    #[error("no session cookie in probe response")]
    NoSession,
}

/// Failures of the login submission.
#[derive(thiserror::Error, Debug)]
pub enum LoginError {
    #[error("login transport failure: {0}")]
    Transport(#[from] ClientError),

    #[error("unexpected login status {0}")]
    UnexpectedStatus(u16),

    #[error("login redirected back to {location}")]
    Rejected { location: String },

    #[error("login succeeded without renewing the session cookie")]
    NoSessionAfterLogin,
}

/// Everything that can end a retrieval early.
#[derive(thiserror::Error, Debug)]
pub(crate) enum PipelineError {
    #[error("probe failed: {0}")]
    Probe(#[source] ProbeError),

    #[error("verification probe failed: {0}")]
    Verify(#[source] ProbeError),

    #[error("no anti-forgery token on the login page")]
    NoCsrf,

    #[error(transparent)]
    Login(#[from] LoginError),

    #[error("resolved page is {0}, not the dashboard")]
    NotLoggedIn(crate::types::PageState),

    #[error("{0}")]
    Unsupported(&'static str),
}

impl From<PipelineError> for FailureTag {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Probe(ProbeError::NoSession)
            | PipelineError::Verify(ProbeError::NoSession) => FailureTag::NoSession,
            PipelineError::Probe(_) | PipelineError::Verify(_) => FailureTag::ConnectionError,
            PipelineError::NoCsrf => FailureTag::NoCsrf,
            PipelineError::Login(LoginError::NoSessionAfterLogin) => {
                FailureTag::NoSessionAfterLogin
            }
            PipelineError::Login(_) => FailureTag::LoginFailed,
            PipelineError::NotLoggedIn(_) => FailureTag::NotLoggedIn,
            PipelineError::Unsupported(_) => FailureTag::Error,
        }
    }
}
