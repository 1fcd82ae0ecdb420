//! The end-to-end retrieval: probe, log in if needed, verify, extract,
//! normalize, log out.
//!
//! ```text
//! START ─probe─▶ PROBED ─needs login─▶ AUTHENTICATING ─login+verify─▶ AUTHENTICATED
//!                   │                                                    ▲
//!                   └──────────── already authenticated ─────────────────┘
//! AUTHENTICATED ─extract+normalize─▶ EXTRACTED ─logout (best effort)─▶ DONE
//! ```
//!
//! Every transition can exit with a [`FailureTag`]. Nothing is retried; the
//! host re-running the whole retrieval on its schedule is the retry.

use futures::FutureExt;
use std::fmt;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::auth;
use crate::error::{ClientError, FailureTag, PipelineError};
use crate::fields::{extract_cards, extract_field, MISSING_VALUE};
use crate::http_client::{ClientOptions, PortalClient};
use crate::logout::logout;
use crate::normalize::display_value;
use crate::probe::probe;
use crate::profile::PortalProfile;
use crate::token::TokenExtractor;
use crate::types::{Credentials, PageState, RetrievalMode, RetrievalResult, Summary};

/// Pipeline position, for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Probed,
    Authenticating,
    Authenticated,
    Extracted,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Start => "start",
            Stage::Probed => "probed",
            Stage::Authenticating => "authenticating",
            Stage::Authenticated => "authenticated",
            Stage::Extracted => "extracted",
            Stage::Done => "done",
        };
        f.write_str(s)
    }
}

/// Runs retrievals against one portal profile.
///
/// Holds no per-run state: every call starts from a fresh probe, so
/// overlapping calls cannot interfere with each other.
#[derive(Clone)]
pub struct Retriever {
    client: PortalClient,
    profile: PortalProfile,
    token: TokenExtractor,
}

impl Retriever {
    pub fn new(profile: PortalProfile, options: ClientOptions) -> Result<Self, ClientError> {
        profile.validate()?;
        let client = PortalClient::new(options)?;
        Ok(Self::with_client(profile, client))
    }

    pub fn with_client(profile: PortalProfile, client: PortalClient) -> Self {
        let token = TokenExtractor::new(&profile.token);
        Self {
            client,
            profile,
            token,
        }
    }

    pub fn profile(&self) -> &PortalProfile {
        &self.profile
    }

    /// Balance-only retrieval.
    pub async fn balance(&self, credentials: &Credentials) -> Result<String, FailureTag> {
        let spec = &self.profile.balance;
        self.run(credentials, |html| display_value(&extract_field(html, spec)))
            .await
    }

    /// Balance, top-up, and expense from the positional summary cards.
    pub async fn summary(&self, credentials: &Credentials) -> Result<Summary, FailureTag> {
        let Some(cards) = &self.profile.summary else {
            let err = PipelineError::Unsupported("profile has no summary cards");
            warn!(profile = %self.profile.name, error = %err, "summary unavailable");
            return Err(err.into());
        };
        self.run(credentials, |html| {
            let raw = extract_cards(html, cards);
            let value = |i: usize| display_value(raw.get(i).map_or(MISSING_VALUE, String::as_str));
            Summary {
                balance: value(0),
                top_up: value(1),
                expense: value(2),
            }
        })
        .await
    }

    /// Either variant, with failures folded into the result.
    pub async fn retrieve(&self, credentials: &Credentials, mode: RetrievalMode) -> RetrievalResult {
        let outcome = match mode {
            RetrievalMode::Balance => self
                .balance(credentials)
                .await
                .map(|value| RetrievalResult::Balance { value }),
            RetrievalMode::Summary => self
                .summary(credentials)
                .await
                .map(|summary| RetrievalResult::Summary { summary }),
        };
        outcome.unwrap_or_else(|tag| RetrievalResult::Failed { tag })
    }

    /// The balance, or the failure tag, as one display string.
    pub async fn retrieve_balance(&self, credentials: &Credentials) -> String {
        match self.balance(credentials).await {
            Ok(value) => value,
            Err(tag) => tag.to_string(),
        }
    }

    /// Balance, top-up, and expense as a tuple.
    pub async fn retrieve_all(
        &self,
        credentials: &Credentials,
    ) -> Result<(String, String, String), FailureTag> {
        self.summary(credentials)
            .await
            .map(|s| (s.balance, s.top_up, s.expense))
    }

    /// Run the pipeline, turning every error, and any panic, into a tag.
    async fn run<T, F>(&self, credentials: &Credentials, extract: F) -> Result<T, FailureTag>
    where
        F: FnOnce(&str) -> T + Send,
        T: Send,
    {
        let span = info_span!("retrieve", profile = %self.profile.name);
        let outcome = AssertUnwindSafe(self.pipeline(credentials, extract).instrument(span))
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                let tag = FailureTag::from(e);
                info!(%tag, "retrieval failed");
                Err(tag)
            }
            Err(_) => {
                error!("retrieval panicked");
                Err(FailureTag::Error)
            }
        }
    }

    async fn pipeline<T, F>(&self, credentials: &Credentials, extract: F) -> Result<T, PipelineError>
    where
        F: FnOnce(&str) -> T + Send,
    {
        let client = &self.client;
        let profile = &self.profile;
        debug!(stage = %Stage::Start, "starting retrieval");

        let probed = probe(client, profile, None)
            .await
            .map_err(PipelineError::Probe)?;
        debug!(stage = %Stage::Probed, state = %probed.state);

        let (html, session) = match probed.state {
            PageState::NeedsLogin => {
                debug!(stage = %Stage::Authenticating);
                let token = self
                    .token
                    .extract(&probed.html)
                    .ok_or(PipelineError::NoCsrf)?;
                let login =
                    auth::login(client, profile, &probed.session, &token, credentials).await?;

                let verified = probe(client, profile, Some(&login.session))
                    .await
                    .map_err(PipelineError::Verify)?;
                if verified.state != PageState::Authenticated {
                    return Err(PipelineError::NotLoggedIn(verified.state));
                }
                (verified.html, verified.session)
            }
            PageState::Authenticated => (probed.html, probed.session),
            PageState::Unknown => {
                warn!(url = %probed.final_url, "entry page resolved somewhere unrecognized");
                return Err(PipelineError::NotLoggedIn(PageState::Unknown));
            }
        };
        debug!(stage = %Stage::Authenticated);

        let value = extract(&html);
        debug!(stage = %Stage::Extracted);

        // Best effort; see `logout`.
        logout(client, profile, &session).await;
        debug!(stage = %Stage::Done);

        Ok(value)
    }
}
