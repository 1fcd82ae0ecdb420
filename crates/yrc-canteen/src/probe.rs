//! Page-state probe: where does the entry page send us?
//!
//! The portal redirects the entry URL to the dashboard when the session is
//! valid and to the login form otherwise, so the state is read from the
//! resolved URL, never from the one requested.

use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::http_client::PortalClient;
use crate::profile::PortalProfile;
use crate::types::{redact, PageState, SessionHandle};

/// What the probe saw.
#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub state: PageState,
    /// Body of the page the redirects ended on.
    pub html: String,
    /// Session cookie after the probe (rotated, or the one that was sent).
    pub session: SessionHandle,
    pub final_url: String,
}

/// Load the entry page, optionally with an existing session, and classify it.
pub async fn probe(
    client: &PortalClient,
    profile: &PortalProfile,
    session: Option<&SessionHandle>,
) -> Result<ProbeOutcome, ProbeError> {
    let url = profile
        .entry_url()
        .map_err(|e| ProbeError::Transport(e.into()))?;

    let resp = client
        .get_following(url, &profile.cookie_name, session.cloned())
        .await
        .map_err(|e| {
            warn!(error = %e, "probe request failed");
            ProbeError::Transport(e)
        })?;

    if resp.status >= 400 {
        warn!(status = resp.status, url = %resp.final_url, "portal answered with an error");
        return Err(ProbeError::Status(resp.status));
    }

    let state = profile.classify(&resp.final_url);
    let session = resp
        .cookie(&profile.cookie_name)
        .map(SessionHandle::new)
        .or_else(|| session.cloned())
        .ok_or(ProbeError::NoSession)?;

    debug!(
        %state,
        url = %resp.final_url,
        redirects = resp.redirects,
        session = %redact(session.as_str()),
        "page state probed"
    );

    Ok(ProbeOutcome {
        state,
        html: resp.body,
        session,
        final_url: resp.final_url,
    })
}
