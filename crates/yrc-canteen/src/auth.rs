//! Login submission.
//!
//! The POST is never redirect-followed: depending on the portal version,
//! success is a bare redirect or a 200 with a changed body, and in both cases
//! the renewed session cookie lives on that one response.

use tracing::{debug, info, warn};

use crate::error::LoginError;
use crate::http_client::PortalClient;
use crate::profile::{PortalProfile, SuccessSignal};
use crate::types::{redact, Credentials, PageState, SessionHandle};

/// A successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Body of the login answer (often empty for redirects).
    pub html: String,
    /// The renewed session cookie.
    pub session: SessionHandle,
    /// Redirect target, for redirect-signalled portals.
    pub location: Option<String>,
}

/// Build the form body in the order the portal's own form submits it.
pub fn login_form(
    profile: &PortalProfile,
    token: &str,
    credentials: &Credentials,
) -> Vec<(String, String)> {
    let mut fields = vec![(profile.token.field.clone(), token.to_string())];
    fields.extend(profile.login_form.extra.iter().cloned());
    fields.push((
        profile.login_form.username_field.clone(),
        credentials.username.clone(),
    ));
    fields.push((
        profile.login_form.password_field.clone(),
        credentials.password.clone(),
    ));
    fields
}

/// Submit credentials with the pre-login session and the page's token.
pub async fn login(
    client: &PortalClient,
    profile: &PortalProfile,
    pre_session: &SessionHandle,
    token: &str,
    credentials: &Credentials,
) -> Result<LoginOutcome, LoginError> {
    let url = profile
        .login_url()
        .map_err(|e| LoginError::Transport(e.into()))?;
    let form = login_form(profile, token, credentials);

    debug!(
        username_len = credentials.username.chars().count(),
        password_len = credentials.password.chars().count(),
        token = %redact(token),
        "submitting login"
    );

    let resp = client
        .post_form(
            &url,
            &form,
            Some(&pre_session.cookie_header(&profile.cookie_name)),
            url.as_str(),
        )
        .await
        .map_err(|e| {
            warn!(error = %e, "login request failed");
            LoginError::Transport(e)
        })?;

    match &profile.success {
        SuccessSignal::Redirect { status } => {
            if resp.status != *status {
                warn!(status = resp.status, expected = *status, "unexpected login status");
                return Err(LoginError::UnexpectedStatus(resp.status));
            }
            let location = resp.location.clone().unwrap_or_default();
            let lands_on_login = url
                .join(&location)
                .map(|target| profile.classify(target.as_str()) == PageState::NeedsLogin)
                .unwrap_or(true);
            if lands_on_login {
                warn!(location = %location, "login redirected back to the login page");
                return Err(LoginError::Rejected { location });
            }
        }
        SuccessSignal::Document { failure_marker } => {
            if resp.status != 200 {
                warn!(status = resp.status, "unexpected login status");
                return Err(LoginError::UnexpectedStatus(resp.status));
            }
            if resp.body.contains(failure_marker.as_str()) {
                warn!("login form re-rendered after submission");
                return Err(LoginError::Rejected {
                    location: resp.final_url.clone(),
                });
            }
        }
    }

    // A success without a renewed cookie must not fall back to the stale one.
    let session = resp
        .cookie(&profile.cookie_name)
        .map(SessionHandle::new)
        .ok_or_else(|| {
            warn!("login succeeded but no session cookie was issued");
            LoginError::NoSessionAfterLogin
        })?;

    info!(session = %redact(session.as_str()), "logged in");

    Ok(LoginOutcome {
        html: resp.body,
        session,
        location: resp.location,
    })
}
