//! Session termination.

use tracing::debug;

use crate::http_client::PortalClient;
use crate::profile::PortalProfile;
use crate::types::SessionHandle;

/// Ask the portal to invalidate `session`.
///
/// Best effort: the outcome is logged and otherwise ignored, so a failing
/// logout can never change a result the caller already has.
pub async fn logout(client: &PortalClient, profile: &PortalProfile, session: &SessionHandle) {
    let (url, referer) = match (profile.logout_url(), profile.dashboard_url()) {
        (Ok(url), Ok(referer)) => (url, referer),
        (Err(e), _) | (_, Err(e)) => {
            debug!(error = %e, "logout skipped: bad profile URL");
            return;
        }
    };

    let cookie = session.cookie_header(&profile.cookie_name);
    match client.get(&url, Some(&cookie), Some(referer.as_str())).await {
        Ok(resp) => debug!(status = resp.status, "logged out"),
        Err(e) => debug!(error = %e, "logout failed, ignoring"),
    }
}
