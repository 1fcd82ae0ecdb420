//! Async HTTP client wrapping reqwest.
//!
//! Not a browser, but it behaves like one where the portal cares: a mobile
//! user-agent, an HTML `Accept` header, and an explicit session `Cookie`
//! header. Automatic redirects are disabled. GETs follow redirects by hand so
//! that a cookie set on any hop is seen; form POSTs never follow, so the raw
//! status, `Location`, and rotated cookie of the login answer stay visible.

use reqwest::header::{ACCEPT, COOKIE, LOCATION, ORIGIN, REFERER};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::error::ClientError;
use crate::types::SessionHandle;

/// User-agent of a mobile Safari; the portal serves other markup to bots.
pub const MOBILE_USER_AGENT: &str =
    "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/605.1.15";

/// `Accept` header sent with page loads.
pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
                               image/avif,image/webp,image/apng,*/*;q=0.8,\
                               application/signed-exchange;v=b3;q=0.7";

/// Transport settings for [`PortalClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout.
    pub timeout: Duration,
    pub user_agent: String,
    /// Hop limit for [`PortalClient::get_following`].
    pub max_redirects: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: MOBILE_USER_AGENT.to_string(),
            max_redirects: 5,
        }
    }
}

/// One response (or the last of a redirect chain).
#[derive(Debug, Clone)]
pub struct PortalResponse {
    /// Originally requested URL.
    pub url: String,
    /// URL of the response that ended the chain.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Raw `Location` header, if any.
    pub location: Option<String>,
    /// `Set-Cookie` name/value pairs from every hop, in arrival order.
    pub cookies: Vec<(String, String)>,
    /// Response body as text.
    pub body: String,
    /// Number of redirects followed.
    pub redirects: usize,
}

impl PortalResponse {
    /// The last non-empty value set for cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .rev()
            .find(|(n, v)| n == name && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }

    pub fn is_redirect(&self) -> bool {
        (300..400).contains(&self.status) && self.status != 304
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// HTTP client for talking to the portal.
#[derive(Clone)]
pub struct PortalClient {
    client: reqwest::Client,
    options: ClientOptions,
}

impl PortalClient {
    pub fn new(options: ClientOptions) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(options.user_agent.as_str())
            .build()
            .map_err(ClientError::Build)?;
        Ok(Self { client, options })
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Single GET, no redirect following.
    pub async fn get(
        &self,
        url: &Url,
        cookie: Option<&str>,
        referer: Option<&str>,
    ) -> Result<PortalResponse, ClientError> {
        let mut builder = self.client.get(url.clone()).header(ACCEPT, HTML_ACCEPT);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(referer) = referer {
            builder = builder.header(REFERER, referer);
        }
        let resp = builder.send().await?;
        Self::read(url, resp).await
    }

    /// GET that follows redirects by hand, carrying the session cookie.
    ///
    /// A cookie named `cookie_name` issued by any hop replaces the one sent
    /// on later hops, as a browser would do.
    pub async fn get_following(
        &self,
        url: Url,
        cookie_name: &str,
        session: Option<SessionHandle>,
    ) -> Result<PortalResponse, ClientError> {
        let requested = url.to_string();
        let mut current = url;
        let mut session = session;
        let mut cookies = Vec::new();

        for hop in 0..=self.options.max_redirects {
            let cookie = session.as_ref().map(|s| s.cookie_header(cookie_name));
            let mut resp = self.get(&current, cookie.as_deref(), None).await?;
            if let Some(value) = resp.cookie(cookie_name) {
                session = Some(SessionHandle::new(value));
            }
            cookies.append(&mut resp.cookies);

            if !resp.is_redirect() {
                return Ok(PortalResponse {
                    url: requested,
                    final_url: current.to_string(),
                    cookies,
                    redirects: hop,
                    ..resp
                });
            }

            let location = resp
                .location
                .as_deref()
                .ok_or(ClientError::MissingLocation {
                    status: resp.status,
                })?;
            let next = current.join(location)?;
            debug!(status = resp.status, from = %current, to = %next, "following redirect");
            current = next;
        }

        Err(ClientError::TooManyRedirects {
            limit: self.options.max_redirects,
        })
    }

    /// POST an url-encoded form. Never follows redirects.
    pub async fn post_form(
        &self,
        url: &Url,
        form_fields: &[(String, String)],
        cookie: Option<&str>,
        referer: &str,
    ) -> Result<PortalResponse, ClientError> {
        let mut builder = self
            .client
            .post(url.clone())
            .header(REFERER, referer)
            .header(ORIGIN, url.origin().ascii_serialization());
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        let resp = builder.form(form_fields).send().await?;
        Self::read(url, resp).await
    }

    async fn read(url: &Url, resp: reqwest::Response) -> Result<PortalResponse, ClientError> {
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let cookies: Vec<(String, String)> = resp
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = resp.text().await?;

        debug!(%url, status, cookies = cookies.len(), bytes = body.len(), "response");

        Ok(PortalResponse {
            url: url.to_string(),
            final_url,
            status,
            location,
            cookies,
            body,
            redirects: 0,
        })
    }
}
