//! Portal profiles: every version-specific constant in one value.
//!
//! Deployments of the canteen portal differ in paths, cookie name, token
//! placement, dashboard markup, and how a successful login is signalled.
//! The orchestrator is written once against [`PortalProfile`]; which profile
//! applies is static configuration, never guessed at runtime.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::fields::{CardSpec, FieldSpec};
use crate::token::TokenSpec;
use crate::types::PageState;

/// Names accepted by [`PortalProfile::by_name`].
pub const BUILTIN_PROFILES: &[&str] = &["current", "legacy"];

/// How the portal reports a successful login POST.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SuccessSignal {
    /// A redirect with exactly this status to somewhere other than the login page.
    Redirect { status: u16 },
    /// A 200 whose body no longer contains `failure_marker`.
    Document { failure_marker: String },
}

/// Field names of the login form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    pub username_field: String,
    pub password_field: String,
    /// Constant fields the portal expects, in submission order.
    #[serde(default)]
    pub extra: Vec<(String, String)>,
}

/// Version-specific constants for one deployment of the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalProfile {
    pub name: String,
    pub base_url: String,
    /// Entry page requested by the probe; redirects tell login from dashboard.
    pub entry_path: String,
    /// Login form target, also sent as `Referer`.
    pub login_path: String,
    pub logout_path: String,
    pub dashboard_path: String,
    /// Substring of a resolved URL that means "authenticated".
    pub dashboard_marker: String,
    /// Substring of a resolved URL that means "login required".
    pub login_marker: String,
    /// Name of the session cookie.
    pub cookie_name: String,
    pub token: TokenSpec,
    pub login_form: LoginForm,
    pub success: SuccessSignal,
    pub balance: FieldSpec,
    /// Positional cards for the three-value variant, when the portal has them.
    #[serde(default)]
    pub summary: Option<CardSpec>,
}

impl PortalProfile {
    /// The portal as currently deployed.
    pub fn yupparaj() -> Self {
        Self {
            name: "current".into(),
            base_url: "https://www.yupparaj.ac.th".into(),
            entry_path: "/canteen/login".into(),
            login_path: "/canteen/login".into(),
            logout_path: "/canteen/student/logout".into(),
            dashboard_path: "/canteen/student/dashboard".into(),
            dashboard_marker: "dashboard".into(),
            login_marker: "login".into(),
            cookie_name: "canteen_session".into(),
            token: TokenSpec {
                field: "_csrf_token".into(),
                meta: Some("csrf-token".into()),
            },
            login_form: LoginForm {
                username_field: "username".into(),
                password_field: "password".into(),
                extra: vec![("user_type".into(), "student".into())],
            },
            success: SuccessSignal::Redirect { status: 302 },
            balance: FieldSpec {
                label: "คงเหลือ".into(),
                primary: "body > main > div > \
                          div.bg-gradient-to-r.from-blue-500.to-indigo-600.rounded-2xl.p-8.text-white.shadow-xl \
                          > div.flex.items-center.justify-between > div:nth-child(1) > p.text-4xl.font-bold.mt-1"
                    .into(),
                fallbacks: vec![
                    "main div.rounded-2xl div.justify-between p.text-4xl".into(),
                    "p.text-4xl.font-bold".into(),
                    "[data-field=\"balance\"]".into(),
                ],
            },
            summary: None,
        }
    }

    /// Older deployment: 200-on-success login and one card per value.
    pub fn yupparaj_legacy() -> Self {
        Self {
            name: "legacy".into(),
            base_url: "https://www.yupparaj.ac.th".into(),
            entry_path: "/canteen/student/login".into(),
            login_path: "/canteen/student/login".into(),
            logout_path: "/canteen/student/logout".into(),
            dashboard_path: "/canteen/student/dashboard".into(),
            dashboard_marker: "dashboard".into(),
            login_marker: "login".into(),
            cookie_name: "laravel_session".into(),
            token: TokenSpec {
                field: "_token".into(),
                meta: Some("csrf-token".into()),
            },
            login_form: LoginForm {
                username_field: "username".into(),
                password_field: "password".into(),
                extra: Vec::new(),
            },
            success: SuccessSignal::Document {
                failure_marker: "name=\"password\"".into(),
            },
            balance: FieldSpec {
                label: "คงเหลือ".into(),
                primary: "div.summary-card:nth-of-type(1) > p.summary-value".into(),
                fallbacks: vec![
                    ".summary-card .summary-value".into(),
                    "[data-field=\"balance\"]".into(),
                ],
            },
            summary: Some(CardSpec {
                container: ".summary-card".into(),
                value: ".summary-value".into(),
                labels: vec!["คงเหลือ".into(), "เติมเงิน".into(), "ใช้จ่าย".into()],
            }),
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "current" | "yupparaj" => Some(Self::yupparaj()),
            "legacy" | "yupparaj-legacy" => Some(Self::yupparaj_legacy()),
            _ => None,
        }
    }

    /// Same profile against another host (mirrors, staging, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Resolve a profile path against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)?.join(path)
    }

    pub fn entry_url(&self) -> Result<Url, url::ParseError> {
        self.url(&self.entry_path)
    }

    pub fn login_url(&self) -> Result<Url, url::ParseError> {
        self.url(&self.login_path)
    }

    pub fn logout_url(&self) -> Result<Url, url::ParseError> {
        self.url(&self.logout_path)
    }

    pub fn dashboard_url(&self) -> Result<Url, url::ParseError> {
        self.url(&self.dashboard_path)
    }

    /// Check that every path resolves against the base URL.
    pub fn validate(&self) -> Result<(), url::ParseError> {
        self.entry_url()?;
        self.login_url()?;
        self.logout_url()?;
        self.dashboard_url()?;
        Ok(())
    }

    /// Classify a *resolved* URL. The dashboard marker wins over the login marker.
    pub fn classify(&self, resolved_url: &str) -> PageState {
        if resolved_url.contains(&self.dashboard_marker) {
            PageState::Authenticated
        } else if resolved_url.contains(&self.login_marker) {
            PageState::NeedsLogin
        } else {
            PageState::Unknown
        }
    }

    /// Labels for the values a retrieval in this profile produces.
    pub fn labels(&self, summary: bool) -> Vec<String> {
        match (&self.summary, summary) {
            (Some(cards), true) => cards.labels.clone(),
            _ => vec![self.balance.label.clone()],
        }
    }
}

impl Default for PortalProfile {
    fn default() -> Self {
        Self::yupparaj()
    }
}
