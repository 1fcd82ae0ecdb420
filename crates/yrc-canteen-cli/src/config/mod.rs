//! Settings loading and resolution.
//!
//! Precedence, highest first: command-line flags, `YRC_CANTEEN_*`
//! environment variables, the settings file. The file is only read; the
//! credentials it holds are never written back.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::warn;

use yrc_canteen::snapshot::DEFAULT_REFRESH_MINUTES;
use yrc_canteen::{ClientOptions, Credentials, PortalProfile, RefreshSchedule};

pub const SETTINGS_ENV: &str = "YRC_CANTEEN_SETTINGS";
pub const USERNAME_ENV: &str = "YRC_CANTEEN_USERNAME";
pub const PASSWORD_ENV: &str = "YRC_CANTEEN_PASSWORD";
pub const REFRESH_ENV: &str = "YRC_CANTEEN_REFRESH_MINUTES";
pub const PROFILE_ENV: &str = "YRC_CANTEEN_PROFILE";

pub const DEFAULT_PROFILE: &str = "current";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Shown when no usable username/password pair was configured.
pub const MISSING_CREDENTIALS: &str = "Please set your credentials";

/// On-disk settings, using the widget's historical field names.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// Refresh interval in minutes.
    #[serde(default)]
    pub update_rate: Option<u32>,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

/// Values given on the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_minutes: Option<u32>,
    pub profile: Option<String>,
    pub base_url: Option<String>,
}

/// Fully resolved settings for one run.
#[derive(Clone)]
pub struct Settings {
    pub username: String,
    pub password: String,
    pub refresh_minutes: u32,
    pub profile: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("username_len", &self.username.chars().count())
            .field("password_len", &self.password.chars().count())
            .field("refresh_minutes", &self.refresh_minutes)
            .field("profile", &self.profile)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Resolve the settings file path.
///
/// Returns the path and whether it was asked for explicitly; a missing
/// default file is fine, a missing explicit one is not.
pub fn resolve_settings_path(explicit: Option<&Path>) -> (PathBuf, bool) {
    if let Some(path) = explicit {
        return (path.to_path_buf(), true);
    }

    if let Ok(env_path) = std::env::var(SETTINGS_ENV) {
        return (PathBuf::from(env_path), true);
    }

    (default_settings_path(), false)
}

fn default_settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".yrc-canteen")
        .join("settings.json")
}

/// Read a settings file. A missing file that was not asked for is empty.
pub fn load_settings_file(path: &Path, required: bool) -> anyhow::Result<SettingsFile> {
    if !path.exists() {
        if required {
            bail!("settings file not found: {}", path.display());
        }
        return Ok(SettingsFile::default());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    // A malformed file counts as empty; the run then stops at missing credentials.
    match serde_json::from_str(&raw) {
        Ok(file) => Ok(file),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring malformed settings file");
            Ok(SettingsFile::default())
        }
    }
}

impl Settings {
    /// Resolve from flags, the process environment, and the settings file.
    pub fn load(overrides: Overrides, settings_path: Option<&Path>) -> anyhow::Result<Self> {
        let (path, required) = resolve_settings_path(settings_path);
        let file = load_settings_file(&path, required)?;
        Self::resolve(overrides, |key| std::env::var(key).ok(), file)
    }

    /// Merge the three layers. `env` looks up one environment variable.
    pub fn resolve(
        overrides: Overrides,
        env: impl Fn(&str) -> Option<String>,
        file: SettingsFile,
    ) -> anyhow::Result<Self> {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let env_refresh = env(REFRESH_ENV)
            .map(|v| {
                v.trim()
                    .parse::<u32>()
                    .with_context(|| format!("{REFRESH_ENV} must be a whole number of minutes"))
            })
            .transpose()?;

        let refresh_minutes = overrides
            .refresh_minutes
            .or(env_refresh)
            .or(file.update_rate)
            .unwrap_or(DEFAULT_REFRESH_MINUTES);
        if refresh_minutes == 0 {
            bail!("refresh interval must be at least one minute");
        }

        Ok(Self {
            username: overrides
                .username
                .or_else(|| env(USERNAME_ENV))
                .or(file.username)
                .unwrap_or_default(),
            password: overrides
                .password
                .or_else(|| env(PASSWORD_ENV))
                .or(file.password)
                .unwrap_or_default(),
            refresh_minutes,
            profile: overrides
                .profile
                .or_else(|| env(PROFILE_ENV))
                .or(file.profile)
                .unwrap_or_else(|| DEFAULT_PROFILE.to_string()),
            base_url: overrides.base_url.or(file.base_url),
            timeout_secs: file.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            bail!(MISSING_CREDENTIALS);
        }
        Ok(Credentials::new(self.username.trim(), self.password.clone()))
    }

    pub fn portal_profile(&self) -> anyhow::Result<PortalProfile> {
        let profile = PortalProfile::by_name(&self.profile).with_context(|| {
            format!(
                "unknown profile '{}' (expected one of: {})",
                self.profile,
                yrc_canteen::BUILTIN_PROFILES.join(", ")
            )
        })?;
        Ok(match &self.base_url {
            Some(base) => profile.with_base_url(base.trim_end_matches('/')),
            None => profile,
        })
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            ..ClientOptions::default()
        }
    }

    pub fn schedule(&self) -> RefreshSchedule {
        RefreshSchedule::every(self.refresh_minutes).unwrap_or_default()
    }
}
