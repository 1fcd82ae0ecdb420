//! Rendering of snapshots and profile listings.

use yrc_canteen::{PortalProfile, Snapshot, SuccessSignal, BUILTIN_PROFILES};

/// `<label>: <value>` lines, then the next refresh time.
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    for line in &snapshot.lines {
        out.push_str(&format!("{}: {}\n", line.label, line.value));
    }
    out.push_str(&format!(
        "next refresh: {}\n",
        snapshot.refresh_after.to_rfc3339()
    ));
    out
}

pub fn render_json(snapshot: &Snapshot) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// One block per built-in profile with its distinguishing constants.
pub fn render_profiles() -> String {
    BUILTIN_PROFILES
        .iter()
        .filter_map(|name| PortalProfile::by_name(name))
        .map(|p| {
            let signal = match &p.success {
                SuccessSignal::Redirect { status } => format!("redirect ({status})"),
                SuccessSignal::Document { .. } => "document".to_string(),
            };
            format!(
                "{}\n  base url:   {}\n  login:      {}\n  cookie:     {}\n  token:      {}\n  signal:     {}\n  summary:    {}\n",
                p.name,
                p.base_url,
                p.login_path,
                p.cookie_name,
                p.token.field,
                signal,
                if p.summary.is_some() { "yes" } else { "no" },
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
