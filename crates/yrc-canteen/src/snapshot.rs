//! What a display host needs from one run: labelled strings and the time
//! of the next refresh.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::PortalProfile;
use crate::types::RetrievalResult;

/// Heading shown above the values.
pub const TITLE: &str = "YRC Canteen";

/// Default minutes between refreshes.
pub const DEFAULT_REFRESH_MINUTES: u32 = 5;

/// How often the host should re-run the retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSchedule {
    pub interval_minutes: u32,
}

impl RefreshSchedule {
    /// `None` for a zero interval.
    pub fn every(minutes: u32) -> Option<Self> {
        (minutes > 0).then_some(Self {
            interval_minutes: minutes,
        })
    }

    pub fn next_refresh(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::minutes(i64::from(self.interval_minutes))
    }
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self {
            interval_minutes: DEFAULT_REFRESH_MINUTES,
        }
    }
}

/// One labelled display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotLine {
    pub label: String,
    pub value: String,
}

/// Everything a widget renders for one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub title: String,
    pub lines: Vec<SnapshotLine>,
    pub failed: bool,
    pub generated_at: DateTime<Utc>,
    pub refresh_after: DateTime<Utc>,
}

impl Snapshot {
    pub fn build(
        result: &RetrievalResult,
        profile: &PortalProfile,
        schedule: &RefreshSchedule,
        now: DateTime<Utc>,
    ) -> Self {
        let summary = matches!(result, RetrievalResult::Summary { .. });
        let labels = profile.labels(summary);
        let lines = result
            .display_strings()
            .into_iter()
            .enumerate()
            .map(|(i, value)| SnapshotLine {
                label: labels
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| profile.balance.label.clone()),
                value,
            })
            .collect();

        Self {
            title: TITLE.to_string(),
            lines,
            failed: result.is_failure(),
            generated_at: now,
            refresh_after: schedule.next_refresh(now),
        }
    }
}
