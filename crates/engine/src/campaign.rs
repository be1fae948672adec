//! Campaign model.
//!
//! A [`CampaignSet`] is built once per definition refresh and then held
//! immutable; the scheduler swaps the whole set on the next refresh.

use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::quiet_hours::QuietHours;
use crate::trigger::Trigger;

/// Campaign-format version tag. Selects the JIT request shape and keys
/// tracker rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignFormat {
    Legacy,
    #[default]
    Current,
}

impl CampaignFormat {
    pub fn tag(&self) -> &'static str {
        match self {
            CampaignFormat::Legacy => "legacy",
            CampaignFormat::Current => "current",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Campaign {
    pub id: String,
    /// Higher displays first.
    pub priority: i64,
    pub format: CampaignFormat,
    pub triggers: Vec<Trigger>,
    pub quiet_hours: Option<QuietHours>,
    /// Minimum delay between two views of this campaign. Zero disables it.
    pub min_display_interval: Duration,
    /// Lifetime view cap for this campaign.
    pub max_views: Option<u32>,
    pub starts_at: Option<OffsetDateTime>,
    pub ends_at: Option<OffsetDateTime>,
    pub requires_jit_sync: bool,
    /// Handed untouched to the renderer.
    pub display_payload: serde_json::Value,
}

impl Campaign {
    pub fn new(id: impl Into<String>, priority: i64) -> Self {
        Campaign {
            id: id.into(),
            priority,
            format: CampaignFormat::default(),
            triggers: Vec::new(),
            quiet_hours: None,
            min_display_interval: Duration::ZERO,
            max_views: None,
            starts_at: None,
            ends_at: None,
            requires_jit_sync: false,
            display_payload: serde_json::Value::Null,
        }
    }

    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn with_jit_sync(mut self, requires: bool) -> Self {
        self.requires_jit_sync = requires;
        self
    }

    /// `starts_at` is inclusive, `ends_at` exclusive.
    pub fn is_within_validity(&self, now: OffsetDateTime) -> bool {
        if let Some(start) = self.starts_at {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.ends_at {
            if now >= end {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindowCap {
    pub max_views: u32,
    pub window: Duration,
}

/// Global view caps shared by every campaign in a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capping {
    session_limit: Option<u32>,
    time_windows: Vec<TimeWindowCap>,
}

impl Capping {
    /// Window entries that can never be satisfied (zero views or a
    /// non-positive window) are dropped here.
    pub fn new(session_limit: Option<u32>, windows: impl IntoIterator<Item = TimeWindowCap>) -> Self {
        Capping {
            session_limit,
            time_windows: windows
                .into_iter()
                .filter(|w| w.max_views > 0 && w.window.is_positive())
                .collect(),
        }
    }

    pub fn session_limit(&self) -> Option<u32> {
        self.session_limit
    }

    pub fn time_windows(&self) -> &[TimeWindowCap] {
        &self.time_windows
    }

    pub fn longest_window(&self) -> Option<Duration> {
        self.time_windows.iter().map(|w| w.window).max()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CampaignSet {
    pub campaigns: Vec<Campaign>,
    pub capping: Option<Capping>,
}

impl CampaignSet {
    pub fn new(campaigns: Vec<Campaign>, capping: Option<Capping>) -> Self {
        CampaignSet { campaigns, capping }
    }

    pub fn get(&self, id: &str) -> Option<&Campaign> {
        self.campaigns.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.campaigns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn capping_drops_unsatisfiable_windows() {
        let capping = Capping::new(
            Some(3),
            [
                TimeWindowCap { max_views: 0, window: Duration::hours(1) },
                TimeWindowCap { max_views: 2, window: Duration::ZERO },
                TimeWindowCap { max_views: 1, window: Duration::hours(1) },
            ],
        );
        assert_eq!(capping.time_windows().len(), 1);
        assert_eq!(capping.time_windows()[0].max_views, 1);
        assert_eq!(capping.session_limit(), Some(3));
    }

    #[test]
    fn validity_window_bounds() {
        let mut c = Campaign::new("a", 0);
        c.starts_at = Some(datetime!(2024-01-01 0:00 UTC));
        c.ends_at = Some(datetime!(2024-02-01 0:00 UTC));
        assert!(!c.is_within_validity(datetime!(2023-12-31 23:59 UTC)));
        assert!(c.is_within_validity(datetime!(2024-01-01 0:00 UTC)));
        assert!(!c.is_within_validity(datetime!(2024-02-01 0:00 UTC)));
        assert!(Campaign::new("b", 0).is_within_validity(datetime!(1999-01-01 0:00 UTC)));
    }
}
