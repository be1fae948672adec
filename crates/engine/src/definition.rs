//! Campaign set definitions.
//!
//! Decodes the JSON shipped by the campaign backend into a [`CampaignSet`].
//! The document shape:
//!
//! ```json
//! {
//!   "capping": { "session": 2, "time": [{ "views": 1, "duration": 3600 }] },
//!   "campaigns": [{
//!     "id": "spring-sale",
//!     "priority": 10,
//!     "format": "current",
//!     "triggers": [{ "type": "event", "name": "OPEN", "label": "home" }],
//!     "quietHours": { "start": "22:00", "end": "07:30", "days": [0, 6] },
//!     "minDisplayInterval": 600,
//!     "maxViews": 3,
//!     "startsAt": "2024-03-01T00:00:00Z",
//!     "requiresJitSync": false,
//!     "payload": {}
//!   }]
//! }
//! ```
//!
//! A malformed document is an error. A malformed campaign inside a valid
//! document is logged and skipped so one bad entry cannot block the set.

use std::collections::HashSet;

use serde::Deserialize;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};

use crate::campaign::{Campaign, CampaignFormat, CampaignSet, Capping, TimeWindowCap};
use crate::error::EngineError;
use crate::quiet_hours::{QuietHours, TimeOfDay};
use crate::trigger::Trigger;

// ──────────────────────────────────────────────
// Wire shapes
// ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawCampaignSet {
    #[serde(default)]
    capping: Option<RawCapping>,
    #[serde(default)]
    campaigns: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RawCapping {
    #[serde(default)]
    session: Option<u32>,
    #[serde(default)]
    time: Vec<RawTimeWindow>,
}

#[derive(Debug, Deserialize)]
struct RawTimeWindow {
    views: u32,
    /// Seconds.
    duration: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCampaign {
    id: String,
    #[serde(default)]
    priority: i64,
    #[serde(default)]
    format: CampaignFormat,
    #[serde(default)]
    triggers: Vec<RawTrigger>,
    #[serde(default)]
    quiet_hours: Option<RawQuietHours>,
    #[serde(default)]
    min_display_interval: u64,
    #[serde(default)]
    max_views: Option<u32>,
    #[serde(default)]
    starts_at: Option<String>,
    #[serde(default)]
    ends_at: Option<String>,
    #[serde(default)]
    requires_jit_sync: bool,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawTrigger {
    Event {
        name: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        attributes: Option<serde_json::Value>,
    },
    NextSession,
    SessionStart,
    CampaignsRefreshed,
    Condition {
        #[serde(default)]
        event: Option<String>,
        rule: String,
    },
}

#[derive(Debug, Deserialize)]
struct RawQuietHours {
    start: String,
    end: String,
    #[serde(default)]
    days: Vec<u8>,
}

// ──────────────────────────────────────────────
// Conversion
// ──────────────────────────────────────────────

impl CampaignSet {
    pub fn from_json_str(src: &str) -> Result<Self, EngineError> {
        let value: serde_json::Value = serde_json::from_str(src)
            .map_err(|e| EngineError::definition(format!("not valid JSON: {}", e)))?;
        Self::from_json(value)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, EngineError> {
        let raw: RawCampaignSet = serde_json::from_value(value)
            .map_err(|e| EngineError::definition(e.to_string()))?;

        let capping = raw.capping.map(|c| {
            Capping::new(
                c.session,
                c.time.into_iter().map(|w| TimeWindowCap {
                    max_views: w.views,
                    window: Duration::seconds(w.duration),
                }),
            )
        });

        let mut seen = HashSet::new();
        let mut campaigns = Vec::with_capacity(raw.campaigns.len());
        for (index, entry) in raw.campaigns.into_iter().enumerate() {
            match decode_campaign(entry) {
                Ok(campaign) => {
                    if !seen.insert(campaign.id.clone()) {
                        tracing::warn!(id = %campaign.id, "duplicate campaign id, keeping the first");
                        continue;
                    }
                    campaigns.push(campaign);
                }
                Err(e) => {
                    tracing::warn!(index, error = %e, "skipping invalid campaign");
                }
            }
        }

        tracing::debug!(count = campaigns.len(), "decoded campaign set");
        Ok(CampaignSet::new(campaigns, capping))
    }
}

fn decode_campaign(entry: serde_json::Value) -> Result<Campaign, EngineError> {
    let raw: RawCampaign =
        serde_json::from_value(entry).map_err(|e| EngineError::definition(e.to_string()))?;
    if raw.id.is_empty() {
        return Err(EngineError::definition("campaign id is empty"));
    }

    let quiet_hours = match raw.quiet_hours {
        Some(q) if q.days.iter().any(|d| *d > 6) => {
            return Err(EngineError::definition(format!(
                "quietHours days must be 0-6, got {:?}",
                q.days
            )));
        }
        Some(q) => Some(QuietHours::new(
            TimeOfDay::parse(&q.start)?,
            TimeOfDay::parse(&q.end)?,
            q.days,
        )),
        None => None,
    };

    let triggers = raw
        .triggers
        .into_iter()
        .map(|t| match t {
            RawTrigger::Event {
                name,
                label,
                attributes,
            } => Trigger::Event {
                name,
                label,
                attributes,
            },
            RawTrigger::NextSession => Trigger::NextSession,
            RawTrigger::SessionStart => Trigger::SessionStart,
            RawTrigger::CampaignsRefreshed => Trigger::CampaignsRefreshed,
            RawTrigger::Condition { event, rule } => Trigger::condition(event.as_deref(), &rule),
        })
        .collect();

    let min_display_interval = i64::try_from(raw.min_display_interval)
        .map(Duration::seconds)
        .map_err(|_| EngineError::definition("minDisplayInterval out of range"))?;

    Ok(Campaign {
        id: raw.id,
        priority: raw.priority,
        format: raw.format,
        triggers,
        quiet_hours,
        min_display_interval,
        max_views: raw.max_views,
        starts_at: raw.starts_at.as_deref().map(parse_timestamp).transpose()?,
        ends_at: raw.ends_at.as_deref().map(parse_timestamp).transpose()?,
        requires_jit_sync: raw.requires_jit_sync,
        display_payload: raw.payload,
    })
}

fn parse_timestamp(s: &str) -> Result<OffsetDateTime, EngineError> {
    OffsetDateTime::parse(s, &Rfc3339)
        .map_err(|e| EngineError::definition(format!("invalid timestamp '{}': {}", s, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    #[test]
    fn decodes_full_campaign() {
        let set = CampaignSet::from_json(json!({
            "capping": {"session": 2, "time": [{"views": 1, "duration": 3600}, {"views": 0, "duration": 60}]},
            "campaigns": [{
                "id": "spring",
                "priority": 10,
                "format": "legacy",
                "triggers": [
                    {"type": "event", "name": "OPEN", "label": "home"},
                    {"type": "next_session"},
                    {"type": "condition", "rule": "(= `c.plan` \"pro\")"}
                ],
                "quietHours": {"start": "22:00", "end": "07:30", "days": [0, 6]},
                "minDisplayInterval": 600,
                "maxViews": 3,
                "startsAt": "2024-03-01T00:00:00Z",
                "endsAt": "2024-04-01T00:00:00+02:00",
                "requiresJitSync": true,
                "payload": {"title": "Spring"}
            }]
        }))
        .unwrap();

        let capping = set.capping.as_ref().unwrap();
        assert_eq!(capping.session_limit(), Some(2));
        assert_eq!(capping.time_windows().len(), 1);

        let c = &set.campaigns[0];
        assert_eq!(c.id, "spring");
        assert_eq!(c.format, CampaignFormat::Legacy);
        assert_eq!(c.triggers.len(), 3);
        assert!(matches!(c.triggers[2], Trigger::Condition { .. }));
        assert_eq!(c.min_display_interval, Duration::minutes(10));
        assert_eq!(c.max_views, Some(3));
        assert_eq!(c.starts_at, Some(datetime!(2024-03-01 0:00 UTC)));
        assert_eq!(c.ends_at, Some(datetime!(2024-04-01 0:00 +02:00)));
        assert!(c.requires_jit_sync);
        assert_eq!(c.display_payload, json!({"title": "Spring"}));
        let q = c.quiet_hours.as_ref().unwrap();
        assert_eq!((q.start().hour(), q.end().minute()), (22, 30));
    }

    #[test]
    fn minimal_campaign_uses_defaults() {
        let set = CampaignSet::from_json_str(r#"{"campaigns": [{"id": "a"}]}"#).unwrap();
        let c = &set.campaigns[0];
        assert_eq!(c.priority, 0);
        assert_eq!(c.format, CampaignFormat::Current);
        assert!(c.triggers.is_empty());
        assert!(!c.requires_jit_sync);
        assert!(set.capping.is_none());
    }

    #[test]
    fn invalid_campaigns_are_skipped() {
        let set = CampaignSet::from_json(json!({
            "campaigns": [
                {"id": "ok"},
                {"priority": 3},
                {"id": "bad-hours", "quietHours": {"start": "25:00", "end": "07:00"}},
                {"id": "bad-days", "quietHours": {"start": "22:00", "end": "07:00", "days": [9]}},
                {"id": "bad-trigger", "triggers": [{"type": "teleport"}]},
                {"id": "bad-date", "startsAt": "yesterday"},
                {"id": "ok"}
            ]
        }))
        .unwrap();
        let ids: Vec<_> = set.campaigns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn unparsable_rule_becomes_never() {
        let set = CampaignSet::from_json(json!({
            "campaigns": [{"id": "a", "triggers": [{"type": "condition", "rule": "(and true"}]}]
        }))
        .unwrap();
        assert!(matches!(set.campaigns[0].triggers[0], Trigger::Never { .. }));
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(CampaignSet::from_json_str("not json").is_err());
        assert!(CampaignSet::from_json(json!({"campaigns": 3})).is_err());
    }
}
