//! JIT request and response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::JitError;
use crate::campaign::{Campaign, CampaignFormat};
use crate::tracker::EventInfo;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_user_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewCount {
    pub count: u64,
    /// Seconds since the last view; absent when never viewed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JitRequest {
    /// Selects the endpoint; not part of the body.
    #[serde(skip)]
    pub format: CampaignFormat,
    pub ids: DeviceIds,
    pub campaigns: Vec<String>,
    pub views: BTreeMap<String, ViewCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<serde_json::Value>,
}

impl JitRequest {
    /// `attributes` is only sent for [`CampaignFormat::Legacy`].
    pub fn build(
        format: CampaignFormat,
        ids: &DeviceIds,
        campaigns: &[&Campaign],
        views: &BTreeMap<String, EventInfo>,
        attributes: Option<serde_json::Value>,
        now: OffsetDateTime,
    ) -> Self {
        let views = campaigns
            .iter()
            .map(|c| {
                let info = views.get(&c.id).copied().unwrap_or_default();
                let count = ViewCount {
                    count: info.count,
                    duration: info.last_occurrence.map(|at| (now - at).whole_seconds()),
                };
                (c.id.clone(), count)
            })
            .collect();

        JitRequest {
            format,
            ids: ids.clone(),
            campaigns: campaigns.iter().map(|c| c.id.clone()).collect(),
            views,
            attributes: match format {
                CampaignFormat::Legacy => attributes,
                CampaignFormat::Current => None,
            },
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        // A struct of strings, integers and JSON values always serializes.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JitResponse {
    eligible_campaigns: Vec<String>,
}

/// Extracts the confirmed campaign ids from a response body.
pub fn parse_response(body: &str) -> Result<Vec<String>, JitError> {
    if body.trim().is_empty() {
        return Err(JitError::Format {
            message: "empty body".to_string(),
        });
    }
    serde_json::from_str::<JitResponse>(body)
        .map(|r| r.eligible_campaigns)
        .map_err(|e| JitError::Format {
            message: e.to_string(),
        })
}
