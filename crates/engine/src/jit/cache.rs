use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::clock::{from_unix_ms, to_unix_ms};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncedJitResult {
    pub timestamp: OffsetDateTime,
    pub eligible: bool,
}

/// Latest JIT answer per campaign id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JitCache {
    entries: HashMap<String, SyncedJitResult>,
}

impl JitCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the entry for `campaign_id` unless the stored one is newer.
    pub fn insert(&mut self, campaign_id: impl Into<String>, result: SyncedJitResult) {
        let campaign_id = campaign_id.into();
        match self.entries.get(&campaign_id) {
            Some(existing) if existing.timestamp > result.timestamp => {}
            _ => {
                self.entries.insert(campaign_id, result);
            }
        }
    }

    pub fn get(&self, campaign_id: &str) -> Option<&SyncedJitResult> {
        self.entries.get(campaign_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn to_persisted(&self) -> BTreeMap<String, PersistedResult> {
        self.entries
            .iter()
            .map(|(id, r)| {
                (
                    id.clone(),
                    PersistedResult {
                        timestamp_ms: to_unix_ms(r.timestamp),
                        eligible: r.eligible,
                    },
                )
            })
            .collect()
    }

    pub(crate) fn from_persisted(persisted: BTreeMap<String, PersistedResult>) -> Self {
        JitCache {
            entries: persisted
                .into_iter()
                .map(|(id, p)| {
                    (
                        id,
                        SyncedJitResult {
                            timestamp: from_unix_ms(p.timestamp_ms),
                            eligible: p.eligible,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct PersistedResult {
    timestamp_ms: i64,
    eligible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn newer_entries_win() {
        let mut cache = JitCache::new();
        let t0 = datetime!(2024-03-04 12:00 UTC);
        let t1 = datetime!(2024-03-04 12:01 UTC);

        cache.insert("a", SyncedJitResult { timestamp: t1, eligible: true });
        cache.insert("a", SyncedJitResult { timestamp: t0, eligible: false });
        assert!(cache.get("a").unwrap().eligible);

        cache.insert("a", SyncedJitResult { timestamp: t1, eligible: false });
        assert!(!cache.get("a").unwrap().eligible);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn persisted_form_keeps_entries() {
        let mut cache = JitCache::new();
        cache.insert(
            "a",
            SyncedJitResult {
                timestamp: datetime!(2024-03-04 12:00:00.5 UTC),
                eligible: true,
            },
        );
        assert_eq!(JitCache::from_persisted(cache.to_persisted()), cache);
    }
}
