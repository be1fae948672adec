use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use herald_storage::{load, save, KeyValueStore};
use time::{Duration, OffsetDateTime};

use super::cache::{JitCache, PersistedResult, SyncedJitResult};
use super::protocol::{parse_response, DeviceIds, JitRequest};
use super::transport::JitTransport;
use super::JitError;
use crate::campaign::Campaign;
use crate::clock::{from_unix_ms, to_unix_ms, DateProvider};
use crate::error::EngineError;
use crate::tracker::EventInfo;

pub const CACHE_KEY: &str = "jit.cache";
pub const NEXT_ALLOWED_KEY: &str = "jit.next_allowed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncedState {
    Eligible,
    NotEligible,
    RequiresSync,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitSettings {
    /// How long a cached answer stays valid.
    pub ttl: Duration,
    /// Delay after the first consecutive failure; doubles per failure.
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for JitSettings {
    fn default() -> Self {
        JitSettings {
            ttl: Duration::seconds(30),
            backoff_base: Duration::seconds(10),
            backoff_max: Duration::minutes(10),
        }
    }
}

impl JitSettings {
    /// Delay applied after `failures` consecutive failures (1-based).
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(30);
        let delay = self
            .backoff_base
            .checked_mul(1i32 << exponent)
            .unwrap_or(self.backoff_max);
        delay.min(self.backoff_max)
    }
}

#[derive(Debug, Default)]
struct JitState {
    cache: JitCache,
    next_allowed: Option<OffsetDateTime>,
    failures: u32,
}

/// Confirms campaign eligibility with the backend and caches the answers.
///
/// The cache and throttle state sit behind one mutex that is released
/// before the transport is awaited.
pub struct JitSyncClient {
    transport: Arc<dyn JitTransport>,
    clock: Arc<dyn DateProvider>,
    store: Arc<dyn KeyValueStore>,
    settings: JitSettings,
    ids: DeviceIds,
    state: Mutex<JitState>,
}

impl JitSyncClient {
    /// Restores the cache and throttle timestamp from `store`.
    pub fn open(
        transport: Arc<dyn JitTransport>,
        clock: Arc<dyn DateProvider>,
        store: Arc<dyn KeyValueStore>,
        settings: JitSettings,
        ids: DeviceIds,
    ) -> Result<Self, EngineError> {
        let cache: BTreeMap<String, PersistedResult> =
            load(store.as_ref(), CACHE_KEY)?.unwrap_or_default();
        let next_allowed: Option<i64> = load(store.as_ref(), NEXT_ALLOWED_KEY)?;
        tracing::debug!(entries = cache.len(), "restored JIT cache");

        Ok(JitSyncClient {
            transport,
            clock,
            store,
            settings,
            ids,
            state: Mutex::new(JitState {
                cache: JitCache::from_persisted(cache),
                next_allowed: next_allowed.map(from_unix_ms),
                failures: 0,
            }),
        })
    }

    pub fn settings(&self) -> &JitSettings {
        &self.settings
    }

    fn lock(&self) -> MutexGuard<'_, JitState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn synced_state(&self, campaign: &Campaign) -> SyncedState {
        if !campaign.requires_jit_sync {
            return SyncedState::Eligible;
        }
        let now = self.clock.now();
        match self.lock().cache.get(&campaign.id) {
            None => SyncedState::RequiresSync,
            Some(entry) if now - entry.timestamp < self.settings.ttl => {
                if entry.eligible {
                    SyncedState::Eligible
                } else {
                    SyncedState::NotEligible
                }
            }
            Some(_) => SyncedState::RequiresSync,
        }
    }

    pub fn is_available(&self) -> bool {
        let now = self.clock.now();
        self.lock().next_allowed.map_or(true, |at| now >= at)
    }

    pub fn next_allowed(&self) -> Option<OffsetDateTime> {
        self.lock().next_allowed
    }

    /// Number of consecutive failed syncs.
    pub fn failure_streak(&self) -> u32 {
        self.lock().failures
    }

    /// Asks the backend which of `campaigns` may be shown and returns the
    /// confirmed ids. Listed ids are cached as eligible; unlisted ids are
    /// left alone.
    ///
    /// The request shape follows the first campaign's format. Campaigns of
    /// another format are not sent and stay unsynced.
    pub async fn sync(
        &self,
        campaigns: &[&Campaign],
        views: &BTreeMap<String, EventInfo>,
        attributes: Option<serde_json::Value>,
    ) -> Result<Vec<String>, JitError> {
        let Some(first) = campaigns.first() else {
            return Ok(Vec::new());
        };
        {
            let state = self.lock();
            if let Some(until) = state.next_allowed {
                if self.clock.now() < until {
                    return Err(JitError::Throttled { until });
                }
            }
        }

        let format = first.format;
        let batch: Vec<&Campaign> = campaigns
            .iter()
            .copied()
            .filter(|c| c.format == format)
            .collect();
        if batch.len() < campaigns.len() {
            tracing::debug!(
                format = format.tag(),
                skipped = campaigns.len() - batch.len(),
                "leaving campaigns of another format for a later sync"
            );
        }

        let request = JitRequest::build(format, &self.ids, &batch, views, attributes, self.clock.now());
        let outcome = match self.transport.send(&request).await {
            Ok(body) => parse_response(&body),
            Err(e) => Err(JitError::from(e)),
        };

        match outcome {
            Ok(eligible) => {
                let now = self.clock.now();
                let mut state = self.lock();
                state.failures = 0;
                for id in &eligible {
                    state.cache.insert(
                        id.clone(),
                        SyncedJitResult {
                            timestamp: now,
                            eligible: true,
                        },
                    );
                }
                self.persist_cache(&state.cache);
                tracing::info!(
                    requested = batch.len(),
                    eligible = eligible.len(),
                    "JIT sync succeeded"
                );
                Ok(eligible)
            }
            Err(e) => {
                let retry_after = match &e {
                    JitError::Transport { retry_after, .. } => *retry_after,
                    _ => None,
                };
                let until = self.record_failure(retry_after);
                tracing::warn!(error = %e, %until, "JIT sync failed");
                Err(e)
            }
        }
    }

    /// Caches `ids` as not eligible as of now.
    pub fn mark_not_eligible<'a>(&self, ids: impl IntoIterator<Item = &'a str>) {
        let now = self.clock.now();
        let mut state = self.lock();
        let mut marked = BTreeSet::new();
        for id in ids {
            state.cache.insert(
                id,
                SyncedJitResult {
                    timestamp: now,
                    eligible: false,
                },
            );
            marked.insert(id);
        }
        if !marked.is_empty() {
            tracing::debug!(ids = ?marked, "marked campaigns not eligible");
            self.persist_cache(&state.cache);
        }
    }

    fn record_failure(&self, retry_after: Option<Duration>) -> OffsetDateTime {
        let mut state = self.lock();
        state.failures = state.failures.saturating_add(1);
        let delay = retry_after.unwrap_or_else(|| self.settings.backoff_for(state.failures));
        let until = self.clock.now() + delay;
        state.next_allowed = Some(until);
        if let Err(e) = save(self.store.as_ref(), NEXT_ALLOWED_KEY, &to_unix_ms(until)) {
            tracing::warn!(error = %e, "failed to persist JIT throttle");
        }
        until
    }

    fn persist_cache(&self, cache: &JitCache) {
        if let Err(e) = save(self.store.as_ref(), CACHE_KEY, &cache.to_persisted()) {
            tracing::warn!(error = %e, "failed to persist JIT cache");
        }
    }
}
