//! Campaign scheduler.
//!
//! Owns the active campaign set and turns signals into at most one
//! campaign to display, confirming JIT campaigns with the backend when
//! they outrank everything that can be shown without a round-trip.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use herald_expr::UserAttributeSource;
use herald_storage::{JsonFileStore, KeyValueStore, MemoryStore};

use crate::campaign::{Campaign, CampaignSet};
use crate::clock::{DateProvider, SystemDateProvider};
use crate::config::EngineConfig;
use crate::eligibility::{first_eligible_requiring_sync, first_not_requiring_sync, EligibilityEngine};
use crate::error::EngineError;
use crate::jit::{JitSyncClient, JitTransport, SyncedState};
use crate::signal::Signal;
use crate::tracker::{EventInfo, StoredViewTracker, ViewEventKey, ViewKind, ViewTracker};

pub struct CampaignScheduler {
    campaigns: CampaignSet,
    engine: EligibilityEngine,
    tracker: Arc<dyn ViewTracker>,
    jit: Option<JitSyncClient>,
}

impl CampaignScheduler {
    pub fn new(engine: EligibilityEngine, tracker: Arc<dyn ViewTracker>) -> Self {
        CampaignScheduler {
            campaigns: CampaignSet::default(),
            engine,
            tracker,
            jit: None,
        }
    }

    /// Without a JIT client, campaigns that require a sync are never shown.
    pub fn with_jit(mut self, client: JitSyncClient) -> Self {
        self.jit = Some(client);
        self
    }

    /// Wires a scheduler from configuration: the state store, tracker,
    /// eligibility engine and, when a transport is given, the JIT client.
    pub fn from_config(
        config: &EngineConfig,
        user: Arc<dyn UserAttributeSource + Send + Sync>,
        transport: Option<Arc<dyn JitTransport>>,
    ) -> Result<Self, EngineError> {
        let clock: Arc<dyn DateProvider> = Arc::new(SystemDateProvider::new(config.utc_offset()?));
        Self::from_config_with_clock(config, clock, user, transport)
    }

    pub fn from_config_with_clock(
        config: &EngineConfig,
        clock: Arc<dyn DateProvider>,
        user: Arc<dyn UserAttributeSource + Send + Sync>,
        transport: Option<Arc<dyn JitTransport>>,
    ) -> Result<Self, EngineError> {
        let store: Arc<dyn KeyValueStore> = match &config.store_path {
            Some(path) => Arc::new(JsonFileStore::open(path)?),
            None => Arc::new(MemoryStore::new()),
        };
        let tracker: Arc<dyn ViewTracker> =
            Arc::new(StoredViewTracker::open(store.clone(), clock.clone())?);
        let engine = EligibilityEngine::new(clock.clone(), tracker.clone(), config.native.clone(), user)
            .with_user_id(config.user_id.clone());

        let mut scheduler = CampaignScheduler::new(engine, tracker);
        if let Some(transport) = transport {
            scheduler = scheduler.with_jit(JitSyncClient::open(
                transport,
                clock,
                store,
                config.jit_settings(),
                config.device_ids(),
            )?);
        }
        Ok(scheduler)
    }

    pub fn campaigns(&self) -> &CampaignSet {
        &self.campaigns
    }

    pub fn engine(&self) -> &EligibilityEngine {
        &self.engine
    }

    pub fn jit(&self) -> Option<&JitSyncClient> {
        self.jit.as_ref()
    }

    pub fn set_user_attributes(&mut self, user: Arc<dyn UserAttributeSource + Send + Sync>) {
        self.engine.set_user(user);
    }

    /// Resets the session view counter and handles the new-session signal.
    pub async fn start_session(&mut self) -> Option<&Campaign> {
        self.tracker.reset_session_counter();
        tracing::info!("session started");
        self.process(&Signal::NewSession).await
    }

    /// Swaps the active set without processing any signal.
    pub fn set_campaigns(&mut self, set: CampaignSet) {
        if let Some(window) = set.capping.as_ref().and_then(|c| c.longest_window()) {
            self.tracker.ensure_retention(window);
        }
        self.campaigns = set;
    }

    /// Activates `set` inside the current session.
    pub async fn load_campaigns(&mut self, set: CampaignSet) -> Option<&Campaign> {
        tracing::info!(count = set.len(), "campaigns loaded");
        self.set_campaigns(set);
        self.process(&Signal::CampaignsLoaded).await
    }

    /// Replaces the active set with a fresher definition.
    pub async fn refresh_campaigns(&mut self, set: CampaignSet) -> Option<&Campaign> {
        tracing::info!(count = set.len(), "campaigns refreshed");
        self.set_campaigns(set);
        self.process(&Signal::CampaignsRefreshed).await
    }

    /// Picks the campaign to display for `signal`, if any.
    pub async fn process(&self, signal: &Signal) -> Option<&Campaign> {
        let eligible = self.engine.eligible_campaigns(&self.campaigns, signal);
        let Some(jit) = &self.jit else {
            return first_not_requiring_sync(&eligible);
        };

        // Everything unsynced ranked above the first showable campaign.
        let mut pending: Vec<&Campaign> = Vec::new();
        let mut fallback = None;
        for campaign in &eligible {
            match jit.synced_state(campaign) {
                SyncedState::Eligible => {
                    fallback = Some(*campaign);
                    break;
                }
                SyncedState::NotEligible => continue,
                SyncedState::RequiresSync => pending.push(*campaign),
            }
        }
        let fallback = fallback.or_else(|| first_not_requiring_sync(&eligible));

        let candidates = first_eligible_requiring_sync(&pending);
        if candidates.is_empty() {
            return fallback;
        }
        if !jit.is_available() {
            tracing::debug!(pending = candidates.len(), "JIT throttled, using fallback");
            return fallback;
        }

        let views = self.view_counts(&candidates);
        let attributes = Some(self.engine.user().snapshot());
        match jit.sync(&candidates, &views, attributes).await {
            Ok(listed) => {
                let listed: BTreeSet<&str> = listed.iter().map(String::as_str).collect();
                let format = candidates[0].format;
                jit.mark_not_eligible(
                    candidates
                        .iter()
                        .filter(|c| c.format == format && !listed.contains(c.id.as_str()))
                        .map(|c| c.id.as_str()),
                );
                candidates
                    .iter()
                    .copied()
                    .find(|c| listed.contains(c.id.as_str()))
                    .or(fallback)
            }
            Err(_) => fallback,
        }
    }

    fn view_counts(&self, campaigns: &[&Campaign]) -> BTreeMap<String, EventInfo> {
        campaigns
            .iter()
            .map(|c| (c.id.clone(), self.tracker.event_info(&self.view_key(c, ViewKind::View))))
            .collect()
    }

    fn view_key(&self, campaign: &Campaign, kind: ViewKind) -> ViewEventKey {
        ViewEventKey::new(campaign.id.clone(), kind, campaign.format, self.engine.user_id())
    }

    /// Records that `campaign` was displayed. Returns its view count.
    pub fn record_display(&self, campaign: &Campaign) -> Result<u64, EngineError> {
        self.record(campaign, ViewKind::View)
    }

    pub fn record(&self, campaign: &Campaign, kind: ViewKind) -> Result<u64, EngineError> {
        self.tracker.track_event(&self.view_key(campaign, kind))
    }
}
