//! View tracking.
//!
//! Counts how often each campaign was viewed, clicked or closed, and keeps
//! a timestamped history of views for the global time-window caps. The
//! session counter lives in memory only and is reset at session start.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use herald_storage::{load, save, KeyValueStore};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::campaign::CampaignFormat;
use crate::clock::{from_unix_ms, to_unix_ms, DateProvider};
use crate::error::EngineError;

pub const ROWS_KEY: &str = "tracker.rows";
pub const HISTORY_KEY: &str = "tracker.history";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    View,
    Click,
    Close,
}

/// Identity of one counter row. Each distinct key counts independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewEventKey {
    pub campaign_id: String,
    pub kind: ViewKind,
    pub format: CampaignFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl ViewEventKey {
    pub fn new(
        campaign_id: impl Into<String>,
        kind: ViewKind,
        format: CampaignFormat,
        user_id: Option<&str>,
    ) -> Self {
        ViewEventKey {
            campaign_id: campaign_id.into(),
            kind,
            format,
            user_id: user_id.map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventInfo {
    pub count: u64,
    pub last_occurrence: Option<OffsetDateTime>,
}

pub trait ViewTracker: Send + Sync {
    /// Records one occurrence and returns the row's new count. Views also
    /// bump the session counter and the time-window history.
    fn track_event(&self, key: &ViewEventKey) -> Result<u64, EngineError>;

    /// Views of any campaign recorded strictly after `since`.
    fn count_events_since(&self, since: OffsetDateTime) -> u64;

    fn event_info(&self, key: &ViewEventKey) -> EventInfo;

    fn reset_session_counter(&self);

    fn session_view_count(&self) -> u64;

    /// Keeps view history for at least `window`, so caps over that window
    /// see every view.
    fn ensure_retention(&self, window: Duration);
}

// ──────────────────────────────────────────────
// Persisted form
// ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedRow {
    #[serde(flatten)]
    key: ViewEventKey,
    count: u64,
    last_occurrence_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedView {
    campaign_id: String,
    at_ms: i64,
}

#[derive(Debug)]
struct TrackerState {
    rows: BTreeMap<ViewEventKey, (u64, i64)>,
    history: Vec<PersistedView>,
    session_views: u64,
    retention: Duration,
}

fn persisted_rows(rows: &BTreeMap<ViewEventKey, (u64, i64)>) -> Vec<PersistedRow> {
    rows.iter()
        .map(|(key, (count, last))| PersistedRow {
            key: key.clone(),
            count: *count,
            last_occurrence_ms: *last,
        })
        .collect()
}

// ──────────────────────────────────────────────
// StoredViewTracker
// ──────────────────────────────────────────────

/// Tracker persisted through a [`KeyValueStore`].
pub struct StoredViewTracker {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn DateProvider>,
    state: Mutex<TrackerState>,
}

impl StoredViewTracker {
    /// View history older than this is pruned on write, unless a longer
    /// window is requested through [`ViewTracker::ensure_retention`].
    pub const DEFAULT_RETENTION: Duration = Duration::days(90);

    pub fn open(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn DateProvider>,
    ) -> Result<Self, EngineError> {
        let rows: Vec<PersistedRow> = load(store.as_ref(), ROWS_KEY)?.unwrap_or_default();
        let history: Vec<PersistedView> = load(store.as_ref(), HISTORY_KEY)?.unwrap_or_default();
        tracing::debug!(rows = rows.len(), history = history.len(), "restored view tracker");

        let state = TrackerState {
            rows: rows
                .into_iter()
                .map(|r| (r.key, (r.count, r.last_occurrence_ms)))
                .collect(),
            history,
            session_views: 0,
            retention: Self::DEFAULT_RETENTION,
        };
        Ok(StoredViewTracker {
            store,
            clock,
            state: Mutex::new(state),
        })
    }

    pub fn with_retention(self, retention: Duration) -> Self {
        self.lock().retention = retention;
        self
    }

    pub fn retention(&self) -> Duration {
        self.lock().retention
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Writes `rows` and `history`. If the history write fails the
    /// previous rows are written back so the store stays consistent.
    fn persist(
        &self,
        previous: &BTreeMap<ViewEventKey, (u64, i64)>,
        rows: &BTreeMap<ViewEventKey, (u64, i64)>,
        history: &[PersistedView],
    ) -> Result<(), EngineError> {
        save(self.store.as_ref(), ROWS_KEY, &persisted_rows(rows))?;
        if let Err(e) = save(self.store.as_ref(), HISTORY_KEY, &history) {
            if let Err(restore) = save(self.store.as_ref(), ROWS_KEY, &persisted_rows(previous)) {
                tracing::warn!(error = %restore, "failed to restore tracker rows");
            }
            return Err(e.into());
        }
        Ok(())
    }
}

impl ViewTracker for StoredViewTracker {
    fn track_event(&self, key: &ViewEventKey) -> Result<u64, EngineError> {
        let now_ms = to_unix_ms(self.clock.now());
        let mut state = self.lock();

        // Changes are staged and only committed once the store accepted them.
        let mut rows = state.rows.clone();
        let row = rows.entry(key.clone()).or_insert((0, now_ms));
        row.0 += 1;
        row.1 = now_ms;
        let count = row.0;

        let is_view = key.kind == ViewKind::View;
        let history = if is_view {
            let retention_ms =
                i64::try_from(state.retention.whole_milliseconds()).unwrap_or(i64::MAX);
            let cutoff = now_ms.saturating_sub(retention_ms);
            let mut history: Vec<PersistedView> = state
                .history
                .iter()
                .filter(|v| v.at_ms >= cutoff)
                .cloned()
                .collect();
            history.push(PersistedView {
                campaign_id: key.campaign_id.clone(),
                at_ms: now_ms,
            });
            history
        } else {
            state.history.clone()
        };

        self.persist(&state.rows, &rows, &history)?;
        state.rows = rows;
        state.history = history;
        if is_view {
            state.session_views += 1;
        }

        tracing::debug!(
            campaign = %key.campaign_id,
            kind = ?key.kind,
            count,
            "tracked campaign event"
        );
        Ok(count)
    }

    fn count_events_since(&self, since: OffsetDateTime) -> u64 {
        let since_ms = to_unix_ms(since);
        self.lock()
            .history
            .iter()
            .filter(|v| v.at_ms > since_ms)
            .count() as u64
    }

    fn event_info(&self, key: &ViewEventKey) -> EventInfo {
        match self.lock().rows.get(key) {
            Some((count, last)) => EventInfo {
                count: *count,
                last_occurrence: Some(from_unix_ms(*last)),
            },
            None => EventInfo::default(),
        }
    }

    fn reset_session_counter(&self) {
        self.lock().session_views = 0;
    }

    fn session_view_count(&self) -> u64 {
        self.lock().session_views
    }

    fn ensure_retention(&self, window: Duration) {
        let mut state = self.lock();
        if window > state.retention {
            tracing::debug!(days = window.whole_days(), "extending view history retention");
            state.retention = window;
        }
    }
}
