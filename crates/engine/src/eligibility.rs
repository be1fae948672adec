//! Campaign eligibility.
//!
//! Filters a campaign set down to the campaigns that may be shown for a
//! signal: triggered, inside their validity window, under every cap and
//! outside quiet hours. Survivors come back sorted by priority.

use std::sync::Arc;

use herald_expr::{
    CachingContext, EventContext, Evaluator, MetaContext, NativeAttributeContext,
    NativeAttributes, UserAttributeContext, UserAttributeSource,
};

use time::PrimitiveDateTime;

use crate::campaign::{Campaign, CampaignSet, Capping};
use crate::clock::DateProvider;
use crate::signal::Signal;
use crate::tracker::{ViewEventKey, ViewKind, ViewTracker};

pub struct EligibilityEngine {
    clock: Arc<dyn DateProvider>,
    tracker: Arc<dyn ViewTracker>,
    evaluator: Evaluator,
    native: NativeAttributes,
    user: Arc<dyn UserAttributeSource + Send + Sync>,
    user_id: Option<String>,
}

impl EligibilityEngine {
    pub fn new(
        clock: Arc<dyn DateProvider>,
        tracker: Arc<dyn ViewTracker>,
        native: NativeAttributes,
        user: Arc<dyn UserAttributeSource + Send + Sync>,
    ) -> Self {
        EligibilityEngine {
            clock,
            tracker,
            evaluator: Evaluator::default(),
            native,
            user,
            user_id: None,
        }
    }

    /// Replaces the built-in operator set.
    pub fn with_evaluator(mut self, evaluator: Evaluator) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// External user id the tracker rows are keyed by.
    pub fn with_user_id(mut self, user_id: Option<String>) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn user(&self) -> &(dyn UserAttributeSource + Send + Sync) {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: Arc<dyn UserAttributeSource + Send + Sync>) {
        self.user = user;
    }

    pub fn eligible_campaigns<'s>(&self, set: &'s CampaignSet, signal: &Signal) -> Vec<&'s Campaign> {
        let now = self.clock.now();

        let mut chain = MetaContext::new();
        if let Some(event) = signal.event() {
            chain.push(EventContext::new(event));
        }
        chain.push(NativeAttributeContext::new(&self.native));
        chain.push(UserAttributeContext::new(self.user.as_ref()));
        let mut ctx = CachingContext::new(chain);

        let capping = set.capping.as_ref();
        let mut eligible: Vec<&Campaign> = set
            .campaigns
            .iter()
            .filter(|c| c.is_within_validity(now))
            .filter(|c| {
                c.triggers
                    .iter()
                    .any(|t| t.is_satisfied(signal, &self.evaluator, &mut ctx))
            })
            .filter(|c| {
                let over = self.is_over_capping(capping, c);
                if over {
                    tracing::debug!(campaign = %c.id, "campaign over capping");
                }
                !over
            })
            .filter(|c| {
                let quiet = self.is_in_quiet_hours(c);
                if quiet {
                    tracing::debug!(campaign = %c.id, "campaign in quiet hours");
                }
                !quiet
            })
            .collect();

        sort_by_priority(&mut eligible);
        tracing::debug!(
            signal = signal.kind_name(),
            eligible = eligible.len(),
            "evaluated campaign eligibility"
        );
        eligible
    }

    /// Global caps first, then the campaign's own view cap and display
    /// interval. Any single violated rule is enough.
    pub fn is_over_capping(&self, capping: Option<&Capping>, campaign: &Campaign) -> bool {
        if capping.is_some_and(|c| self.is_over_global_capping(c)) {
            return true;
        }

        let needs_row = campaign.max_views.is_some() || campaign.min_display_interval.is_positive();
        if !needs_row {
            return false;
        }
        let info = self.tracker.event_info(&ViewEventKey::new(
            campaign.id.clone(),
            ViewKind::View,
            campaign.format,
            self.user_id.as_deref(),
        ));
        if let Some(max) = campaign.max_views {
            if info.count >= max as u64 {
                return true;
            }
        }
        if campaign.min_display_interval.is_positive() {
            if let Some(last) = info.last_occurrence {
                if self.clock.now() - last < campaign.min_display_interval {
                    return true;
                }
            }
        }
        false
    }

    pub fn is_over_global_capping(&self, capping: &Capping) -> bool {
        if let Some(limit) = capping.session_limit() {
            if self.tracker.session_view_count() >= limit as u64 {
                return true;
            }
        }
        let now = self.clock.now();
        capping.time_windows().iter().any(|w| {
            // A window reaching past the representable range covers all history.
            let since = now
                .checked_sub(w.window)
                .unwrap_or_else(|| PrimitiveDateTime::MIN.assume_utc());
            self.tracker.count_events_since(since) >= w.max_views as u64
        })
    }

    pub fn is_in_quiet_hours(&self, campaign: &Campaign) -> bool {
        campaign
            .quiet_hours
            .as_ref()
            .is_some_and(|q| q.contains(self.clock.now()))
    }
}

/// Stable sort, highest priority first.
pub fn sort_by_priority(campaigns: &mut [&Campaign]) {
    campaigns.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Campaigns that need a JIT round-trip, in their original order.
pub fn first_eligible_requiring_sync<'a>(campaigns: &[&'a Campaign]) -> Vec<&'a Campaign> {
    campaigns
        .iter()
        .copied()
        .filter(|c| c.requires_jit_sync)
        .collect()
}

pub fn first_not_requiring_sync<'a>(campaigns: &[&'a Campaign]) -> Option<&'a Campaign> {
    campaigns.iter().copied().find(|c| !c.requires_jit_sync)
}
