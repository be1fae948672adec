//! Herald campaign targeting engine.
//!
//! Decides, for each incoming [`Signal`], which in-app campaign (if any)
//! should be displayed. Campaigns are matched by their triggers, filtered
//! by view capping and quiet hours, ranked by priority and, when flagged,
//! confirmed with the backend through a [`JitSyncClient`].
//!
//! ```
//! use herald_engine::{CampaignSet, Signal};
//!
//! let set = CampaignSet::from_json_str(r#"{
//!     "campaigns": [{"id": "welcome", "triggers": [{"type": "next_session"}]}]
//! }"#).unwrap();
//! assert_eq!(set.len(), 1);
//! assert_eq!(Signal::NewSession.kind_name(), "new_session");
//! ```

pub mod campaign;
pub mod clock;
pub mod config;
pub mod definition;
pub mod eligibility;
pub mod error;
pub mod jit;
pub mod quiet_hours;
pub mod scheduler;
pub mod signal;
pub mod tracker;
pub mod trigger;

pub use campaign::{Campaign, CampaignFormat, CampaignSet, Capping, TimeWindowCap};
pub use clock::{DateProvider, FakeDateProvider, SystemDateProvider};
pub use config::{EngineConfig, JitConfig};
pub use eligibility::{
    first_eligible_requiring_sync, first_not_requiring_sync, sort_by_priority, EligibilityEngine,
};
pub use error::EngineError;
pub use jit::{JitError, JitSettings, JitSyncClient, JitTransport, SyncedState, TransportError};
pub use quiet_hours::{QuietHours, TimeOfDay};
pub use scheduler::CampaignScheduler;
pub use signal::Signal;
pub use tracker::{EventInfo, StoredViewTracker, ViewEventKey, ViewKind, ViewTracker};
pub use trigger::Trigger;
