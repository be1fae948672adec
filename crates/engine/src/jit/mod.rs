//! Just-in-time eligibility confirmation.
//!
//! Campaigns flagged `requires_jit_sync` are only shown once the backend
//! confirms them. Confirmations are cached per campaign for a TTL; failed
//! round-trips throttle further attempts.

pub mod cache;
pub mod client;
pub mod protocol;
pub mod transport;

use time::{Duration, OffsetDateTime};

pub use cache::{JitCache, SyncedJitResult};
pub use client::{JitSettings, JitSyncClient, SyncedState};
pub use protocol::{DeviceIds, JitRequest, ViewCount};
#[cfg(feature = "http")]
pub use transport::HttpJitTransport;
pub use transport::{JitTransport, TransportError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JitError {
    /// The request never produced a usable response.
    #[error("JIT transport failed: {cause}")]
    Transport {
        cause: String,
        retry_after: Option<Duration>,
    },

    /// The response body was not a valid eligibility answer.
    #[error("malformed JIT response: {message}")]
    Format { message: String },

    /// Syncing is paused after earlier failures.
    #[error("JIT sync throttled until {until}")]
    Throttled { until: OffsetDateTime },
}

impl From<TransportError> for JitError {
    fn from(e: TransportError) -> Self {
        JitError::Transport {
            cause: e.cause,
            retry_after: e.retry_after,
        }
    }
}
