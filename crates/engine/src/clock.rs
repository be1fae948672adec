//! Injected time source.
//!
//! Engine logic never reads the wall clock directly: TTLs, throttling,
//! capping windows and quiet hours all go through a [`DateProvider`].

use std::sync::Mutex;

use time::{Duration, OffsetDateTime, UtcOffset};

pub trait DateProvider: Send + Sync {
    /// Current instant, in the offset used for local-time rules.
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock shifted to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemDateProvider {
    offset: UtcOffset,
}

impl SystemDateProvider {
    pub fn new(offset: UtcOffset) -> Self {
        SystemDateProvider { offset }
    }

    pub fn utc() -> Self {
        Self::new(UtcOffset::UTC)
    }
}

impl DateProvider for SystemDateProvider {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc().to_offset(self.offset)
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct FakeDateProvider {
    now: Mutex<OffsetDateTime>,
}

impl FakeDateProvider {
    pub fn new(at: OffsetDateTime) -> Self {
        FakeDateProvider { now: Mutex::new(at) }
    }

    pub fn set(&self, at: OffsetDateTime) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl DateProvider for FakeDateProvider {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Unix milliseconds, the persisted timestamp form.
pub fn to_unix_ms(at: OffsetDateTime) -> i64 {
    (at.unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn from_unix_ms(ms: i64) -> OffsetDateTime {
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn fake_clock_advances() {
        let clock = FakeDateProvider::new(datetime!(2024-03-01 12:00 UTC));
        clock.advance(Duration::seconds(90));
        assert_eq!(clock.now(), datetime!(2024-03-01 12:01:30 UTC));
        clock.set(datetime!(2020-01-01 0:00 UTC));
        assert_eq!(clock.now(), datetime!(2020-01-01 0:00 UTC));
    }

    #[test]
    fn unix_ms_conversion_keeps_millisecond_precision() {
        let at = datetime!(2024-03-01 12:00:00.250 UTC);
        assert_eq!(from_unix_ms(to_unix_ms(at)), at);
    }

    #[test]
    fn system_clock_uses_configured_offset() {
        let offset = UtcOffset::from_hms(2, 0, 0).unwrap();
        let now = SystemDateProvider::new(offset).now();
        assert_eq!(now.offset(), offset);
    }
}
