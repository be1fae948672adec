use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay {
    hour: u8,
    minute: u8,
}

impl TimeOfDay {
    pub fn new(hour: u8, minute: u8) -> Result<Self, EngineError> {
        if hour > 23 || minute > 59 {
            return Err(EngineError::definition(format!(
                "invalid time of day {:02}:{:02}",
                hour, minute
            )));
        }
        Ok(TimeOfDay { hour, minute })
    }

    /// Parses `HH:MM`.
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let (h, m) = s
            .split_once(':')
            .ok_or_else(|| EngineError::definition(format!("expected HH:MM, got '{}'", s)))?;
        let hour = h
            .trim()
            .parse::<u8>()
            .map_err(|_| EngineError::definition(format!("invalid hour in '{}'", s)))?;
        let minute = m
            .trim()
            .parse::<u8>()
            .map_err(|_| EngineError::definition(format!("invalid minute in '{}'", s)))?;
        Self::new(hour, minute)
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    fn minutes_since_midnight(&self) -> u16 {
        self.hour as u16 * 60 + self.minute as u16
    }
}

/// Recurring daily window during which a campaign must not be shown.
///
/// `days` uses 0 = Sunday through 6 = Saturday; an empty set means every
/// day. The window is `[start, end)` and wraps past midnight when `end`
/// is before `start`. Day membership is checked against the day of the
/// instant being tested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuietHours {
    start: TimeOfDay,
    end: TimeOfDay,
    days: BTreeSet<u8>,
}

impl QuietHours {
    /// Day numbers above 6 are dropped.
    pub fn new(start: TimeOfDay, end: TimeOfDay, days: impl IntoIterator<Item = u8>) -> Self {
        QuietHours {
            start,
            end,
            days: days.into_iter().filter(|d| *d <= 6).collect(),
        }
    }

    pub fn start(&self) -> TimeOfDay {
        self.start
    }

    pub fn end(&self) -> TimeOfDay {
        self.end
    }

    pub fn days(&self) -> &BTreeSet<u8> {
        &self.days
    }

    /// Whether `at` (in its own offset) falls inside the window.
    pub fn contains(&self, at: OffsetDateTime) -> bool {
        let day = at.weekday().number_days_from_sunday();
        if !self.days.is_empty() && !self.days.contains(&day) {
            return false;
        }
        let now = at.hour() as u16 * 60 + at.minute() as u16;
        let start = self.start.minutes_since_midnight();
        let end = self.end.minutes_since_midnight();
        if start == end {
            false
        } else if start < end {
            now >= start && now < end
        } else {
            now >= start || now < end
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn tod(s: &str) -> TimeOfDay {
        TimeOfDay::parse(s).unwrap()
    }

    #[test]
    fn daytime_window() {
        let q = QuietHours::new(tod("12:00"), tod("14:30"), []);
        assert!(!q.contains(datetime!(2024-03-06 11:59 UTC)));
        assert!(q.contains(datetime!(2024-03-06 12:00 UTC)));
        assert!(q.contains(datetime!(2024-03-06 14:29 UTC)));
        assert!(!q.contains(datetime!(2024-03-06 14:30 UTC)));
    }

    #[test]
    fn overnight_window_wraps_past_midnight() {
        let q = QuietHours::new(tod("22:00"), tod("07:00"), []);
        assert!(q.contains(datetime!(2024-03-06 23:15 UTC)));
        assert!(q.contains(datetime!(2024-03-07 03:00 UTC)));
        assert!(!q.contains(datetime!(2024-03-07 07:00 UTC)));
        assert!(!q.contains(datetime!(2024-03-07 12:00 UTC)));
    }

    #[test]
    fn day_mask_restricts_window() {
        // 2024-03-03 is a Sunday, 2024-03-04 a Monday.
        let q = QuietHours::new(tod("00:00"), tod("23:59"), [0, 6]);
        assert!(q.contains(datetime!(2024-03-03 10:00 UTC)));
        assert!(!q.contains(datetime!(2024-03-04 10:00 UTC)));
    }

    #[test]
    fn uses_the_offset_of_the_instant() {
        let q = QuietHours::new(tod("09:00"), tod("10:00"), []);
        assert!(q.contains(datetime!(2024-03-04 09:30 +02:00)));
        assert!(!q.contains(datetime!(2024-03-04 09:30 +02:00).to_offset(time::UtcOffset::UTC)));
    }

    #[test]
    fn empty_window_never_matches_and_invalid_days_are_dropped() {
        let q = QuietHours::new(tod("08:00"), tod("08:00"), [1, 9]);
        assert!(!q.contains(datetime!(2024-03-04 08:00 UTC)));
        assert_eq!(q.days().len(), 1);
    }

    #[test]
    fn rejects_invalid_times() {
        assert!(TimeOfDay::parse("24:00").is_err());
        assert!(TimeOfDay::parse("12:60").is_err());
        assert!(TimeOfDay::parse("noon").is_err());
    }
}
