//! Venue time - "now", timestamp parsing and return deadlines in the venue's civil zone.
//!
//! All lifecycle code asks a [`TimeService`] for the current time instead of reading the
//! system clock, so tests can pin the clock with [`FixedClock`]. Timestamps are stored in
//! UTC and converted to the venue zone for presentation and for calendar-day arithmetic.

use chrono::{DateTime, NaiveDateTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use std::fmt;
use std::sync::Arc;

/// Length of a checkout session before the cart is due back.
pub const RETURN_WINDOW_HOURS: i64 = 6;

/// Source of the current instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant in UTC
    fn now_utc(&self) -> DateTime<Utc>;
}

/// Reads the operating system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Clock plus the fixed civil zone of the venue.
#[derive(Debug, Clone)]
pub struct TimeService {
    zone: Tz,
    clock: Arc<dyn Clock>,
}

impl TimeService {
    /// Time service reading `clock` in `zone`.
    #[must_use]
    pub fn new(zone: Tz, clock: Arc<dyn Clock>) -> Self {
        Self { zone, clock }
    }

    /// Time service backed by the system clock.
    #[must_use]
    pub fn system(zone: Tz) -> Self {
        Self::new(zone, Arc::new(SystemClock))
    }

    /// Time service pinned to one instant.
    #[must_use]
    pub fn fixed(zone: Tz, instant: DateTime<Utc>) -> Self {
        Self::new(zone, Arc::new(FixedClock(instant)))
    }

    /// The venue's civil time zone.
    #[must_use]
    pub const fn zone(&self) -> Tz {
        self.zone
    }

    /// Current instant expressed in the venue zone.
    #[must_use]
    pub fn now(&self) -> DateTime<Tz> {
        self.clock.now_utc().with_timezone(&self.zone)
    }

    /// Converts a stored UTC timestamp into the venue zone.
    #[must_use]
    pub fn to_zone(&self, instant: DateTime<Utc>) -> DateTime<Tz> {
        instant.with_timezone(&self.zone)
    }

    /// Parses an ISO-8601 timestamp into the venue zone.
    ///
    /// Accepts a trailing `Z`, an explicit offset, or no offset at all (the value is then
    /// read as venue-local time). Seconds are optional. Anything else yields `None`;
    /// callers treat that as "not provided".
    #[must_use]
    pub fn parse(&self, text: &str) -> Option<DateTime<Tz>> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let normalized = match text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
            Some(stripped) => format!("{stripped}+00:00"),
            None => text.to_string(),
        };

        if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
            return Some(parsed.with_timezone(&self.zone));
        }
        if let Ok(parsed) = DateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M%:z") {
            return Some(parsed.with_timezone(&self.zone));
        }

        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .and_then(|naive| self.zone.from_local_datetime(&naive).earliest())
    }

    /// Deadline for a session that started at `checkout`.
    ///
    /// Six hours after checkout, but never past 23:59:59 of the checkout's calendar day in
    /// the venue zone.
    #[must_use]
    pub fn derive_return_by(&self, checkout: DateTime<Tz>) -> DateTime<Tz> {
        let candidate = checkout + TimeDelta::hours(RETURN_WINDOW_HOURS);
        if candidate.date_naive() == checkout.date_naive() {
            return candidate;
        }

        checkout
            .date_naive()
            .and_hms_opt(23, 59, 59)
            .and_then(|end_of_day| self.zone.from_local_datetime(&end_of_day).earliest())
            .map_or(candidate, |end_of_day| end_of_day.max(checkout))
    }

    /// Whether `deadline` has already passed.
    #[must_use]
    pub fn is_overdue(&self, deadline: DateTime<Utc>) -> bool {
        self.clock.now_utc() > deadline
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use chrono::{FixedOffset, Timelike};
    use chrono_tz::America::New_York;

    fn local(text: &str) -> DateTime<Tz> {
        let naive = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S").unwrap();
        New_York.from_local_datetime(&naive).unwrap()
    }

    fn service_at(text: &str) -> TimeService {
        TimeService::fixed(New_York, local(text).with_timezone(&Utc))
    }

    #[test]
    fn test_now_is_in_venue_zone() {
        let time = service_at("2024-06-01T20:00:00");
        let now = time.now();
        assert_eq!(now.to_rfc3339(), "2024-06-01T20:00:00-04:00");
    }

    #[test]
    fn test_return_by_no_clamp() {
        let time = service_at("2024-06-01T10:00:00");
        let return_by = time.derive_return_by(time.now());
        assert_eq!(return_by.to_rfc3339(), "2024-06-01T16:00:00-04:00");
    }

    #[test]
    fn test_return_by_clamped_to_end_of_day() {
        let time = service_at("2024-06-01T20:00:00");
        let return_by = time.derive_return_by(time.now());
        assert_eq!(return_by.to_rfc3339(), "2024-06-01T23:59:59-04:00");
    }

    #[test]
    fn test_return_by_exactly_at_midnight_boundary() {
        // 18:00 + 6h lands on 00:00 of the next day, which is already a new date
        let time = service_at("2024-06-01T18:00:00");
        let return_by = time.derive_return_by(time.now());
        assert_eq!(return_by.to_rfc3339(), "2024-06-01T23:59:59-04:00");

        let time = service_at("2024-06-01T17:59:59");
        let return_by = time.derive_return_by(time.now());
        assert_eq!(return_by.to_rfc3339(), "2024-06-01T23:59:59-04:00");
    }

    #[test]
    fn test_return_by_never_exceeds_window_or_date() {
        let time = service_at("2024-11-03T00:00:00");
        for hour in 0..24 {
            for minute in [0, 17, 59] {
                let Some(checkout) = time
                    .now()
                    .with_hour(hour)
                    .and_then(|t| t.with_minute(minute))
                else {
                    continue;
                };
                let return_by = time.derive_return_by(checkout);
                assert!(return_by <= checkout + TimeDelta::hours(RETURN_WINDOW_HOURS));
                assert!(return_by >= checkout);
                assert_eq!(return_by.date_naive(), checkout.date_naive());
            }
        }
    }

    #[test]
    fn test_parse_accepts_z_suffix() {
        let time = service_at("2024-06-01T10:00:00");
        let parsed = time.parse("2024-06-02T00:30:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-06-01T20:30:00-04:00");

        let parsed = time.parse("2024-06-02T00:30:00.250Z").unwrap();
        assert_eq!(parsed.with_timezone(&Utc).timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_offsets_and_local_forms() {
        let time = service_at("2024-06-01T10:00:00");

        let with_offset = time.parse("2024-06-01T12:00:00+02:00").unwrap();
        assert_eq!(with_offset.to_rfc3339(), "2024-06-01T06:00:00-04:00");

        let no_seconds = time.parse("2024-06-01T12:00-05:00").unwrap();
        assert_eq!(no_seconds.to_rfc3339(), "2024-06-01T13:00:00-04:00");

        let zone_less = time.parse("2024-06-01T14:30").unwrap();
        assert_eq!(zone_less.to_rfc3339(), "2024-06-01T14:30:00-04:00");

        let winter = time.parse("2024-01-15T09:00:00").unwrap();
        assert_eq!(
            winter.fixed_offset().offset(),
            &FixedOffset::west_opt(5 * 3600).unwrap()
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let time = service_at("2024-06-01T10:00:00");
        assert!(time.parse("").is_none());
        assert!(time.parse("   ").is_none());
        assert!(time.parse("yesterday").is_none());
        assert!(time.parse("2024-13-45T99:00:00Z").is_none());
        assert!(time.parse("Z").is_none());
    }

    #[test]
    fn test_is_overdue() {
        let time = service_at("2024-06-01T20:00:00");
        let earlier = local("2024-06-01T19:00:00").with_timezone(&Utc);
        let later = local("2024-06-01T21:00:00").with_timezone(&Utc);
        assert!(time.is_overdue(earlier));
        assert!(!time.is_overdue(later));
    }
}
