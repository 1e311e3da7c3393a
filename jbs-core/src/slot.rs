//! Session timing and calendar conflict detection.
//!
//! Form input is a wall-clock date and time in Japan; everything stored or
//! compared is UTC.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Asia::Tokyo;
use chrono_tz::Tz;

use crate::constants::session_length;
use crate::error::{JbsError, JbsResult};
use crate::remote::CalendarEntry;

/// Time zone the booking form is expressed in.
pub const BOOKING_TZ: Tz = Tokyo;

/// A half-open interval `[start, end)` occupied by one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookingSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BookingSlot {
    pub fn starting_at(start: DateTime<Utc>) -> Self {
        BookingSlot {
            start,
            end: start + session_length(),
        }
    }

    /// Parse `YYYY-MM-DD` and `HH:MM` as Tokyo wall time.
    pub fn from_local(date: &str, time: &str) -> JbsResult<Self> {
        let invalid = || JbsError::Validation("Invalid date or time".into());

        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M").map_err(|_| invalid())?;

        let local = BOOKING_TZ
            .from_local_datetime(&date.and_time(time))
            .single()
            .ok_or_else(invalid)?;

        Ok(Self::starting_at(local.with_timezone(&Utc)))
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start < end && self.end > start
    }

    /// Start in booking-form wall time, e.g. `2025-03-01` / `19:30`.
    pub fn local_date(&self) -> String {
        self.start.with_timezone(&BOOKING_TZ).format("%Y-%m-%d").to_string()
    }

    pub fn local_time(&self) -> String {
        self.start.with_timezone(&BOOKING_TZ).format("%H:%M").to_string()
    }
}

/// First calendar entry that overlaps `slot`. All-day entries are ignored.
pub fn find_conflict<'a>(slot: &BookingSlot, entries: &'a [CalendarEntry]) -> Option<&'a CalendarEntry> {
    entries.iter().find(|entry| match (entry.start, entry.end) {
        (Some(start), Some(end)) => slot.overlaps(start, end),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEntry {
        CalendarEntry {
            id: "ev".into(),
            summary: None,
            start: Some(start),
            end: Some(end),
        }
    }

    #[test]
    fn test_from_local_applies_tokyo_offset() {
        let slot = BookingSlot::from_local("2025-03-01", "10:00").unwrap();
        assert_eq!(slot.start, Utc.with_ymd_and_hms(2025, 3, 1, 1, 0, 0).unwrap());
        assert_eq!(slot.end - slot.start, Duration::minutes(30));
        assert_eq!(slot.local_date(), "2025-03-01");
        assert_eq!(slot.local_time(), "10:00");
    }

    #[test]
    fn test_from_local_crosses_date_line() {
        let slot = BookingSlot::from_local("2025-03-01", "08:30").unwrap();
        assert_eq!(slot.start, Utc.with_ymd_and_hms(2025, 2, 28, 23, 30, 0).unwrap());
    }

    #[test]
    fn test_from_local_rejects_bad_input() {
        assert!(BookingSlot::from_local("2025-13-01", "10:00").is_err());
        assert!(BookingSlot::from_local("2025-03-01", "25:00").is_err());
        assert!(BookingSlot::from_local("tomorrow", "10:00").is_err());
    }

    #[test]
    fn test_touching_entries_do_not_conflict() {
        let slot = BookingSlot::from_local("2025-03-01", "10:00").unwrap();
        let before = entry(slot.start - Duration::minutes(30), slot.start);
        let after = entry(slot.end, slot.end + Duration::minutes(30));
        assert!(find_conflict(&slot, &[before, after]).is_none());
    }

    #[test]
    fn test_partial_overlap_conflicts() {
        let slot = BookingSlot::from_local("2025-03-01", "10:00").unwrap();
        let overlapping = entry(slot.start + Duration::minutes(15), slot.end + Duration::hours(1));
        assert!(find_conflict(&slot, &[overlapping]).is_some());
    }

    #[test]
    fn test_enclosing_entry_conflicts() {
        let slot = BookingSlot::from_local("2025-03-01", "10:00").unwrap();
        let enclosing = entry(slot.start - Duration::hours(1), slot.end + Duration::hours(1));
        assert!(find_conflict(&slot, &[enclosing]).is_some());
    }

    #[test]
    fn test_all_day_entries_ignored() {
        let slot = BookingSlot::from_local("2025-03-01", "10:00").unwrap();
        let all_day = CalendarEntry {
            id: "holiday".into(),
            summary: Some("Holiday".into()),
            start: None,
            end: None,
        };
        assert!(find_conflict(&slot, &[all_day]).is_none());
    }
}
