//! Calendar month windows for quota counting.
//!
//! Quotas are counted over the UTC calendar month containing a reference
//! timestamp. A delivery scheduled at the first instant of the month, or at
//! any instant up to the end of its last day, counts toward that month.

use chrono::{DateTime, Datelike, Days, Months, NaiveTime, Utc};

/// The calendar month containing a timestamp, as `[start, next_start)`.
///
/// The half-open form is equivalent to the inclusive range from the first
/// to the last instant of the month.
///
/// # Example
///
/// ```
/// use fleet_engine::rules::MonthWindow;
/// use chrono::{DateTime, Utc};
///
/// let ts: DateTime<Utc> = "2026-02-14T10:30:00Z".parse().unwrap();
/// let window = MonthWindow::containing(ts);
/// assert_eq!(window.start().to_rfc3339(), "2026-02-01T00:00:00+00:00");
/// assert_eq!(window.next_start().to_rfc3339(), "2026-03-01T00:00:00+00:00");
/// assert!(window.contains(ts));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthWindow {
    start: DateTime<Utc>,
    next_start: DateTime<Utc>,
}

impl MonthWindow {
    /// Builds the window for the month containing `reference`.
    pub fn containing(reference: DateTime<Utc>) -> Self {
        let first_day = reference.date_naive() - Days::new(u64::from(reference.day0()));
        let next_first_day = first_day + Months::new(1);

        Self {
            start: first_day.and_time(NaiveTime::MIN).and_utc(),
            next_start: next_first_day.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    /// First instant of the month.
    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// First instant of the following month (exclusive bound).
    pub fn next_start(&self) -> DateTime<Utc> {
        self.next_start
    }

    /// Returns true if `ts` falls inside the month.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.next_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_first_instant_is_inside() {
        let window = MonthWindow::containing(ts("2026-10-19T12:00:00Z"));
        assert!(window.contains(ts("2026-10-01T00:00:00Z")));
    }

    #[test]
    fn test_last_instant_is_inside() {
        let window = MonthWindow::containing(ts("2026-10-19T12:00:00Z"));
        assert!(window.contains(ts("2026-10-31T23:59:59.999999Z")));
    }

    #[test]
    fn test_neighbouring_months_are_outside() {
        let window = MonthWindow::containing(ts("2026-10-19T12:00:00Z"));
        assert!(!window.contains(ts("2026-09-30T23:59:59Z")));
        assert!(!window.contains(ts("2026-11-01T00:00:00Z")));
    }

    #[test]
    fn test_december_rolls_into_next_year() {
        let window = MonthWindow::containing(ts("2026-12-31T23:00:00Z"));
        assert_eq!(window.start(), ts("2026-12-01T00:00:00Z"));
        assert_eq!(window.next_start(), ts("2027-01-01T00:00:00Z"));
    }

    #[test]
    fn test_leap_february() {
        let window = MonthWindow::containing(ts("2028-02-29T08:00:00Z"));
        assert_eq!(window.start(), ts("2028-02-01T00:00:00Z"));
        assert_eq!(window.next_start(), ts("2028-03-01T00:00:00Z"));
    }

    #[test]
    fn test_reference_on_first_day() {
        let window = MonthWindow::containing(ts("2026-03-01T00:00:00Z"));
        assert_eq!(window.start(), ts("2026-03-01T00:00:00Z"));
    }
}
