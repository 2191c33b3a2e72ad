//! Inclusive calendar-date windows.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// An inclusive range of calendar dates. Empty when `end < start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window of `days` dates beginning at `start`. Zero days is empty.
    pub fn starting_at(start: NaiveDate, days: u32) -> Self {
        let end = start + Duration::days(i64::from(days)) - Duration::days(1);
        Self { start, end }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            usize::try_from((self.end - self.start).num_days() + 1).unwrap_or(0)
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Same window with its end pulled back to `last` if it extends past it.
    pub fn capped_at(&self, last: NaiveDate) -> Self {
        Self {
            start: self.start,
            end: self.end.min(last),
        }
    }

    /// Every date in the window, ascending.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d <= end)
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_window_is_inclusive() {
        let w = DateWindow::new(d(2026, 1, 1), d(2026, 1, 5));
        assert_eq!(w.len(), 5);
        assert!(w.contains(d(2026, 1, 5)));
        assert_eq!(w.days().last(), Some(d(2026, 1, 5)));
    }

    #[test]
    fn test_reversed_window_is_empty() {
        let w = DateWindow::new(d(2026, 1, 5), d(2026, 1, 1));
        assert!(w.is_empty());
        assert_eq!(w.len(), 0);
        assert_eq!(w.days().count(), 0);
    }

    #[test]
    fn test_starting_at_and_cap() {
        let w = DateWindow::starting_at(d(2026, 1, 6), 14);
        assert_eq!(w.end, d(2026, 1, 19));
        assert!(DateWindow::starting_at(d(2026, 1, 6), 0).is_empty());

        let capped = w.capped_at(d(2026, 1, 10));
        assert_eq!(capped.len(), 5);
        assert!(w.capped_at(d(2026, 1, 1)).is_empty());
    }

    #[test]
    fn test_days_cross_month_boundary() {
        let w = DateWindow::new(d(2025, 12, 30), d(2026, 1, 2));
        let days: Vec<_> = w.days().collect();
        assert_eq!(days, vec![d(2025, 12, 30), d(2025, 12, 31), d(2026, 1, 1), d(2026, 1, 2)]);
    }
}
