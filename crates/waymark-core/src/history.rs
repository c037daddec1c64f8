//! Calendar windows used to group history for display.

use chrono::{DateTime, Days, Utc};
use serde::{Deserialize, Serialize};

use crate::site::SiteRecord;

/// A half-open time window `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
  pub from: DateTime<Utc>,
  pub to:   DateTime<Utc>,
}

impl Window {
  pub fn contains(&self, at: DateTime<Utc>) -> bool { self.from <= at && at < self.to }
}

/// The three windows shown on the history screen, relative to `now`.
///
/// Days are UTC calendar days. "This week" covers the five days before
/// yesterday, so the three windows together span seven days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryWindows {
  pub today:     Window,
  pub yesterday: Window,
  pub this_week: Window,
}

impl HistoryWindows {
  pub fn at(now: DateTime<Utc>) -> Self {
    let start_of_today = now
      .date_naive()
      .and_hms_opt(0, 0, 0)
      .map(|dt| dt.and_utc())
      .unwrap_or(now);
    let start_of_yesterday = start_of_today
      .checked_sub_days(Days::new(1))
      .unwrap_or(start_of_today);
    let start_of_week = start_of_today
      .checked_sub_days(Days::new(6))
      .unwrap_or(start_of_yesterday);

    Self {
      today:     Window { from: start_of_today, to: now },
      yesterday: Window { from: start_of_yesterday, to: start_of_today },
      this_week: Window { from: start_of_week, to: start_of_yesterday },
    }
  }
}

/// History split into the [`HistoryWindows`] buckets, each newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedHistory {
  pub today:     Vec<SiteRecord>,
  pub yesterday: Vec<SiteRecord>,
  pub this_week: Vec<SiteRecord>,
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn windows_are_contiguous() {
    let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
    let w = HistoryWindows::at(now);

    assert_eq!(w.today.from, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
    assert_eq!(w.today.to, now);
    assert_eq!(w.yesterday.to, w.today.from);
    assert_eq!(w.yesterday.from, Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap());
    assert_eq!(w.this_week.to, w.yesterday.from);
    assert_eq!(w.this_week.from, Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
  }

  #[test]
  fn window_is_half_open() {
    let from = Utc.timestamp_millis_opt(1_000).unwrap();
    let to = Utc.timestamp_millis_opt(2_000).unwrap();
    let w = Window { from, to };
    assert!(w.contains(from));
    assert!(!w.contains(to));
  }
}
