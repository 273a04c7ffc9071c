use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

use crate::error::PathError;

/// Calendar buckets under `/recent`.
///
/// Buckets are computed from a conversation's **creation** time. Imports rewrite `updated_at`
/// wholesale, so bucketing on it would put every imported record under `today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecentPeriod {
    Today,
    ThisWeek,
    ThisMonth,
    Older,
}

impl RecentPeriod {
    pub const ALL: [RecentPeriod; 4] =
        [RecentPeriod::Today, RecentPeriod::ThisWeek, RecentPeriod::ThisMonth, RecentPeriod::Older];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecentPeriod::Today => "today",
            RecentPeriod::ThisWeek => "this-week",
            RecentPeriod::ThisMonth => "this-month",
            RecentPeriod::Older => "older",
        }
    }

    /// Bucket for `created_at` as seen at `now`.
    ///
    /// Boundaries are checked from the newest down, so every timestamp lands in exactly one
    /// bucket. Timestamps in the future count as today.
    pub fn classify(created_at: DateTime<Utc>, now: DateTime<Utc>) -> RecentPeriod {
        let boundaries = Boundaries::at(now);
        if created_at >= boundaries.today {
            RecentPeriod::Today
        } else if created_at >= boundaries.week {
            RecentPeriod::ThisWeek
        } else if created_at >= boundaries.month {
            RecentPeriod::ThisMonth
        } else {
            RecentPeriod::Older
        }
    }
}

impl fmt::Display for RecentPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecentPeriod {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecentPeriod::ALL
            .into_iter()
            .find(|period| period.as_str() == s)
            .ok_or_else(|| PathError::UnknownPeriod(s.to_string()))
    }
}

/// Start of today, of the ISO week (Monday) and of the month, in UTC
struct Boundaries {
    today: DateTime<Utc>,
    week: DateTime<Utc>,
    month: DateTime<Utc>,
}

impl Boundaries {
    fn at(now: DateTime<Utc>) -> Self {
        let date = now.date_naive();
        let today = date.and_time(NaiveTime::MIN).and_utc();
        let week = today - Duration::days(i64::from(date.weekday().num_days_from_monday()));
        let month = date.with_day(1).unwrap_or(date).and_time(NaiveTime::MIN).and_utc();
        Self { today, week, month }
    }
}
