//! Time buckets for the per-business analytics series.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::HubError;

/// Period selected by `GET /coupons/analytics?type=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsPeriod {
    /// Current ISO week, one bucket per weekday.
    Week,
    /// Current month, five week-of-month buckets.
    Month,
    /// Current year, one bucket per month.
    Year,
}

const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];
const WEEK_LABELS: [&str; 5] = ["Week 1", "Week 2", "Week 3", "Week 4", "Week 5"];
const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

impl AnalyticsPeriod {
    /// Parses the `type` query value.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for anything but `week`, `month`
    /// or `year`.
    pub fn parse(value: &str) -> Result<Self, HubError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            other => Err(HubError::Validation(format!(
                "invalid analytics type '{other}', expected week, month or year"
            ))),
        }
    }

    /// Bucket labels, in order.
    #[must_use]
    pub fn labels(self) -> &'static [&'static str] {
        match self {
            Self::Week => &WEEKDAY_LABELS,
            Self::Month => &WEEK_LABELS,
            Self::Year => &MONTH_LABELS,
        }
    }

    /// First instant of the period containing `now`.
    #[must_use]
    pub fn period_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive();
        let first_day = match self {
            Self::Week => {
                today - Duration::days(i64::from(today.weekday().num_days_from_monday()))
            }
            Self::Month => today.with_day(1).unwrap_or(today),
            Self::Year => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        };
        first_day.and_time(chrono::NaiveTime::MIN).and_utc()
    }

    /// Index of the bucket `ts` falls into, or `None` if `ts` is outside
    /// the period containing `now`.
    #[must_use]
    pub fn bucket_of(self, ts: DateTime<Utc>, now: DateTime<Utc>) -> Option<usize> {
        if ts < self.period_start(now) {
            return None;
        }
        let day = ts.date_naive();
        let today = now.date_naive();
        let index = match self {
            Self::Week => {
                if day.iso_week() != today.iso_week() {
                    return None;
                }
                day.weekday().num_days_from_monday()
            }
            Self::Month => {
                if day.year() != today.year() || day.month() != today.month() {
                    return None;
                }
                (day.day() - 1) / 7
            }
            Self::Year => {
                if day.year() != today.year() {
                    return None;
                }
                day.month0()
            }
        };
        usize::try_from(index).ok()
    }

    /// Counts timestamps per bucket, zero-filling empty ones.
    #[must_use]
    pub fn bucketize<I>(self, timestamps: I, now: DateTime<Utc>) -> Vec<u64>
    where
        I: IntoIterator<Item = DateTime<Utc>>,
    {
        let mut buckets = vec![0u64; self.labels().len()];
        for ts in timestamps {
            if let Some(slot) = self.bucket_of(ts, now).and_then(|i| buckets.get_mut(i)) {
                *slot = slot.saturating_add(1);
            }
        }
        buckets
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        let Some(ts) = Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).single() else {
            panic!("valid timestamp");
        };
        ts
    }

    #[test]
    fn parse_rejects_unknown_period() {
        assert!(AnalyticsPeriod::parse("decade").is_err());
        assert_eq!(AnalyticsPeriod::parse("Month").ok(), Some(AnalyticsPeriod::Month));
    }

    #[test]
    fn week_buckets_by_weekday() {
        // 2025-06-11 is a Wednesday.
        let now = at(2025, 6, 11);
        let series = AnalyticsPeriod::Week.bucketize(
            [at(2025, 6, 9), at(2025, 6, 11), at(2025, 6, 11), at(2025, 6, 2)],
            now,
        );
        assert_eq!(series, vec![1, 0, 2, 0, 0, 0, 0]);
    }

    #[test]
    fn month_has_five_zero_filled_buckets() {
        let now = at(2025, 3, 31);
        let events = [at(2025, 3, 1), at(2025, 3, 29), at(2025, 2, 28)];
        let series = AnalyticsPeriod::Month.bucketize(events, now);
        assert_eq!(series, vec![1, 0, 0, 0, 1]);
    }

    #[test]
    fn year_buckets_by_month() {
        let now = at(2025, 12, 1);
        let events = [at(2025, 1, 5), at(2025, 12, 1), at(2024, 12, 1)];
        let series = AnalyticsPeriod::Year.bucketize(events, now);
        assert_eq!(series.len(), 12);
        assert_eq!(series.first(), Some(&1));
        assert_eq!(series.last(), Some(&1));
        assert_eq!(series.iter().sum::<u64>(), 2);
    }

    #[test]
    fn empty_input_is_all_zeros() {
        let series = AnalyticsPeriod::Week.bucketize(Vec::new(), Utc::now());
        assert_eq!(series, vec![0; 7]);
    }
}
