//! Usage counters and the persisted rate limiter.
//!
//! Each invocation is a fresh process, so the limiter keeps its sliding
//! window inside the usage record instead of in memory.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AssistError;

/// Days of per-day counts kept in the record.
pub const DAILY_RETENTION_DAYS: i64 = 30;

const DAY_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageRecord {
    /// Requests that reached a final decision, executed or not.
    pub total_requests: u64,
    /// Requests whose command was actually run.
    pub runs: u64,
    /// `YYYY-MM-DD` -> requests on that day.
    pub daily: BTreeMap<String, u64>,
    /// Model calls inside the current rate-limit window.
    pub recent_calls: Vec<DateTime<Utc>>,
}

impl UsageRecord {
    /// Count one finished request cycle.
    pub fn record_request(&mut self, today: NaiveDate, executed: bool) {
        self.total_requests += 1;
        if executed {
            self.runs += 1;
        }
        *self.daily.entry(day_key(today)).or_insert(0) += 1;
        self.prune_daily(today);
    }

    pub fn requests_on(&self, day: NaiveDate) -> u64 {
        self.daily.get(&day_key(day)).copied().unwrap_or(0)
    }

    /// The last `n` days that have counts, oldest first.
    pub fn recent_days(&self, n: usize) -> Vec<(&str, u64)> {
        let skip = self.daily.len().saturating_sub(n);
        self.daily
            .iter()
            .skip(skip)
            .map(|(day, count)| (day.as_str(), *count))
            .collect()
    }

    fn prune_daily(&mut self, today: NaiveDate) {
        let cutoff = today - Duration::days(DAILY_RETENTION_DAYS);
        self.daily.retain(|day, _| {
            NaiveDate::parse_from_str(day, DAY_FORMAT)
                .map(|d| d > cutoff)
                .unwrap_or(false)
        });
    }
}

fn day_key(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Sliding-window limiter on model calls, with an optional per-day cap on
/// requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    pub max_calls: u32,
    pub window: Duration,
    pub daily_limit: Option<u64>,
}

impl RateLimiter {
    pub fn new(max_calls: u32, window: Duration, daily_limit: Option<u64>) -> Self {
        Self {
            max_calls,
            window,
            daily_limit,
        }
    }

    /// Seconds until another call is allowed, `None` when one is allowed now.
    pub fn retry_after(&self, usage: &UsageRecord, now: DateTime<Local>) -> Option<u64> {
        let now_utc = now.with_timezone(&Utc);
        let cutoff = now_utc - self.window;

        if let Some(limit) = self.daily_limit {
            if usage.requests_on(now.date_naive()) >= limit {
                return Some(seconds_until_tomorrow(now));
            }
        }

        let in_window: Vec<_> = usage.recent_calls.iter().filter(|t| **t > cutoff).collect();
        if in_window.len() < self.max_calls as usize {
            return None;
        }
        // the oldest call in the window is the next one to expire
        let oldest = in_window.into_iter().min()?;
        let wait = (*oldest + self.window - now_utc).num_seconds();
        Some(wait.max(1) as u64)
    }

    /// Check the limit and, if admitted, record the call.
    pub fn admit(&self, usage: &mut UsageRecord, now: DateTime<Local>) -> Result<(), AssistError> {
        let now_utc = now.with_timezone(&Utc);
        let cutoff = now_utc - self.window;
        usage.recent_calls.retain(|t| *t > cutoff);

        if let Some(retry_after_secs) = self.retry_after(usage, now) {
            return Err(AssistError::RateLimitExceeded { retry_after_secs });
        }
        usage.recent_calls.push(now_utc);
        Ok(())
    }
}

fn seconds_until_tomorrow(now: DateTime<Local>) -> u64 {
    let tomorrow = now.date_naive().succ_opt().and_then(|d| d.and_hms_opt(0, 0, 0));
    tomorrow
        .and_then(|t| Local.from_local_datetime(&t).earliest())
        .map(|t| (t - now).num_seconds().max(1) as u64)
        .unwrap_or(60 * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 10, h, m, s)
            .earliest()
            .unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_record_request_counts() {
        let mut usage = UsageRecord::default();
        let today = day(2024, 5, 10);
        usage.record_request(today, true);
        usage.record_request(today, false);
        usage.record_request(today, false);

        assert_eq!(usage.total_requests, 3);
        assert_eq!(usage.runs, 1);
        assert_eq!(usage.requests_on(today), 3);
        assert_eq!(usage.requests_on(day(2024, 5, 9)), 0);
    }

    #[test]
    fn test_daily_counts_keep_thirty_days() {
        let mut usage = UsageRecord::default();
        usage.daily.insert("2024-03-01".into(), 4);
        usage.daily.insert("2024-04-20".into(), 2);
        usage.daily.insert("garbage".into(), 9);

        usage.record_request(day(2024, 5, 10), false);

        assert!(!usage.daily.contains_key("2024-03-01"));
        assert!(!usage.daily.contains_key("garbage"));
        assert_eq!(usage.daily.get("2024-04-20"), Some(&2));
        assert_eq!(usage.daily.get("2024-05-10"), Some(&1));
    }

    #[test]
    fn test_recent_days_are_the_latest() {
        let mut usage = UsageRecord::default();
        for d in 1..=9 {
            usage.daily.insert(format!("2024-05-0{d}"), d);
        }
        let recent = usage.recent_days(7);
        assert_eq!(recent.len(), 7);
        assert_eq!(recent[0], ("2024-05-03", 3));
        assert_eq!(recent[6], ("2024-05-09", 9));
    }

    #[test]
    fn test_limiter_admits_up_to_max_calls() {
        let limiter = RateLimiter::new(3, Duration::minutes(1), None);
        let mut usage = UsageRecord::default();
        let now = at(12, 0, 0);

        for i in 0..3 {
            assert!(limiter.admit(&mut usage, now + Duration::seconds(i)).is_ok());
        }
        match limiter.admit(&mut usage, now + Duration::seconds(10)) {
            Err(AssistError::RateLimitExceeded { retry_after_secs }) => {
                // the first call expires at 12:01:00
                assert_eq!(retry_after_secs, 50);
            }
            other => panic!("Expected RateLimitExceeded, got {:?}", other),
        }
        // refused calls are not recorded
        assert_eq!(usage.recent_calls.len(), 3);
    }

    #[test]
    fn test_limiter_window_slides() {
        let limiter = RateLimiter::new(2, Duration::minutes(1), None);
        let mut usage = UsageRecord::default();
        let now = at(12, 0, 0);

        assert!(limiter.admit(&mut usage, now).is_ok());
        assert!(limiter.admit(&mut usage, now + Duration::seconds(30)).is_ok());
        assert!(limiter.admit(&mut usage, now + Duration::seconds(45)).is_err());
        assert!(limiter.admit(&mut usage, now + Duration::seconds(61)).is_ok());
        assert_eq!(usage.recent_calls.len(), 2);
    }

    #[test]
    fn test_limiter_daily_cap() {
        let limiter = RateLimiter::new(60, Duration::minutes(1), Some(2));
        let mut usage = UsageRecord::default();
        let now = at(23, 0, 0);
        usage.record_request(now.date_naive(), true);
        usage.record_request(now.date_naive(), false);

        assert_eq!(limiter.retry_after(&usage, now), Some(3600));
        assert!(limiter.admit(&mut usage, now).is_err());
        // new day, fresh quota
        assert!(limiter.admit(&mut usage, at(23, 0, 0) + Duration::hours(2)).is_ok());
    }

    #[test]
    fn test_retry_after_none_when_ready() {
        let limiter = RateLimiter::new(1, Duration::minutes(1), None);
        assert_eq!(limiter.retry_after(&UsageRecord::default(), at(8, 0, 0)), None);
    }
}
