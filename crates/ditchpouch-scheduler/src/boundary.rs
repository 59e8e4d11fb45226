//! Daily boundary timer.
//! Polls on a tokio interval (sleeps between checks) and fires exactly once
//! per local calendar day. The last applied day is persisted by the caller,
//! so a restart neither repeats a boundary nor skips one.

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use ditchpouch_core::error::{DitchPouchError, Result};

use crate::cron::{daily_time, next_run_from_cron};

/// Tracks when the next daily boundary is due and which day it closes.
#[derive(Debug, Clone)]
pub struct DailyBoundary<Tz: TimeZone = Local> {
    expression: String,
    next: DateTime<Tz>,
    /// Day the pending fire belongs to.
    next_day: NaiveDate,
    last_fired: NaiveDate,
}

impl<Tz: TimeZone> DailyBoundary<Tz> {
    /// Arm from `now` given the last applied day.
    ///
    /// With `None` (first run) the most recent boundary counts as applied and
    /// nothing fires until the upcoming one. When the most recent boundary is
    /// later than `last_fired`, it is due immediately; a longer outage still
    /// catches up with a single fire.
    pub fn new(expression: &str, now: DateTime<Tz>, last_fired: Option<NaiveDate>) -> Result<Self> {
        if daily_time(expression).is_none() {
            return Err(DitchPouchError::Scheduler(format!(
                "boundary '{expression}' must fire once a day (fixed minute and hour, e.g. '0 0 * * *')"
            )));
        }
        let upcoming = next_run_from_cron(expression, now.clone()).ok_or_else(|| {
            DitchPouchError::Scheduler(format!("no upcoming run for '{expression}'"))
        })?;
        let upcoming_day = upcoming.date_naive();
        let previous_day = upcoming_day.pred_opt().ok_or_else(|| {
            DitchPouchError::Scheduler(format!("no day before {upcoming_day}"))
        })?;

        let boundary = match last_fired {
            Some(last) if last < previous_day => {
                tracing::info!("⏪ Boundary for {previous_day} was missed (last {last}), catching up");
                Self {
                    expression: expression.to_string(),
                    next: now,
                    next_day: previous_day,
                    last_fired: last,
                }
            }
            last => Self {
                expression: expression.to_string(),
                next: upcoming,
                next_day: upcoming_day,
                last_fired: last.unwrap_or(previous_day),
            },
        };
        Ok(boundary)
    }

    pub fn next(&self) -> &DateTime<Tz> {
        &self.next
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Most recent day counted as applied.
    pub fn last_fired(&self) -> NaiveDate {
        self.last_fired
    }

    /// The day whose boundary is due at `now`, if any; re-arms for the next
    /// one. A late wakeup fires once for the most recent day it slept past.
    pub fn poll(&mut self, now: DateTime<Tz>) -> Option<NaiveDate> {
        if now < self.next {
            return None;
        }
        let (next, next_day) = match next_run_from_cron(&self.expression, now.clone()) {
            Some(next) => {
                let day = next.date_naive();
                (next, day)
            }
            None => (now.clone() + chrono::Duration::days(1), self.next_day.succ_opt()?),
        };
        let due = match next_day.pred_opt() {
            Some(day) if day > self.next_day => day,
            _ => self.next_day,
        };
        self.next = next;
        self.next_day = next_day;

        if due <= self.last_fired {
            tracing::debug!("Boundary for {due} already fired, skipping");
            return None;
        }
        self.last_fired = due;
        Some(due)
    }
}

/// Run the boundary loop forever, calling `on_boundary` with the closed day
/// each time it fires.
///
/// The callback decouples the scheduler from the tracker crate.
pub async fn spawn_daily_boundary<F, Fut>(
    mut boundary: DailyBoundary<Local>,
    on_boundary: F,
    check_interval_secs: u64,
) where
    F: Fn(NaiveDate) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send,
{
    tracing::info!(
        "⏰ Daily boundary scheduler started ('{}', next {}, check every {}s)",
        boundary.expression(),
        boundary.next().format("%Y-%m-%d %H:%M"),
        check_interval_secs
    );

    let mut interval =
        tokio::time::interval(std::time::Duration::from_secs(check_interval_secs.max(1)));

    loop {
        interval.tick().await;

        let Some(day) = boundary.poll(Local::now()) else {
            continue;
        };
        tracing::info!("🌙 Daily boundary reached for {day}");
        if let Err(e) = on_boundary(day).await {
            tracing::warn!("⚠️ Daily boundary handling failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset, Utc};
    use std::sync::{Arc, Mutex};

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    /// Poll once a minute over `[from, until)` and collect the days fired.
    fn poll_every_minute(
        boundary: &mut DailyBoundary<Utc>,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Vec<NaiveDate> {
        let mut fired = Vec::new();
        let mut now = from;
        while now < until {
            fired.extend(boundary.poll(now));
            now += Duration::minutes(1);
        }
        fired
    }

    #[test]
    fn test_rejects_non_daily_expression() {
        assert!(DailyBoundary::new("*/5 * * * *", at(9, 0), None).is_err());
        assert!(DailyBoundary::new("nonsense", at(9, 0), None).is_err());
    }

    #[test]
    fn test_first_run_sets_baseline_without_firing() {
        let mut boundary = DailyBoundary::new("0 0 * * *", at(9, 0), None).unwrap();
        assert_eq!(boundary.last_fired(), day(10));
        assert_eq!(boundary.poll(at(9, 1)), None);
        assert_eq!(boundary.poll(at(23, 59)), None);
        assert_eq!(boundary.next(), &(at(0, 0) + Duration::days(1)));
    }

    #[test]
    fn test_restart_after_missed_boundary_catches_up_once() {
        // Down over midnight; back at 00:02 with the 10th as the last tick
        let restart = at(0, 2) + Duration::days(1);
        let mut boundary = DailyBoundary::new("0 0 * * *", restart, Some(day(10))).unwrap();
        let fired = poll_every_minute(&mut boundary, restart, at(23, 59) + Duration::days(1));
        assert_eq!(fired, vec![day(11)]);
        assert_eq!(boundary.poll(at(0, 0) + Duration::days(2)), Some(day(12)));
    }

    #[test]
    fn test_restart_after_todays_boundary_does_not_repeat() {
        let restart = at(0, 30) + Duration::days(1);
        let mut boundary = DailyBoundary::new("0 0 * * *", restart, Some(day(11))).unwrap();
        let fired = poll_every_minute(&mut boundary, restart, at(0, 1) + Duration::days(2));
        assert_eq!(fired, vec![day(12)]);
    }

    #[test]
    fn test_catch_up_keeps_the_same_days_boundary() {
        // 23:30 boundary; down from the evening of the 10th until 00:10 on the 11th
        let restart = at(0, 10) + Duration::days(1);
        let mut boundary = DailyBoundary::new("30 23 * * *", restart, Some(day(9))).unwrap();
        assert_eq!(boundary.poll(restart), Some(day(10)));
        let fired = poll_every_minute(&mut boundary, restart, at(23, 59) + Duration::days(1));
        assert_eq!(fired, vec![day(11)]);
    }

    #[test]
    fn test_long_outage_fires_single_catch_up() {
        let restart = at(8, 0) + Duration::days(5);
        let mut boundary = DailyBoundary::new("0 0 * * *", restart, Some(day(10))).unwrap();
        assert_eq!(boundary.poll(restart), Some(day(15)));
        assert_eq!(boundary.poll(restart + Duration::minutes(1)), None);
    }

    #[test]
    fn test_fires_once_then_rearms() {
        let mut boundary = DailyBoundary::new("0 0 * * *", at(23, 0), None).unwrap();
        let midnight = at(0, 0) + Duration::days(1);
        assert_eq!(boundary.poll(midnight), Some(day(11)));
        assert_eq!(boundary.poll(midnight + Duration::seconds(30)), None);
        assert_eq!(boundary.poll(midnight + Duration::hours(12)), None);
        assert_eq!(boundary.poll(midnight + Duration::days(1)), Some(day(12)));
    }

    #[test]
    fn test_late_wakeup_fires_once() {
        let mut boundary = DailyBoundary::new("0 0 * * *", at(23, 0), None).unwrap();
        // Machine asleep for three days
        let wake = at(8, 0) + Duration::days(3);
        assert_eq!(boundary.poll(wake), Some(day(13)));
        assert_eq!(boundary.poll(wake + Duration::minutes(1)), None);
        assert_eq!(boundary.next(), &(at(0, 0) + Duration::days(4)));
    }

    #[test]
    fn test_local_offset() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2026, 3, 10, 22, 0, 0).unwrap();
        let mut boundary = DailyBoundary::new("30 23 * * *", now, Some(day(9))).unwrap();
        assert_eq!(boundary.poll(tz.with_ymd_and_hms(2026, 3, 10, 23, 29, 0).unwrap()), None);
        assert_eq!(
            boundary.poll(tz.with_ymd_and_hms(2026, 3, 10, 23, 30, 0).unwrap()),
            Some(day(10))
        );
    }

    #[tokio::test]
    async fn test_loop_invokes_callback_with_day() {
        let yesterday = Local::now().date_naive() - Duration::days(2);
        let boundary = DailyBoundary::new("0 0 * * *", Local::now(), Some(yesterday)).unwrap();
        let due = boundary.next_day;
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let handle = tokio::spawn(spawn_daily_boundary(
            boundary,
            move |day| {
                let seen = seen.clone();
                async move {
                    seen.lock().unwrap().push(day);
                    Ok(())
                }
            },
            1,
        ));
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        handle.abort();
        assert_eq!(*calls.lock().unwrap(), vec![due]);
    }
}
