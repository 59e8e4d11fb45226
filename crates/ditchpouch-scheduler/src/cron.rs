//! Minimal cron expression support.
//! Format: "MIN HOUR DOM MON DOW" (5-field, no seconds).
//! Minute and hour accept `*`, `*/N`, `N` and `N,M,..`; the date fields are
//! accepted but only `*` is meaningful.

use chrono::{DateTime, Duration, TimeZone, Timelike};

/// Next time strictly after `after` (to the minute) matching `expression`,
/// in `after`'s time zone.
pub fn next_run_from_cron<Tz: TimeZone>(expression: &str, after: DateTime<Tz>) -> Option<DateTime<Tz>> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 5 {
        tracing::warn!(
            "Invalid cron expression: '{}' (need 5 fields: MIN HOUR DOM MON DOW)",
            expression
        );
        return None;
    }

    let minutes = parse_field(parts[0], 0, 59)?;
    let hours = parse_field(parts[1], 0, 23)?;

    let mut candidate = after + Duration::minutes(1);
    candidate = candidate.with_second(0).unwrap_or(candidate);
    candidate = candidate.with_nanosecond(0).unwrap_or(candidate);

    // 48h covers a daily schedule across a DST gap
    for _ in 0..(48 * 60) {
        if minutes.contains(&candidate.minute()) && hours.contains(&candidate.hour()) {
            return Some(candidate);
        }
        candidate += Duration::minutes(1);
    }

    None
}

/// `(hour, minute)` of an expression that fires once a day, e.g. `0 0 * * *`.
pub fn daily_time(expression: &str) -> Option<(u32, u32)> {
    let parts: Vec<&str> = expression.split_whitespace().collect();
    if parts.len() != 5 || parts[2..].iter().any(|p| *p != "*") {
        return None;
    }
    match (parse_field(parts[0], 0, 59)?.as_slice(), parse_field(parts[1], 0, 23)?.as_slice()) {
        ([minute], [hour]) => Some((*hour, *minute)),
        _ => None,
    }
}

/// Parse a cron field into a list of matching values.
fn parse_field(field: &str, min: u32, max: u32) -> Option<Vec<u32>> {
    if field == "*" {
        return Some((min..=max).collect());
    }

    if let Some(step) = field.strip_prefix("*/") {
        let n: u32 = step.parse().ok()?;
        if n == 0 {
            return None;
        }
        return Some((min..=max).step_by(n as usize).collect());
    }

    if field.contains(',') {
        let vals: Vec<u32> = field
            .split(',')
            .map(|s| s.trim().parse())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        let vals: Vec<u32> = vals.into_iter().filter(|x| (min..=max).contains(x)).collect();
        return (!vals.is_empty()).then_some(vals);
    }

    let n: u32 = field.parse().ok()?;
    (min..=max).contains(&n).then(|| vec![n])
}
