/// Duration engine
///
/// Elapsed time of a time log is always derived from its start and end
/// timestamps, never stored or accepted from a caller. Arithmetic is done in
/// whole seconds; presentation converts to minutes by floor division.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use taskclock_shared::duration::{duration_between, to_minutes};
///
/// let end = Utc::now();
/// let start = end - Duration::minutes(90);
///
/// let seconds = duration_between(start, Some(end)).unwrap();
/// assert_eq!(seconds, 5400);
/// assert_eq!(to_minutes(seconds), 90);
/// ```

use chrono::{DateTime, Utc};

/// Seconds elapsed between `start` and `end`
///
/// Returns `None` while the log is still running (`end` is `None`).
/// Sub-second remainders are truncated.
pub fn duration_between(start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Option<i64> {
    end.map(|end| (end - start).num_seconds())
}

/// Converts seconds to whole minutes, rounding down
pub fn to_minutes(seconds: i64) -> i64 {
    seconds.div_euclid(60)
}

/// Sums optional durations, treating running logs as zero
pub fn total_seconds<I>(durations: I) -> i64
where
    I: IntoIterator<Item = Option<i64>>,
{
    durations.into_iter().map(|d| d.unwrap_or(0)).sum()
}

/// Formats seconds as `H:MM:SS`
///
/// Hours are not wrapped into days, so 26 hours renders as `26:00:00`.
pub fn format_hms(seconds: i64) -> String {
    let sign = if seconds < 0 { "-" } else { "" };
    let seconds = seconds.abs();
    format!(
        "{}{}:{:02}:{:02}",
        sign,
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}
