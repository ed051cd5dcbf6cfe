use chrono::{DateTime, NaiveDate, Utc};
use tracing::warn;

/// Counts consecutive days ending at the most recent completion day.
///
/// `days` must be sorted newest first. The count is anchored at the user's
/// last active day, not at today: a user idle for a week still reports the
/// streak they had when they stopped.
pub fn compute_streak(days: &[NaiveDate]) -> u32 {
    let Some(first) = days.first() else {
        return 0;
    };

    let mut streak = 1;
    let mut previous = *first;

    for day in &days[1..] {
        match previous.signed_duration_since(*day).num_days() {
            0 => continue,
            1 => {
                streak += 1;
                previous = *day;
            }
            _ => break,
        }
    }

    streak
}

/// Maps RFC 3339 completion timestamps to distinct UTC dates, newest first.
pub fn completion_days<'a, I>(timestamps: I) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut days: Vec<NaiveDate> = timestamps
        .into_iter()
        .filter_map(|ts| match DateTime::parse_from_rfc3339(ts) {
            Ok(dt) => Some(dt.with_timezone(&Utc).date_naive()),
            Err(e) => {
                warn!("skipping unparseable completion timestamp {:?}: {}", ts, e);
                None
            }
        })
        .collect();

    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();
    days
}
