use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};
use tracing::trace;

/// Commit timestamp in the committer's own UTC offset.
#[tracing::instrument(level = "trace")]
pub fn commit_datetime(secs: i64, offset_minutes: i32) -> Option<OffsetDateTime> {
    let offset = UtcOffset::from_whole_seconds(offset_minutes.checked_mul(60)?).ok()?;
    let dt = OffsetDateTime::from_unix_timestamp(secs).ok()?.to_offset(offset);
    trace!("Converted commit time {}s ({:+}m) to {}", secs, offset_minutes, dt);
    Some(dt)
}

/// Human-readable commit date, e.g. `2016-03-01 14:05 +01:00`.
///
/// Falls back to the raw epoch seconds when the timestamp is out of range.
pub fn format_commit_time(secs: i64, offset_minutes: i32) -> String {
    commit_datetime(secs, offset_minutes)
        .and_then(|dt| {
            dt.format(format_description!(
                "[year]-[month]-[day] [hour]:[minute] [offset_hour sign:mandatory]:[offset_minute]"
            ))
            .ok()
        })
        .unwrap_or_else(|| secs.to_string())
}
