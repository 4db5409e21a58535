use chrono::TimeDelta;

/// Renders a duration in the largest whole unit, e.g. `24 hours` or
/// `5 minutes`.
#[must_use]
pub fn describe_duration(duration: TimeDelta) -> String {
    let seconds = duration.num_seconds();
    let (amount, unit) = if seconds >= 3600 && seconds % 3600 == 0 {
        (seconds / 3600, "hour")
    } else if seconds >= 60 && seconds % 60 == 0 {
        (seconds / 60, "minute")
    } else {
        (seconds, "second")
    };

    let plural = if amount == 1 { "" } else { "s" };
    format!("{amount} {unit}{plural}")
}
