use chrono::{DateTime, Local, TimeZone};

pub fn current_datetime() -> String {
    describe(Local::now())
}

pub fn describe<Tz: TimeZone>(now: DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "Current date and time: {} (ISO format: {})",
        now.format("%Y-%m-%d %H:%M:%S"),
        now.to_rfc3339()
    )
}
