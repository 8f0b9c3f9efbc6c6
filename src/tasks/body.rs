use chrono::{DateTime, Local, TimeZone};

pub const FALLBACK_PREFIX: &str = "hello ";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f %z";

/// Builds a task body from command line words, stamping the current local time
/// when no words were given.
pub fn body_from_args(words: &[String]) -> String {
    body_from_args_at(words, Local::now())
}

/// Words joined by single spaces, or `"hello <now>"` when the list is empty or
/// its first word is empty.
pub fn body_from_args_at<Tz>(words: &[String], now: DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    match words.first() {
        Some(first) if !first.is_empty() => words.join(" "),
        _ => format!("{}{}", FALLBACK_PREFIX, now.format(TIMESTAMP_FORMAT)),
    }
}
