//! Timestamp formatting for query parameters and request bodies.

use std::fmt::Display;

use {
    chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, TimeZone, Utc},
    serde::Serializer,
};

/// Interpret `naive` as UTC and express it in the local time zone.
pub fn add_local_tz(naive: NaiveDateTime) -> DateTime<Local> {
    Utc.from_utc_datetime(&naive).with_timezone(&Local)
}

/// RFC 3339 with whole seconds and a numeric offset, e.g.
/// `2014-10-01T00:00:00-05:00`.
pub fn format_time<Tz: TimeZone>(t: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    t.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub(crate) fn serialize_time<Tz: TimeZone, S: Serializer>(
    t: &DateTime<Tz>,
    s: S,
) -> Result<S::Ok, S::Error>
where
    Tz::Offset: Display,
{
    s.serialize_str(&format_time(t))
}
