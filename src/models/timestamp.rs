use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// `YYYY-MM-DD_HH-mm-ss`, the run identifier shared by every artifact of a run
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Renders `instant` as a run timestamp in the configured fixed time zone
pub fn format_run_timestamp(instant: DateTime<Utc>, zone: &FixedOffset) -> String {
    zone.from_utc_datetime(&instant.naive_utc())
        .format(RUN_TIMESTAMP_FORMAT)
        .to_string()
}

/// Parses the timestamp part of an archive name. Returns `None` for anything
/// that is not a run timestamp.
pub fn parse_run_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, RUN_TIMESTAMP_FORMAT).ok()
}
