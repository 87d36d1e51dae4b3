use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Lead anchor: creation time, but never earlier than the launch floor.
///
/// Leads imported before launch would otherwise look weeks overdue on the first runs.
pub fn floored_anchor(created_at: DateTime<Utc>, floor: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match floor {
        Some(floor) => created_at.max(floor),
        None => created_at,
    }
}

/// Event anchor: midnight UTC of the event's calendar date.
pub fn date_anchor(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
