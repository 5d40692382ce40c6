//! US equity regular-session detection

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use chrono_tz::US::Eastern;

/// Whether `at` falls inside Mon-Fri 09:30-16:00 America/New_York
///
/// Exchange holidays are not modelled.
pub fn is_regular_session(at: DateTime<Utc>) -> bool {
    let local = at.with_timezone(&Eastern);

    if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
        return false;
    }

    let time = local.time();
    match (
        NaiveTime::from_hms_opt(9, 30, 0),
        NaiveTime::from_hms_opt(16, 0, 0),
    ) {
        (Some(open), Some(close)) => time >= open && time < close,
        _ => false,
    }
}
