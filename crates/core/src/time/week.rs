use chrono::{Datelike, Duration, Local, NaiveDate};

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Monday of the current week in the local timezone.
pub fn current_week_start() -> NaiveDate {
    week_start(Local::now().date_naive())
}
