use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};

/// Calendar day of a stored date, read from its `YYYY-MM-DD` prefix so any
/// time-of-day suffix is ignored.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let prefix = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}

/// Full ordering key for a stored date or timestamp.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Whole days from `today` until `target`, never negative.
pub fn days_left(target: NaiveDate, today: NaiveDate) -> i64 {
    (target - today).num_days().max(0)
}

pub fn first_of_month(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

/// Shift a month anchor by `delta` months, landing on the 1st.
pub fn shift_month(month: NaiveDate, delta: i32) -> NaiveDate {
    let anchor = first_of_month(month);
    let shifted = if delta >= 0 {
        anchor.checked_add_months(Months::new(delta.unsigned_abs()))
    } else {
        anchor.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    shifted.unwrap_or(anchor)
}

/// Parses `YYYY-MM` into the first day of that month.
pub fn parse_month(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d").ok()
}
