//! Calendar-day arithmetic in the server's time zone
//!
//! Deadlines are stored as UTC instants, but "today", "tomorrow" and "this
//! week" are server-local calendar notions. These helpers turn a local day
//! into the half-open UTC range `[start, end)` used in queries. They are
//! generic over the zone so tests can pin one.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

/// Days in a week bucket array
pub const DAYS_PER_WEEK: usize = 7;

/// UTC instant of local midnight starting `day`
///
/// On a DST transition without a local midnight, the earliest valid instant
/// of the day is used.
pub fn local_midnight<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> DateTime<Utc> {
    let midnight = day.and_time(NaiveTime::MIN);

    tz.from_local_datetime(&midnight)
        .earliest()
        .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&midnight))
}

/// `[start, end)` of a local calendar day, in UTC
pub fn day_bounds<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let next = day.succ_opt().unwrap_or(day);
    (local_midnight(tz, day), local_midnight(tz, next))
}

/// Monday of the week containing `day`
pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(weekday_index(day) as i64)
}

/// Monday = 0 .. Sunday = 6
pub fn weekday_index(day: NaiveDate) -> usize {
    day.weekday().num_days_from_monday() as usize
}

/// `[start, end)` of the Monday-start local week containing `day`, in UTC
pub fn week_bounds<Tz: TimeZone>(tz: &Tz, day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let monday = week_start(day);
    let next_monday = monday + Duration::days(DAYS_PER_WEEK as i64);
    (local_midnight(tz, monday), local_midnight(tz, next_monday))
}

/// Local calendar day of a UTC instant
pub fn local_day<Tz: TimeZone>(tz: &Tz, instant: DateTime<Utc>) -> NaiveDate {
    instant.with_timezone(tz).date_naive()
}

/// Parses a `YYYY-MM-DD` path or query value
pub fn parse_day(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}', expected YYYY-MM-DD", value))
}

/// Buckets instants into Monday-indexed local weekdays
///
/// Instants outside the week starting at `monday` are ignored.
pub fn bucket_by_weekday<Tz, I>(tz: &Tz, monday: NaiveDate, instants: I) -> [i64; DAYS_PER_WEEK]
where
    Tz: TimeZone,
    I: IntoIterator<Item = DateTime<Utc>>,
{
    let mut buckets = [0i64; DAYS_PER_WEEK];

    for instant in instants {
        let offset = (local_day(tz, instant) - monday).num_days();
        if (0..DAYS_PER_WEEK as i64).contains(&offset) {
            buckets[offset as usize] += 1;
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn day(s: &str) -> NaiveDate {
        parse_day(s).unwrap()
    }

    #[test]
    fn test_day_bounds_in_offset_zone() {
        let jakarta = FixedOffset::east_opt(7 * 3600).unwrap();
        let (start, end) = day_bounds(&jakarta, day("2024-01-15"));

        assert_eq!(start.to_rfc3339(), "2024-01-14T17:00:00+00:00");
        assert_eq!(end - start, Duration::hours(24));
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-01-17 is a Wednesday
        assert_eq!(week_start(day("2024-01-17")), day("2024-01-15"));
        assert_eq!(week_start(day("2024-01-15")), day("2024-01-15"));
        assert_eq!(week_start(day("2024-01-21")), day("2024-01-15"));
        assert_eq!(weekday_index(day("2024-01-21")), 6);
    }

    #[test]
    fn test_bucket_by_weekday() {
        let monday = day("2024-01-15");
        let instants = vec![
            Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 21, 23, 59, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap(),
        ];

        let buckets = bucket_by_weekday(&Utc, monday, instants);
        assert_eq!(buckets, [2, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_parse_day_rejects_garbage() {
        assert!(parse_day("2024-02-30").is_err());
        assert!(parse_day("15/01/2024").is_err());
        assert_eq!(parse_day(" 2024-01-15 ").unwrap(), day("2024-01-15"));
    }
}
