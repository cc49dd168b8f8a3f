//! Pomodoro focus tracking
//!
//! Sessions are bucketed by the server-local calendar day of their
//! completion instant and accumulated per day.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::middleware::AuthContext;
use crate::calendar::{self, DAYS_PER_WEEK};
use crate::error::{ServiceError, ServiceResult};
use crate::models::pomodoro::Pomodoro;

/// Longest session accepted, in minutes
pub const MAX_SESSION_MINUTES: i64 = 24 * 60;

/// A finished focus session
#[derive(Debug, Clone, Deserialize)]
pub struct CompletedSession {
    /// Minutes
    pub duration: i64,
    pub completed_at: DateTime<Utc>,
}

/// Day total after recording a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecorded {
    pub date: NaiveDate,
    pub total_duration: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyFocus {
    pub date: NaiveDate,
    pub total_minutes: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyFocus {
    pub week_start: NaiveDate,
    /// Minutes per day, Monday first
    pub daily_focus_times: [i64; DAYS_PER_WEEK],
    /// Minutes over the whole week
    pub focused: i64,
}

/// Records a session
pub async fn complete_session<Tz: TimeZone>(
    pool: &PgPool,
    auth: &AuthContext,
    tz: &Tz,
    session: CompletedSession,
) -> ServiceResult<SessionRecorded> {
    let minutes = session_minutes(session.duration)?;

    let day = calendar::local_day(tz, session.completed_at);
    let row = Pomodoro::add_minutes(pool, auth.user_id, day, minutes).await?;

    tracing::debug!(user_id = %auth.user_id, %day, total = row.duration, "Pomodoro recorded");

    Ok(SessionRecorded {
        date: row.day,
        total_duration: row.duration,
    })
}

/// Accepts between 1 minute and one day per session
pub fn session_minutes(duration: i64) -> ServiceResult<i32> {
    if duration < 1 {
        return Err(ServiceError::validation(
            "duration",
            "Duration must be at least 1 minute",
        ));
    }
    if duration > MAX_SESSION_MINUTES {
        return Err(ServiceError::validation(
            "duration",
            format!("Duration must be at most {} minutes", MAX_SESSION_MINUTES),
        ));
    }
    Ok(duration as i32)
}

/// Focus minutes on one day
pub async fn daily_focus(pool: &PgPool, auth: &AuthContext, day: NaiveDate) -> ServiceResult<DailyFocus> {
    let total_minutes = Pomodoro::minutes_on(pool, auth.user_id, day).await?;
    Ok(DailyFocus {
        date: day,
        total_minutes,
    })
}

/// Spreads day rows over a Monday-first week
pub fn weekly_from_rows(week_start: NaiveDate, rows: &[Pomodoro]) -> WeeklyFocus {
    let mut daily_focus_times = [0i64; DAYS_PER_WEEK];

    for row in rows {
        let offset = (row.day - week_start).num_days();
        if (0..DAYS_PER_WEEK as i64).contains(&offset) {
            daily_focus_times[offset as usize] += i64::from(row.duration);
        }
    }

    WeeklyFocus {
        week_start,
        focused: daily_focus_times.iter().sum(),
        daily_focus_times,
    }
}

/// Focus minutes for the Monday-start week containing `today`
pub async fn weekly_focus(pool: &PgPool, auth: &AuthContext, today: NaiveDate) -> ServiceResult<WeeklyFocus> {
    let week_start = calendar::week_start(today);
    let week_end = week_start + Duration::days(DAYS_PER_WEEK as i64);

    let rows = Pomodoro::list_between(pool, auth.user_id, week_start, week_end).await?;
    Ok(weekly_from_rows(week_start, &rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn row(day: NaiveDate, duration: i32) -> Pomodoro {
        let now = Utc::now();
        Pomodoro {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            day,
            duration,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_weekly_from_rows() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let rows = vec![
            row(monday, 25),
            row(NaiveDate::from_ymd_opt(2024, 1, 17).unwrap(), 50),
            row(NaiveDate::from_ymd_opt(2024, 1, 21).unwrap(), 10),
            // next week, ignored
            row(NaiveDate::from_ymd_opt(2024, 1, 22).unwrap(), 99),
        ];

        let weekly = weekly_from_rows(monday, &rows);

        assert_eq!(weekly.daily_focus_times, [25, 0, 50, 0, 0, 0, 10]);
        assert_eq!(weekly.focused, 85);
        assert_eq!(weekly.week_start, monday);
    }

    #[test]
    fn test_session_minutes_bounds() {
        assert_eq!(session_minutes(1).unwrap(), 1);
        assert_eq!(session_minutes(MAX_SESSION_MINUTES).unwrap(), 1440);

        for duration in [0, -5, MAX_SESSION_MINUTES + 1, i64::from(i32::MAX), i64::MAX] {
            assert!(matches!(
                session_minutes(duration),
                Err(ServiceError::Validation { ref field, .. }) if field == "duration"
            ));
        }
    }

    #[test]
    fn test_weekly_from_no_rows() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let weekly = weekly_from_rows(monday, &[]);
        assert_eq!(weekly.focused, 0);
    }
}
