//! Session start resolution
//!
//! Turns the date and time-of-day the user typed into a UTC instant under an
//! explicit [`TimezonePolicy`].

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDate, NaiveDateTime, NaiveTime,
    TimeZone, Utc,
};
use serde::{Deserialize, Serialize};

use crate::error::{GpxHrError, Result};
use crate::models::EndpointPolicy;

/// How the entered wall-clock time maps to the UTC timestamps we write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimezonePolicy {
    /// The entered time already is UTC
    #[default]
    Utc,
    /// The entered time is local to a zone `minutes` east of UTC
    FixedOffset { minutes: i32 },
    /// The entered time is local to the machine's zone
    Local,
}

impl TimezonePolicy {
    /// Convert a naive wall-clock instant to UTC
    pub fn to_utc(&self, wall_clock: NaiveDateTime) -> Result<DateTime<Utc>> {
        match self {
            TimezonePolicy::Utc => Ok(Utc.from_utc_datetime(&wall_clock)),
            TimezonePolicy::FixedOffset { minutes } => {
                let offset = minutes
                    .checked_mul(60)
                    .and_then(FixedOffset::east_opt)
                    .ok_or_else(|| {
                        GpxHrError::invalid("timezone", format!("offset of {} minutes", minutes))
                    })?;
                single(offset.from_local_datetime(&wall_clock), wall_clock)
            }
            TimezonePolicy::Local => single(Local.from_local_datetime(&wall_clock), wall_clock),
        }
    }
}

fn single<Tz: TimeZone>(
    result: LocalResult<DateTime<Tz>>,
    wall_clock: NaiveDateTime,
) -> Result<DateTime<Utc>> {
    match result {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Autumn fold: keep the earlier of the two readings
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(GpxHrError::invalid(
            "time",
            format!("{} does not exist in the local timezone", wall_clock),
        )),
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|e| GpxHrError::invalid("date", format!("'{}' is not YYYY-MM-DD ({})", date, e)))
}

/// Parse an `HH:MM` or `HH:MM:SS` time of day
pub fn parse_time(time: &str) -> Result<NaiveTime> {
    let time = time.trim();
    NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|e| GpxHrError::invalid("time", format!("'{}' is not HH:MM ({})", time, e)))
}

/// Reject negative durations, pass the rest through as minutes.
///
/// The inclusive endpoint adds one point past the last minute, so the point
/// count must still fit a `u32`.
pub fn validate_duration(minutes: i64) -> Result<u32> {
    if minutes < 0 {
        return Err(GpxHrError::invalid(
            "duration",
            format!("must not be negative, got {} minutes", minutes),
        ));
    }
    u32::try_from(minutes)
        .ok()
        .filter(|minutes| minutes.checked_add(1).is_some())
        .ok_or_else(|| {
            GpxHrError::invalid("duration", format!("{} minutes is too long", minutes))
        })
}

/// A resolved session: when it starts and which minutes get a point
#[derive(Debug, Clone, PartialEq)]
pub struct SessionClock {
    pub start: DateTime<Utc>,
    pub duration_minutes: u32,
    pub endpoint: EndpointPolicy,
}

impl SessionClock {
    /// Resolve a session from the raw strings the user entered
    pub fn resolve(
        date: &str,
        time: &str,
        duration_minutes: i64,
        timezone: TimezonePolicy,
        endpoint: EndpointPolicy,
    ) -> Result<Self> {
        let wall_clock = NaiveDateTime::new(parse_date(date)?, parse_time(time)?);
        Ok(Self {
            start: timezone.to_utc(wall_clock)?,
            duration_minutes: validate_duration(duration_minutes)?,
            endpoint,
        })
    }

    pub fn point_count(&self) -> u32 {
        self.endpoint.point_count(self.duration_minutes)
    }

    /// Instants of every track point, one minute apart
    pub fn instants(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        (0..self.point_count()).map(move |i| self.start + Duration::minutes(i as i64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_and_time() {
        assert_eq!(
            parse_date("2024-06-03").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
        );
        assert_eq!(
            parse_time("19:30").unwrap(),
            NaiveTime::from_hms_opt(19, 30, 0).unwrap()
        );
        assert_eq!(
            parse_time("07:05:09").unwrap(),
            NaiveTime::from_hms_opt(7, 5, 9).unwrap()
        );
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(matches!(
            parse_date("03/06/2024"),
            Err(GpxHrError::InvalidInput { .. })
        ));
        assert!(matches!(
            parse_time("25:00"),
            Err(GpxHrError::InvalidInput { .. })
        ));
        assert!(matches!(
            validate_duration(-1),
            Err(GpxHrError::InvalidInput { .. })
        ));
        assert_eq!(validate_duration(0).unwrap(), 0);
    }

    #[test]
    fn test_duration_upper_bound() {
        assert_eq!(
            validate_duration(u32::MAX as i64 - 1).unwrap(),
            u32::MAX - 1
        );
        for minutes in [u32::MAX as i64, u32::MAX as i64 + 1, i64::MAX] {
            assert!(matches!(
                validate_duration(minutes),
                Err(GpxHrError::InvalidInput { .. })
            ));
        }

        let result = SessionClock::resolve(
            "2024-06-03",
            "19:30",
            u32::MAX as i64,
            TimezonePolicy::Utc,
            EndpointPolicy::Inclusive,
        );
        assert!(matches!(result, Err(GpxHrError::InvalidInput { .. })));
    }

    #[test]
    fn test_utc_policy_keeps_wall_clock() {
        let clock = SessionClock::resolve(
            "2024-06-03",
            "19:30",
            2,
            TimezonePolicy::Utc,
            EndpointPolicy::Inclusive,
        )
        .unwrap();
        assert_eq!(clock.start, Utc.with_ymd_and_hms(2024, 6, 3, 19, 30, 0).unwrap());
    }

    #[test]
    fn test_fixed_offset_policy_converts() {
        let clock = SessionClock::resolve(
            "2024-06-03",
            "19:30",
            2,
            TimezonePolicy::FixedOffset { minutes: 120 },
            EndpointPolicy::Inclusive,
        )
        .unwrap();
        assert_eq!(clock.start, Utc.with_ymd_and_hms(2024, 6, 3, 17, 30, 0).unwrap());
    }

    fn noon() -> NaiveDateTime {
        NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2024, 10, 27).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_ambiguous_local_time_takes_earlier_reading() {
        let summer = FixedOffset::east_opt(2 * 3600).unwrap();
        let winter = FixedOffset::east_opt(3600).unwrap();
        let folded = LocalResult::Ambiguous(
            summer.from_local_datetime(&noon()).unwrap(),
            winter.from_local_datetime(&noon()).unwrap(),
        );

        assert_eq!(
            single(folded, noon()).unwrap(),
            Utc.with_ymd_and_hms(2024, 10, 27, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_missing_local_time_rejected() {
        let gap: LocalResult<DateTime<FixedOffset>> = LocalResult::None;
        assert!(matches!(
            single(gap, noon()),
            Err(GpxHrError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_local_policy_matches_machine_zone() {
        let expected = Local
            .from_local_datetime(&noon())
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
        assert_eq!(TimezonePolicy::Local.to_utc(noon()).ok(), expected);
    }

    #[test]
    fn test_out_of_range_offset_rejected() {
        let wall_clock = NaiveDateTime::new(
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        let policy = TimezonePolicy::FixedOffset { minutes: 24 * 60 };
        assert!(policy.to_utc(wall_clock).is_err());
    }

    #[test]
    fn test_instants_are_one_minute_apart() {
        let clock = SessionClock::resolve(
            "2024-12-31",
            "23:59",
            3,
            TimezonePolicy::Utc,
            EndpointPolicy::Inclusive,
        )
        .unwrap();
        let instants: Vec<_> = clock.instants().collect();
        assert_eq!(instants.len(), 4);
        assert_eq!(instants[1], Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        for pair in instants.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::minutes(1));
        }
    }

    #[test]
    fn test_policy_serialization() {
        let policy = TimezonePolicy::FixedOffset { minutes: 60 };
        let json = serde_json::to_string(&policy).unwrap();
        assert_eq!(json, r#"{"kind":"fixed_offset","minutes":60}"#);
        let back: TimezonePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
