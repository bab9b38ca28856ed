use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Minutes in a calendar day; interpolation wraps modulo this.
pub const MINUTES_PER_DAY: i32 = 24 * 60;

/// Time-of-day value with minute resolution, no date attached.
///
/// Schedules carry a start and an end time; the end may be numerically
/// earlier than the start when a shift crosses midnight, so arithmetic on
/// these values always wraps modulo [`MINUTES_PER_DAY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    /// Build from hour and minute. Returns `None` when out of range.
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(TimeOfDay)
    }

    /// Parse an `HH:MM` or `HH:MM:SS` string.
    pub fn parse(s: &str) -> Result<Self, String> {
        NaiveTime::parse_from_str(s, "%H:%M:%S")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
            .map(TimeOfDay)
            .map_err(|_| format!("invalid time of day '{}', expected HH:MM or HH:MM:SS", s))
    }

    /// Minutes since midnight, in `0..1440`. Seconds are truncated.
    pub fn minutes_since_midnight(&self) -> i32 {
        (self.0.hour() * 60 + self.0.minute()) as i32
    }

    /// Build from minutes since midnight, wrapping modulo one day.
    pub fn from_minutes(minutes: i32) -> Self {
        let m = minutes.rem_euclid(MINUTES_PER_DAY) as u32;
        TimeOfDay(
            NaiveTime::from_hms_opt(m / 60, m % 60, 0)
                .unwrap_or(NaiveTime::MIN),
        )
    }

    /// Forward duration in minutes from `self` to `end`, wrapping past
    /// midnight so the result is always non-negative.
    pub fn minutes_until(&self, end: TimeOfDay) -> i32 {
        (end.minutes_since_midnight() - self.minutes_since_midnight()).rem_euclid(MINUTES_PER_DAY)
    }

    /// Underlying chrono time (for database storage).
    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(t: NaiveTime) -> Self {
        TimeOfDay(t)
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl std::str::FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeOfDay::parse(s)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TimeOfDay::parse(&s)
    }
}

impl From<TimeOfDay> for String {
    fn from(t: TimeOfDay) -> Self {
        t.to_string()
    }
}
