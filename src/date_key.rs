use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

/// A calendar day in the user's local timezone, rendered as `YYYY-MM-DD`.
///
/// Every day boundary in the crate goes through this type: record keys,
/// "is this the displayed day" checks and the weekly overview. It is always
/// derived from the wall-clock date of an instant in a concrete timezone,
/// never by truncating a UTC timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateKey(NaiveDate);

impl DateKey {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Local calendar day of `instant` as seen in its own timezone.
    pub fn of<Tz: TimeZone>(instant: &DateTime<Tz>) -> Self {
        Self(instant.date_naive())
    }

    pub fn today() -> Self {
        Self::of(&Local::now())
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn add_days(&self, days: i64) -> Self {
        self.0
            .checked_add_signed(Duration::days(days))
            .map(Self)
            .unwrap_or(*self)
    }
}

/// Free-function form used by collaborators that only deal in instants.
pub fn to_date_key<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateKey {
    DateKey::of(instant)
}

/// Zero-padded 24-hour wall-clock `HH:mm` of `instant` in its own timezone.
pub fn to_hhmm<Tz: TimeZone>(instant: &DateTime<Tz>) -> String {
    format!("{:02}:{:02}", instant.hour(), instant.minute())
}

/// Accepts only the canonical zero-padded `HH:mm` form.
pub fn is_valid_hhmm(value: &str) -> bool {
    let bytes = value.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| -> Option<u32> {
        value.get(range)?.parse::<u32>().ok()
    };
    if !bytes[..2].iter().chain(&bytes[3..]).all(u8::is_ascii_digit) {
        return false;
    }
    matches!((digits(0..2), digits(3..5)), (Some(h), Some(m)) if h < 24 && m < 60)
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(DATE_KEY_FORMAT))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date key: {0:?}")]
pub struct ParseDateKeyError(pub String);

impl FromStr for DateKey {
    type Err = ParseDateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // NaiveDate parsing accepts unpadded fields; keys must stay canonical.
        if s.len() != 10 {
            return Err(ParseDateKeyError(s.to_string()));
        }
        NaiveDate::parse_from_str(s, DATE_KEY_FORMAT)
            .map(Self)
            .map_err(|_| ParseDateKeyError(s.to_string()))
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Source of "now" for everything that depends on wall-clock time.
pub trait Clock: Send + Sync {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;

    fn today(&self) -> DateKey {
        DateKey::of(&self.now())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}
