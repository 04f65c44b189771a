use std::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicU64, Ordering},
};

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{AlarmError, Result};

/// Process local identifier of an alarm.
/// Ids are handed out when an alarm is created or loaded and are never written to disk,
/// so two alarms with the same name, dose and time can still be told apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmId(u64);

impl fmt::Display for AlarmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

static UID: AtomicU64 = AtomicU64::new(1);

#[must_use]
pub fn get_uid() -> AlarmId {
    AlarmId(UID.fetch_add(1, Ordering::Relaxed))
}

/// Time of day with minute granularity, written as `HH:MM` (24 hour clock).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AlarmTime(NaiveTime);

impl AlarmTime {
    fn parse_saved(s: &str) -> Result<Self> {
        let invalid = || AlarmError::Validation(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        let digits = |part: &str, len: std::ops::RangeInclusive<usize>| {
            len.contains(&part.len()) && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !digits(hour, 1..=2) || !digits(minute, 2..=2) {
            return Err(invalid());
        }
        let hour = hour.parse().map_err(|_| invalid())?;
        let minute = minute.parse().map_err(|_| invalid())?;
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(Self)
            .ok_or_else(invalid)
    }

    /// Whole minutes from `earlier` to `self`, going forward through midnight.
    #[must_use]
    pub fn minutes_since(self, earlier: Self) -> i64 {
        (self.0 - earlier.0).num_minutes().rem_euclid(24 * 60)
    }

    /// Wraps around midnight.
    #[must_use]
    pub fn plus_minutes(self, minutes: i64) -> Self {
        Self(
            self.0
                .overflowing_add_signed(chrono::Duration::minutes(minutes))
                .0,
        )
    }

    /// Truncates `time` to the minute.
    #[must_use]
    pub fn from_time(time: NaiveTime) -> Self {
        Self(
            time.with_second(0)
                .and_then(|time| time.with_nanosecond(0))
                .unwrap_or(time),
        )
    }
}

impl FromStr for AlarmTime {
    type Err = AlarmError;

    /// Only accepts exactly two digit hours and minutes, `8:00` is rejected.
    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 5
            && bytes
                .iter()
                .enumerate()
                .all(|(i, b)| if i == 2 { *b == b':' } else { b.is_ascii_digit() });
        if !well_formed {
            return Err(AlarmError::Validation(s.to_string()));
        }
        NaiveTime::parse_from_str(s, "%H:%M")
            .map(Self)
            .map_err(|_| AlarmError::Validation(s.to_string()))
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for AlarmTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Saved files may hold times written before they were checked strictly (`8:00`), so reading
/// them back also accepts a single digit hour.
impl<'de> Deserialize<'de> for AlarmTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let time = String::deserialize(deserializer)?;
        Self::parse_saved(&time).map_err(serde::de::Error::custom)
    }
}

/// A one shot medicine reminder.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub name: String,
    pub dose: String,
    pub time: AlarmTime,
    #[serde(skip, default = "get_uid")]
    id: AlarmId,
}

impl Alarm {
    /// Creates an alarm with a fresh id, validating `time`.
    ///
    /// # Errors
    /// [`AlarmError::Validation`] if `time` isn't in `HH:MM` format.
    pub fn new(name: impl Into<String>, dose: impl Into<String>, time: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            dose: dose.into(),
            time: time.parse()?,
            id: get_uid(),
        })
    }

    #[must_use]
    pub const fn id(&self) -> AlarmId {
        self.id
    }

    /// The line shown when the alarm goes off.
    #[must_use]
    pub fn reminder(&self) -> String {
        format!("⏰ Reminder: take {} of {} now!", self.dose, self.name)
    }
}

impl fmt::Display for Alarm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} at {}", self.name, self.dose, self.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_times() {
        for time in ["00:00", "08:00", "12:30", "23:59"] {
            let parsed: AlarmTime = time.parse().unwrap();
            assert_eq!(parsed.to_string(), time);
        }
    }

    #[test]
    fn rejects_malformed_times() {
        for time in [
            "25:61", "24:00", "12:60", "8:00", "08:0", "", "08-00", "08:00:00", "ab:cd", " 8:00",
        ] {
            assert!(
                matches!(time.parse::<AlarmTime>(), Err(AlarmError::Validation(t)) if t == time),
                "{time:?} should be rejected"
            );
        }
    }

    #[test]
    fn from_time_truncates_to_minute() {
        let time = NaiveTime::from_hms_milli_opt(8, 0, 59, 999).unwrap();
        assert_eq!(AlarmTime::from_time(time), "08:00".parse().unwrap());
    }

    #[test]
    fn ids_are_unique_even_for_identical_alarms() {
        let a = Alarm::new("Aspirin", "1 pill", "08:00").unwrap();
        let b = Alarm::new("Aspirin", "1 pill", "08:00").unwrap();
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
    }

    #[test]
    fn id_is_not_serialized() {
        let alarm = Alarm::new("Aspirin", "1 pill", "08:00").unwrap();
        let json = serde_json::to_string(&alarm).unwrap();
        assert_eq!(json, r#"{"name":"Aspirin","dose":"1 pill","time":"08:00"}"#);
    }

    #[test]
    fn saved_single_digit_hour_is_read_back() {
        let alarm: Alarm =
            serde_json::from_str(r#"{"name":"Aspirin","dose":"1 pill","time":"8:00"}"#).unwrap();
        assert_eq!(alarm.time.to_string(), "08:00");
    }

    #[test]
    fn deserializing_rejects_bad_time() {
        for time in ["25:61", "noon", "8:0", "", "008:00"] {
            let json = format!(r#"{{"name":"Aspirin","dose":"1 pill","time":"{time}"}}"#);
            assert!(serde_json::from_str::<Alarm>(&json).is_err(), "{time:?}");
        }
    }

    #[test]
    fn minute_arithmetic_wraps_at_midnight() {
        let late: AlarmTime = "23:59".parse().unwrap();
        let early: AlarmTime = "00:01".parse().unwrap();
        assert_eq!(early.minutes_since(late), 2);
        assert_eq!(late.minutes_since(early), 24 * 60 - 2);
        assert_eq!(late.plus_minutes(1), "00:00".parse().unwrap());
        assert_eq!(early.minutes_since(early), 0);
    }

    #[test]
    fn display_and_reminder() {
        let alarm = Alarm::new("Aspirin", "1 pill", "08:00").unwrap();
        assert_eq!(alarm.to_string(), "Aspirin - 1 pill at 08:00");
        assert!(alarm.reminder().contains("1 pill of Aspirin"));
    }
}
