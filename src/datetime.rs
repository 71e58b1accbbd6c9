//! Host-facing date/time value types and their conversion from the binary protocol.
//!
//! The decoder first normalizes every temporal wire form into [`MysqlTime`]; the typed
//! getters of a result set then convert it into [`DateTime`] or [`Time`].

use std::fmt;

use crate::protocol::value::Value;

/// Normalized temporal value as delivered by the server.
///
/// For `TIME` values the day count is folded into `hour`, so `hour` may exceed 23.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MysqlTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u32,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
    pub negative: bool,
}

impl MysqlTime {
    /// Normalize a temporal wire value; `None` for non-temporal values.
    ///
    /// DATE and DATETIME share wire forms, so a DATE reads as midnight.
    pub fn from_value(value: &Value<'_>) -> Option<Self> {
        let time = match value {
            Value::Timestamp0 | Value::Time0 => Self::default(),
            Value::Timestamp4(ts) => Self {
                year: ts.year.get(),
                month: ts.month,
                day: ts.day,
                ..Self::default()
            },
            Value::Timestamp7(ts) => Self {
                year: ts.year.get(),
                month: ts.month,
                day: ts.day,
                hour: u32::from(ts.hour),
                minute: ts.minute,
                second: ts.second,
                ..Self::default()
            },
            Value::Timestamp11(ts) => Self {
                year: ts.year.get(),
                month: ts.month,
                day: ts.day,
                hour: u32::from(ts.hour),
                minute: ts.minute,
                second: ts.second,
                microsecond: ts.microsecond.get(),
                ..Self::default()
            },
            Value::Time8(t) => Self {
                hour: t.days.get().saturating_mul(24).saturating_add(u32::from(t.hour)),
                minute: t.minute,
                second: t.second,
                negative: t.is_negative != 0,
                ..Self::default()
            },
            Value::Time12(t) => Self {
                hour: t.days.get().saturating_mul(24).saturating_add(u32::from(t.hour)),
                minute: t.minute,
                second: t.second,
                microsecond: t.microsecond.get(),
                negative: t.is_negative != 0,
                ..Self::default()
            },
            _ => return None,
        };
        Some(time)
    }
}

/// Calendar date and time of day.
///
/// The all-zero default doubles as the "null date" returned for NULL or missing columns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub microsecond: u32,
}

impl DateTime {
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
            microsecond: 0,
        }
    }

    pub fn from_date(year: u16, month: u8, day: u8) -> Self {
        Self::new(year, month, day, 0, 0, 0)
    }

    /// Convert a decoded temporal value. `TIME` values wrap into the time of day.
    pub fn from_mysql_time(time: &MysqlTime) -> Self {
        Self {
            year: time.year,
            month: time.month,
            day: time.day,
            hour: (time.hour % 24) as u8,
            minute: time.minute,
            second: time.second,
            microsecond: time.microsecond,
        }
    }

    /// `0000-00-00 00:00:00`
    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

impl fmt::Display for DateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )?;
        if self.microsecond != 0 {
            write!(f, ".{:06}", self.microsecond)?;
        }
        Ok(())
    }
}

/// Signed duration in the `TIME` range (-838:59:59 to 838:59:59)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Time {
    pub negative: bool,
    pub hours: u32,
    pub minutes: u8,
    pub seconds: u8,
    pub microseconds: u32,
}

impl Time {
    pub fn new(hours: u32, minutes: u8, seconds: u8) -> Self {
        Self {
            negative: false,
            hours,
            minutes,
            seconds,
            microseconds: 0,
        }
    }

    /// Convert a decoded temporal value; for DATETIME values only the time of day is kept.
    pub fn from_mysql_time(time: &MysqlTime) -> Self {
        Self {
            negative: time.negative,
            hours: time.hour,
            minutes: time.minute,
            seconds: time.second,
            microseconds: time.microsecond,
        }
    }

    pub fn total_seconds(&self) -> i64 {
        let secs = i64::from(self.hours) * 3600
            + i64::from(self.minutes) * 60
            + i64::from(self.seconds);
        if self.negative { -secs } else { secs }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)?;
        if self.microseconds != 0 {
            write!(f, ".{:06}", self.microseconds)?;
        }
        Ok(())
    }
}

#[cfg(feature = "with-chrono")]
mod chrono_interop {
    use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

    use super::{DateTime, Time};
    use crate::error::Error;

    impl TryFrom<DateTime> for NaiveDateTime {
        type Error = Error;

        fn try_from(value: DateTime) -> Result<Self, Self::Error> {
            let date = NaiveDate::from_ymd_opt(
                i32::from(value.year),
                u32::from(value.month),
                u32::from(value.day),
            )
            .ok_or_else(|| Error::BadUsageError(format!("invalid date: {value}")))?;
            let time = NaiveTime::from_hms_micro_opt(
                u32::from(value.hour),
                u32::from(value.minute),
                u32::from(value.second),
                value.microsecond,
            )
            .ok_or_else(|| Error::BadUsageError(format!("invalid time of day: {value}")))?;
            Ok(NaiveDateTime::new(date, time))
        }
    }

    impl TryFrom<DateTime> for NaiveDate {
        type Error = Error;

        fn try_from(value: DateTime) -> Result<Self, Self::Error> {
            NaiveDateTime::try_from(value).map(|dt| dt.date())
        }
    }

    impl TryFrom<Time> for NaiveTime {
        type Error = Error;

        fn try_from(value: Time) -> Result<Self, Self::Error> {
            if value.negative {
                return Err(Error::BadUsageError(format!(
                    "negative TIME has no time of day: {value}"
                )));
            }
            NaiveTime::from_hms_micro_opt(
                value.hours,
                u32::from(value.minutes),
                u32::from(value.seconds),
                value.microseconds,
            )
            .ok_or_else(|| Error::BadUsageError(format!("TIME out of day range: {value}")))
        }
    }

    impl From<NaiveDateTime> for DateTime {
        fn from(value: NaiveDateTime) -> Self {
            Self {
                year: u16::try_from(value.year()).unwrap_or(0),
                month: value.month() as u8,
                day: value.day() as u8,
                hour: value.hour() as u8,
                minute: value.minute() as u8,
                second: value.second() as u8,
                microsecond: value.nanosecond() / 1000,
            }
        }
    }

    impl From<NaiveDate> for DateTime {
        fn from(value: NaiveDate) -> Self {
            Self::from_date(
                u16::try_from(value.year()).unwrap_or(0),
                value.month() as u8,
                value.day() as u8,
            )
        }
    }

    impl From<NaiveTime> for Time {
        fn from(value: NaiveTime) -> Self {
            Self {
                negative: false,
                hours: value.hour(),
                minutes: value.minute() as u8,
                seconds: value.second() as u8,
                microseconds: value.nanosecond() / 1000,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::value::{Time12, Timestamp7};
    use zerocopy::FromBytes;

    #[test]
    fn test_datetime_from_timestamp7() {
        let bytes = [0xE8, 0x07, 12, 25, 15, 30, 45];
        let ts = Timestamp7::ref_from_bytes(&bytes).unwrap();
        let time = MysqlTime::from_value(&Value::Timestamp7(ts)).unwrap();

        let dt = DateTime::from_mysql_time(&time);
        assert_eq!(dt, DateTime::new(2024, 12, 25, 15, 30, 45));
        assert_eq!(dt.to_string(), "2024-12-25 15:30:45");
    }

    #[test]
    fn test_time_folds_days_into_hours() {
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&2u32.to_le_bytes());
        bytes.extend_from_slice(&[3, 4, 5]);
        bytes.extend_from_slice(&250u32.to_le_bytes());
        let t = Time12::ref_from_bytes(&bytes).unwrap();
        let time = MysqlTime::from_value(&Value::Time12(t)).unwrap();

        let converted = Time::from_mysql_time(&time);
        assert!(converted.negative);
        assert_eq!(converted.hours, 51);
        assert_eq!(converted.to_string(), "-51:04:05.000250");
        assert_eq!(converted.total_seconds(), -(51 * 3600 + 4 * 60 + 5));

        // As a DateTime only the time of day survives
        assert_eq!(DateTime::from_mysql_time(&time).hour, 3);
    }

    #[test]
    fn test_zero_and_non_temporal() {
        let zero = MysqlTime::from_value(&Value::Timestamp0).unwrap();
        assert!(DateTime::from_mysql_time(&zero).is_zero());
        assert!(MysqlTime::from_value(&Value::SignedInt(1)).is_none());
    }
}
