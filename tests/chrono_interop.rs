//! `chrono` conversions of the host date/time types

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pretty_assertions::assert_eq;
use zero_mysql_bind::error::Error;
use zero_mysql_bind::{DateTime, Time};

#[test]
fn datetime_into_naive_datetime() {
    let mut dt = DateTime::new(2024, 2, 29, 23, 59, 58);
    dt.microsecond = 250_000;
    let naive = NaiveDateTime::try_from(dt).unwrap();
    let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
        .unwrap()
        .and_hms_micro_opt(23, 59, 58, 250_000)
        .unwrap();
    assert_eq!(naive, expected);
    assert_eq!(DateTime::from(naive), dt);
}

#[test]
fn zero_date_is_rejected() {
    assert!(matches!(
        NaiveDate::try_from(DateTime::default()),
        Err(Error::BadUsageError(_))
    ));
}

#[test]
fn date_round_trip() {
    let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
    let dt = DateTime::from(date);
    assert_eq!(dt, DateTime::from_date(1999, 12, 31));
    assert_eq!(NaiveDate::try_from(dt).unwrap(), date);
}

#[test]
fn time_into_naive_time() {
    let naive = NaiveTime::try_from(Time::new(13, 5, 9)).unwrap();
    assert_eq!(naive, NaiveTime::from_hms_opt(13, 5, 9).unwrap());
    assert_eq!(Time::from(naive), Time::new(13, 5, 9));
}

#[test]
fn durations_outside_a_day_are_rejected() {
    assert!(NaiveTime::try_from(Time::new(26, 0, 0)).is_err());

    let mut negative = Time::new(1, 0, 0);
    negative.negative = true;
    assert!(NaiveTime::try_from(negative).is_err());
}
