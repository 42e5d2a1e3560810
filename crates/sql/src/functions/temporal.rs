//! Date and time field extraction

use super::{ScalarFunction, unconvertible};
use crate::error::Result;
use crate::types::{ExecutionContext, Value};
use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};

fn date_of(function: &str, value: &Value, context: &ExecutionContext) -> Result<NaiveDate> {
    match value {
        Value::Date(date) => Ok(date.date),
        Value::Timestamp(ts) => Ok(ts.date().date),
        Value::Str(s) => context
            .rules
            .parse_timestamp(s.trim())?
            .map(|ts| ts.date().date)
            .ok_or_else(|| unconvertible(function, value)),
        other => Err(unconvertible(function, other)),
    }
}

fn time_of(function: &str, value: &Value, context: &ExecutionContext) -> Result<NaiveTime> {
    match value {
        Value::Time(time) => Ok(time.wall_clock()),
        Value::Timestamp(ts) => Ok(ts.instant.time()),
        Value::Str(s) => match context.rules.parse_time(s.trim()) {
            Some(time) => Ok(time.wall_clock()),
            None => context
                .rules
                .parse_timestamp(s.trim())?
                .map(|ts| ts.instant.time())
                .ok_or_else(|| unconvertible(function, value)),
        },
        other => Err(unconvertible(function, other)),
    }
}

/// Extracts a calendar or clock field. DAYOFWEEK counts from Sunday = 1.
pub(super) fn extract(
    function: ScalarFunction,
    value: &Value,
    context: &ExecutionContext,
) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let name = function.name();
    let field = match function {
        ScalarFunction::Year => date_of(name, value, context)?.year(),
        ScalarFunction::Month => date_of(name, value, context)?.month() as i32,
        ScalarFunction::DayOfMonth => date_of(name, value, context)?.day() as i32,
        ScalarFunction::DayOfWeek => {
            date_of(name, value, context)?.weekday().num_days_from_sunday() as i32 + 1
        }
        ScalarFunction::DayOfYear => date_of(name, value, context)?.ordinal() as i32,
        ScalarFunction::HourOfDay => time_of(name, value, context)?.hour() as i32,
        ScalarFunction::Minute => time_of(name, value, context)?.minute() as i32,
        ScalarFunction::Second => time_of(name, value, context)?.second() as i32,
        other => return Err(unconvertible(other.name(), value)),
    };
    Ok(Value::I32(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CancelHandle;
    use chrono_tz::Tz;
    use flatsql_value::{ConversionRules, Date, Time, Timestamp};

    fn with_context<T>(f: impl FnOnce(&ExecutionContext) -> T) -> T {
        let rules = ConversionRules::default();
        let cancel = CancelHandle::new();
        let context = ExecutionContext::new(&[], &rules, None, &cancel);
        f(&context)
    }

    #[test]
    fn test_date_fields() {
        with_context(|context| {
            // 2024-03-10 was a Sunday.
            let date = Value::Date(Date::from_ymd(2024, 3, 10, Tz::UTC).unwrap());
            assert_eq!(extract(ScalarFunction::Year, &date, context), Ok(Value::I32(2024)));
            assert_eq!(extract(ScalarFunction::Month, &date, context), Ok(Value::I32(3)));
            assert_eq!(extract(ScalarFunction::DayOfMonth, &date, context), Ok(Value::I32(10)));
            assert_eq!(extract(ScalarFunction::DayOfWeek, &date, context), Ok(Value::I32(1)));
            assert_eq!(extract(ScalarFunction::DayOfYear, &date, context), Ok(Value::I32(70)));
        });
    }

    #[test]
    fn test_time_fields() {
        with_context(|context| {
            let time = Value::Time(Time::new((13 * 3600 + 5 * 60 + 9) * 1000, Tz::UTC));
            assert_eq!(extract(ScalarFunction::HourOfDay, &time, context), Ok(Value::I32(13)));
            assert_eq!(extract(ScalarFunction::Minute, &time, context), Ok(Value::I32(5)));
            assert_eq!(extract(ScalarFunction::Second, &time, context), Ok(Value::I32(9)));
        });
    }

    #[test]
    fn test_timestamp_fields_use_the_zone() {
        with_context(|context| {
            let zone: Tz = "Europe/Berlin".parse().unwrap();
            // 2024-01-01 23:30 UTC is 00:30 on January 2nd in Berlin.
            let ts = Timestamp::from_millis(1_704_151_800_000, zone).unwrap();
            let value = Value::Timestamp(ts);
            assert_eq!(extract(ScalarFunction::DayOfMonth, &value, context), Ok(Value::I32(2)));
            assert_eq!(extract(ScalarFunction::HourOfDay, &value, context), Ok(Value::I32(0)));
        });
    }

    #[test]
    fn test_strings_and_errors() {
        with_context(|context| {
            let text = Value::Str("2023-12-31".into());
            assert_eq!(extract(ScalarFunction::Year, &text, context), Ok(Value::I32(2023)));
            assert_eq!(extract(ScalarFunction::Year, &Value::Null, context), Ok(Value::Null));
            assert!(extract(ScalarFunction::Year, &Value::I32(5), context).is_err());
        });
    }
}
