use crate::ast::Ast;
use crate::context::Scope;
use crate::error::EvalError;
use crate::value::Value;
use chrono::{Datelike, Months, NaiveDateTime, TimeDelta, Timelike};

// Length of each unit in milliseconds
pub(super) const MILLISECOND: f64 = 1.0;
pub(super) const SECOND: f64 = 1_000.0;
pub(super) const MINUTE: f64 = 60_000.0;
pub(super) const HOUR: f64 = 3_600_000.0;
pub(super) const DAY: f64 = 86_400_000.0;

/// Evaluate a date argument, or `None` if it is null
fn date(arg: &Ast, scope: &Scope) -> Result<Option<NaiveDateTime>, EvalError> {
    let value = scope.evaluate(arg)?;
    if value.is_null() {
        return Ok(None);
    }
    value.to_datetime().map(Some)
}

/// Extract a component of a date argument. Null propagates.
fn component(args: &[Ast], scope: &Scope, get: fn(&NaiveDateTime) -> u32) -> Result<Value, EvalError> {
    Ok(date(&args[0], scope)?.map_or(Value::Null, |date| Value::Integer(i64::from(get(&date)))))
}

pub(super) fn year_of(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(date(&args[0], scope)?.map_or(Value::Null, |date| Value::Integer(i64::from(date.year()))))
}

pub(super) fn month_of(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    component(args, scope, |date| date.month())
}

pub(super) fn day_of(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    component(args, scope, |date| date.day())
}

pub(super) fn hour_of(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    component(args, scope, |date| date.hour())
}

/// Unlike the other date components there is no null check: a null argument
/// is a coercion error.
pub(super) fn minute_of(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let date = scope.evaluate(&args[0])?.to_datetime()?;
    Ok(Value::Integer(i64::from(date.minute())))
}

pub(super) fn second_of(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    component(args, scope, |date| date.second())
}

pub(super) fn millisecond_of(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    // Leap seconds are reported with nanoseconds above one second
    component(args, scope, |date| date.nanosecond() % 1_000_000_000 / 1_000_000)
}

/// Fractional number of milliseconds in `delta`
fn total_milliseconds(delta: TimeDelta) -> f64 {
    match delta.num_microseconds() {
        Some(micros) => micros as f64 / 1_000.0,
        None => delta.num_milliseconds() as f64,
    }
}

/// `end - start`, expressed in `unit` milliseconds. Null propagates.
pub(super) fn between(args: &[Ast], scope: &Scope, unit: f64) -> Result<Value, EvalError> {
    let start = date(&args[0], scope)?;
    let end = date(&args[1], scope)?;
    match (start, end) {
        (Some(start), Some(end)) => {
            let delta = end.signed_duration_since(start);
            Ok(Value::Float(total_milliseconds(delta) / unit))
        }
        _ => Ok(Value::Null),
    }
}

/// Add a fractional `amount` of `unit` milliseconds to a date. Null propagates.
pub(super) fn add(args: &[Ast], scope: &Scope, function: &str, unit: f64) -> Result<Value, EvalError> {
    let date = date(&args[0], scope)?;
    let amount = scope.evaluate(&args[1])?;
    let (date, amount) = match (date, amount) {
        (Some(date), amount) if !amount.is_null() => (date, amount.to_f64()?),
        _ => return Ok(Value::Null),
    };

    let millis = (amount * unit).round();
    // Beyond about 292 million years the delta does not fit
    if !millis.is_finite() || millis.abs() >= 9.2e18 {
        return Err(EvalError::function(function, "amount out of range"));
    }
    TimeDelta::try_milliseconds(millis as i64)
        .and_then(|delta| date.checked_add_signed(delta))
        .map(Value::DateTime)
        .ok_or_else(|| EvalError::function(function, "resulting date out of range"))
}

/// Add an integral number of `amount * factor` months. Null propagates.
pub(super) fn add_months(args: &[Ast], scope: &Scope, function: &str, factor: i64) -> Result<Value, EvalError> {
    let date = date(&args[0], scope)?;
    let amount = scope.evaluate(&args[1])?;
    let (date, amount) = match (date, amount) {
        (Some(date), amount) if !amount.is_null() => (date, amount.to_integer()?),
        _ => return Ok(Value::Null),
    };

    let out_of_range = || EvalError::function(function, "resulting date out of range");
    let months = amount.checked_mul(factor).ok_or_else(out_of_range)?;
    let count = u32::try_from(months.unsigned_abs()).map_err(|_| out_of_range())?;
    let result = if months >= 0 {
        date.checked_add_months(Months::new(count))
    } else {
        date.checked_sub_months(Months::new(count))
    };
    result.map(Value::DateTime).ok_or_else(out_of_range)
}

#[cfg(test)]
mod tests {
    use crate::{eval, Error, EvalError, Expr, Value};
    use chrono::{NaiveDate, NaiveDateTime};
    use std::collections::HashMap;
    use test_case::test_case;

    fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(year, month, day)
            .unwrap()
            .and_hms_opt(hour, minute, second)
            .unwrap()
    }

    fn run(input: &str) -> Result<Value, Error> {
        eval(input, &HashMap::<String, Value>::new())
    }

    #[test_case("HoursBetween(#2024-01-01#, #2024-01-02 06:00:00#)" => Ok(Value::Float(30.0)) ; "hours")]
    #[test_case("DaysBetween(#2024-03-01#, #2024-02-28#)" => Ok(Value::Float(-2.0)) ; "negative days in a leap year")]
    #[test_case("MinutesBetween('2024-01-01 00:00', '2024-01-01 01:30')" => Ok(Value::Float(90.0)) ; "strings are dates")]
    #[test_case("SecondsBetween(#2024-01-01#, #2024-01-01 00:00:01.5#)" => Ok(Value::Float(1.5)) ; "fractional seconds")]
    #[test_case("MillisecondsBetween(#2024-01-01#, #2024-01-01 00:00:02#)" => Ok(Value::Float(2000.0)) ; "milliseconds")]
    #[test_case("HoursBetween(null, #2024-01-01#)" => Ok(Value::Null) ; "null start")]
    #[test_case("MillisecondsBetween(#2024-01-01#, null)" => Ok(Value::Null) ; "null end")]
    #[test_case("YearOf(#2024-05-06 07:08:09#)" => Ok(Value::Integer(2024)) ; "year")]
    #[test_case("MonthOf(#2024-05-06 07:08:09#)" => Ok(Value::Integer(5)) ; "month")]
    #[test_case("DayOf(#2024-05-06 07:08:09#)" => Ok(Value::Integer(6)) ; "day")]
    #[test_case("HourOf(#2024-05-06 07:08:09#)" => Ok(Value::Integer(7)) ; "hour")]
    #[test_case("MinuteOf(#2024-05-06 07:08:09#)" => Ok(Value::Integer(8)) ; "minute")]
    #[test_case("SecondOf(#2024-05-06 07:08:09#)" => Ok(Value::Integer(9)) ; "second")]
    #[test_case("MillisecondOf(#2024-05-06 07:08:09.25#)" => Ok(Value::Integer(250)) ; "millisecond")]
    #[test_case("SecondOf(null)" => Ok(Value::Null) ; "second of null")]
    fn dates(input: &str) -> Result<Value, Error> {
        run(input)
    }

    #[test_case("AddDays(#2024-02-28#, 2)" => Ok(Value::DateTime(at(2024, 3, 1, 0, 0, 0))) ; "days")]
    #[test_case("AddDays(#2024-02-28#, 0.5)" => Ok(Value::DateTime(at(2024, 2, 28, 12, 0, 0))) ; "fractional days")]
    #[test_case("AddHours(#2024-01-01#, -1)" => Ok(Value::DateTime(at(2023, 12, 31, 23, 0, 0))) ; "negative hours")]
    #[test_case("AddMinutes(#2024-01-01#, 90)" => Ok(Value::DateTime(at(2024, 1, 1, 1, 30, 0))) ; "minutes")]
    #[test_case("AddSeconds(#2024-01-01#, 61)" => Ok(Value::DateTime(at(2024, 1, 1, 0, 1, 1))) ; "seconds")]
    #[test_case("AddMonths(#2024-01-31#, 1)" => Ok(Value::DateTime(at(2024, 2, 29, 0, 0, 0))) ; "months clamp to the end of month")]
    #[test_case("AddMonths(#2024-03-15#, -3)" => Ok(Value::DateTime(at(2023, 12, 15, 0, 0, 0))) ; "negative months")]
    #[test_case("AddYears(#2024-02-29#, 1)" => Ok(Value::DateTime(at(2025, 2, 28, 0, 0, 0))) ; "years")]
    #[test_case("AddDays(null, 1)" => Ok(Value::Null) ; "null date")]
    #[test_case("AddDays(#2024-01-01#, null)" => Ok(Value::Null) ; "null amount")]
    fn arithmetic(input: &str) -> Result<Value, Error> {
        run(input)
    }

    #[test]
    fn out_of_range() {
        assert!(matches!(
            run("AddYears(#2024-01-01#, 1000000000)"),
            Err(Error::Eval(EvalError::Function { .. }))
        ));
        assert!(matches!(
            run("AddDays(#2024-01-01#, 1e300)"),
            Err(Error::Eval(EvalError::Function { .. }))
        ));
    }

    #[test]
    fn minute_of_does_not_check_null() {
        assert_eq!(
            run("MinuteOf(null)"),
            Err(Error::Eval(EvalError::Coercion {
                value: "null".into(),
                target: "date"
            }))
        );
    }

    #[test]
    fn milliseconds_are_hours() {
        let milliseconds = Expr::parse("MillisecondsBetween(start, end)").unwrap();
        let hours = Expr::parse("HoursBetween(start, end)").unwrap();
        let pairs = [
            (at(2024, 1, 1, 0, 0, 0), at(2024, 1, 1, 0, 0, 0)),
            (at(2024, 1, 1, 0, 0, 0), at(2024, 3, 1, 17, 45, 12)),
            (at(2030, 6, 15, 8, 0, 1), at(1999, 12, 31, 23, 59, 59)),
            (at(2024, 2, 29, 12, 0, 0), at(2024, 2, 29, 12, 0, 0) + chrono::TimeDelta::milliseconds(1)),
        ];
        for (start, end) in pairs {
            let mut context: HashMap<String, Value> = HashMap::new();
            context.insert("start".into(), start.into());
            context.insert("end".into(), end.into());
            let milliseconds = milliseconds.eval(&context).unwrap().to_f64().unwrap();
            let hours = hours.eval(&context).unwrap().to_f64().unwrap();
            assert!(
                (milliseconds - hours * 3_600_000.0).abs() <= milliseconds.abs() * 1e-12,
                "{} ms and {} h differ for {} .. {}",
                milliseconds,
                hours,
                start,
                end
            );
        }
    }
}
