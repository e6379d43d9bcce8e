use crate::ast::Ast;
use crate::context::Scope;
use crate::error::EvalError;
use crate::value::Value;

/// Evaluate every argument, dropping nulls
fn present(args: &[Ast], scope: &Scope) -> Result<Vec<Value>, EvalError> {
    let mut values = scope.evaluate_all(args)?;
    values.retain(|value| !value.is_null());
    Ok(values)
}

fn numbers(args: &[Ast], scope: &Scope) -> Result<Vec<f64>, EvalError> {
    present(args, scope)?.iter().map(Value::to_f64).collect()
}

pub(super) fn count(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let count = present(args, scope)?.len();
    Ok(Value::Integer(i64::try_from(count).unwrap_or(i64::MAX)))
}

pub(super) fn sum(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let values = present(args, scope)?;
    let mut total = Some(0_i64);
    for value in &values {
        total = match (total, value) {
            (Some(total), Value::Integer(value)) => total.checked_add(*value),
            _ => None,
        };
    }
    match total {
        Some(total) => Ok(Value::Integer(total)),
        None => {
            let mut total = 0.0;
            for value in &values {
                total += value.to_f64()?;
            }
            Ok(Value::Float(total))
        }
    }
}

pub(super) fn average(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let numbers = numbers(args, scope)?;
    if numbers.is_empty() {
        return Ok(Value::Null);
    }
    Ok(Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

pub(super) fn median(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let mut numbers = numbers(args, scope)?;
    if numbers.is_empty() {
        return Ok(Value::Null);
    }
    numbers.sort_by(f64::total_cmp);
    let middle = numbers.len() / 2;
    let median = if numbers.len() % 2 == 0 {
        // halved first, the sum of two large values overflows
        numbers[middle - 1] / 2.0 + numbers[middle] / 2.0
    } else {
        numbers[middle]
    };
    Ok(Value::Float(median))
}

/// The argument that `keep` prefers over all others, in its original type
fn extremum(args: &[Ast], scope: &Scope, keep: fn(f64, f64) -> bool) -> Result<Value, EvalError> {
    let mut best: Option<(f64, Value)> = None;
    for value in present(args, scope)? {
        let number = value.to_f64()?;
        best = match best {
            Some((current, _)) if !keep(number, current) => best,
            _ => Some((number, value)),
        };
    }
    Ok(best.map_or(Value::Null, |(_, value)| value))
}

pub(super) fn max(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    extremum(args, scope, |candidate, current| candidate > current)
}

pub(super) fn min(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    extremum(args, scope, |candidate, current| candidate < current)
}
