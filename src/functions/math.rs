use crate::ast::Ast;
use crate::context::Scope;
use crate::error::EvalError;
use crate::value::Value;

/// Apply `op` to a single numeric argument. Null propagates.
pub(super) fn unary(args: &[Ast], scope: &Scope, op: fn(f64) -> f64) -> Result<Value, EvalError> {
    let value = scope.evaluate(&args[0])?;
    if value.is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Float(op(value.to_f64()?)))
}

/// Evaluate both arguments as numbers, or `None` if one of them is null.
fn binary(args: &[Ast], scope: &Scope) -> Result<Option<(f64, f64)>, EvalError> {
    let lhs = scope.evaluate(&args[0])?;
    let rhs = scope.evaluate(&args[1])?;
    if lhs.is_null() || rhs.is_null() {
        return Ok(None);
    }
    Ok(Some((lhs.to_f64()?, rhs.to_f64()?)))
}

pub(super) fn abs(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    match scope.evaluate(&args[0])? {
        Value::Null => Ok(Value::Null),
        Value::Integer(value) => Ok(value
            .checked_abs()
            .map_or(Value::Float((value as f64).abs()), Value::Integer)),
        other => Ok(Value::Float(other.to_f64()?.abs())),
    }
}

/// IEEE 754 remainder: `x - y * n` with `n` the integer nearest to `x / y`.
///
/// Unlike the other math functions there is no null check: a null argument
/// is a coercion error.
pub(super) fn ieee_remainder(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let x = scope.evaluate(&args[0])?.to_f64()?;
    let y = scope.evaluate(&args[1])?.to_f64()?;
    Ok(Value::Float(libm::remainder(x, y)))
}

/// `Log(value, base)`
pub(super) fn log(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(binary(args, scope)?.map_or(Value::Null, |(value, base)| Value::Float(value.ln() / base.ln())))
}

pub(super) fn pow(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(binary(args, scope)?.map_or(Value::Null, |(x, y)| Value::Float(libm::pow(x, y))))
}

/// `Round(value)` or `Round(value, digits)`, rounding half to even
pub(super) fn round(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let value = scope.evaluate(&args[0])?;
    let digits = match args.get(1) {
        Some(arg) => scope.evaluate(arg)?,
        None => Value::Integer(0),
    };
    if value.is_null() || digits.is_null() {
        return Ok(Value::Null);
    }

    let value = value.to_f64()?;
    let digits = digits.to_integer()?;
    if !(0..=15).contains(&digits) {
        return Err(EvalError::function("Round", format!("digits must be between 0 and 15, got {}", digits)));
    }
    let factor = 10_f64.powi(digits as i32);
    Ok(Value::Float((value * factor).round_ties_even() / factor))
}

pub(super) fn sign(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let value = scope.evaluate(&args[0])?;
    if value.is_null() {
        return Ok(Value::Null);
    }
    let value = value.to_f64()?;
    if value.is_nan() {
        return Err(EvalError::function("Sign", "argument is NaN"));
    }
    let sign = if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    };
    Ok(Value::Integer(sign))
}
