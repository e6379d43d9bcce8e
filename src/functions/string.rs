use crate::ast::Ast;
use crate::context::Scope;
use crate::error::EvalError;
use crate::value::Value;

/// Evaluate `args` as strings, or `None` if one of them is null
fn strings<const N: usize>(args: &[Ast], scope: &Scope) -> Result<Option<[String; N]>, EvalError> {
    let mut values: [String; N] = std::array::from_fn(|_| String::new());
    for (slot, arg) in values.iter_mut().zip(args) {
        let value = scope.evaluate(arg)?;
        if value.is_null() {
            return Ok(None);
        }
        *slot = value.to_text()?;
    }
    Ok(Some(values))
}

/// Concatenation of every non-null argument
pub(super) fn concat(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let mut result = String::new();
    for value in scope.evaluate_all(args)? {
        if !value.is_null() {
            result.push_str(&value.to_text()?);
        }
    }
    Ok(Value::String(result))
}

pub(super) fn contains(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(strings::<2>(args, scope)?.map_or(Value::Null, |[text, search]| Value::Boolean(text.contains(&search))))
}

pub(super) fn starts_with(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(strings::<2>(args, scope)?.map_or(Value::Null, |[text, prefix]| Value::Boolean(text.starts_with(&prefix))))
}

pub(super) fn ends_with(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(strings::<2>(args, scope)?.map_or(Value::Null, |[text, suffix]| Value::Boolean(text.ends_with(&suffix))))
}

/// Number of characters
pub(super) fn length(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(strings::<1>(args, scope)?.map_or(Value::Null, |[text]| {
        Value::Integer(i64::try_from(text.chars().count()).unwrap_or(i64::MAX))
    }))
}

pub(super) fn lowercase(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(strings::<1>(args, scope)?.map_or(Value::Null, |[text]| Value::String(text.to_lowercase())))
}

pub(super) fn uppercase(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    Ok(strings::<1>(args, scope)?.map_or(Value::Null, |[text]| Value::String(text.to_uppercase())))
}

/// `Substring(text, start)` or `Substring(text, start, length)`, counted in
/// characters from zero
pub(super) fn substring(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let values = scope.evaluate_all(args)?;
    if values.iter().any(Value::is_null) {
        return Ok(Value::Null);
    }
    let text = values[0].to_text()?;
    let total = text.chars().count();
    let start = values[1].to_integer()?;
    let length = match values.get(2) {
        Some(length) => length.to_integer()?,
        None => i64::try_from(total).unwrap_or(i64::MAX).saturating_sub(start),
    };

    let range = usize::try_from(start)
        .ok()
        .zip(usize::try_from(length).ok())
        .filter(|(start, length)| start.checked_add(*length).map_or(false, |end| end <= total));
    match range {
        Some((start, length)) => Ok(Value::String(text.chars().skip(start).take(length).collect())),
        None => Err(EvalError::function(
            "Substring",
            format!("range {}+{} is outside of a string of length {}", start, length, total),
        )),
    }
}
