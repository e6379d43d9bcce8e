use crate::ast::{logical, Ast};
use crate::context::Scope;
use crate::error::EvalError;
use crate::value::Value;

/// `If(condition, then, otherwise)`: only the chosen branch is evaluated
pub(super) fn if_(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    if logical(&scope.evaluate(&args[0])?)? {
        scope.evaluate(&args[1])
    } else {
        scope.evaluate(&args[2])
    }
}

/// `In(value, candidates...)`: candidates are evaluated until one is equal
pub(super) fn in_(args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
    let value = scope.evaluate(&args[0])?;
    for candidate in &args[1..] {
        if value.loose_eq(&scope.evaluate(candidate)?) {
            return Ok(Value::Boolean(true));
        }
    }
    Ok(Value::Boolean(false))
}
