//! Functions callable from expressions, and the standard catalog.
//!
//! A function receives its arguments unevaluated, together with the
//! [`Scope`] of the current evaluation. It decides which arguments to
//! evaluate and in which order, which is how `If` only evaluates the chosen
//! branch.

use crate::ast::Ast;
use crate::context::Scope;
use crate::error::EvalError;
use crate::value::Value;
use std::fmt::{self, Display, Formatter};

mod date;
mod logical;
mod math;
mod statistical;
mod string;

/// A function that can be registered in a [`Registry`](crate::Registry).
///
/// Implementations must not keep per-call state: a compiled expression can
/// be evaluated concurrently from several threads.
pub trait Function: Send + Sync {
    /// Name used to call the function
    fn name(&self) -> &str;

    /// Accepted number of arguments. Calls outside these bounds are rejected
    /// when the expression is compiled.
    fn arity(&self) -> Arity;

    /// Evaluate the function with unevaluated `args`.
    fn evaluate(&self, args: &[Ast], scope: &Scope) -> Result<Value, EvalError>;
}

/// Bounds on the number of arguments of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    /// Fewest arguments accepted
    pub min: usize,
    /// `None` for variadic functions
    pub max: Option<usize>,
}

impl Arity {
    /// Exactly `count` arguments
    #[must_use]
    pub const fn exactly(count: usize) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    /// From `min` to `max` arguments, both included
    #[must_use]
    pub const fn between(min: usize, max: usize) -> Self {
        Self { min, max: Some(max) }
    }

    /// `min` arguments or more
    #[must_use]
    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    /// Check if `count` arguments are accepted
    #[must_use]
    pub fn accepts(self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }

    /// Validate the number of arguments given to `function`.
    pub fn check(self, function: &str, count: usize) -> Result<(), EvalError> {
        if self.accepts(count) {
            Ok(())
        } else {
            Err(EvalError::Arity {
                function: function.to_owned(),
                expected: self,
                found: count,
            })
        }
    }
}

impl Display for Arity {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(fmt, "exactly {}", max),
            Some(max) => write!(fmt, "between {} and {}", self.min, max),
            None => write!(fmt, "at least {}", self.min),
        }
    }
}

/// Signature of the functions in the standard catalog
pub type NativeFn = fn(&[Ast], &Scope) -> Result<Value, EvalError>;

/// A function implemented by a plain Rust function pointer
#[derive(Clone, Copy)]
pub struct NativeFunction {
    name: &'static str,
    arity: Arity,
    func: NativeFn,
}

impl NativeFunction {
    /// A function called `name`, checking `arity` before calling `func`
    #[must_use]
    pub const fn new(name: &'static str, arity: Arity, func: NativeFn) -> Self {
        Self { name, arity, func }
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

impl Function for NativeFunction {
    fn name(&self) -> &str {
        self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn evaluate(&self, args: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
        self.arity.check(self.name, args.len())?;
        (self.func)(args, scope)
    }
}

/// Defines the standard catalog as a table of `name => (arity, function)`.
macro_rules! native_functions {
    (
        $(
            $name:literal => ($arity:expr, $func:expr)
        ),* $(,)?
    ) => {
        /// All the functions of the standard catalog
        pub(crate) fn standard_functions() -> Vec<NativeFunction> {
            vec![
                $(
                    NativeFunction::new($name, $arity, $func),
                )*
            ]
        }
    };
}

native_functions! {
    // math
    "Abs" => (Arity::exactly(1), math::abs),
    "Acos" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::acos)),
    "Asin" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::asin)),
    "Atan" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::atan)),
    "Ceiling" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::ceil)),
    "Cos" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::cos)),
    "Exp" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::exp)),
    "Floor" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::floor)),
    "IEEERemainder" => (Arity::exactly(2), math::ieee_remainder),
    "Log" => (Arity::exactly(2), math::log),
    "Log10" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::log10)),
    "Pow" => (Arity::exactly(2), math::pow),
    "Round" => (Arity::between(1, 2), math::round),
    "Sign" => (Arity::exactly(1), math::sign),
    "Sin" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::sin)),
    "Sqrt" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::sqrt)),
    "Tan" => (Arity::exactly(1), |args, scope| math::unary(args, scope, f64::tan)),
    "Truncate" => (Arity::exactly(1), |args, scope| math::unary(args, scope, libm::trunc)),
    // statistics
    "Average" => (Arity::at_least(1), statistical::average),
    "Count" => (Arity::at_least(1), statistical::count),
    "Max" => (Arity::at_least(1), statistical::max),
    "Median" => (Arity::at_least(1), statistical::median),
    "Min" => (Arity::at_least(1), statistical::min),
    "Sum" => (Arity::at_least(1), statistical::sum),
    // dates
    "AddYears" => (Arity::exactly(2), |args, scope| date::add_months(args, scope, "AddYears", 12)),
    "AddMonths" => (Arity::exactly(2), |args, scope| date::add_months(args, scope, "AddMonths", 1)),
    "AddDays" => (Arity::exactly(2), |args, scope| date::add(args, scope, "AddDays", date::DAY)),
    "AddHours" => (Arity::exactly(2), |args, scope| date::add(args, scope, "AddHours", date::HOUR)),
    "AddMinutes" => (Arity::exactly(2), |args, scope| date::add(args, scope, "AddMinutes", date::MINUTE)),
    "AddSeconds" => (Arity::exactly(2), |args, scope| date::add(args, scope, "AddSeconds", date::SECOND)),
    "AddMilliseconds" => (Arity::exactly(2), |args, scope| date::add(args, scope, "AddMilliseconds", date::MILLISECOND)),
    "YearOf" => (Arity::exactly(1), date::year_of),
    "MonthOf" => (Arity::exactly(1), date::month_of),
    "DayOf" => (Arity::exactly(1), date::day_of),
    "HourOf" => (Arity::exactly(1), date::hour_of),
    "MinuteOf" => (Arity::exactly(1), date::minute_of),
    "SecondOf" => (Arity::exactly(1), date::second_of),
    "MillisecondOf" => (Arity::exactly(1), date::millisecond_of),
    "DaysBetween" => (Arity::exactly(2), |args, scope| date::between(args, scope, date::DAY)),
    "HoursBetween" => (Arity::exactly(2), |args, scope| date::between(args, scope, date::HOUR)),
    "MinutesBetween" => (Arity::exactly(2), |args, scope| date::between(args, scope, date::MINUTE)),
    "SecondsBetween" => (Arity::exactly(2), |args, scope| date::between(args, scope, date::SECOND)),
    "MillisecondsBetween" => (Arity::exactly(2), |args, scope| date::between(args, scope, date::MILLISECOND)),
    // logic
    "If" => (Arity::exactly(3), logical::if_),
    "In" => (Arity::at_least(2), logical::in_),
    // strings
    "Concat" => (Arity::at_least(1), string::concat),
    "Contains" => (Arity::exactly(2), string::contains),
    "EndsWith" => (Arity::exactly(2), string::ends_with),
    "Length" => (Arity::exactly(1), string::length),
    "Lowercase" => (Arity::exactly(1), string::lowercase),
    "StartsWith" => (Arity::exactly(2), string::starts_with),
    "Substring" => (Arity::between(2, 3), string::substring),
    "Uppercase" => (Arity::exactly(1), string::uppercase),
}
