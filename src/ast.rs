use crate::error::EvalError;
use crate::functions::Function;
use crate::lexer::is_variable;
use crate::operators::Operator;
use crate::value::Value;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Ast nodes for the expressions
#[derive(Debug, Clone)]
pub enum Ast {
    /// A constant value
    Value(Value),
    /// A variable, to be resolved at evaluation
    Variable(String),
    /// <op> <operand>
    Unary(UnaryOp, Box<Ast>),
    /// <left> <op> <right>
    Binary(BinaryOp, Box<Ast>, Box<Ast>),
    /// name(<args>...)
    Call(Call),
    /// A node evaluated by a custom operator
    Operation(Operation),
}

/// A resolved function call
#[derive(Clone)]
pub struct Call {
    /// Registered name of the function
    pub name: String,
    /// The function, as found in the registry when compiling
    pub function: Arc<dyn Function>,
    /// Unevaluated arguments
    pub args: Vec<Ast>,
}

/// An operator node built with [`Occurrence::operation`](crate::Occurrence::operation),
/// evaluated by [`Operator::evaluate`]
#[derive(Clone)]
pub struct Operation {
    /// The operator text, as found in the input
    pub symbol: String,
    /// The operator which built the node
    pub operator: Arc<dyn Operator>,
    /// One operand for a prefix operator, two for an infix one
    pub operands: Vec<Ast>,
}

impl fmt::Debug for Call {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("Call")
            .field("name", &self.name)
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Debug for Operation {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        fmt.debug_struct("Operation")
            .field("symbol", &self.symbol)
            .field("operands", &self.operands)
            .finish()
    }
}

/// Operators taking a single operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// +<operand>
    Plus,
    /// -<operand>
    Minus,
    /// not <operand>, !<operand>
    Not,
}

/// Operators taking two operands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// <left> + <right>
    Add,
    /// <left> - <right>
    Subtract,
    /// <left> * <right>
    Multiply,
    /// <left> / <right>
    Divide,
    /// <left> % <right>
    Modulus,
    /// <left> << <right>
    LeftShift,
    /// <left> >> <right>
    RightShift,
    /// <left> < <right>
    LessThan,
    /// <left> <= <right>
    LessThanOrEqual,
    /// <left> > <right>
    GreaterThan,
    /// <left> >= <right>
    GreaterThanOrEqual,
    /// <left> = <right>
    Equal,
    /// <left> != <right>
    NotEqual,
    /// <left> & <right>
    BitwiseAnd,
    /// <left> ^ <right>
    BitwiseXor,
    /// <left> | <right>
    BitwiseOr,
    /// <left> && <right>
    And,
    /// <left> || <right>
    Or,
    /// <left> ?? <right>
    NullCoalescing,
}

impl PartialEq<Self> for Ast {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Ast::Value(v), Ast::Value(v2)) => v == v2,
            (Ast::Variable(name), Ast::Variable(name2)) => name == name2,
            (Ast::Unary(op, a), Ast::Unary(op2, a2)) => op == op2 && a == a2,
            (Ast::Binary(op, a, b), Ast::Binary(op2, a2, b2)) => op == op2 && a == a2 && b == b2,
            (Ast::Call(call), Ast::Call(call2)) => call.name == call2.name && call.args == call2.args,
            (Ast::Operation(operation), Ast::Operation(operation2)) => {
                operation.symbol == operation2.symbol && operation.operands == operation2.operands
            }
            _ => false,
        }
    }
}

impl UnaryOp {
    /// Text used to display the operator
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Not => "not",
        }
    }

    /// Apply the operator to an evaluated operand. Null propagates.
    pub fn apply(self, operand: Value) -> Result<Value, EvalError> {
        if operand.is_null() {
            return Ok(Value::Null);
        }
        match self {
            Self::Plus => match operand {
                Value::Integer(_) | Value::Float(_) => Ok(operand),
                other => Ok(Value::Float(other.to_f64()?)),
            },
            Self::Minus => match operand {
                Value::Integer(value) => Ok(value
                    .checked_neg()
                    .map_or(Value::Float(-(value as f64)), Value::Integer)),
                other => Ok(Value::Float(-other.to_f64()?)),
            },
            Self::Not => Ok(Value::Boolean(!operand.to_bool()?)),
        }
    }
}

impl BinaryOp {
    /// Text used to display the operator
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "*",
            Self::Divide => "/",
            Self::Modulus => "%",
            Self::LeftShift => "<<",
            Self::RightShift => ">>",
            Self::LessThan => "<",
            Self::LessThanOrEqual => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqual => ">=",
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::BitwiseAnd => "&",
            Self::BitwiseXor => "^",
            Self::BitwiseOr => "|",
            Self::And => "&&",
            Self::Or => "||",
            Self::NullCoalescing => "??",
        }
    }

    /// Check if the right operand is only evaluated when the left one does
    /// not decide the result
    #[must_use]
    pub fn is_short_circuit(self) -> bool {
        matches!(self, Self::And | Self::Or | Self::NullCoalescing)
    }

    /// Apply the operator to two evaluated operands.
    pub fn apply(self, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        match self {
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide | Self::Modulus => {
                self.arithmetic(lhs, rhs)
            }
            Self::LeftShift | Self::RightShift | Self::BitwiseAnd | Self::BitwiseXor | Self::BitwiseOr => {
                self.bitwise(lhs, rhs)
            }
            Self::LessThan | Self::LessThanOrEqual | Self::GreaterThan | Self::GreaterThanOrEqual => {
                if lhs.is_null() || rhs.is_null() {
                    return Ok(Value::Null);
                }
                let ordering = lhs.compare(&rhs, self.symbol())?;
                Ok(Value::Boolean(ordering.map_or(false, |ordering| self.accepts(ordering))))
            }
            Self::Equal => Ok(Value::Boolean(lhs.loose_eq(&rhs))),
            Self::NotEqual => Ok(Value::Boolean(!lhs.loose_eq(&rhs))),
            Self::And => Ok(Value::Boolean(logical(&lhs)? && logical(&rhs)?)),
            Self::Or => Ok(Value::Boolean(logical(&lhs)? || logical(&rhs)?)),
            Self::NullCoalescing => Ok(if lhs.is_null() { rhs } else { lhs }),
        }
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::LessThan => ordering == Ordering::Less,
            Self::LessThanOrEqual => ordering != Ordering::Greater,
            Self::GreaterThan => ordering == Ordering::Greater,
            Self::GreaterThanOrEqual => ordering != Ordering::Less,
            _ => false,
        }
    }

    fn arithmetic(self, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        if lhs.is_null() || rhs.is_null() {
            return Ok(Value::Null);
        }
        if self == Self::Add && (matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_))) {
            return Ok(Value::String(format!("{}{}", lhs, rhs)));
        }
        if matches!(lhs, Value::Boolean(_) | Value::DateTime(_)) || matches!(rhs, Value::Boolean(_) | Value::DateTime(_)) {
            return Err(EvalError::TypeMismatch {
                operator: self.symbol(),
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            });
        }

        if let (Value::Integer(a), Value::Integer(b)) = (&lhs, &rhs) {
            let (a, b) = (*a, *b);
            let checked = match self {
                Self::Add => a.checked_add(b),
                Self::Subtract => a.checked_sub(b),
                Self::Multiply => a.checked_mul(b),
                Self::Modulus if b == 0 => return Err(EvalError::DivisionByZero),
                Self::Modulus => Some(a.wrapping_rem(b)),
                _ => None,
            };
            // Overflow, and division, continue in floating point
            if let Some(result) = checked {
                return Ok(Value::Integer(result));
            }
        }

        let a = lhs.to_f64()?;
        let b = rhs.to_f64()?;
        let result = match self {
            Self::Add => a + b,
            Self::Subtract => a - b,
            Self::Multiply => a * b,
            Self::Divide => a / b,
            _ => a % b,
        };
        Ok(Value::Float(result))
    }

    fn bitwise(self, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
        if lhs.is_null() || rhs.is_null() {
            return Ok(Value::Null);
        }
        if let (Value::Boolean(a), Value::Boolean(b)) = (&lhs, &rhs) {
            let (a, b) = (*a, *b);
            return match self {
                Self::BitwiseAnd => Ok(Value::Boolean(a & b)),
                Self::BitwiseXor => Ok(Value::Boolean(a ^ b)),
                Self::BitwiseOr => Ok(Value::Boolean(a | b)),
                _ => Err(EvalError::TypeMismatch {
                    operator: self.symbol(),
                    lhs: "boolean",
                    rhs: "boolean",
                }),
            };
        }

        let a = lhs.to_integer()?;
        let b = rhs.to_integer()?;
        let result = match self {
            Self::LeftShift | Self::RightShift => {
                let amount = u32::try_from(b)
                    .ok()
                    .filter(|amount| *amount < i64::BITS)
                    .ok_or(EvalError::InvalidShift { amount: b })?;
                if self == Self::LeftShift {
                    a << amount
                } else {
                    a >> amount
                }
            }
            Self::BitwiseAnd => a & b,
            Self::BitwiseXor => a ^ b,
            _ => a | b,
        };
        Ok(Value::Integer(result))
    }
}

/// Truth value of a logical operand: null counts as false
pub(crate) fn logical(value: &Value) -> Result<bool, EvalError> {
    if value.is_null() {
        Ok(false)
    } else {
        value.to_bool()
    }
}

impl Ast {
    /// If the AST node correspond to a constant, get `Some(constant)`. Else,
    /// get `None`
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        if let Self::Value(value) = self {
            Some(value)
        } else {
            None
        }
    }

    /// Optimize the AST by doing constants propagation. Operators whose
    /// evaluation fails are kept, so that the error is reported when the
    /// expression is evaluated. Function calls and custom operations are
    /// never folded.
    #[must_use]
    pub fn optimize(self) -> Self {
        match self {
            Self::Variable(_) | Self::Value(_) => self,
            Self::Call(mut call) => {
                call.args = call.args.into_iter().map(Self::optimize).collect();
                Self::Call(call)
            }
            Self::Operation(mut operation) => {
                operation.operands = operation.operands.into_iter().map(Self::optimize).collect();
                Self::Operation(operation)
            }
            Self::Unary(op, operand) => {
                let operand = operand.optimize();
                if let Some(value) = operand.value() {
                    if let Ok(result) = op.apply(value.clone()) {
                        return Self::Value(result);
                    }
                }
                Self::Unary(op, Box::new(operand))
            }
            Self::Binary(op, left, right) => {
                let left = left.optimize();
                let right = right.optimize();
                if let (Some(lhs), Some(rhs)) = (left.value(), right.value()) {
                    if let Ok(result) = op.apply(lhs.clone(), rhs.clone()) {
                        return Self::Value(result);
                    }
                }
                Self::Binary(op, Box::new(left), Box::new(right))
            }
        }
    }
}

impl Display for Ast {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Value(Value::String(string)) => {
                write!(fmt, "'{}'", string.replace('\\', "\\\\").replace('\'', "\\'"))
            }
            Self::Value(Value::DateTime(date)) => write!(fmt, "#{}#", date.format("%Y-%m-%d %H:%M:%S%.f")),
            // 2.0 stays a float when read again
            Self::Value(Value::Float(value)) if value.is_finite() => write!(fmt, "{:?}", value),
            Self::Value(Value::Float(value)) if value.is_nan() => write!(fmt, "(0.0 / 0.0)"),
            Self::Value(Value::Float(value)) if *value > 0.0 => write!(fmt, "(1.0 / 0.0)"),
            Self::Value(Value::Float(_)) => write!(fmt, "(-1.0 / 0.0)"),
            Self::Value(value) => write!(fmt, "{}", value),
            Self::Variable(name) if is_variable(name) => write!(fmt, "{}", name),
            Self::Variable(name) => write!(fmt, "[{}]", name),
            Self::Unary(UnaryOp::Not, operand) => write!(fmt, "(not {})", operand),
            Self::Unary(op, operand) => write!(fmt, "({}{})", op.symbol(), operand),
            Self::Binary(op, left, right) => write!(fmt, "({} {} {})", left, op.symbol(), right),
            Self::Call(call) => {
                write!(fmt, "{}(", call.name)?;
                for (i, arg) in call.args.iter().enumerate() {
                    if i > 0 {
                        write!(fmt, ", ")?;
                    }
                    write!(fmt, "{}", arg)?;
                }
                write!(fmt, ")")
            }
            Self::Operation(operation) => match operation.operands.as_slice() {
                [left, right] => write!(fmt, "({} {} {})", left, operation.symbol, right),
                operands => {
                    write!(fmt, "({}", operation.symbol)?;
                    for operand in operands {
                        write!(fmt, " {}", operand)?;
                    }
                    write!(fmt, ")")
                }
            },
        }
    }
}
