use crate::functions::Arity;
use thiserror::Error;

/// Error raised while scanning the input into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// A character that can not start any token
    #[error("unexpected character '{character}' at position {position}")]
    UnexpectedCharacter {
        /// The offending character
        character: char,
        /// Byte offset in the input
        position: usize,
    },
    /// A string literal without its closing quote
    #[error("unterminated string starting at position {position}")]
    UnterminatedString {
        /// Byte offset of the opening quote
        position: usize,
    },
    /// A `[name]` variable without its closing bracket
    #[error("unterminated variable name starting at position {position}")]
    UnterminatedVariable {
        /// Byte offset of the `[`
        position: usize,
    },
    /// A `#date#` literal without its closing `#`
    #[error("unterminated date literal starting at position {position}")]
    UnterminatedDate {
        /// Byte offset of the opening `#`
        position: usize,
    },
    /// A numeric literal that does not parse
    #[error("invalid number '{text}' at position {position}")]
    InvalidNumber {
        /// The literal as written
        text: String,
        /// Byte offset in the input
        position: usize,
    },
    /// A date literal that does not parse
    #[error("invalid date '{text}' at position {position}")]
    InvalidDate {
        /// Text between the `#`
        text: String,
        /// Byte offset in the input
        position: usize,
    },
}

/// Error raised while compiling an expression. Compilation never evaluates
/// anything, so every error here is structural.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The input could not be split in tokens
    #[error(transparent)]
    Lex(#[from] LexError),
    /// The input contains no expression at all
    #[error("empty expression at position {position}")]
    EmptyExpression {
        /// Where an operand was expected
        position: usize,
    },
    /// A token which is not allowed where it was found
    #[error("unexpected token '{token}' at position {position}")]
    UnexpectedToken {
        /// Text of the token
        token: String,
        /// Byte offset of the token
        position: usize,
    },
    /// Input ended in the middle of an expression
    #[error("unexpected end of input")]
    UnexpectedEnd,
    /// A `(` without `)`, or the other way around
    #[error("mismatched parenthesis at position {position}")]
    MismatchedParenthesis {
        /// Byte offset of the unmatched parenthesis
        position: usize,
    },
    /// An operator without enough operands around it
    #[error("missing operand for operator '{operator}' at position {position}")]
    MissingOperand {
        /// Text of the operator
        operator: String,
        /// Byte offset of the operator
        position: usize,
    },
    /// An operator built from the wrong number of operands
    #[error("operator '{operator}' at position {position} takes {expected} operand(s), got {found}")]
    OperatorArity {
        /// Text of the operator, captive tokens included
        operator: String,
        /// Operands the operator builds from
        expected: usize,
        /// Operands it was given
        found: usize,
        /// Byte offset of the operator
        position: usize,
    },
    /// A call to a function missing from the registry
    #[error("unknown function '{name}' at position {position}")]
    UnknownFunction {
        /// Name as written in the input
        name: String,
        /// Byte offset of the name
        position: usize,
    },
    /// A call with an argument count outside the function's bounds
    #[error("function '{function}' at position {position} expects {expected} argument(s), got {found}")]
    Arity {
        /// Registered name of the function
        function: String,
        /// Accepted argument counts
        expected: Arity,
        /// Arguments in the call
        found: usize,
        /// Byte offset of the function name
        position: usize,
    },
    /// Nesting deeper than `Options::max_depth`
    #[error("expression nested deeper than {limit} levels at position {position}")]
    TooDeep {
        /// The `max_depth` in use
        limit: usize,
        /// Byte offset where the limit was crossed
        position: usize,
    },
}

/// Error raised while evaluating a compiled expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// The variable context has no binding for this name
    #[error("name '{name}' is not defined")]
    UnknownVariable {
        /// Name of the variable
        name: String,
    },
    /// A value could not be converted to the type an operation needs
    #[error("cannot convert {value} to {target}")]
    Coercion {
        /// The value, with its type
        value: String,
        /// Name of the type it was converted to
        target: &'static str,
    },
    /// Two operand types that an operator can not combine
    #[error("cannot apply '{operator}' to {lhs} and {rhs}")]
    TypeMismatch {
        /// Symbol of the operator
        operator: &'static str,
        /// Type of the left operand
        lhs: &'static str,
        /// Type of the right operand
        rhs: &'static str,
    },
    /// Integer modulus by zero
    #[error("division by zero")]
    DivisionByZero,
    /// Shift amount outside `0..64`
    #[error("invalid shift amount {amount}")]
    InvalidShift {
        /// The right operand of the shift
        amount: i64,
    },
    /// A function evaluated with an argument count outside its bounds
    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    Arity {
        /// Name of the function
        function: String,
        /// Accepted argument counts
        expected: Arity,
        /// Arguments received
        found: usize,
    },
    /// A function rejected its (well typed) arguments
    #[error("{function}: {message}")]
    Function {
        /// Name of the function
        function: String,
        /// What was wrong
        message: String,
    },
    /// A custom operator failed, or does not know how to evaluate its node
    #[error("operator '{operator}': {message}")]
    Operator {
        /// Text of the operator
        operator: String,
        /// What was wrong
        message: String,
    },
}

impl EvalError {
    pub(crate) fn coercion(value: &crate::Value, target: &'static str) -> Self {
        Self::Coercion {
            value: value.describe(),
            target,
        }
    }

    pub(crate) fn function(function: &str, message: impl Into<String>) -> Self {
        Self::Function {
            function: function.to_owned(),
            message: message.into(),
        }
    }
}

/// Error raised while populating a [`Registry`](crate::Registry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Another operator already claims this tag
    #[error("operator tag '{tag}' is already registered")]
    DuplicateOperatorTag {
        /// The tag, as given to the rejected operator
        tag: String,
    },
    /// Another function already uses this name
    #[error("function '{name}' is already registered")]
    DuplicateFunction {
        /// The name of the rejected function
        name: String,
    },
    /// Tags can not be empty, contain whitespace, parenthesis or commas
    #[error("invalid operator tag '{tag}'")]
    InvalidTag {
        /// The rejected tag
        tag: String,
    },
    /// Function names must be identifiers
    #[error("invalid function name '{name}'")]
    InvalidFunctionName {
        /// The rejected name
        name: String,
    },
}

/// Error type for the one-step [`eval`](crate::eval) function
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Error while compiling an expression
    #[error("ParseError: {0}")]
    Parse(#[from] ParseError),
    /// Error while evaluating an expression
    #[error("EvalError: {0}")]
    Eval(#[from] EvalError),
}
