#![warn(missing_docs, clippy::all, clippy::pedantic)]
#![allow(
    clippy::needless_return,
    clippy::missing_docs_in_private_items,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::non_ascii_literal
)]

//! Expressive, a crate for compiling and evaluating formulas at run-time.
//!
//! This crate compiles expressions embedded in strings into reusable trees,
//! which are then evaluated against variables. The easiest way to use this
//! crate is with the [`eval`](fn.eval.html) function:
//!
//! ```
//! use std::collections::HashMap;
//! use expressive::Value;
//!
//! let empty: HashMap<String, Value> = HashMap::new();
//! assert_eq!(expressive::eval("3 + 5 * 2", &empty), Ok(Value::Integer(13)));
//! ```
//!
//! The second argument to `eval` holds the variables, in any map implementing
//! [`Variables`](trait.Variables.html):
//!
//! ```
//! use std::collections::HashMap;
//! use expressive::Value;
//!
//! let mut context: HashMap<String, Value> = HashMap::new();
//! context.insert("price".into(), Value::Float(3.5));
//! context.insert("tax rate".into(), Value::Float(0.2));
//! assert_eq!(
//!     expressive::eval("Round(price * (1 + [tax rate]), 2)", &context),
//!     Ok(Value::Float(4.2))
//! );
//! ```
//!
//! It is also possible to separate the compilation from the evaluation of an
//! expression with the [`Expr`](struct.Expr.html) type. This allows reusing
//! the same expression with different values for variables.
//!
//! ```
//! use std::collections::HashMap;
//! use expressive::{Expr, Value};
//!
//! let expr = Expr::parse("If(c > 0, 3 / c, null) ?? b").unwrap();
//! let mut context: HashMap<String, Value> = HashMap::new();
//! context.insert("c".into(), Value::Integer(2));
//! context.insert("b".into(), Value::Integer(5));
//! assert_eq!(expr.eval(&context), Ok(Value::Float(1.5)));
//!
//! context.insert("c".into(), Value::Integer(0));
//! assert_eq!(expr.eval(&context), Ok(Value::Integer(5)));
//! ```
//!
//! # Language definition
//!
//! The language can contain the following elements:
//!
//! - integer and float literals: `42`, `-12.456`, `.5`, `4.5e78`;
//! - strings in single or double quotes, with `\n`, `\t`, `\r`, `\\`, `\'`
//!   and `\"` escapes;
//! - dates between `#`: `#2024-01-31#`, `#2024-01-31 08:30:00#`;
//! - `true`, `false` and `null`, in any case;
//! - left and right parenthesis;
//! - variables. Bare names are ASCII only, start with a letter or `_`, and
//!   can contain letters, digits, `.` or `_`. Any other name can be written
//!   between brackets: `[unit price]`;
//! - function calls: `Max(a, 3)`, `AddDays(start, 2)`;
//! - operators, from the weakest to the strongest binding: `??`, `||` (or
//!   `or`), `&&` (or `and`), `|`, `^`, `&`, equality (`=`, `==`, `!=`, `<>`,
//!   `is`, `is not`), comparisons (`<`, `<=`, `>`, `>=`), shifts (`<<`, `>>`),
//!   `+` and `-`, `*`, `/` and `%` (or `mod`), and finally the unary `+`,
//!   `-`, `!` (or `not`).
//!
//! Any other symbol is forbidden in the input.
//!
//! Operations on `null` give `null`, except equality (`null = null` is true)
//! and logic operators, where `null` is false. `&&`, `||`, `??` and the `If`
//! function only evaluate the operands they need.
//!
//! # Extending the language
//!
//! Operators and functions are plugins, held by a [`Registry`]. An
//! [`Engine`] compiles expressions against a registry, which can be the
//! standard one, a subset of it, or a superset with custom [`Operator`]s and
//! [`Function`]s. A custom operator either builds one of the standard nodes,
//! or an [`Operation`] which it then evaluates itself.
//!
//! # Technical details
//!
//! expressive is based on an AST interpreter, and uses a Shunting-Yard
//! algorithm for parsing the expressions. The parser checks operand counts and
//! function arities, so a compiled expression can only fail on the values it
//! receives. It performs a simple constant propagation to optimize the
//! expressions.

#[macro_use]
extern crate lazy_static;

mod ast;
mod context;
mod error;
mod expr;
pub mod functions;
mod lexer;
pub mod operators;
mod parser;
mod registry;
mod token;
mod value;

pub use ast::{Ast, BinaryOp, Call, Operation, UnaryOp};
pub use context::{Scope, Variables};
pub use error::{Error, EvalError, LexError, ParseError, RegistryError};
pub use expr::{eval, Engine, Expr, Options};
pub use functions::{Arity, Function, NativeFunction};
pub use lexer::is_variable;
pub use operators::{Occurrence, Operands, Operator};
pub use registry::{Registry, STANDARD};
pub use token::{Fixity, Precedence, Token, TokenKind};
pub use value::{parse_datetime, Value};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Install a `tracing` subscriber printing DEBUG events, or the level set
    /// by `RUST_LOG`. Call this at the start of tests where you want to see
    /// logging output.
    pub fn init_test_logging() {
        use tracing_subscriber::{fmt, EnvFilter};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    }
}
