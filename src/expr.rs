use crate::ast::{logical, Ast, BinaryOp};
use crate::context::{Scope, Variables};
use crate::error::{Error, EvalError, ParseError};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::registry::{Registry, STANDARD};
use crate::value::Value;
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

/// Evaluate a single expression from `input`, with the standard operators
/// and functions.
///
/// Returns `Ok(result)` if the evaluation is successful, or `Err(cause)` if
/// parsing or evaluating the expression failed.
///
/// # Example
///
/// ```
/// # use std::collections::HashMap;
/// # use expressive::{eval, Value};
/// let empty: HashMap<String, Value> = HashMap::new();
/// assert_eq!(eval("45 - 2 * 3", &empty), Ok(Value::Integer(39)));
///
/// let mut context: HashMap<String, Value> = HashMap::new();
/// context.insert("a".into(), Value::Float(-5.0));
/// assert_eq!(eval("3 * a", &context), Ok(Value::Float(-15.0)));
/// ```
pub fn eval(input: &str, variables: &impl Variables) -> Result<Value, Error> {
    let expr = Expr::parse(input)?;
    Ok(expr.eval(variables)?)
}

/// Settings applied when compiling expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Match operator words, function names and variable names ignoring
    /// ASCII case
    pub ignore_case: bool,
    /// Deepest tree, and deepest nesting of parenthesis and calls, accepted
    /// by the parser
    pub max_depth: usize,
    /// Replace operators on constants by their value after parsing
    pub fold_constants: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            ignore_case: false,
            max_depth: 256,
            fold_constants: true,
        }
    }
}

/// Compiles expressions against a registry of operators and functions.
///
/// # Examples
/// ```
/// # use expressive::{Engine, Options, Value};
/// # use std::collections::HashMap;
/// let engine = Engine::new().options(Options {
///     ignore_case: true,
///     ..Options::default()
/// });
/// let expr = engine.compile("max(a, 2) MOD 3").unwrap();
///
/// let mut context: HashMap<String, Value> = HashMap::new();
/// context.insert("A".into(), Value::Integer(7));
/// assert_eq!(expr.eval(&context), Ok(Value::Integer(1)));
/// ```
#[derive(Debug, Clone)]
pub struct Engine {
    registry: Arc<Registry>,
    options: Options,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the standard operators and functions
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::clone(&STANDARD),
            options: Options::default(),
        }
    }

    /// An engine using a custom `registry`
    #[must_use]
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
            options: Options::default(),
        }
    }

    /// Replace the compilation options
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// The registry used to compile expressions
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Compile `input` into an `Expr`. Nothing is evaluated, except constant
    /// operators when `Options::fold_constants` is set.
    pub fn compile(&self, input: &str) -> Result<Expr, ParseError> {
        let Options {
            ignore_case,
            max_depth,
            fold_constants,
        } = self.options;
        let tokens = Lexer::new(input, &self.registry, ignore_case).tokenize()?;
        let mut ast = Parser::new(&tokens, &self.registry, ignore_case, max_depth).parse()?;
        if fold_constants {
            ast = ast.optimize();
        }
        tracing::debug!(input, tokens = tokens.len(), ast = %ast, "compiled expression");
        Ok(Expr { ast, ignore_case })
    }
}

/// A compiled expression.
///
/// An `Expr` is immutable: it can be evaluated any number of times, from
/// several threads, each evaluation with its own variables.
///
/// # Examples
/// ```
/// # use expressive::{Expr, Value};
/// # use std::collections::HashMap;
/// let expr = Expr::parse("3 + 5 * 2").unwrap();
/// assert_eq!(expr.eval(&HashMap::<String, Value>::new()), Ok(Value::Integer(13)));
///
/// let mut context: HashMap<String, Value> = HashMap::new();
/// context.insert("a".into(), Value::Integer(42));
/// let expr = Expr::parse("-2 * a").unwrap();
/// assert_eq!(expr.eval(&context), Ok(Value::Integer(-84)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    ast: Ast,
    ignore_case: bool,
}

impl Expr {
    /// Compile `expression` with the standard operators, functions and
    /// options.
    ///
    /// # Examples
    /// ```
    /// # use expressive::Expr;
    /// // A valid expression
    /// assert!(Expr::parse("3 + 5 * 2").is_ok());
    /// // an invalid expression
    /// assert!(Expr::parse("3 + * 2").is_err());
    /// ```
    pub fn parse(expression: &str) -> Result<Self, ParseError> {
        Engine::new().compile(expression)
    }

    /// Evaluate the expression with the given `variables`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use expressive::{Expr, Value};
    /// # use std::collections::HashMap;
    /// let expr = Expr::parse("3 + a").unwrap();
    ///
    /// let mut context: HashMap<String, Value> = HashMap::new();
    /// context.insert("a".into(), Value::Integer(-5));
    /// assert_eq!(expr.eval(&context), Ok(Value::Integer(-2)));
    /// context.insert("a".into(), Value::Float(2.5));
    /// assert_eq!(expr.eval(&context), Ok(Value::Float(5.5)));
    /// ```
    pub fn eval(&self, variables: &impl Variables) -> Result<Value, EvalError> {
        let scope = Scope::new(variables, self.ignore_case);
        let result = evaluate(&self.ast, &scope);
        tracing::trace!(expression = %self.ast, ?result, "evaluated expression");
        result
    }

    /// Names of the variables used by the expression.
    ///
    /// # Examples
    /// ```
    /// # use expressive::Expr;
    /// # use std::collections::HashSet;
    /// let expr = Expr::parse("3 + 5 * 2").unwrap();
    /// assert_eq!(expr.variables(), HashSet::new());
    ///
    /// let expr = Expr::parse("3 + a").unwrap();
    /// assert_eq!(expr.variables(), HashSet::from(["a"]));
    /// ```
    #[must_use]
    pub fn variables(&self) -> HashSet<&str> {
        let mut variables = HashSet::new();
        Self::inner_variables(&self.ast, &mut variables);
        variables
    }

    /// The compiled tree
    #[must_use]
    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    fn inner_variables<'a>(ast: &'a Ast, variables: &mut HashSet<&'a str>) {
        match ast {
            Ast::Variable(name) => {
                variables.insert(name);
            }
            Ast::Value(_) => {}
            Ast::Unary(_, operand) => Self::inner_variables(operand, variables),
            Ast::Binary(_, left, right) => {
                Self::inner_variables(left, variables);
                Self::inner_variables(right, variables);
            }
            Ast::Call(call) => {
                for arg in &call.args {
                    Self::inner_variables(arg, variables);
                }
            }
            Ast::Operation(operation) => {
                for operand in &operation.operands {
                    Self::inner_variables(operand, variables);
                }
            }
        }
    }
}

impl Display for Expr {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "{}", self.ast)
    }
}

/// Evaluate `ast` in `scope`. Operands are evaluated left to right, and the
/// right operand of `&&`, `||` and `??` only when needed.
pub(crate) fn evaluate(ast: &Ast, scope: &Scope) -> Result<Value, EvalError> {
    match ast {
        Ast::Value(value) => Ok(value.clone()),
        Ast::Variable(name) => scope.variable(name),
        Ast::Unary(op, operand) => op.apply(evaluate(operand, scope)?),
        Ast::Binary(BinaryOp::And, left, right) => {
            if !logical(&evaluate(left, scope)?)? {
                return Ok(Value::Boolean(false));
            }
            Ok(Value::Boolean(logical(&evaluate(right, scope)?)?))
        }
        Ast::Binary(BinaryOp::Or, left, right) => {
            if logical(&evaluate(left, scope)?)? {
                return Ok(Value::Boolean(true));
            }
            Ok(Value::Boolean(logical(&evaluate(right, scope)?)?))
        }
        Ast::Binary(BinaryOp::NullCoalescing, left, right) => {
            let value = match evaluate(left, scope) {
                // an unbound variable is as good as null here
                Err(EvalError::UnknownVariable { .. }) if matches!(**left, Ast::Variable(_)) => Value::Null,
                other => other?,
            };
            if value.is_null() {
                evaluate(right, scope)
            } else {
                Ok(value)
            }
        }
        Ast::Binary(op, left, right) => {
            let lhs = evaluate(left, scope)?;
            let rhs = evaluate(right, scope)?;
            op.apply(lhs, rhs)
        }
        Ast::Call(call) => call.function.evaluate(&call.args, scope),
        Ast::Operation(operation) => operation.operator.evaluate(&operation.operands, scope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::UnaryOp;
    use crate::functions::{Arity, Function};
    use crate::operators::{BinaryOperator, Occurrence, Operands, Operator};
    use crate::test_utils::init_test_logging;
    use crate::token::{Fixity, Precedence, Token};
    use chrono::NaiveDate;
    use std::collections::HashMap;
    use test_case::test_case;

    fn context() -> HashMap<String, Value> {
        let mut context = HashMap::new();
        context.insert("a".into(), Value::Integer(1));
        context.insert("b".into(), Value::Integer(2));
        context.insert("x".into(), Value::Float(0.5));
        context.insert("name".into(), Value::from("Ada"));
        context.insert("nothing".into(), Value::Null);
        context.insert("unit price".into(), Value::Float(2.5));
        context
    }

    fn run(input: &str) -> Result<Value, Error> {
        eval(input, &context())
    }

    #[test]
    fn parse() {
        let valid_expressions = [
            "3 + +5e67",
            "(3 + -5)*45",
            "(3. + 5.0)*\t\n45",
            "Sin(34.0) * Sqrt(28.0)",
            "[unit price] * 3 >= 7 and not (name = 'Bob')",
            "If(a is not null, a, b) ?? 0",
            "#2024-01-01# < #2024-02-01 10:00:00#",
        ];
        for expr in &valid_expressions {
            assert!(Expr::parse(expr).is_ok(), "{}", expr);
        }
    }

    #[test_case("3 + 5" => Ok(Value::Integer(8)) ; "addition")]
    #[test_case("2 - 5" => Ok(Value::Integer(-3)) ; "subtraction")]
    #[test_case("10 / 4" => Ok(Value::Float(2.5)) ; "division")]
    #[test_case("25 - -3" => Ok(Value::Integer(28)) ; "minus negative")]
    #[test_case("3 + 5 * 2" => Ok(Value::Integer(13)) ; "precedence")]
    #[test_case("1 + 2 << 3" => Ok(Value::Integer(24)) ; "additive binds tighter than shift")]
    #[test_case("1 + (2 << 3)" => Ok(Value::Integer(17)) ; "explicit shift grouping")]
    #[test_case("(a + b) * x" => Ok(Value::Float(1.5)) ; "variables")]
    #[test_case("[unit price] * 2" => Ok(Value::Float(5.0)) ; "bracketed variable")]
    #[test_case("'Hello ' + name" => Ok(Value::from("Hello Ada")) ; "string concatenation")]
    #[test_case("a < b and b < 3" => Ok(Value::Boolean(true)) ; "logic")]
    #[test_case("nothing + 1" => Ok(Value::Null) ; "null propagates")]
    #[test_case("nothing = null" => Ok(Value::Boolean(true)) ; "null equality")]
    #[test_case("nothing || a = 1" => Ok(Value::Boolean(true)) ; "null is false in logic")]
    #[test_case("nothing ?? 'default'" => Ok(Value::from("default")) ; "coalescing null")]
    #[test_case("missing ?? b" => Ok(Value::Integer(2)) ; "coalescing unbound variable")]
    #[test_case("a ?? missing" => Ok(Value::Integer(1)) ; "coalescing is lazy")]
    #[test_case("true || missing" => Ok(Value::Boolean(true)) ; "or is lazy")]
    #[test_case("a is not null" => Ok(Value::Boolean(true)) ; "is not")]
    #[test_case("5 mod 3 = 2" => Ok(Value::Boolean(true)) ; "mod")]
    #[test_case("6 & 3 | 8 ^ 1" => Ok(Value::Integer(11)) ; "bitwise")]
    #[test_case("YearOf(#2024-05-06#) - 2000" => Ok(Value::Integer(24)) ; "date literal")]
    fn evaluation(input: &str) -> Result<Value, Error> {
        run(input)
    }

    #[test]
    fn errors() {
        assert_eq!(
            run("2 * z").unwrap_err().to_string(),
            "EvalError: name 'z' is not defined"
        );
        assert_eq!(
            run("2 *").unwrap_err().to_string(),
            "ParseError: missing operand for operator '*' at position 2"
        );
        assert_eq!(
            run("name * 2"),
            Err(Error::Eval(EvalError::Coercion {
                value: "'Ada'".into(),
                target: "number"
            }))
        );
        assert_eq!(
            run("true * 2"),
            Err(Error::Eval(EvalError::TypeMismatch {
                operator: "*",
                lhs: "boolean",
                rhs: "integer"
            }))
        );
        assert_eq!(run("a % 0"), Err(Error::Eval(EvalError::DivisionByZero)));
        // a folded constant keeps its failure for the evaluation
        assert_eq!(run("1 % 0"), Err(Error::Eval(EvalError::DivisionByZero)));
    }

    #[test]
    fn evaluation_is_repeatable() {
        let expr = Expr::parse("(a + b) * 3 - Abs(-x)").unwrap();
        let context = context();
        let first = expr.eval(&context);
        assert_eq!(first, Ok(Value::Float(8.5)));
        for _ in 0..10 {
            assert_eq!(expr.eval(&context), first);
        }
    }

    #[test]
    fn unary_and_binary_plus() {
        let engine = Engine::new().options(Options {
            fold_constants: false,
            ..Options::default()
        });
        let five = || Box::new(Ast::Value(Value::Integer(5)));

        let expr = engine.compile("+5").unwrap();
        assert_eq!(expr.ast(), &Ast::Unary(UnaryOp::Plus, five()));

        let expr = engine.compile("3 + 5").unwrap();
        assert_eq!(
            expr.ast(),
            &Ast::Binary(BinaryOp::Add, Box::new(Ast::Value(Value::Integer(3))), five())
        );
        assert_eq!(expr.eval(&context()), Ok(Value::Integer(8)));
    }

    #[test]
    fn constants_are_folded() {
        let expr = Expr::parse("2 * 3 + a").unwrap();
        assert_eq!(expr.to_string(), "(6 + a)");

        let engine = Engine::new().options(Options {
            fold_constants: false,
            ..Options::default()
        });
        assert_eq!(engine.compile("2 * 3 + a").unwrap().to_string(), "((2 * 3) + a)");
    }

    #[test]
    fn arity_is_checked_when_compiling() {
        for input in ["IEEERemainder(1)", "IEEERemainder(1, 2, 3)"] {
            assert!(matches!(
                Expr::parse(input),
                Err(ParseError::Arity { found, .. }) if found != 2
            ));
        }
        assert_eq!(
            eval("IEEERemainder(10, 3)", &context()),
            Ok(Value::Float(1.0))
        );
    }

    #[test]
    fn hours_between_null_is_null() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let expr = Expr::parse("HoursBetween(null, day)").unwrap();
        let mut context = context();
        context.insert("day".into(), Value::DateTime(date));
        assert_eq!(expr.eval(&context), Ok(Value::Null));
    }

    /// A function that can not be evaluated
    struct Fail;

    impl Function for Fail {
        fn name(&self) -> &str {
            "Fail"
        }

        fn arity(&self) -> Arity {
            Arity::exactly(0)
        }

        fn evaluate(&self, _: &[Ast], _: &Scope) -> Result<Value, EvalError> {
            panic!("Fail() must not be evaluated")
        }
    }

    #[test]
    fn short_circuit() {
        init_test_logging();
        let mut registry = Registry::standard();
        registry.register_function(Fail).unwrap();
        let engine = Engine::with_registry(registry);

        let expr = engine.compile("false && Fail()").unwrap();
        assert_eq!(expr.eval(&context()), Ok(Value::Boolean(false)));
        let expr = engine.compile("true or Fail()").unwrap();
        assert_eq!(expr.eval(&context()), Ok(Value::Boolean(true)));
        let expr = engine.compile("If(a > b, Fail(), 'fine')").unwrap();
        assert_eq!(expr.eval(&context()), Ok(Value::from("fine")));
    }

    #[test]
    fn sandboxed_registry() {
        let mut registry = Registry::standard();
        registry.remove_function("Pow");
        let engine = Engine::with_registry(registry);
        assert!(matches!(
            engine.compile("Pow(2, 8)"),
            Err(ParseError::UnknownFunction { .. })
        ));
        assert!(Engine::new().compile("Pow(2, 8)").is_ok());
    }

    #[test]
    fn custom_operator_tag() {
        let mut registry = Registry::standard();
        registry
            .register_operator(BinaryOperator::new(&["plus"], Precedence::Additive, BinaryOp::Add))
            .unwrap();
        let engine = Engine::with_registry(registry);
        let expr = engine.compile("a plus b * 2").unwrap();
        assert_eq!(expr.eval(&context()), Ok(Value::Integer(5)));
        // PLUS is a name unless case is ignored
        assert!(matches!(
            engine.compile("a PLUS b"),
            Err(ParseError::UnexpectedToken { ref token, .. }) if token == "PLUS"
        ));

        let engine = engine.options(Options {
            ignore_case: true,
            ..Options::default()
        });
        let expr = engine.compile("a PLUS b").unwrap();
        assert_eq!(expr.eval(&context()), Ok(Value::Integer(3)));
    }

    /// `**`, evaluated by the operator itself
    struct Power;

    impl Operator for Power {
        fn tags(&self) -> &[&str] {
            &["**"]
        }

        fn fixity(&self, _previous: Option<&Token>) -> Fixity {
            Fixity::Infix
        }

        fn precedence(&self, _previous: Option<&Token>) -> Precedence {
            Precedence::Multiplicative
        }

        fn build(&self, occurrence: &Occurrence, operands: Operands) -> Result<Ast, ParseError> {
            Ok(occurrence.operation(operands))
        }

        fn evaluate(&self, operands: &[Ast], scope: &Scope) -> Result<Value, EvalError> {
            let base = scope.evaluate(&operands[0])?.to_f64()?;
            let exponent = scope.evaluate(&operands[1])?.to_f64()?;
            Ok(Value::Float(libm::pow(base, exponent)))
        }
    }

    #[test]
    fn custom_operator_semantics() {
        let mut registry = Registry::standard();
        registry.register_operator(Power).unwrap();
        let engine = Engine::with_registry(registry);

        let expr = engine.compile("2 ** 10 + a").unwrap();
        assert_eq!(expr.to_string(), "((2 ** 10) + a)");
        assert_eq!(expr.eval(&context()), Ok(Value::Float(1025.0)));

        let expr = engine.compile("2 ** 3 ** 2").unwrap();
        assert_eq!(expr.eval(&context()), Ok(Value::Float(64.0)));

        let expr = engine.compile("x ** b").unwrap();
        assert_eq!(expr.variables(), HashSet::from(["x", "b"]));
        assert_eq!(expr.eval(&context()), Ok(Value::Float(0.25)));

        // `*` is still there
        assert_eq!(engine.compile("3 * 2").unwrap().eval(&context()), Ok(Value::Integer(6)));
    }

    #[test]
    fn compiled_text_keeps_float_constants() {
        let expr = Expr::parse("1 + 1.0").unwrap();
        assert_eq!(expr.to_string(), "2.0");
        let again = Expr::parse(&expr.to_string()).unwrap();
        assert_eq!(again.ast(), expr.ast());

        let expr = Expr::parse("a + 1 / 0").unwrap();
        let again = Expr::parse(&expr.to_string()).unwrap();
        assert_eq!(again.ast(), expr.ast());
    }

    #[test]
    fn ignore_case() {
        let engine = Engine::new().options(Options {
            ignore_case: true,
            ..Options::default()
        });
        let expr = engine.compile("ABS(A) + [UNIT PRICE] IS NOT NULL").unwrap();
        assert_eq!(expr.eval(&context()), Ok(Value::Boolean(true)));
        assert!(Expr::parse("ABS(A)").is_err());
    }

    #[test]
    fn variables() {
        let expr = Expr::parse("(a + b) * 2").unwrap();
        assert_eq!(expr.variables(), HashSet::from(["a", "b"]));

        let expr = Expr::parse("a * Log(b + c, [d e])").unwrap();
        assert_eq!(expr.variables(), HashSet::from(["a", "b", "c", "d e"]));
    }

    #[test]
    fn shared_between_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Expr>();
        assert_send_sync::<Engine>();

        let expr = Expr::parse("n * n + 1").unwrap();
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4_i64)
                .map(|n| {
                    let expr = &expr;
                    scope.spawn(move || {
                        let mut context: HashMap<String, Value> = HashMap::new();
                        context.insert("n".into(), Value::Integer(n));
                        expr.eval(&context)
                    })
                })
                .collect();
            for (n, handle) in (0..4_i64).zip(handles) {
                assert_eq!(handle.join().unwrap(), Ok(Value::Integer(n * n + 1)));
            }
        });
    }
}
