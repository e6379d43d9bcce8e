//! Operators recognized by the parser, and the standard catalog.
//!
//! An [`Operator`] claims one or more lexemes (its tags). Each time one of
//! them is found, the parser asks the operator, given the token just before
//! it, whether it is used as a prefix or infix operator and with which
//! precedence, then hands it the parsed operands to build a node.
//!
//! Operators of the standard catalog build [`Ast::Unary`] and [`Ast::Binary`]
//! nodes. Other operators can build an [`Ast::Operation`] with
//! [`Occurrence::operation`], which is evaluated by [`Operator::evaluate`].

use crate::ast::{Ast, BinaryOp, Operation, UnaryOp};
use crate::context::Scope;
use crate::error::{EvalError, ParseError};
use crate::token::{is_unary_context, Fixity, Precedence, Token, TokenKind};
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Operand sub-expressions given to [`Operator::build`]
#[derive(Debug, Clone, PartialEq)]
pub enum Operands {
    /// The operand of a prefix operator
    Unary(Ast),
    /// Left and right operands of an infix operator
    Binary(Ast, Ast),
}

impl Operands {
    /// Number of operands
    #[must_use]
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        match self {
            Self::Unary(_) => 1,
            Self::Binary(..) => 2,
        }
    }

    fn into_vec(self) -> Vec<Ast> {
        match self {
            Self::Unary(operand) => vec![operand],
            Self::Binary(left, right) => vec![left, right],
        }
    }
}

/// One occurrence of an operator in the token stream
#[derive(Clone, Copy)]
pub struct Occurrence<'a> {
    /// The operator found, as registered
    pub operator: &'a Arc<dyn Operator>,
    /// The token which matched one of the operator tags
    pub token: &'a Token,
    /// The token just before, `None` at the start of the input
    pub previous: Option<&'a Token>,
    /// Following tokens claimed by the operator as part of itself
    pub captive: &'a [Token],
}

impl Occurrence<'_> {
    /// Full text of the occurrence, captive tokens included
    #[must_use]
    pub fn text(&self) -> String {
        let mut text = self.token.text.clone();
        for token in self.captive {
            text.push(' ');
            text.push_str(&token.text);
        }
        text
    }

    /// A node evaluated by calling [`Operator::evaluate`] on the operator of
    /// this occurrence
    #[must_use]
    pub fn operation(&self, operands: Operands) -> Ast {
        Ast::Operation(Operation {
            symbol: self.text(),
            operator: Arc::clone(self.operator),
            operands: operands.into_vec(),
        })
    }

    fn wrong_operands(&self, expected: usize, operands: &Operands) -> ParseError {
        ParseError::OperatorArity {
            operator: self.text(),
            expected,
            found: operands.len(),
            position: self.token.position,
        }
    }
}

impl fmt::Debug for Occurrence<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Occurrence")
            .field("token", &self.token)
            .field("previous", &self.previous)
            .field("captive", &self.captive)
            .finish()
    }
}

/// An operator that can be registered in a [`Registry`](crate::Registry).
///
/// Operators are shared by every parse and must be stateless.
pub trait Operator: Send + Sync {
    /// The lexemes recognized by this operator
    fn tags(&self) -> &[&str];

    /// Prefix or infix use, knowing the token before the operator
    fn fixity(&self, previous: Option<&Token>) -> Fixity;

    /// Binding strength, knowing the token before the operator
    fn precedence(&self, previous: Option<&Token>) -> Precedence;

    /// Number of tokens from `remaining` (the tokens following `token`) to
    /// claim as part of this operator. `remaining` is a view on the token
    /// stream and nothing is consumed until the parser commits the match.
    fn captive_tokens(&self, _previous: Option<&Token>, _token: &Token, _remaining: &[Token]) -> usize {
        0
    }

    /// Number of tokens, at the end of the `claimed` ones, which belong to
    /// another operator nested in this one. They are given back to the token
    /// stream.
    fn inner_captive_tokens(&self, _claimed: &[Token]) -> usize {
        0
    }

    /// Build the node for an `occurrence` of this operator.
    fn build(&self, occurrence: &Occurrence, operands: Operands) -> Result<Ast, ParseError>;

    /// Evaluate a node built by [`Occurrence::operation`]. The operands are
    /// given unevaluated, in source order.
    fn evaluate(&self, _operands: &[Ast], _scope: &Scope) -> Result<Value, EvalError> {
        Err(EvalError::Operator {
            operator: self.tags().first().map_or_else(String::new, |tag| (*tag).to_owned()),
            message: "no evaluation rule".into(),
        })
    }
}

/// An infix operator building a single kind of binary node
#[derive(Debug, Clone, Copy)]
pub struct BinaryOperator {
    tags: &'static [&'static str],
    precedence: Precedence,
    op: BinaryOp,
}

impl BinaryOperator {
    /// An operator claiming `tags`, building `op` nodes
    #[must_use]
    pub const fn new(tags: &'static [&'static str], precedence: Precedence, op: BinaryOp) -> Self {
        Self { tags, precedence, op }
    }
}

impl Operator for BinaryOperator {
    fn tags(&self) -> &[&str] {
        self.tags
    }

    fn fixity(&self, _previous: Option<&Token>) -> Fixity {
        Fixity::Infix
    }

    fn precedence(&self, _previous: Option<&Token>) -> Precedence {
        self.precedence
    }

    fn build(&self, occurrence: &Occurrence, operands: Operands) -> Result<Ast, ParseError> {
        match operands {
            Operands::Binary(left, right) => Ok(Ast::Binary(self.op, Box::new(left), Box::new(right))),
            other => Err(occurrence.wrong_operands(2, &other)),
        }
    }
}

/// A prefix-only operator
#[derive(Debug, Clone, Copy)]
pub struct PrefixOperator {
    tags: &'static [&'static str],
    op: UnaryOp,
}

impl PrefixOperator {
    /// A prefix operator claiming `tags`, building `op` nodes
    #[must_use]
    pub const fn new(tags: &'static [&'static str], op: UnaryOp) -> Self {
        Self { tags, op }
    }
}

impl Operator for PrefixOperator {
    fn tags(&self) -> &[&str] {
        self.tags
    }

    fn fixity(&self, _previous: Option<&Token>) -> Fixity {
        Fixity::Prefix
    }

    fn precedence(&self, _previous: Option<&Token>) -> Precedence {
        Precedence::Unary
    }

    fn build(&self, occurrence: &Occurrence, operands: Operands) -> Result<Ast, ParseError> {
        match operands {
            Operands::Unary(operand) => Ok(Ast::Unary(self.op, Box::new(operand))),
            other => Err(occurrence.wrong_operands(1, &other)),
        }
    }
}

/// `+` and `-`: unary at the start of the input, after `(`, `,` or another
/// operator, binary otherwise
#[derive(Debug, Clone, Copy)]
pub struct SignOperator {
    tags: &'static [&'static str],
    unary: UnaryOp,
    binary: BinaryOp,
}

impl SignOperator {
    /// An operator building `unary` nodes in prefix position, `binary` ones
    /// otherwise
    #[must_use]
    pub const fn new(tags: &'static [&'static str], unary: UnaryOp, binary: BinaryOp) -> Self {
        Self { tags, unary, binary }
    }
}

impl Operator for SignOperator {
    fn tags(&self) -> &[&str] {
        self.tags
    }

    fn fixity(&self, previous: Option<&Token>) -> Fixity {
        if is_unary_context(previous) {
            Fixity::Prefix
        } else {
            Fixity::Infix
        }
    }

    fn precedence(&self, previous: Option<&Token>) -> Precedence {
        if is_unary_context(previous) {
            Precedence::Unary
        } else {
            Precedence::Additive
        }
    }

    fn build(&self, occurrence: &Occurrence, operands: Operands) -> Result<Ast, ParseError> {
        let unary = is_unary_context(occurrence.previous);
        match operands {
            Operands::Unary(operand) if unary => Ok(Ast::Unary(self.unary, Box::new(operand))),
            Operands::Binary(left, right) if !unary => {
                Ok(Ast::Binary(self.binary, Box::new(left), Box::new(right)))
            }
            other => Err(occurrence.wrong_operands(if unary { 1 } else { 2 }, &other)),
        }
    }
}

/// `is` and `is not`, a two-word operator.
///
/// `is` claims every `not` following it, but only keeps the first one: in
/// `a is not not b` the second `not` negates `b`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsOperator;

fn is_not(token: &Token) -> bool {
    token.kind == TokenKind::Operator && token.text.eq_ignore_ascii_case("not")
}

impl Operator for IsOperator {
    fn tags(&self) -> &[&str] {
        &["is"]
    }

    fn fixity(&self, _previous: Option<&Token>) -> Fixity {
        Fixity::Infix
    }

    fn precedence(&self, _previous: Option<&Token>) -> Precedence {
        Precedence::Equality
    }

    fn captive_tokens(&self, _previous: Option<&Token>, _token: &Token, remaining: &[Token]) -> usize {
        remaining.iter().take_while(|token| is_not(token)).count()
    }

    fn inner_captive_tokens(&self, claimed: &[Token]) -> usize {
        claimed.len().saturating_sub(1)
    }

    fn build(&self, occurrence: &Occurrence, operands: Operands) -> Result<Ast, ParseError> {
        let op = if occurrence.captive.iter().any(is_not) {
            BinaryOp::NotEqual
        } else {
            BinaryOp::Equal
        };
        match operands {
            Operands::Binary(left, right) => Ok(Ast::Binary(op, Box::new(left), Box::new(right))),
            other => Err(occurrence.wrong_operands(2, &other)),
        }
    }
}

/// The operators of the standard catalog
pub(crate) fn standard_operators() -> Vec<Box<dyn Operator>> {
    use BinaryOp::*;
    use Precedence as P;
    vec![
        Box::new(SignOperator::new(&["+"], UnaryOp::Plus, Add)),
        Box::new(SignOperator::new(&["-"], UnaryOp::Minus, Subtract)),
        Box::new(PrefixOperator::new(&["!", "not"], UnaryOp::Not)),
        Box::new(BinaryOperator::new(&["*"], P::Multiplicative, Multiply)),
        Box::new(BinaryOperator::new(&["/"], P::Multiplicative, Divide)),
        Box::new(BinaryOperator::new(&["%", "mod"], P::Multiplicative, Modulus)),
        Box::new(BinaryOperator::new(&["<<"], P::Shift, LeftShift)),
        Box::new(BinaryOperator::new(&[">>"], P::Shift, RightShift)),
        Box::new(BinaryOperator::new(&["<"], P::Relational, LessThan)),
        Box::new(BinaryOperator::new(&["<="], P::Relational, LessThanOrEqual)),
        Box::new(BinaryOperator::new(&[">"], P::Relational, GreaterThan)),
        Box::new(BinaryOperator::new(&[">="], P::Relational, GreaterThanOrEqual)),
        Box::new(BinaryOperator::new(&["=", "=="], P::Equality, Equal)),
        Box::new(BinaryOperator::new(&["!=", "<>"], P::Equality, NotEqual)),
        Box::new(IsOperator),
        Box::new(BinaryOperator::new(&["&"], P::BitwiseAnd, BitwiseAnd)),
        Box::new(BinaryOperator::new(&["^"], P::BitwiseXor, BitwiseXor)),
        Box::new(BinaryOperator::new(&["|"], P::BitwiseOr, BitwiseOr)),
        Box::new(BinaryOperator::new(&["&&", "and"], P::LogicalAnd, And)),
        Box::new(BinaryOperator::new(&["||", "or"], P::LogicalOr, Or)),
        Box::new(BinaryOperator::new(&["??"], P::NullCoalescing, NullCoalescing)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn operator(text: &str) -> Token {
        Token::new(text, TokenKind::Operator, 0)
    }

    fn number(value: i64) -> Token {
        Token::new(value.to_string(), TokenKind::Literal(Value::Integer(value)), 0)
    }

    #[test]
    fn sign_depends_on_previous_token() {
        let plus = SignOperator::new(&["+"], UnaryOp::Plus, BinaryOp::Add);
        let open = Token::new("(", TokenKind::LParen, 0);

        assert_eq!(plus.fixity(None), Fixity::Prefix);
        assert_eq!(plus.precedence(None), Precedence::Unary);
        assert_eq!(plus.fixity(Some(&open)), Fixity::Prefix);
        assert_eq!(plus.fixity(Some(&operator("*"))), Fixity::Prefix);
        assert_eq!(plus.fixity(Some(&number(3))), Fixity::Infix);
        assert_eq!(plus.precedence(Some(&number(3))), Precedence::Additive);
    }

    #[test]
    fn sign_builds_unary_or_binary() {
        let minus: Arc<dyn Operator> = Arc::new(SignOperator::new(&["-"], UnaryOp::Minus, BinaryOp::Subtract));
        let token = operator("-");
        let three = number(3);
        let one = || Ast::Value(Value::Integer(1));

        let prefix = Occurrence {
            operator: &minus,
            token: &token,
            previous: None,
            captive: &[],
        };
        assert_eq!(
            minus.build(&prefix, Operands::Unary(one())),
            Ok(Ast::Unary(UnaryOp::Minus, Box::new(one())))
        );
        assert!(matches!(
            minus.build(&prefix, Operands::Binary(one(), one())),
            Err(ParseError::OperatorArity { expected: 1, found: 2, .. })
        ));

        let infix = Occurrence {
            operator: &minus,
            token: &token,
            previous: Some(&three),
            captive: &[],
        };
        assert_eq!(
            minus.build(&infix, Operands::Binary(one(), one())),
            Ok(Ast::Binary(BinaryOp::Subtract, Box::new(one()), Box::new(one())))
        );
    }

    #[test]
    fn is_claims_a_single_not() {
        let remaining = [operator("not"), operator("NOT"), number(1)];
        assert_eq!(IsOperator.captive_tokens(None, &operator("is"), &remaining), 2);
        assert_eq!(IsOperator.inner_captive_tokens(&remaining[..2]), 1);
        assert_eq!(IsOperator.captive_tokens(None, &operator("is"), &remaining[2..]), 0);
        assert_eq!(IsOperator.inner_captive_tokens(&[]), 0);

        let is: Arc<dyn Operator> = Arc::new(IsOperator);
        let token = operator("is");
        let occurrence = Occurrence {
            operator: &is,
            token: &token,
            previous: None,
            captive: &remaining[..1],
        };
        assert_eq!(occurrence.text(), "is not");
        let one = Ast::Value(Value::Integer(1));
        assert_eq!(
            IsOperator.build(&occurrence, Operands::Binary(one.clone(), one.clone())),
            Ok(Ast::Binary(BinaryOp::NotEqual, Box::new(one.clone()), Box::new(one)))
        );
    }

    #[test]
    fn operation_nodes() {
        let plus: Arc<dyn Operator> = Arc::new(BinaryOperator::new(&["plus"], Precedence::Additive, BinaryOp::Add));
        let token = operator("plus");
        let occurrence = Occurrence {
            operator: &plus,
            token: &token,
            previous: None,
            captive: &[],
        };
        let one = || Ast::Value(Value::Integer(1));
        let ast = occurrence.operation(Operands::Binary(one(), Ast::Variable("a".into())));
        assert_eq!(ast.to_string(), "(1 plus a)");

        // operators building standard nodes have nothing to evaluate
        let variables: std::collections::HashMap<String, Value> = std::collections::HashMap::new();
        assert_eq!(
            plus.evaluate(&[one(), one()], &Scope::new(&variables, false)),
            Err(EvalError::Operator {
                operator: "plus".into(),
                message: "no evaluation rule".into()
            })
        );
    }
}
