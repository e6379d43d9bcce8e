use crate::value::Value;

/// A lexical unit of the input string
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The source text of the token
    pub text: String,
    /// What the token is
    pub kind: TokenKind,
    /// Byte offset of the token in the input
    pub position: usize,
}

/// Possible tokens to find in the input string
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Number, string, date, boolean or null literal
    Literal(Value),
    /// A bare name: variable, or function when followed by `(`
    Identifier,
    /// A `[bracketed name]`, always a variable
    Variable(String),
    /// A lexeme claimed by a registered operator
    Operator,
    /// Left parenthesis
    LParen,
    /// Right parenthesis
    RParen,
    /// Argument separator
    Comma,
}

impl Token {
    /// Create a new token at byte offset `position`
    pub fn new(text: impl Into<String>, kind: TokenKind, position: usize) -> Self {
        Self {
            text: text.into(),
            kind,
            position,
        }
    }

    /// Check if this token ends an operand, so that an operator following it
    /// is used in binary position.
    #[must_use]
    pub fn is_operand_end(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Literal(_) | TokenKind::Identifier | TokenKind::Variable(_) | TokenKind::RParen
        )
    }
}

/// Check if an operator following `previous` is in unary position: at the
/// start of the input, after `(` or `,`, or after another operator.
#[must_use]
pub fn is_unary_context(previous: Option<&Token>) -> bool {
    previous.map_or(true, |token| !token.is_operand_end())
}

/// Binding strength of operators, weakest first. Operators with higher
/// precedence are grouped first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precedence {
    /// `??`
    NullCoalescing,
    /// `||`, `or`
    LogicalOr,
    /// `&&`, `and`
    LogicalAnd,
    /// `|`
    BitwiseOr,
    /// `^`
    BitwiseXor,
    /// `&`
    BitwiseAnd,
    /// `=`, `!=`, `is`, `is not`
    Equality,
    /// `<`, `<=`, `>`, `>=`
    Relational,
    /// `<<`, `>>`
    Shift,
    /// binary `+` and `-`
    Additive,
    /// `*`, `/`, `%`
    Multiplicative,
    /// prefix operators
    Unary,
}

/// Position of an operator relative to its operands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fixity {
    /// One operand, following the operator
    Prefix,
    /// Two operands, on both sides of the operator
    Infix,
}

impl Fixity {
    /// Number of operands taken by an operator with this fixity
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Prefix => 1,
            Self::Infix => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_order() {
        assert!(Precedence::Unary > Precedence::Multiplicative);
        assert!(Precedence::Multiplicative > Precedence::Additive);
        assert!(Precedence::Additive > Precedence::Shift);
        assert!(Precedence::Shift > Precedence::Relational);
        assert!(Precedence::Relational > Precedence::Equality);
        assert!(Precedence::Equality > Precedence::BitwiseAnd);
        assert!(Precedence::BitwiseAnd > Precedence::BitwiseOr);
        assert!(Precedence::BitwiseOr > Precedence::LogicalAnd);
        assert!(Precedence::LogicalAnd > Precedence::LogicalOr);
        assert!(Precedence::LogicalOr > Precedence::NullCoalescing);
    }

    #[test]
    fn unary_context() {
        let number = Token::new("3", TokenKind::Literal(Value::Integer(3)), 0);
        let operator = Token::new("*", TokenKind::Operator, 2);
        let open = Token::new("(", TokenKind::LParen, 0);
        let close = Token::new(")", TokenKind::RParen, 0);
        let comma = Token::new(",", TokenKind::Comma, 0);
        assert!(is_unary_context(None));
        assert!(is_unary_context(Some(&operator)));
        assert!(is_unary_context(Some(&open)));
        assert!(is_unary_context(Some(&comma)));
        assert!(!is_unary_context(Some(&number)));
        assert!(!is_unary_context(Some(&close)));
    }
}
