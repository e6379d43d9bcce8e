use crate::error::LexError;
use crate::registry::Registry;
use crate::token::{Token, TokenKind};
use crate::value::{parse_datetime, Value};

#[must_use]
/// Check if `ident` is a valid bare variable or function name
///
/// # Examples
///
/// ```
/// # use expressive::is_variable;
///
/// assert_eq!(is_variable("__abc3"), true);
/// assert_eq!(is_variable("order.total"), true);
/// assert_eq!(is_variable("34zb"), false);
/// ```
pub fn is_variable(ident: &str) -> bool {
    let mut chars = ident.chars();
    // Check first char
    if !chars.next().map_or(false, is_variable_start) {
        return false;
    }
    // Check all others
    for c in chars {
        if !is_variable_part(c) {
            return false;
        }
    }
    return true;
}

/// Turns an input string into tokens, consulting a registry for operator
/// lexemes.
pub struct Lexer<'a> {
    input: &'a str,
    position: usize,
    registry: &'a Registry,
    ignore_case: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, registry: &'a Registry, ignore_case: bool) -> Lexer<'a> {
        Lexer {
            input,
            position: 0,
            registry,
            ignore_case,
        }
    }

    /// Scan the whole input.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut output = Vec::new();
        while let Some(token) = self.next_token()? {
            output.push(token);
        }
        Ok(output)
    }

    fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    /// Consume `len` bytes as a token of the given `kind`
    fn take(&mut self, len: usize, kind: TokenKind) -> Token {
        let start = self.position;
        self.position += len;
        Token::new(&self.input[start..self.position], kind, start)
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        let rest = self.rest();
        let trimmed = rest.trim_start();
        self.position += rest.len() - trimmed.len();

        let c = match trimmed.chars().next() {
            Some(c) => c,
            None => return Ok(None),
        };
        let token = match c {
            '(' => self.take(1, TokenKind::LParen),
            ')' => self.take(1, TokenKind::RParen),
            ',' => self.take(1, TokenKind::Comma),
            _ => {
                if let Some(len) = self.registry.match_operator(trimmed, self.ignore_case) {
                    self.take(len, TokenKind::Operator)
                } else if is_number_start(trimmed) {
                    self.number()?
                } else if c == '"' || c == '\'' {
                    self.string(c)?
                } else if c == '[' {
                    self.variable()?
                } else if c == '#' {
                    self.date()?
                } else if is_variable_start(c) {
                    self.identifier()
                } else {
                    return Err(LexError::UnexpectedCharacter {
                        character: c,
                        position: self.position,
                    });
                }
            }
        };
        Ok(Some(token))
    }

    fn number(&mut self) -> Result<Token, LexError> {
        let bytes = self.rest().as_bytes();
        let digits = |from: usize| {
            bytes[from..]
                .iter()
                .take_while(|b| b.is_ascii_digit())
                .count()
        };

        let mut len = digits(0);
        let mut integral = true;
        if bytes.get(len) == Some(&b'.') {
            integral = false;
            len += 1;
            len += digits(len);
        }
        if matches!(bytes.get(len), Some(b'e' | b'E')) {
            let sign = usize::from(matches!(bytes.get(len + 1), Some(b'+' | b'-')));
            let exponent = digits(len + 1 + sign);
            if exponent > 0 {
                integral = false;
                len += 1 + sign + exponent;
            }
        }

        let text = &self.rest()[..len];
        let value = if integral {
            // Integers too large for i64 fall back to floats
            match text.parse::<i64>() {
                Ok(value) => Value::Integer(value),
                Err(_) => text.parse::<f64>().map(Value::Float).map_err(|_| self.invalid_number(text))?,
            }
        } else {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|_| self.invalid_number(text))?
        };
        Ok(self.take(len, TokenKind::Literal(value)))
    }

    fn invalid_number(&self, text: &str) -> LexError {
        LexError::InvalidNumber {
            text: text.to_owned(),
            position: self.position,
        }
    }

    fn string(&mut self, quote: char) -> Result<Token, LexError> {
        let mut value = String::new();
        let mut chars = self.rest().char_indices().skip(1);
        while let Some((i, c)) = chars.next() {
            match c {
                c if c == quote => {
                    return Ok(self.take(i + c.len_utf8(), TokenKind::Literal(Value::String(value))));
                }
                '\\' => match chars.next() {
                    Some((_, 'n')) => value.push('\n'),
                    Some((_, 't')) => value.push('\t'),
                    Some((_, 'r')) => value.push('\r'),
                    Some((_, escaped @ ('\\' | '\'' | '"'))) => value.push(escaped),
                    Some((_, other)) => {
                        value.push('\\');
                        value.push(other);
                    }
                    None => break,
                },
                c => value.push(c),
            }
        }
        Err(LexError::UnterminatedString {
            position: self.position,
        })
    }

    fn variable(&mut self) -> Result<Token, LexError> {
        match self.rest().find(']') {
            Some(end) => {
                let name = self.rest()[1..end].to_owned();
                Ok(self.take(end + 1, TokenKind::Variable(name)))
            }
            None => Err(LexError::UnterminatedVariable {
                position: self.position,
            }),
        }
    }

    fn date(&mut self) -> Result<Token, LexError> {
        let end = match self.rest()[1..].find('#') {
            Some(end) => end + 1,
            None => {
                return Err(LexError::UnterminatedDate {
                    position: self.position,
                })
            }
        };
        let text = &self.rest()[1..end];
        match parse_datetime(text) {
            Some(date) => Ok(self.take(end + 1, TokenKind::Literal(Value::DateTime(date)))),
            None => Err(LexError::InvalidDate {
                text: text.to_owned(),
                position: self.position,
            }),
        }
    }

    fn identifier(&mut self) -> Token {
        let len = self
            .rest()
            .char_indices()
            .find(|&(_, c)| !is_variable_part(c))
            .map_or(self.rest().len(), |(i, _)| i);
        let text = &self.rest()[..len];
        let kind = if text.eq_ignore_ascii_case("true") {
            TokenKind::Literal(Value::Boolean(true))
        } else if text.eq_ignore_ascii_case("false") {
            TokenKind::Literal(Value::Boolean(false))
        } else if text.eq_ignore_ascii_case("null") {
            TokenKind::Literal(Value::Null)
        } else {
            TokenKind::Identifier
        };
        self.take(len, kind)
    }
}

/// Check if `input` starts with a numeric literal
fn is_number_start(input: &str) -> bool {
    let mut chars = input.chars();
    match chars.next() {
        Some(c) if c.is_ascii_digit() => true,
        Some('.') => chars.next().map_or(false, |c| c.is_ascii_digit()),
        _ => false,
    }
}

/// Check if `c` can appear at the first character of a variable
fn is_variable_start(c: char) -> bool {
    c == '_' || (c.is_ascii() && c.is_alphabetic())
}

/// Check if `c` can appear inside a variable
pub(crate) fn is_variable_part(c: char) -> bool {
    c == '.' || c == '_' || (c.is_ascii() && c.is_alphanumeric())
}
