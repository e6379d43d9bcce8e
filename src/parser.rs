//! Shunting-yard parser turning tokens into an [`Ast`].
//!
//! Operators are not known to the parser: each operator token is resolved in
//! the registry, which tells whether it is prefix or infix and how strongly
//! it binds. Parenthesis and function arguments are parsed recursively.

use crate::ast::{Ast, Call};
use crate::error::ParseError;
use crate::operators::{Occurrence, Operands, Operator};
use crate::registry::Registry;
use crate::token::{Fixity, Precedence, Token, TokenKind};
use std::sync::Arc;

/// An operator waiting for its operands on the operator stack
struct Pending<'t> {
    operator: Arc<dyn Operator>,
    fixity: Fixity,
    precedence: Precedence,
    token: &'t Token,
    previous: Option<&'t Token>,
    captive: &'t [Token],
}

pub(crate) struct Parser<'t> {
    tokens: &'t [Token],
    position: usize,
    registry: &'t Registry,
    ignore_case: bool,
    max_depth: usize,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(tokens: &'t [Token], registry: &'t Registry, ignore_case: bool, max_depth: usize) -> Self {
        Self {
            tokens,
            position: 0,
            registry,
            ignore_case,
            max_depth,
        }
    }

    /// Parse all the tokens as a single expression.
    pub(crate) fn parse(mut self) -> Result<Ast, ParseError> {
        let (ast, _) = self.expression(0)?;
        match self.peek() {
            None => Ok(ast),
            Some(token) if token.kind == TokenKind::RParen => Err(ParseError::MismatchedParenthesis {
                position: token.position,
            }),
            Some(token) => Err(unexpected(token)),
        }
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.position)
    }

    fn previous(&self) -> Option<&'t Token> {
        self.position.checked_sub(1).and_then(|i| self.tokens.get(i))
    }

    /// Position just after the current token, for errors at the end of the
    /// input
    fn here(&self) -> usize {
        match self.peek() {
            Some(token) => token.position,
            None => self
                .tokens
                .last()
                .map_or(0, |token| token.position + token.text.len()),
        }
    }

    fn too_deep(&self, position: usize) -> ParseError {
        ParseError::TooDeep {
            limit: self.max_depth,
            position,
        }
    }

    /// Parse an expression up to the end of the input, or an unmatched `)` or
    /// `,`. Returns the tree and its depth.
    fn expression(&mut self, nesting: usize) -> Result<(Ast, usize), ParseError> {
        if nesting > self.max_depth {
            return Err(self.too_deep(self.here()));
        }

        let mut output: Vec<(Ast, usize)> = Vec::new();
        let mut operators: Vec<Pending<'t>> = Vec::new();
        let mut expect_operand = true;

        while let Some(token) = self.peek() {
            match &token.kind {
                TokenKind::RParen | TokenKind::Comma => break,
                TokenKind::Operator => {
                    let previous = self.previous();
                    let operator = self
                        .registry
                        .operator(&token.text, self.ignore_case)
                        .cloned()
                        .ok_or_else(|| unexpected(token))?;
                    let fixity = operator.fixity(previous);
                    match (fixity, expect_operand) {
                        (Fixity::Prefix, true) | (Fixity::Infix, false) => {}
                        (Fixity::Prefix, false) => return Err(unexpected(token)),
                        (Fixity::Infix, true) => {
                            return Err(ParseError::MissingOperand {
                                operator: token.text.clone(),
                                position: token.position,
                            })
                        }
                    }
                    self.position += 1;

                    let remaining = &self.tokens[self.position..];
                    let claimed = operator.captive_tokens(previous, token, remaining).min(remaining.len());
                    let inner = operator.inner_captive_tokens(&remaining[..claimed]).min(claimed);
                    let captive = &remaining[..claimed - inner];
                    self.position += captive.len();

                    let precedence = operator.precedence(previous);
                    if fixity == Fixity::Infix {
                        while let Some(top) = operators.pop() {
                            if top.precedence < precedence {
                                operators.push(top);
                                break;
                            }
                            self.reduce(top, &mut output)?;
                        }
                    }
                    tracing::trace!(operator = token.text.as_str(), ?fixity, ?precedence, "operator");
                    operators.push(Pending {
                        operator,
                        fixity,
                        precedence,
                        token,
                        previous,
                        captive,
                    });
                    expect_operand = true;
                }
                _ if !expect_operand => return Err(unexpected(token)),
                TokenKind::LParen => {
                    self.position += 1;
                    let inner = self.expression(nesting + 1)?;
                    self.close(token)?;
                    output.push(inner);
                    expect_operand = false;
                }
                TokenKind::Literal(value) => {
                    self.position += 1;
                    output.push((Ast::Value(value.clone()), 1));
                    expect_operand = false;
                }
                TokenKind::Variable(name) => {
                    self.position += 1;
                    output.push((Ast::Variable(name.clone()), 1));
                    expect_operand = false;
                }
                TokenKind::Identifier => {
                    self.position += 1;
                    let operand = match self.peek() {
                        Some(open) if open.kind == TokenKind::LParen => self.call(token, open, nesting)?,
                        _ => (Ast::Variable(token.text.clone()), 1),
                    };
                    output.push(operand);
                    expect_operand = false;
                }
            }
        }

        if expect_operand {
            return Err(match operators.last() {
                Some(pending) => ParseError::MissingOperand {
                    operator: pending.token.text.clone(),
                    position: pending.token.position,
                },
                None => ParseError::EmptyExpression { position: self.here() },
            });
        }

        while let Some(pending) = operators.pop() {
            self.reduce(pending, &mut output)?;
        }
        let result = output.pop().ok_or(ParseError::UnexpectedEnd)?;
        debug_assert!(output.is_empty());
        Ok(result)
    }

    /// Consume the `)` matching `open`
    fn close(&mut self, open: &Token) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::RParen => {
                self.position += 1;
                Ok(())
            }
            Some(token) if token.kind == TokenKind::Comma => Err(unexpected(token)),
            _ => Err(ParseError::MismatchedParenthesis {
                position: open.position,
            }),
        }
    }

    /// Parse the arguments of a call to `name`, starting at `open`
    fn call(&mut self, name: &Token, open: &Token, nesting: usize) -> Result<(Ast, usize), ParseError> {
        let function = self
            .registry
            .function(&name.text, self.ignore_case)
            .cloned()
            .ok_or_else(|| ParseError::UnknownFunction {
                name: name.text.clone(),
                position: name.position,
            })?;
        self.position += 1;

        let mut args = Vec::new();
        let mut depth = 0;
        if self.peek().map_or(false, |token| token.kind == TokenKind::RParen) {
            self.position += 1;
        } else {
            loop {
                let (arg, arg_depth) = self.expression(nesting + 1)?;
                args.push(arg);
                depth = depth.max(arg_depth);
                match self.peek() {
                    Some(token) if token.kind == TokenKind::Comma => self.position += 1,
                    Some(token) if token.kind == TokenKind::RParen => {
                        self.position += 1;
                        break;
                    }
                    _ => {
                        return Err(ParseError::MismatchedParenthesis {
                            position: open.position,
                        })
                    }
                }
            }
        }

        let arity = function.arity();
        if !arity.accepts(args.len()) {
            return Err(ParseError::Arity {
                function: function.name().to_owned(),
                expected: arity,
                found: args.len(),
                position: name.position,
            });
        }
        let depth = depth + 1;
        if depth > self.max_depth {
            return Err(self.too_deep(name.position));
        }
        let call = Call {
            name: function.name().to_owned(),
            function,
            args,
        };
        Ok((Ast::Call(call), depth))
    }

    /// Pop the operands of `pending` from `output`, and push the node it
    /// builds.
    fn reduce(&self, pending: Pending<'t>, output: &mut Vec<(Ast, usize)>) -> Result<(), ParseError> {
        let missing = || ParseError::MissingOperand {
            operator: pending.token.text.clone(),
            position: pending.token.position,
        };
        let arity = pending.fixity.arity();
        if output.len() < arity {
            return Err(missing());
        }
        let mut popped = output.split_off(output.len() - arity).into_iter();
        let (operands, depth) = match (popped.next(), popped.next()) {
            (Some((operand, depth)), None) => (Operands::Unary(operand), depth),
            (Some((left, left_depth)), Some((right, right_depth))) => {
                (Operands::Binary(left, right), left_depth.max(right_depth))
            }
            _ => return Err(missing()),
        };

        let depth = depth + 1;
        if depth > self.max_depth {
            return Err(self.too_deep(pending.token.position));
        }
        let occurrence = Occurrence {
            operator: &pending.operator,
            token: pending.token,
            previous: pending.previous,
            captive: pending.captive,
        };
        let ast = pending.operator.build(&occurrence, operands)?;
        output.push((ast, depth));
        Ok(())
    }
}

fn unexpected(token: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        token: token.text.clone(),
        position: token.position,
    }
}
