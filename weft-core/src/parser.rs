//! Recursive-descent parser from the token stream to the template AST.
//!
//! Block bodies (`for`, `if`) are collected into an accumulator owned by a
//! single [`collect_children`](Parser::collect_children) call. Nested
//! constructs are interpreted recursively and consume their own
//! terminators, so an accumulator only ever holds the current level's
//! children when its terminator arrives — there is no parse state shared
//! between nesting levels.
//!
//! Boolean conditions arrive from the lexer as an ordered token sequence;
//! they are parsed by a separate little grammar that consumes the sequence
//! destructively left to right.

use std::collections::{HashMap, VecDeque};

use crate::ast::Node;
use crate::error::TemplateError;
use crate::lexer::{ExprToken, Lexer, Operator, Token, TokenKind};
use crate::position::Position;

/// How a block body was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Terminator {
    Else,
    End,
}

pub struct Parser<'p> {
    lexer: Lexer,
    partials: &'p HashMap<String, String>,
}

impl<'p> Parser<'p> {
    pub fn new(source: &str, partials: &'p HashMap<String, String>) -> Self {
        Parser {
            lexer: Lexer::new(source),
            partials,
        }
    }

    /// Parse the whole input into a root block, consuming the lexer to
    /// exhaustion. Lexer errors propagate unchanged.
    pub fn parse(&mut self) -> Result<Node, TemplateError> {
        let mut children = Vec::new();
        while let Some(token) = self.lexer.next()? {
            children.push(self.parse_token(token)?);
        }
        Ok(Node::Block(children))
    }

    fn parse_token(&mut self, token: Token) -> Result<Node, TemplateError> {
        let Token { kind, pos } = token;
        match kind {
            TokenKind::Text(value) => Ok(Node::Text(value)),
            TokenKind::Variable(name) => Ok(Node::VariableRef(name)),
            TokenKind::Partial(name) => self.parse_partial(&name),
            TokenKind::For { iterable, binding } => {
                let (children, _) = self.collect_children(false, "for", pos)?;
                Ok(Node::For {
                    iterable,
                    binding,
                    body: Box::new(Node::Block(children)),
                })
            }
            TokenKind::If(expr_tokens) => self.parse_if(expr_tokens, pos),
            TokenKind::Else | TokenKind::End => Err(TemplateError::UnexpectedCharacter {
                expected: "text or an opening tag".to_string(),
                position: pos,
            }),
        }
    }

    /// Compile the registered partial source against the same registry and
    /// splice its block in wholesale.
    fn parse_partial(&mut self, name: &str) -> Result<Node, TemplateError> {
        let source = self
            .partials
            .get(name)
            .ok_or_else(|| TemplateError::UnknownPartial(name.to_string()))?;
        Parser::new(source, self.partials).parse()
    }

    fn parse_if(
        &mut self,
        expr_tokens: Vec<ExprToken>,
        pos: Position,
    ) -> Result<Node, TemplateError> {
        let condition = parse_boolean_expr(expr_tokens, pos)?;
        let (then_children, terminator) = self.collect_children(true, "if", pos)?;
        let else_children = match terminator {
            Terminator::Else => self.collect_children(false, "if", pos)?.0,
            Terminator::End => Vec::new(),
        };
        Ok(Node::IfElse {
            condition: Box::new(condition),
            then_body: Box::new(Node::Block(then_children)),
            else_body: Box::new(Node::Block(else_children)),
        })
    }

    /// Accumulate child nodes until a terminator closes the block opened at
    /// `start`. `end` always closes; `else` only when `allow_else` is set.
    fn collect_children(
        &mut self,
        allow_else: bool,
        construct: &'static str,
        start: Position,
    ) -> Result<(Vec<Node>, Terminator), TemplateError> {
        let mut children = Vec::new();
        loop {
            let Some(token) = self.lexer.next()? else {
                return Err(TemplateError::UnterminatedBlock {
                    construct,
                    position: start,
                });
            };
            match token.kind {
                TokenKind::End => return Ok((children, Terminator::End)),
                TokenKind::Else if allow_else => return Ok((children, Terminator::Else)),
                TokenKind::Else => {
                    return Err(TemplateError::UnexpectedCharacter {
                        expected: "'{% end %}'".to_string(),
                        position: token.pos,
                    });
                }
                _ => children.push(self.parse_token(token)?),
            }
        }
    }
}

/// Parse a whole captured condition. Trailing tokens the grammar did not
/// consume mean the expression was malformed.
fn parse_boolean_expr(tokens: Vec<ExprToken>, pos: Position) -> Result<Node, TemplateError> {
    let mut tokens = VecDeque::from(tokens);
    let node = parse_compound(&mut tokens, pos)?;
    if !tokens.is_empty() {
        return Err(TemplateError::MalformedExpression(pos));
    }
    Ok(node)
}

/// A simple expression, optionally composed with `&&`/`||`.
///
/// Composition is strictly right-associative and assigns no relative
/// precedence between the two operators: each operator takes everything to
/// its right as its right-hand operand. This is the documented grammar, not
/// an oversight.
fn parse_compound(
    tokens: &mut VecDeque<ExprToken>,
    pos: Position,
) -> Result<Node, TemplateError> {
    let lhs = parse_simple(tokens, pos)?;
    let op = match tokens.pop_front() {
        None => return Ok(lhs),
        Some(ExprToken::Op(Operator::And)) => Operator::And,
        Some(ExprToken::Op(Operator::Or)) => Operator::Or,
        Some(_) => return Err(TemplateError::MalformedExpression(pos)),
    };
    let lhs = Box::new(lhs);
    let rhs = Box::new(parse_compound(tokens, pos)?);
    Ok(if op == Operator::And {
        Node::And(lhs, rhs)
    } else {
        Node::Or(lhs, rhs)
    })
}

/// One primitive value, optionally followed by `==`/`!=` and a second
/// value, or by the `exists` keyword. A lone primitive is itself a valid
/// condition (truthiness decides).
fn parse_simple(tokens: &mut VecDeque<ExprToken>, pos: Position) -> Result<Node, TemplateError> {
    let first = tokens
        .pop_front()
        .ok_or(TemplateError::MalformedExpression(pos))?;
    let lhs = parse_value(first, pos)?;
    match tokens.front() {
        Some(ExprToken::Op(Operator::Eq)) => {
            tokens.pop_front();
            let rhs = next_value(tokens, pos)?;
            Ok(Node::Equals(Box::new(lhs), Box::new(rhs)))
        }
        Some(ExprToken::Op(Operator::Ne)) => {
            tokens.pop_front();
            let rhs = next_value(tokens, pos)?;
            Ok(Node::NotEquals(Box::new(lhs), Box::new(rhs)))
        }
        // `name exists` is sugar for "name is not the missing sentinel".
        Some(ExprToken::Ident(id)) if id == "exists" => {
            tokens.pop_front();
            Ok(Node::NotEquals(
                Box::new(lhs),
                Box::new(Node::VariableRef("undefined".to_string())),
            ))
        }
        _ => Ok(lhs),
    }
}

fn next_value(tokens: &mut VecDeque<ExprToken>, pos: Position) -> Result<Node, TemplateError> {
    let token = tokens
        .pop_front()
        .ok_or(TemplateError::MalformedExpression(pos))?;
    parse_value(token, pos)
}

fn parse_value(token: ExprToken, pos: Position) -> Result<Node, TemplateError> {
    match token {
        ExprToken::Ident(id) if id.eq_ignore_ascii_case("true") => Ok(Node::BoolLit(true)),
        ExprToken::Ident(id) if id.eq_ignore_ascii_case("false") => Ok(Node::BoolLit(false)),
        ExprToken::Ident(id) => Ok(Node::VariableRef(id)),
        ExprToken::Str(value) => Ok(Node::StringLit(value)),
        ExprToken::Number(value) => Ok(Node::NumberLit(value)),
        ExprToken::Op(_) => Err(TemplateError::MalformedExpression(pos)),
    }
}
