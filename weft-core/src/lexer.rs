//! Tokenizer for template markup and the embedded boolean-expression
//! mini-language.
//!
//! The lexer consumes the [`Scanner`] lazily: `peek` computes and caches
//! exactly one token ahead, `next` consumes it. Literal text between markup
//! forms is returned as a single `Text` token; `{{ .. }}`, `{% .. %}` and
//! `{> .. }` produce the structured kinds. The token sequence for an `if`
//! tag's condition is captured eagerly, since the closing `%}` bounds it.

use crate::error::TemplateError;
use crate::position::Position;
use crate::scanner::Scanner;

/// Comparison and boolean operators allowed inside `{% if %}` tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `&&`
    And,
    /// `||`
    Or,
}

/// One token of the boolean-expression mini-language.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprToken {
    /// A bare identifier: a variable path, `true`/`false`, or `exists`.
    Ident(String),
    /// A quoted string literal, without its quotes. No escape sequences.
    Str(String),
    /// An integer or decimal number.
    Number(f64),
    Op(Operator),
}

/// Kind of a markup-level token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// A run of literal text between markup forms.
    Text(String),
    /// `{{ name }}` — a dotted-path interpolation.
    Variable(String),
    /// `{> name}` — a reference to a registered partial.
    Partial(String),
    /// `{% for iterable as binding %}`
    For { iterable: String, binding: String },
    /// `{% if .. %}` with the condition's expression tokens.
    If(Vec<ExprToken>),
    /// `{% else %}`
    Else,
    /// `{% end %}`
    End,
}

/// A markup token together with the position it started at.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
}

pub struct Lexer {
    scanner: Scanner,
    cached: Option<Token>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            scanner: Scanner::new(source),
            cached: None,
        }
    }

    /// Compute and cache the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&Token>, TemplateError> {
        if self.cached.is_none() {
            self.cached = self.read_next()?;
        }
        Ok(self.cached.as_ref())
    }

    pub fn next(&mut self) -> Result<Option<Token>, TemplateError> {
        if let Some(token) = self.cached.take() {
            return Ok(Some(token));
        }
        self.read_next()
    }

    pub fn at_end(&mut self) -> Result<bool, TemplateError> {
        Ok(self.peek()?.is_none())
    }

    fn read_next(&mut self) -> Result<Option<Token>, TemplateError> {
        if self.scanner.at_end() {
            return Ok(None);
        }
        let pos = self.scanner.position();
        let kind = match (self.scanner.peek(0), self.scanner.peek(1)) {
            (Some('{'), Some('{')) => self.read_variable()?,
            (Some('{'), Some('%')) => self.read_control()?,
            (Some('{'), Some('>')) => self.read_partial()?,
            _ => self.read_text()?,
        };
        Ok(Some(Token { kind, pos }))
    }

    fn read_variable(&mut self) -> Result<TokenKind, TemplateError> {
        self.expect_literal("{{")?;
        self.skip_spaces()?;
        let name = self.read_while(|c| c != ' ' && c != '}')?;
        self.skip_spaces()?;
        self.expect_literal("}}")?;
        Ok(TokenKind::Variable(name))
    }

    fn read_partial(&mut self) -> Result<TokenKind, TemplateError> {
        self.expect_literal("{>")?;
        self.skip_spaces()?;
        let name = self.read_while(|c| c != ' ' && c != '}')?;
        self.skip_spaces()?;
        self.expect_literal("}")?;
        Ok(TokenKind::Partial(name))
    }

    fn read_text(&mut self) -> Result<TokenKind, TemplateError> {
        let mut text = String::new();
        while let Some(ch) = self.scanner.peek(0) {
            if ch == '{' && matches!(self.scanner.peek(1), Some('{' | '%' | '>')) {
                break;
            }
            text.push(self.scanner.advance()?);
        }
        Ok(TokenKind::Text(text))
    }

    fn read_control(&mut self) -> Result<TokenKind, TemplateError> {
        self.expect_literal("{%")?;
        self.skip_spaces()?;
        let keyword_pos = self.scanner.position();
        let keyword = self.read_while(|c| c.is_ascii_alphabetic())?;
        match keyword.as_str() {
            "for" => self.read_for(),
            "if" => Ok(TokenKind::If(self.read_expr_tokens()?)),
            "else" => {
                self.skip_spaces()?;
                self.expect_literal("%}")?;
                Ok(TokenKind::Else)
            }
            "end" => {
                self.skip_spaces()?;
                self.expect_literal("%}")?;
                Ok(TokenKind::End)
            }
            _ => Err(TemplateError::UnknownControlKeyword {
                keyword,
                position: keyword_pos,
            }),
        }
    }

    fn read_for(&mut self) -> Result<TokenKind, TemplateError> {
        self.skip_spaces()?;
        let iterable = self.read_while(|c| c != ' ' && c != '%')?;
        self.skip_spaces()?;
        self.expect_literal("as")?;
        self.skip_spaces()?;
        let binding = self.read_while(|c| c != ' ' && c != '%')?;
        self.skip_spaces()?;
        self.expect_literal("%}")?;
        Ok(TokenKind::For { iterable, binding })
    }

    /// Tokenize an `if` condition up to (and through) the closing `%}`.
    fn read_expr_tokens(&mut self) -> Result<Vec<ExprToken>, TemplateError> {
        let mut tokens = Vec::new();
        loop {
            while matches!(self.scanner.peek(0), Some(c) if c.is_whitespace()) {
                self.scanner.advance()?;
            }
            match self.scanner.peek(0) {
                None => {
                    return Err(TemplateError::UnexpectedEndOfInput(self.scanner.position()));
                }
                Some('%') if self.scanner.peek(1) == Some('}') => {
                    self.expect_literal("%}")?;
                    return Ok(tokens);
                }
                Some(ch) => tokens.push(self.read_expr_token(ch)?),
            }
        }
    }

    fn read_expr_token(&mut self, first: char) -> Result<ExprToken, TemplateError> {
        match first {
            '\'' | '"' => self.read_string_literal(first),
            '0'..='9' => self.read_number(),
            '=' | '!' | '&' | '|' => self.read_operator(),
            c if c.is_alphabetic() || c == '_' => self.read_expr_ident(),
            _ => Err(TemplateError::UnexpectedCharacter {
                expected: "an expression token".to_string(),
                position: self.scanner.position(),
            }),
        }
    }

    /// Quoted string, read to the matching quote. Unterminated literals run
    /// to the end of input and fail there.
    fn read_string_literal(&mut self, quote: char) -> Result<ExprToken, TemplateError> {
        self.scanner.advance()?;
        let mut value = String::new();
        loop {
            let ch = self.scanner.advance()?;
            if ch == quote {
                return Ok(ExprToken::Str(value));
            }
            value.push(ch);
        }
    }

    /// Digits, optionally extended by a single `.` and more digits.
    fn read_number(&mut self) -> Result<ExprToken, TemplateError> {
        let position = self.scanner.position();
        let mut digits = self.read_while(|c| c.is_ascii_digit())?;
        if self.scanner.peek(0) == Some('.')
            && matches!(self.scanner.peek(1), Some(c) if c.is_ascii_digit())
        {
            digits.push(self.scanner.advance()?);
            digits.push_str(&self.read_while(|c| c.is_ascii_digit())?);
        }
        let value = digits
            .parse()
            .map_err(|_| TemplateError::UnexpectedCharacter {
                expected: "a number".to_string(),
                position,
            })?;
        Ok(ExprToken::Number(value))
    }

    /// Two-character operator. The first character commits to a partner;
    /// anything else in second position is an unknown operator.
    fn read_operator(&mut self) -> Result<ExprToken, TemplateError> {
        let position = self.scanner.position();
        let first = self.scanner.advance()?;
        let (partner, operator) = match first {
            '=' => ('=', Operator::Eq),
            '!' => ('=', Operator::Ne),
            '&' => ('&', Operator::And),
            '|' => ('|', Operator::Or),
            other => {
                return Err(TemplateError::UnknownOperator {
                    found: other.to_string(),
                    position,
                });
            }
        };
        match self.scanner.peek(0) {
            Some(ch) if ch == partner => {
                self.scanner.advance()?;
                Ok(ExprToken::Op(operator))
            }
            Some(ch) => Err(TemplateError::UnknownOperator {
                found: format!("{first}{ch}"),
                position,
            }),
            None => Err(TemplateError::UnknownOperator {
                found: first.to_string(),
                position,
            }),
        }
    }

    // Dots are identifier characters here so that dotted paths can appear in
    // conditions: `{% if foo.bar == "bar" %}`.
    fn read_expr_ident(&mut self) -> Result<ExprToken, TemplateError> {
        let ident = self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '.')?;
        Ok(ExprToken::Ident(ident))
    }

    fn skip_spaces(&mut self) -> Result<(), TemplateError> {
        while self.scanner.peek(0) == Some(' ') {
            self.scanner.advance()?;
        }
        Ok(())
    }

    fn read_while(&mut self, pred: impl Fn(char) -> bool) -> Result<String, TemplateError> {
        let mut out = String::new();
        while let Some(ch) = self.scanner.peek(0) {
            if !pred(ch) {
                break;
            }
            out.push(self.scanner.advance()?);
        }
        Ok(out)
    }

    /// Require `expected` verbatim at the cursor.
    fn expect_literal(&mut self, expected: &'static str) -> Result<(), TemplateError> {
        for want in expected.chars() {
            let position = self.scanner.position();
            match self.scanner.peek(0) {
                Some(ch) if ch == want => {
                    self.scanner.advance()?;
                }
                _ => {
                    return Err(TemplateError::UnexpectedCharacter {
                        expected: format!("'{expected}'"),
                        position,
                    });
                }
            }
        }
        Ok(())
    }
}
