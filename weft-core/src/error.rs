use thiserror::Error;

use crate::position::Position;

/// Every failure the compile and render pipeline can produce.
///
/// Scanner, lexer, and parser errors abort compilation entirely; the only
/// render-time variant is `UnresolvableIterator`. An unresolved plain
/// variable reference is not an error, it renders as the empty string.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("unexpected end of input at {0}")]
    UnexpectedEndOfInput(Position),
    #[error("expected {expected} at {position}")]
    UnexpectedCharacter { expected: String, position: Position },
    #[error("unknown control keyword '{keyword}' at {position}, expected one of: for, if, else, end")]
    UnknownControlKeyword { keyword: String, position: Position },
    #[error("unknown operator '{found}' at {position}")]
    UnknownOperator { found: String, position: Position },
    #[error("'{construct}' block starting at {position} was never terminated")]
    UnterminatedBlock {
        construct: &'static str,
        position: Position,
    },
    #[error("malformed boolean expression at {0}")]
    MalformedExpression(Position),
    #[error("no partial named '{0}' is registered")]
    UnknownPartial(String),
    #[error("cannot resolve '{path}' to an iterable sequence")]
    UnresolvableIterator { path: String },
    #[error("failed to read partial source: {0}")]
    Io(#[from] std::io::Error),
}
