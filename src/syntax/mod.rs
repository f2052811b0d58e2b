//! Go frontend: tokens, syntax tree, parser, comment association and the
//! formatting-preserving printer.

pub mod ast;
pub mod comments;
pub mod decorate;
pub mod lexer;
pub mod node;
pub mod parser;
pub mod printer;
pub mod token;

use thiserror::Error;

pub use token::{LineIndex, Position, Span};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}
