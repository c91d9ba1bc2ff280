//! SQL parsing module.
//!
//! This module provides a handwritten recursive descent parser that converts
//! the SQL dialect accepted by the front-end into an Abstract Syntax Tree.
//!
//! ```text
//! query string ──► Lexer ──► [Token] ──► Parser ──► Option<Statement>
//! ```
//!
//! The dialect covers table and list-partition DDL, multi-row INSERT, SHOW
//! introspection, and transaction control. Everything else is a syntax error.

mod ast;
mod error;
mod lexer;
mod parser;
mod token;

pub use ast::*;
pub use error::{Span, SyntaxError};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Keyword, Token, TokenKind};
