//! SQL token types.
//!
//! This module defines the [`Token`] type produced by the lexer: keywords,
//! identifiers, literals, and the few punctuation marks the grammar uses.

use super::error::Span;

/// A SQL token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The span of this token in the source.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an end-of-file token.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

/// The kind of a SQL token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Literals
    /// Unsigned integer literal (e.g., 42). A leading minus is a separate token.
    Integer(u64),
    /// String literal (e.g., 'hello').
    String(String),

    // Identifiers and keywords
    /// Unquoted identifier (e.g., foo, my_table).
    Identifier(String),
    /// Quoted identifier (e.g., "my table").
    QuotedIdentifier(String),
    Keyword(Keyword),

    // Operators and punctuation
    /// -
    Minus,
    /// *
    Asterisk,
    /// =
    Eq,
    /// (
    LParen,
    /// )
    RParen,
    /// ,
    Comma,
    /// ;
    Semicolon,

    /// A lexical error, carrying its message.
    Error(String),

    /// End of file/input.
    Eof,
}

impl TokenKind {
    /// Returns the display name for error messages.
    pub fn display_name(&self) -> String {
        match self {
            TokenKind::Integer(n) => format!("integer '{n}'"),
            TokenKind::String(s) => format!("string '{s}'"),
            TokenKind::Identifier(s) => format!("identifier '{s}'"),
            TokenKind::QuotedIdentifier(s) => format!("identifier '\"{s}\"'"),
            TokenKind::Keyword(kw) => format!("keyword '{}'", kw.as_str()),
            TokenKind::Minus => "'-'".to_string(),
            TokenKind::Asterisk => "'*'".to_string(),
            TokenKind::Eq => "'='".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::Semicolon => "';'".to_string(),
            TokenKind::Error(message) => message.clone(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// SQL keywords.
///
/// Type names and partition strategies are not keywords; the parser reads
/// them as identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    // DDL
    Create,
    Table,
    Drop,
    Alter,
    If,
    Exists,
    Set,
    Partition,
    Of,
    By,
    For,
    In,

    // DML
    Select,
    From,
    Insert,
    Into,
    Values,

    // Constraints
    Primary,
    Key,
    Not,
    Null,

    // Transactions
    Begin,
    Start,
    Transaction,
    Commit,
    Rollback,

    // Introspection
    Show,
}

/// Spelling of every keyword, in declaration order.
const KEYWORDS: [(Keyword, &str); 27] = [
    (Keyword::Create, "CREATE"),
    (Keyword::Table, "TABLE"),
    (Keyword::Drop, "DROP"),
    (Keyword::Alter, "ALTER"),
    (Keyword::If, "IF"),
    (Keyword::Exists, "EXISTS"),
    (Keyword::Set, "SET"),
    (Keyword::Partition, "PARTITION"),
    (Keyword::Of, "OF"),
    (Keyword::By, "BY"),
    (Keyword::For, "FOR"),
    (Keyword::In, "IN"),
    (Keyword::Select, "SELECT"),
    (Keyword::From, "FROM"),
    (Keyword::Insert, "INSERT"),
    (Keyword::Into, "INTO"),
    (Keyword::Values, "VALUES"),
    (Keyword::Primary, "PRIMARY"),
    (Keyword::Key, "KEY"),
    (Keyword::Not, "NOT"),
    (Keyword::Null, "NULL"),
    (Keyword::Begin, "BEGIN"),
    (Keyword::Start, "START"),
    (Keyword::Transaction, "TRANSACTION"),
    (Keyword::Commit, "COMMIT"),
    (Keyword::Rollback, "ROLLBACK"),
    (Keyword::Show, "SHOW"),
];

impl Keyword {
    /// Returns the upper-case spelling of this keyword.
    pub fn as_str(&self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(kw, _)| kw == self)
            .map_or("", |(_, name)| *name)
    }

    /// Looks up a word, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(s))
            .map(|(kw, _)| *kw)
    }
}
