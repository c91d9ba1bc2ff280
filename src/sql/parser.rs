//! SQL parser using recursive descent.
//!
//! The [`Parser`] converts the token stream of one statement into an AST.
//!
//! ## Grammar
//!
//! ```text
//! statement   := create | drop | alter | insert | select | transaction | show
//! create      := CREATE TABLE name ( '(' column_defs ')' [partition_by]
//!                                  | PARTITION OF name FOR VALUES IN '(' literals ')' )
//! partition_by:= PARTITION BY method '(' identifiers ')'
//! drop        := DROP TABLE [IF EXISTS] name
//! alter       := ALTER TABLE name SET '(' key '=' literal {',' key '=' literal} ')'
//! insert      := INSERT INTO name ['(' identifiers ')'] VALUES row {',' row}
//! select      := SELECT items [FROM name]
//! transaction := BEGIN [TRANSACTION] | START TRANSACTION | COMMIT | ROLLBACK
//! show        := SHOW (tables | servers)
//! ```

use super::ast::*;
use super::error::{Span, SyntaxError};
use super::lexer::Lexer;
use super::token::{Keyword, Token, TokenKind};

/// SQL parser that converts tokens into an AST.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    input: &'a str,
}

impl<'a> Parser<'a> {
    /// Creates a new parser for the given SQL input.
    pub fn new(input: &'a str) -> Self {
        Self {
            tokens: Lexer::new(input).collect(),
            pos: 0,
            input,
        }
    }

    /// Parses the input and returns a statement.
    ///
    /// Returns `Ok(None)` for empty queries (whitespace/comments only).
    pub fn parse(&mut self) -> Result<Option<Statement>, SyntaxError> {
        if let Some(token) = self
            .tokens
            .iter()
            .find(|t| matches!(t.kind, TokenKind::Error(_)))
        {
            return Err(SyntaxError::new(token.kind.display_name(), token.span));
        }

        if self.is_eof() {
            return Ok(None);
        }

        let stmt = self.parse_statement()?;

        // Optional trailing semicolon
        self.consume_token(TokenKind::Semicolon);

        if !self.is_eof() {
            return Err(self.unexpected("end of input"));
        }

        Ok(Some(stmt))
    }

    fn parse_statement(&mut self) -> Result<Statement, SyntaxError> {
        if self.consume_keyword(Keyword::Begin) {
            self.consume_keyword(Keyword::Transaction);
            return Ok(Statement::Transaction(TransactionStmt::Begin));
        }

        if self.consume_keyword(Keyword::Start) {
            self.expect_keyword(Keyword::Transaction)?;
            return Ok(Statement::Transaction(TransactionStmt::Begin));
        }

        if self.consume_keyword(Keyword::Commit) {
            self.consume_keyword(Keyword::Transaction);
            return Ok(Statement::Transaction(TransactionStmt::Commit));
        }

        if self.consume_keyword(Keyword::Rollback) {
            self.consume_keyword(Keyword::Transaction);
            return Ok(Statement::Transaction(TransactionStmt::Rollback));
        }

        if self.consume_keyword(Keyword::Create) {
            self.expect_keyword(Keyword::Table)?;
            return self.parse_create_table_stmt();
        }

        if self.consume_keyword(Keyword::Drop) {
            self.expect_keyword(Keyword::Table)?;
            return self.parse_drop_table_stmt();
        }

        if self.consume_keyword(Keyword::Alter) {
            self.expect_keyword(Keyword::Table)?;
            return self.parse_alter_table_stmt();
        }

        if self.consume_keyword(Keyword::Insert) {
            return self.parse_insert_stmt();
        }

        if self.consume_keyword(Keyword::Select) {
            return self.parse_select_stmt();
        }

        if self.consume_keyword(Keyword::Show) {
            return self.parse_show_stmt();
        }

        Err(self.unexpected("statement"))
    }

    /// Parses the rest of a CREATE TABLE statement after `CREATE TABLE`.
    fn parse_create_table_stmt(&mut self) -> Result<Statement, SyntaxError> {
        let name = self.expect_identifier()?;

        if self.consume_keyword(Keyword::Partition) {
            self.expect_keyword(Keyword::Of)?;
            let parent = self.expect_identifier()?;
            self.expect_keyword(Keyword::For)?;
            self.expect_keyword(Keyword::Values)?;
            self.expect_keyword(Keyword::In)?;
            self.expect_token(TokenKind::LParen)?;
            let values = self.parse_literal_list()?;
            self.expect_token(TokenKind::RParen)?;

            return Ok(Statement::CreatePartition(CreatePartitionStmt {
                name,
                parent,
                values,
            }));
        }

        self.expect_token(TokenKind::LParen)?;

        let mut columns: Vec<ColumnDef> = Vec::new();
        let mut key_columns = Vec::new();
        loop {
            if self.check_keyword(Keyword::Primary) {
                let span = self.current_span();
                self.advance();
                self.expect_keyword(Keyword::Key)?;
                self.expect_token(TokenKind::LParen)?;
                let key = self.parse_identifier_list()?;
                self.expect_token(TokenKind::RParen)?;
                key_columns.push((key, span));
            } else {
                columns.push(self.parse_column_def()?);
            }

            if !self.consume_token(TokenKind::Comma) {
                break;
            }
        }

        self.expect_token(TokenKind::RParen)?;

        // Table-level PRIMARY KEY marks its column.
        for (key, span) in key_columns {
            for key_column in key {
                let column = columns
                    .iter_mut()
                    .find(|c| c.name == key_column)
                    .ok_or_else(|| {
                        SyntaxError::new(
                            format!("column \"{}\" named in key does not exist", key_column),
                            span,
                        )
                    })?;
                if !column.is_primary_key() {
                    column.constraints.push(ColumnConstraint::PrimaryKey);
                }
            }
        }

        let partition_by = if self.consume_keyword(Keyword::Partition) {
            self.expect_keyword(Keyword::By)?;
            Some(self.parse_partition_by()?)
        } else {
            None
        };

        Ok(Statement::CreateTable(Box::new(CreateTableStmt {
            name,
            columns,
            partition_by,
        })))
    }

    /// Parses a column definition.
    fn parse_column_def(&mut self) -> Result<ColumnDef, SyntaxError> {
        let name = self.expect_identifier()?;
        let type_name = self.expect_identifier()?;

        // Length modifiers such as VARCHAR(255) are accepted and ignored.
        if self.consume_token(TokenKind::LParen) {
            self.expect_integer()?;
            self.expect_token(TokenKind::RParen)?;
        }

        let mut constraints = Vec::new();
        loop {
            if self.consume_keyword(Keyword::Not) {
                self.expect_keyword(Keyword::Null)?;
                constraints.push(ColumnConstraint::NotNull);
            } else if self.consume_keyword(Keyword::Null) {
                constraints.push(ColumnConstraint::Null);
            } else if self.consume_keyword(Keyword::Primary) {
                self.expect_keyword(Keyword::Key)?;
                constraints.push(ColumnConstraint::PrimaryKey);
            } else {
                break;
            }
        }

        Ok(ColumnDef {
            name,
            type_name,
            constraints,
        })
    }

    /// Parses `method (columns)` after `PARTITION BY`.
    fn parse_partition_by(&mut self) -> Result<PartitionBy, SyntaxError> {
        let span = self.current_span();
        let method = match self.expect_identifier()?.as_str() {
            "list" => PartitionMethod::List,
            "range" => PartitionMethod::Range,
            "hash" => PartitionMethod::Hash,
            other => {
                return Err(SyntaxError::new(
                    format!("unrecognized partitioning strategy \"{}\"", other),
                    span,
                ));
            }
        };

        self.expect_token(TokenKind::LParen)?;
        let columns = self.parse_identifier_list()?;
        self.expect_token(TokenKind::RParen)?;

        Ok(PartitionBy { method, columns })
    }

    /// Parses the rest of a DROP TABLE statement after `DROP TABLE`.
    fn parse_drop_table_stmt(&mut self) -> Result<Statement, SyntaxError> {
        let if_exists = if self.consume_keyword(Keyword::If) {
            self.expect_keyword(Keyword::Exists)?;
            true
        } else {
            false
        };

        let name = self.expect_identifier()?;

        Ok(Statement::DropTable(DropTableStmt { name, if_exists }))
    }

    /// Parses the rest of an ALTER TABLE statement after `ALTER TABLE`.
    fn parse_alter_table_stmt(&mut self) -> Result<Statement, SyntaxError> {
        let name = self.expect_identifier()?;
        self.expect_keyword(Keyword::Set)?;
        self.expect_token(TokenKind::LParen)?;

        let mut options = Vec::new();
        loop {
            let key = self.expect_identifier()?;
            self.expect_token(TokenKind::Eq)?;
            let value = self.parse_literal()?;
            options.push(TableOption { key, value });

            if !self.consume_token(TokenKind::Comma) {
                break;
            }
        }

        self.expect_token(TokenKind::RParen)?;

        Ok(Statement::AlterTable(AlterTableStmt { name, options }))
    }

    /// Parses the rest of an INSERT statement after `INSERT`.
    fn parse_insert_stmt(&mut self) -> Result<Statement, SyntaxError> {
        self.expect_keyword(Keyword::Into)?;
        let table = self.expect_identifier()?;

        let columns = if self.consume_token(TokenKind::LParen) {
            let cols = self.parse_identifier_list()?;
            self.expect_token(TokenKind::RParen)?;
            cols
        } else {
            vec![]
        };

        self.expect_keyword(Keyword::Values)?;

        let mut rows = Vec::new();
        loop {
            self.expect_token(TokenKind::LParen)?;
            rows.push(self.parse_literal_list()?);
            self.expect_token(TokenKind::RParen)?;

            if !self.consume_token(TokenKind::Comma) {
                break;
            }
        }

        Ok(Statement::Insert(Box::new(InsertStmt {
            table,
            columns,
            rows,
        })))
    }

    /// Parses the rest of a SELECT statement after `SELECT`.
    fn parse_select_stmt(&mut self) -> Result<Statement, SyntaxError> {
        let mut items = Vec::new();
        loop {
            let item = if self.consume_token(TokenKind::Asterisk) {
                SelectItem::Wildcard
            } else if matches!(
                self.peek_kind(),
                Some(TokenKind::Identifier(_) | TokenKind::QuotedIdentifier(_))
            ) {
                SelectItem::Column(self.expect_identifier()?)
            } else {
                SelectItem::Literal(self.parse_literal()?)
            };
            items.push(item);

            if !self.consume_token(TokenKind::Comma) {
                break;
            }
        }

        let from = if self.consume_keyword(Keyword::From) {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        Ok(Statement::Select(SelectStmt { items, from }))
    }

    /// Parses the rest of a SHOW statement after `SHOW`.
    fn parse_show_stmt(&mut self) -> Result<Statement, SyntaxError> {
        let span = self.current_span();
        match self.expect_identifier()?.as_str() {
            "tables" => Ok(Statement::Show(ShowStmt::Tables)),
            "servers" => Ok(Statement::Show(ShowStmt::Servers)),
            other => Err(SyntaxError::new(
                format!("unrecognized SHOW target \"{}\"", other),
                span,
            )),
        }
    }

    /// Parses a literal: an optionally negated integer, a string, or NULL.
    fn parse_literal(&mut self) -> Result<Literal, SyntaxError> {
        if self.consume_keyword(Keyword::Null) {
            return Ok(Literal::Null);
        }

        if self.consume_token(TokenKind::Minus) {
            let span = self.current_span();
            let magnitude = self.expect_integer()?;
            return 0i64
                .checked_sub_unsigned(magnitude)
                .map(Literal::Integer)
                .ok_or_else(|| SyntaxError::new("integer out of range", span));
        }

        match self.peek_kind() {
            Some(TokenKind::Integer(n)) => {
                let span = self.current_span();
                let n = i64::try_from(*n)
                    .map_err(|_| SyntaxError::new("integer out of range", span))?;
                self.advance();
                Ok(Literal::Integer(n))
            }
            Some(TokenKind::String(s)) => {
                let s = s.clone();
                self.advance();
                Ok(Literal::String(s))
            }
            _ => Err(self.unexpected("literal")),
        }
    }

    // ==================== Helper methods ====================

    /// Returns true if at end of tokens.
    fn is_eof(&self) -> bool {
        self.peek().is_none_or(|t| t.is_eof())
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|t| &t.kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn current_span(&self) -> Span {
        self.peek().map_or(Span::at(self.input.len()), |t| t.span)
    }

    fn current_token_name(&self) -> String {
        self.peek()
            .map_or("end of input".to_string(), |t| t.kind.display_name())
    }

    /// Builds an error for the current token.
    fn unexpected(&self, expected: &str) -> SyntaxError {
        SyntaxError::unexpected_token(expected, &self.current_token_name(), self.current_span())
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        self.peek_kind() == Some(&TokenKind::Keyword(kw))
    }

    fn consume_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: Keyword) -> Result<(), SyntaxError> {
        if self.consume_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("keyword '{}'", kw.as_str())))
        }
    }

    fn consume_token(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(&kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_token(&mut self, kind: TokenKind) -> Result<(), SyntaxError> {
        if self.consume_token(kind.clone()) {
            Ok(())
        } else {
            Err(self.unexpected(&kind.display_name()))
        }
    }

    /// Expects an identifier, returning its name.
    fn expect_identifier(&mut self) -> Result<String, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Identifier(name) | TokenKind::QuotedIdentifier(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_integer(&mut self) -> Result<u64, SyntaxError> {
        match self.peek_kind() {
            Some(TokenKind::Integer(n)) => {
                let n = *n;
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("integer")),
        }
    }

    /// Parses a comma-separated list of identifiers.
    fn parse_identifier_list(&mut self) -> Result<Vec<String>, SyntaxError> {
        let mut list = vec![self.expect_identifier()?];
        while self.consume_token(TokenKind::Comma) {
            list.push(self.expect_identifier()?);
        }
        Ok(list)
    }

    /// Parses a comma-separated list of literals.
    fn parse_literal_list(&mut self) -> Result<Vec<Literal>, SyntaxError> {
        let mut list = vec![self.parse_literal()?];
        while self.consume_token(TokenKind::Comma) {
            list.push(self.parse_literal()?);
        }
        Ok(list)
    }
}
