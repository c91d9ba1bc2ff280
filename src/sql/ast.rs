//! Abstract Syntax Tree (AST) for SQL statements.
//!
//! The AST is produced by the parser and consumed by the statement handler.

use std::fmt;

/// A SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// CREATE TABLE with column definitions.
    CreateTable(Box<CreateTableStmt>),
    /// CREATE TABLE ... PARTITION OF ... FOR VALUES IN (...).
    CreatePartition(CreatePartitionStmt),
    /// DROP TABLE.
    DropTable(DropTableStmt),
    /// ALTER TABLE ... SET (...).
    AlterTable(AlterTableStmt),
    /// INSERT INTO ... VALUES.
    Insert(Box<InsertStmt>),
    /// SELECT.
    Select(SelectStmt),
    /// BEGIN, COMMIT, or ROLLBACK.
    Transaction(TransactionStmt),
    /// SHOW.
    Show(ShowStmt),
}

impl Statement {
    /// Returns the statement's leading keywords, for logs and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Statement::CreateTable(_) | Statement::CreatePartition(_) => "CREATE TABLE",
            Statement::DropTable(_) => "DROP TABLE",
            Statement::AlterTable(_) => "ALTER TABLE",
            Statement::Insert(_) => "INSERT",
            Statement::Select(_) => "SELECT",
            Statement::Transaction(TransactionStmt::Begin) => "BEGIN",
            Statement::Transaction(TransactionStmt::Commit) => "COMMIT",
            Statement::Transaction(TransactionStmt::Rollback) => "ROLLBACK",
            Statement::Show(_) => "SHOW",
        }
    }
}

/// CREATE TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    /// PARTITION BY clause.
    pub partition_by: Option<PartitionBy>,
}

/// A column definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    /// Type name as written, without any length modifier.
    pub type_name: String,
    pub constraints: Vec<ColumnConstraint>,
}

impl ColumnDef {
    pub fn is_primary_key(&self) -> bool {
        self.constraints.contains(&ColumnConstraint::PrimaryKey)
    }
}

/// Column-level constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    /// NOT NULL
    NotNull,
    /// NULL
    Null,
    /// PRIMARY KEY
    PrimaryKey,
}

/// PARTITION BY clause.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionBy {
    pub method: PartitionMethod,
    pub columns: Vec<String>,
}

/// Partitioning method named in PARTITION BY.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionMethod {
    List,
    Range,
    Hash,
}

/// CREATE TABLE name PARTITION OF parent FOR VALUES IN (...).
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePartitionStmt {
    pub name: String,
    pub parent: String,
    pub values: Vec<Literal>,
}

/// DROP TABLE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStmt {
    pub name: String,
    pub if_exists: bool,
}

/// ALTER TABLE name SET (key = value, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct AlterTableStmt {
    pub name: String,
    pub options: Vec<TableOption>,
}

/// One `key = value` pair of ALTER TABLE SET.
#[derive(Debug, Clone, PartialEq)]
pub struct TableOption {
    pub key: String,
    pub value: Literal,
}

/// INSERT statement.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: String,
    /// Explicit column list; empty when omitted.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Literal>>,
}

/// SELECT statement.
///
/// Only the projection list and an optional single FROM table are parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub items: Vec<SelectItem>,
    pub from: Option<String>,
}

/// An item in the SELECT list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Column(String),
    Literal(Literal),
}

/// Transaction control statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStmt {
    Begin,
    Commit,
    Rollback,
}

/// SHOW statement target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowStmt {
    Tables,
    Servers,
}

/// A constant value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    String(String),
    Null,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Null => f.write_str("NULL"),
        }
    }
}
