//! Statement handling errors.

use crate::catalog::CatalogError;
use crate::datum::DatumError;
use crate::error::ErrorKind;
use crate::router::RouterError;
use crate::sql::SyntaxError;

/// Errors that can occur while executing a statement.
///
/// Errors from the catalog and router are carried unchanged so their
/// [`ErrorKind`] reaches the client as-is.
#[derive(Debug)]
pub enum DatabaseError {
    /// SQL parsing error.
    Parse(SyntaxError),
    /// Catalog error.
    Catalog(CatalogError),
    /// Insert routing error.
    Router(RouterError),
    /// A column type name that has no [`Type`](crate::datum::Type).
    Datum(DatumError),
    /// The statement parses but has a shape this system rejects.
    InvalidStatement(String),
    /// The statement kind is recognized but not executed.
    Unsupported { statement: &'static str },
}

impl DatabaseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatabaseError::Parse(e) => e.kind(),
            DatabaseError::Catalog(e) => e.kind(),
            DatabaseError::Router(e) => e.kind(),
            DatabaseError::Datum(_) | DatabaseError::InvalidStatement(_) => {
                ErrorKind::InvalidArgument
            }
            DatabaseError::Unsupported { .. } => ErrorKind::Unimplemented,
        }
    }
}

impl std::fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseError::Parse(e) => write!(f, "{}", e),
            DatabaseError::Catalog(e) => write!(f, "{}", e),
            DatabaseError::Router(e) => write!(f, "{}", e),
            DatabaseError::Datum(e) => write!(f, "{}", e),
            DatabaseError::InvalidStatement(message) => f.write_str(message),
            DatabaseError::Unsupported { statement } => {
                write!(f, "{} is not supported", statement)
            }
        }
    }
}

impl std::error::Error for DatabaseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DatabaseError::Parse(e) => Some(e),
            DatabaseError::Catalog(e) => Some(e),
            DatabaseError::Router(e) => Some(e),
            DatabaseError::Datum(e) => Some(e),
            DatabaseError::InvalidStatement(_) | DatabaseError::Unsupported { .. } => None,
        }
    }
}

impl From<SyntaxError> for DatabaseError {
    fn from(e: SyntaxError) -> Self {
        DatabaseError::Parse(e)
    }
}

impl From<CatalogError> for DatabaseError {
    fn from(e: CatalogError) -> Self {
        DatabaseError::Catalog(e)
    }
}

impl From<RouterError> for DatabaseError {
    fn from(e: RouterError) -> Self {
        DatabaseError::Router(e)
    }
}

impl From<DatumError> for DatabaseError {
    fn from(e: DatumError) -> Self {
        DatabaseError::Datum(e)
    }
}
