//! Scalar types, values, and their key-value encoding.
//!
//! The type system is closed: a cell is either a 64-bit integer or a string.
//! [`encode`] renders a [`Datum`] as the text stored in key-value payloads and
//! [`decode`] reverses it given the column [`Type`].
//!
//! ## Row key layout
//!
//! ```text
//! /<table_name>/<primary_key_value>/column_<i>
//! ```
//!
//! `i` is the zero-based ordinal of the column in its table. The primary-key
//! column is stored under its own ordinal as well as forming the second
//! segment of every key of the row.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::types::type_oid;

/// Errors from converting between text and typed values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatumError {
    /// The type name does not map to a supported type.
    UnsupportedType(String),
    /// Text that should hold a decimal integer does not.
    InvalidInteger(String),
    /// A value cannot be converted to the requested type.
    TypeMismatch { expected: Type, value: String },
}

impl fmt::Display for DatumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatumError::UnsupportedType(name) => write!(f, "unsupported type: {}", name),
            DatumError::InvalidInteger(text) => {
                write!(f, "invalid input syntax for type bigint: \"{}\"", text)
            }
            DatumError::TypeMismatch { expected, value } => {
                write!(f, "value {} is not of type {}", value, expected)
            }
        }
    }
}

impl std::error::Error for DatumError {}

/// Column data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// 64-bit signed integer.
    Int64,
    /// Variable-length UTF-8 string.
    String,
}

impl Type {
    /// Resolves a SQL type name.
    ///
    /// Integer spellings map to [`Type::Int64`]; the common character types map
    /// to [`Type::String`]. Matching is case-insensitive.
    pub fn from_name(name: &str) -> Result<Self, DatumError> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "int4" | "int8" | "integer" | "bigint" | "int64" => Ok(Type::Int64),
            "string" | "text" | "varchar" => Ok(Type::String),
            _ => Err(DatumError::UnsupportedType(name.to_string())),
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Type::Int64 => "BIGINT",
            Type::String => "STRING",
        }
    }

    /// Returns the wire-protocol type OID.
    pub const fn oid(self) -> i32 {
        match self {
            Type::Int64 => type_oid::INT8,
            Type::String => type_oid::TEXT,
        }
    }

    /// Returns the wire-protocol type size (`-1` for variable length).
    pub const fn wire_size(self) -> i16 {
        match self {
            Type::Int64 => 8,
            Type::String => -1,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Datum {
    Int64(i64),
    String(String),
}

impl Datum {
    /// Returns the type of this value.
    pub fn data_type(&self) -> Type {
        match self {
            Datum::Int64(_) => Type::Int64,
            Datum::String(_) => Type::String,
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Int64(v) => write!(f, "{}", v),
            Datum::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Datum {
    fn from(v: i64) -> Self {
        Datum::Int64(v)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::String(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::String(s)
    }
}

/// Encodes a value as key-value payload text.
pub fn encode(datum: &Datum) -> String {
    match datum {
        Datum::Int64(v) => v.to_string(),
        Datum::String(s) => s.clone(),
    }
}

/// Decodes payload text produced by [`encode`] back into a value of `ty`.
pub fn decode(text: &str, ty: Type) -> Result<Datum, DatumError> {
    match ty {
        Type::Int64 => text
            .parse::<i64>()
            .map(Datum::Int64)
            .map_err(|_| DatumError::InvalidInteger(text.to_string())),
        Type::String => Ok(Datum::String(text.to_string())),
    }
}

/// Converts a literal value to `ty`.
///
/// String literals are accepted for integer columns when they hold a decimal
/// integer. Integers are never implicitly converted to strings.
pub fn coerce(value: Datum, ty: Type) -> Result<Datum, DatumError> {
    match (value, ty) {
        (value @ Datum::Int64(_), Type::Int64) | (value @ Datum::String(_), Type::String) => {
            Ok(value)
        }
        (Datum::String(s), Type::Int64) => decode(&s, Type::Int64).map_err(|_| {
            DatumError::TypeMismatch {
                expected: ty,
                value: format!("'{}'", s),
            }
        }),
        (Datum::Int64(v), Type::String) => Err(DatumError::TypeMismatch {
            expected: ty,
            value: v.to_string(),
        }),
    }
}

/// Rewrites stored text in the canonical form of `ty`.
///
/// `"007"` becomes `"7"` for integers; strings are unchanged.
pub fn canonicalize(text: &str, ty: Type) -> Result<String, DatumError> {
    decode(text, ty).map(|d| encode(&d))
}

/// Builds the storage key of one cell of a row.
pub fn row_key(table: &str, primary_key: &str, ordinal: usize) -> String {
    format!("/{}/{}/column_{}", table, primary_key, ordinal)
}
