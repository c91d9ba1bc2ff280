//! RPC request and response messages.

use serde::{Deserialize, Serialize};

/// Announces a node to the receiving node's server registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub sql_address: String,
    pub rpc_address: String,
    pub region: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
}

/// One row routed to the node owning its partition.
///
/// `column_names`, `column_values` and `column_ordinals` are parallel and
/// follow the column order of the originating INSERT statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertRequest {
    pub table: String,
    /// Encoded primary-key value; the second segment of every row key.
    pub primary_key: String,
    pub column_names: Vec<String>,
    /// Encoded cell values.
    pub column_values: Vec<String>,
    /// Position of each column in the table definition.
    pub column_ordinals: Vec<u32>,
}

/// Acknowledgment of an applied insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {}

/// A request frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcRequest {
    Register(RegisterRequest),
    Insert(InsertRequest),
}

impl RpcRequest {
    pub fn name(&self) -> &'static str {
        match self {
            RpcRequest::Register(_) => "Register",
            RpcRequest::Insert(_) => "Insert",
        }
    }
}

/// A response frame.
///
/// `Error` carries the display text of a failure on the serving node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RpcResponse {
    Register(RegisterResponse),
    Insert(InsertResponse),
    Error { message: String },
}
