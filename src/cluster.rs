//! Cluster membership.
//!
//! Every node keeps a [`ServerRegistry`] of the nodes it knows about. Nodes
//! enter a peer's registry by calling its Register RPC, which a starting node
//! does once through [`ServerRegistry::join`]. The partition router consults
//! the local registry to find the node owning a partition.
//!
//! ## Terminology
//!
//! - **Node descriptor**: a node's SQL address, RPC address, and region
//! - **Placement constraint**: a key/value pair a descriptor must match
//!   (`sql_address`, `rpc_address`, or `region`)
//! - **Bootstrap peer**: the RPC address a node joins at start-up

mod error;
mod registry;

pub use error::RegistryError;
pub use registry::{
    NodeDescriptor, REGION, RPC_ADDRESS, RegistrationPolicy, SQL_ADDRESS, ServerRegistry,
};
