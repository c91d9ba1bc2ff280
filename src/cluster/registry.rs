use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::cluster::RegistryError;
use crate::rpc::{PeerClient, RegisterRequest};

/// Constraint key matching [`NodeDescriptor::sql_address`].
pub const SQL_ADDRESS: &str = "sql_address";
/// Constraint key matching [`NodeDescriptor::rpc_address`].
pub const RPC_ADDRESS: &str = "rpc_address";
/// Constraint key matching [`NodeDescriptor::region`].
pub const REGION: &str = "region";

/// A cluster node as seen by the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub sql_address: String,
    pub rpc_address: String,
    pub region: String,
    /// Known only for the local node; empty for registrations received
    /// over RPC.
    pub data_dir: String,
}

impl NodeDescriptor {
    /// Returns the field a constraint key refers to.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match key {
            SQL_ADDRESS => Some(&self.sql_address),
            RPC_ADDRESS => Some(&self.rpc_address),
            REGION => Some(&self.region),
            _ => None,
        }
    }

    /// Returns true if every constraint equals the corresponding field.
    ///
    /// Unrecognized keys never match.
    pub fn matches(&self, constraints: &BTreeMap<String, String>) -> bool {
        constraints
            .iter()
            .all(|(key, value)| self.attribute(key) == Some(value.as_str()))
    }
}

/// How repeated registrations of one node are recorded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistrationPolicy {
    /// A registration replaces any descriptor with the same rpc address.
    #[default]
    Idempotent,
    /// Every registration is appended, duplicates included.
    Additive,
}

/// In-memory list of known nodes.
///
/// Nothing is persisted or replicated: the registry only knows the nodes that
/// registered with this process.
#[derive(Debug, Default)]
pub struct ServerRegistry {
    policy: RegistrationPolicy,
    nodes: Mutex<Vec<NodeDescriptor>>,
}

impl ServerRegistry {
    pub fn new(policy: RegistrationPolicy) -> Self {
        Self {
            policy,
            nodes: Mutex::new(Vec::new()),
        }
    }

    pub fn policy(&self) -> RegistrationPolicy {
        self.policy
    }

    /// Records a node.
    pub fn register(&self, node: NodeDescriptor) -> Result<(), RegistryError> {
        if node.rpc_address.is_empty() {
            return Err(RegistryError::MissingRpcAddress);
        }

        tracing::info!(
            sql_address = %node.sql_address,
            rpc_address = %node.rpc_address,
            region = %node.region,
            "register server"
        );

        let mut nodes = self.nodes.lock();
        match self.policy {
            RegistrationPolicy::Idempotent => {
                match nodes.iter_mut().find(|n| n.rpc_address == node.rpc_address) {
                    Some(existing) => *existing = node,
                    None => nodes.push(node),
                }
            }
            RegistrationPolicy::Additive => nodes.push(node),
        }
        Ok(())
    }

    /// Returns the nodes matching every constraint, in registration order.
    ///
    /// Empty constraints return every known node.
    pub fn get_servers(&self, constraints: &BTreeMap<String, String>) -> Vec<NodeDescriptor> {
        self.nodes
            .lock()
            .iter()
            .filter(|node| node.matches(constraints))
            .cloned()
            .collect()
    }

    /// Announces `local` to the bootstrap peer at `peer`.
    ///
    /// An empty `peer` means this node starts the cluster, and nothing is
    /// sent. A failed call is not retried.
    pub async fn join<C: PeerClient>(
        &self,
        client: &C,
        local: &NodeDescriptor,
        peer: &str,
    ) -> Result<(), RegistryError> {
        if peer.is_empty() {
            return Ok(());
        }

        tracing::info!(peer = %peer, "joining cluster");
        let request = RegisterRequest {
            sql_address: local.sql_address.clone(),
            rpc_address: local.rpc_address.clone(),
            region: local.region.clone(),
        };

        match client.register(peer, request).await {
            Ok(response) if response.success => {
                tracing::info!(peer = %peer, "joined peer");
                Ok(())
            }
            Ok(_) => Err(RegistryError::JoinRejected {
                peer: peer.to_string(),
            }),
            Err(source) => {
                tracing::error!(peer = %peer, error = %source, "failed to join peer");
                Err(RegistryError::JoinFailed {
                    peer: peer.to_string(),
                    source,
                })
            }
        }
    }
}
