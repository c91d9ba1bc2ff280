//! Node composition: the shared services one process runs.

use std::sync::Arc;

use super::error::DatabaseError;
use crate::catalog::Catalog;
use crate::cluster::ServerRegistry;
use crate::kv::KvStore;
use crate::router::PartitionRouter;
use crate::rpc::PeerClient;

/// The services of one node, shared by every SQL connection.
///
/// The catalog is loaded from `store` when the database is opened. The
/// registry is passed in because the RPC server populates it too.
pub struct Database<S: KvStore, C: PeerClient> {
    store: Arc<S>,
    catalog: Arc<Catalog<S>>,
    registry: Arc<ServerRegistry>,
    router: PartitionRouter<S, C>,
}

impl<S: KvStore, C: PeerClient> Database<S, C> {
    /// Loads the catalog from `store` and wires the router to it.
    ///
    /// # Errors
    ///
    /// Returns an error if persisted catalog records cannot be read.
    pub fn open(
        store: Arc<S>,
        registry: Arc<ServerRegistry>,
        client: Arc<C>,
    ) -> Result<Self, DatabaseError> {
        let catalog = Arc::new(Catalog::open(store.clone())?);
        let router = PartitionRouter::new(catalog.clone(), registry.clone(), client);

        Ok(Self {
            store,
            catalog,
            registry,
            router,
        })
    }

    /// Returns the backing key-value store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Returns a reference to the catalog.
    pub fn catalog(&self) -> &Arc<Catalog<S>> {
        &self.catalog
    }

    /// Returns the cluster membership registry.
    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    pub fn router(&self) -> &PartitionRouter<S, C> {
        &self.router
    }
}
