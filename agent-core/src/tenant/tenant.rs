use std::fmt::{self, Debug};
use std::sync::Arc;

use rst_common::standard::uuid::Uuid;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio::sync::{Mutex, OwnedMutexGuard};

use crate::keystore::{Did, SecureStore, Verkey};

use super::types::{RoutingTable, TenantError, TenantID};

/// Tenant is an isolated identity context
///
/// Every key minted through a `Tenant` is registered in the routing table, which is what makes
/// O(1) inbound resolution possible. Cloning shares the secure store and the mutation lock
#[derive(Clone)]
pub struct Tenant {
    id: TenantID,
    own_did: Did,
    primary_key: Verkey,
    master_secret_id: String,
    store: Arc<dyn SecureStore>,
    routes: Arc<dyn RoutingTable>,
    lock: Arc<Mutex<()>>,
}

impl Tenant {
    /// provision creates the tenant's own identifier and primary key, and routes the key
    pub async fn provision(
        id: TenantID,
        store: Arc<dyn SecureStore>,
        routes: Arc<dyn RoutingTable>,
    ) -> Result<Self, TenantError> {
        let (own_did, primary_key) = store.create_did().await?;
        routes.add_route(&primary_key, &id).await?;

        debug!("tenant provisioned: {} ({})", id, own_did);
        Ok(Self {
            id,
            own_did,
            primary_key,
            master_secret_id: Uuid::new_v4().to_string(),
            store,
            routes,
            lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn id(&self) -> &TenantID {
        &self.id
    }

    pub fn own_did(&self) -> &Did {
        &self.own_did
    }

    pub fn primary_key(&self) -> &Verkey {
        &self.primary_key
    }

    pub fn master_secret_id(&self) -> &str {
        &self.master_secret_id
    }

    pub fn store(&self) -> &dyn SecureStore {
        self.store.as_ref()
    }

    pub async fn create_key(&self) -> Result<Verkey, TenantError> {
        let key = self.store.create_key().await?;
        self.routes.add_route(&key, &self.id).await?;
        Ok(key)
    }

    pub async fn create_did(&self) -> Result<(Did, Verkey), TenantError> {
        let (did, key) = self.store.create_did().await?;
        self.routes.add_route(&key, &self.id).await?;
        Ok((did, key))
    }

    pub async fn key_for_local_did(&self, did: &Did) -> Result<Verkey, TenantError> {
        Ok(self.store.key_for_local_did(did).await?)
    }

    /// serialize must wrap every read-check-write sequence on this tenant's records.
    /// The guard must be dropped before sending anything, a delivered message may
    /// come back to this same tenant
    pub async fn serialize(&self) -> OwnedMutexGuard<()> {
        self.lock.clone().lock_owned().await
    }
}

impl Debug for Tenant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("own_did", &self.own_did)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}
