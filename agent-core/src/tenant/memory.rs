use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::keystore::Verkey;

use super::tenant::Tenant;
use super::types::{RoutingTable, TenantDirectory, TenantError, TenantID};

#[derive(Clone, Default)]
pub struct MemoryRoutes {
    routes: Arc<RwLock<HashMap<Verkey, TenantID>>>,
}

impl MemoryRoutes {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RoutingTable for MemoryRoutes {
    async fn add_route(&self, key: &Verkey, tenant: &TenantID) -> Result<(), TenantError> {
        let mut routes = self.routes.write().await;
        routes.insert(key.to_owned(), tenant.to_owned());
        Ok(())
    }

    async fn lookup(&self, key: &Verkey) -> Result<Option<TenantID>, TenantError> {
        let routes = self.routes.read().await;
        Ok(routes.get(key).cloned())
    }

    async fn remove_routes(&self, tenant: &TenantID) -> Result<(), TenantError> {
        let mut routes = self.routes.write().await;
        routes.retain(|_, owner| owner != tenant);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct MemoryTenants {
    tenants: Arc<RwLock<HashMap<TenantID, Tenant>>>,
}

impl MemoryTenants {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenants {
    async fn insert(&self, tenant: Tenant) -> Result<(), TenantError> {
        let mut tenants = self.tenants.write().await;
        let duplicated = tenants
            .values()
            .any(|existing| existing.id() != tenant.id() && existing.own_did() == tenant.own_did());
        if duplicated {
            return Err(TenantError::DuplicateIdentifier(tenant.own_did().to_string()));
        }

        tenants.insert(tenant.id().clone(), tenant);
        Ok(())
    }

    async fn get(&self, id: &TenantID) -> Result<Option<Tenant>, TenantError> {
        let tenants = self.tenants.read().await;
        Ok(tenants.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<Tenant>, TenantError> {
        let tenants = self.tenants.read().await;
        let mut list: Vec<Tenant> = tenants.values().cloned().collect();
        list.sort_by(|a, b| a.id().as_str().cmp(b.id().as_str()));
        Ok(list)
    }

    async fn remove(&self, id: &TenantID) -> Result<(), TenantError> {
        let mut tenants = self.tenants.write().await;
        tenants.remove(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::with_tokio::tokio;

    use crate::keystore::{MemoryStore, SecureStore};

    #[tokio::test]
    async fn test_remove_routes() {
        let routes = MemoryRoutes::new();
        let alice = TenantID::from("alice".to_string());
        let bob = TenantID::from("bob".to_string());
        let store = MemoryStore::new();
        let alice_key = store.create_key().await.unwrap();
        let bob_key = store.create_key().await.unwrap();

        routes.add_route(&alice_key, &alice).await.unwrap();
        routes.add_route(&bob_key, &bob).await.unwrap();
        routes.remove_routes(&alice).await.unwrap();

        assert_eq!(routes.lookup(&alice_key).await.unwrap(), None);
        assert_eq!(routes.lookup(&bob_key).await.unwrap(), Some(bob))
    }

    #[tokio::test]
    async fn test_directory_reinsert_is_update() {
        let tenants = MemoryTenants::new();
        let routes = Arc::new(MemoryRoutes::new());
        let store = Arc::new(MemoryStore::new());

        let alice = Tenant::provision(TenantID::from("alice".to_string()), store, routes)
            .await
            .unwrap();
        tenants.insert(alice.clone()).await.unwrap();

        // re-inserting the same tenant is an update
        assert!(tenants.insert(alice.clone()).await.is_ok());
        assert_eq!(tenants.list().await.unwrap().len(), 1);
    }
}
