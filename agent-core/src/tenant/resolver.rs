use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::{debug, warn};

use crate::envelope::codec;
use crate::envelope::{Algorithm, Envelope, EnvelopeError, Forward, Unpacked};
use crate::keystore::{KeyError, Verkey};

use super::domain::Domain;
use super::pool::HandlePool;
use super::types::{
    Resolved, RoutingTable, TenantDirectory, TenantError, TenantResolver,
};

pub const DEFAULT_TRIAL_LIMIT: usize = 64;

/// RoutingResolver resolves inbound envelopes layer by layer
///
/// The domain layer is opened first when a domain is configured. Every forward layer after
/// that is located through the routing table, trial decryption over the tenants' primary keys
/// is only used when no route is known, and never tries more than `trial_limit` tenants
#[derive(Clone)]
pub struct RoutingResolver {
    domain: Option<Domain>,
    routes: Arc<dyn RoutingTable>,
    directory: Arc<dyn TenantDirectory>,
    pool: HandlePool,
    trial_limit: usize,
}

impl RoutingResolver {
    pub fn new(
        routes: Arc<dyn RoutingTable>,
        directory: Arc<dyn TenantDirectory>,
        pool: HandlePool,
    ) -> Self {
        Self {
            domain: None,
            routes,
            directory,
            pool,
            trial_limit: DEFAULT_TRIAL_LIMIT,
        }
    }

    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_trial_limit(mut self, limit: usize) -> Self {
        self.trial_limit = limit;
        self
    }

    pub fn pool(&self) -> &HandlePool {
        &self.pool
    }

    async fn open_domain(&self, envelope: &Envelope) -> Result<Option<Forward>, TenantError> {
        match &self.domain {
            Some(domain) => domain.open(envelope).await,
            None => Ok(None),
        }
    }

    async fn locate(&self, key: &Verkey, envelope: &Envelope) -> Result<Resolved, TenantError> {
        let Some(tenant_id) = self.routes.lookup(key).await? else {
            debug!("no route for key: {}, trying trial decryption", key);
            return self.trial_decrypt(envelope).await;
        };

        let tenant = self
            .directory
            .get(&tenant_id)
            .await?
            .ok_or_else(|| TenantError::TenantNotFound(tenant_id.to_string()))?;

        let handle = self.pool.acquire(tenant)?;
        let unpacked = codec::unpack(handle.tenant().store(), key, envelope).await?;
        Ok(Resolved { handle, unpacked })
    }

    async fn trial_decrypt(&self, envelope: &Envelope) -> Result<Resolved, TenantError> {
        if envelope.alg != Algorithm::Anoncrypt {
            return Err(TenantError::NoTenantFound);
        }

        let tenants = self.directory.list().await?;
        if tenants.len() > self.trial_limit {
            warn!(
                "trial decryption limited to {} of {} tenants",
                self.trial_limit,
                tenants.len()
            );
        }

        for tenant in tenants.into_iter().take(self.trial_limit) {
            let key = tenant.primary_key().to_owned();
            match codec::anonymous_decrypt(tenant.store(), &key, envelope).await {
                Ok(message) => {
                    let handle = self.pool.acquire(tenant)?;
                    let unpacked = Unpacked {
                        message,
                        sender_key: None,
                        recipient_key: key,
                    };
                    return Ok(Resolved { handle, unpacked });
                }
                Err(EnvelopeError::KeyError(KeyError::StoreError(err))) => {
                    return Err(TenantError::StoreError(err))
                }
                Err(_) => continue,
            }
        }

        Err(TenantError::NoTenantFound)
    }
}

#[async_trait]
impl TenantResolver for RoutingResolver {
    async fn resolve(&self, bytes: &[u8]) -> Result<Resolved, TenantError> {
        let envelope = Envelope::from_slice(bytes)?;

        let mut resolved = match self.open_domain(&envelope).await? {
            Some(forward) => self.locate(&forward.to, &forward.msg).await?,
            None => self.trial_decrypt(&envelope).await?,
        };

        while let Some(forward) = Forward::from_message(&resolved.unpacked.message)? {
            resolved = self.locate(&forward.to, &forward.msg).await?;
        }

        debug!("envelope resolved to tenant: {}", resolved.handle.tenant().id());
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;
    use rst_common::with_tokio::tokio;

    use crate::envelope::Target;
    use crate::keystore::{MemoryStore, SecureStore};
    use crate::tenant::memory::{MemoryRoutes, MemoryTenants};
    use crate::tenant::tenant::Tenant;
    use crate::tenant::types::TenantID;

    struct Fixture {
        routes: Arc<MemoryRoutes>,
        tenants: Arc<MemoryTenants>,
        domain: Domain,
        pool: HandlePool,
    }

    impl Fixture {
        async fn new() -> Self {
            let domain = Domain::provision(Arc::new(MemoryStore::new()), "local://agent".to_string())
                .await
                .unwrap();

            Self {
                routes: Arc::new(MemoryRoutes::new()),
                tenants: Arc::new(MemoryTenants::new()),
                domain,
                pool: HandlePool::new(),
            }
        }

        async fn tenant(&self, name: &str) -> Tenant {
            let tenant = Tenant::provision(
                TenantID::from(name.to_string()),
                Arc::new(MemoryStore::new()),
                self.routes.clone(),
            )
            .await
            .unwrap();

            self.tenants.insert(tenant.clone()).await.unwrap();
            tenant
        }

        fn resolver(&self) -> RoutingResolver {
            RoutingResolver::new(self.routes.clone(), self.tenants.clone(), self.pool.clone())
                .with_domain(self.domain.clone())
        }
    }

    #[tokio::test]
    async fn test_resolve_through_routing_table() {
        let fixture = Fixture::new().await;
        let _alice = fixture.tenant("alice").await;
        let bob = fixture.tenant("bob").await;
        let pairwise_key = bob.create_key().await.unwrap();

        let sender_store = MemoryStore::new();
        let sender = sender_store.create_key().await.unwrap();
        let target = Target::new(
            vec![pairwise_key.clone()],
            vec![bob.primary_key().clone(), fixture.domain.key().clone()],
            "local://agent".to_string(),
        )
        .with_sender(sender.clone());

        let message = json!({"@type": "test", "hello": "bob"});
        let envelope = codec::pack(&sender_store, &message, &target).await.unwrap();

        let resolver = fixture.resolver().with_trial_limit(0);
        let resolved = resolver.resolve(&envelope.to_vec().unwrap()).await.unwrap();
        assert_eq!(resolved.handle.tenant().id(), bob.id());
        assert_eq!(resolved.unpacked.message, message);
        assert_eq!(resolved.unpacked.sender_key, Some(sender));
        assert_eq!(resolved.unpacked.recipient_key, pairwise_key);
        assert_eq!(fixture.pool.open_handles(bob.id()), 1);

        drop(resolved);
        assert_eq!(fixture.pool.open_handles(bob.id()), 0)
    }

    #[tokio::test]
    async fn test_resolve_by_trial_decryption() {
        let fixture = Fixture::new().await;
        let _alice = fixture.tenant("alice").await;
        let bob = fixture.tenant("bob").await;

        let message = json!({"@type": "test"});
        let envelope = codec::anonymous_encrypt(bob.primary_key(), &message).unwrap();

        let resolved = fixture
            .resolver()
            .resolve(&envelope.to_vec().unwrap())
            .await
            .unwrap();
        assert_eq!(resolved.handle.tenant().id(), bob.id());
        assert_eq!(resolved.unpacked.sender_key, None);
        assert_eq!(resolved.unpacked.message, message)
    }

    #[tokio::test]
    async fn test_trial_decryption_is_bounded() {
        let fixture = Fixture::new().await;
        let _alice = fixture.tenant("alice").await;
        let bob = fixture.tenant("bob").await;

        let envelope = codec::anonymous_encrypt(bob.primary_key(), &json!({})).unwrap();
        let result = fixture
            .resolver()
            .with_trial_limit(1)
            .resolve(&envelope.to_vec().unwrap())
            .await;

        assert!(matches!(result.unwrap_err(), TenantError::NoTenantFound))
    }

    #[tokio::test]
    async fn test_no_tenant_found() {
        let fixture = Fixture::new().await;
        let alice = fixture.tenant("alice").await;

        let stranger = MemoryStore::new().create_key().await.unwrap();
        let envelope = codec::anonymous_encrypt(&stranger, &json!({})).unwrap();
        let result = fixture.resolver().resolve(&envelope.to_vec().unwrap()).await;

        assert!(matches!(result.unwrap_err(), TenantError::NoTenantFound));
        assert_eq!(fixture.pool.open_handles(alice.id()), 0)
    }

    #[tokio::test]
    async fn test_route_to_removed_tenant() {
        let fixture = Fixture::new().await;
        let alice = fixture.tenant("alice").await;
        fixture.tenants.remove(alice.id()).await.unwrap();

        let inner = codec::anonymous_encrypt(alice.primary_key(), &json!({})).unwrap();
        let wrapped =
            codec::forward_wrap(inner, alice.primary_key(), &[fixture.domain.key().clone()])
                .unwrap();

        let result = fixture.resolver().resolve(&wrapped.to_vec().unwrap()).await;
        assert!(matches!(result.unwrap_err(), TenantError::TenantNotFound(_)))
    }

    #[tokio::test]
    async fn test_handle_released_when_inner_layer_fails() {
        let fixture = Fixture::new().await;
        let alice = fixture.tenant("alice").await;

        // routed to alice, but encrypted for a key alice doesn't hold
        let stranger = MemoryStore::new().create_key().await.unwrap();
        let inner = codec::anonymous_encrypt(&stranger, &json!({})).unwrap();
        let wrapped =
            codec::forward_wrap(inner, alice.primary_key(), &[fixture.domain.key().clone()])
                .unwrap();

        let result = fixture.resolver().resolve(&wrapped.to_vec().unwrap()).await;
        assert!(result.is_err());
        assert_eq!(fixture.pool.open_handles(alice.id()), 0)
    }

    #[tokio::test]
    async fn test_invalid_bytes() {
        let fixture = Fixture::new().await;
        let result = fixture.resolver().resolve(b"not an envelope").await;
        assert!(matches!(
            result.unwrap_err(),
            TenantError::EnvelopeError(EnvelopeError::InvalidEnvelope(_))
        ))
    }
}
