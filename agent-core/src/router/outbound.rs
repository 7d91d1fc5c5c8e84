use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::{debug, info};
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::envelope::{codec, Target};
use crate::tenant::Tenant;

use super::types::{MessageSender, RouterError, Transport};

/// Outbound owns the transport registry, keyed by endpoint scheme
///
/// Cloning shares the registry, so the state machines can hold their own copy and still see
/// transports registered later
#[derive(Clone, Default)]
pub struct Outbound {
    transports: Arc<RwLock<HashMap<String, Arc<dyn Transport>>>>,
}

impl Outbound {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, scheme: &str, transport: Arc<dyn Transport>) {
        let mut transports = self.transports.write().await;
        if transports.insert(scheme.to_string(), transport).is_some() {
            info!("transport replaced for scheme: {}", scheme);
        }
    }

    pub async fn transport(&self, scheme: &str) -> Result<Arc<dyn Transport>, RouterError> {
        let transports = self.transports.read().await;
        transports
            .get(scheme)
            .cloned()
            .ok_or_else(|| RouterError::NoTransport(scheme.to_string()))
    }
}

#[async_trait]
impl MessageSender for Outbound {
    async fn send(
        &self,
        tenant: &Tenant,
        message: &Value,
        target: &Target,
    ) -> Result<(), RouterError> {
        let transport = self.transport(&target.scheme()?).await?;
        let envelope = codec::pack(tenant.store(), message, target).await?;

        debug!(
            "sending from tenant {} to {}",
            tenant.id(),
            target.service_endpoint
        );
        transport
            .send(&target.service_endpoint, envelope.to_vec()?)
            .await
            .map_err(RouterError::from)
    }
}
