use std::collections::HashMap;
use std::sync::{Arc, Weak};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::{debug, info};
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::envelope::{message, Target};
use crate::tenant::{Resolved, Tenant, TenantResolver};

use super::outbound::Outbound;
use super::types::{
    DeliveryHook, InboundSink, MessageHandler, MessageSender, RouterError, Transport,
};

/// Router is the explicit registry of message handlers and transports
///
/// It is constructed once and shared through an `Arc`. Nothing is global, two routers in the
/// same process never see each other's registrations
pub struct Router {
    resolver: Arc<dyn TenantResolver>,
    outbound: Outbound,
    hook: Option<Arc<dyn DeliveryHook>>,
    handlers: RwLock<HashMap<String, Arc<dyn MessageHandler>>>,
}

impl Router {
    pub fn new(resolver: Arc<dyn TenantResolver>, outbound: Outbound) -> Self {
        Self {
            resolver,
            outbound,
            hook: None,
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_delivery_hook(mut self, hook: Arc<dyn DeliveryHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn outbound(&self) -> Outbound {
        self.outbound.clone()
    }

    /// register_handler replaces any handler previously registered for `message_type`
    pub async fn register_handler(&self, message_type: &str, handler: Arc<dyn MessageHandler>) {
        let mut handlers = self.handlers.write().await;
        if handlers.insert(message_type.to_string(), handler).is_some() {
            info!("handler replaced for message type: {}", message_type);
        }
    }

    pub async fn register_handlers(&self, message_types: &[&str], handler: Arc<dyn MessageHandler>) {
        for message_type in message_types {
            self.register_handler(message_type, handler.clone()).await;
        }
    }

    /// register_transport makes `transport` available for outbound delivery and points its
    /// inbound callback at this router
    pub async fn register_transport(self: &Arc<Self>, scheme: &str, transport: Arc<dyn Transport>) {
        transport.on_receive(Arc::new(RouterSink {
            router: Arc::downgrade(self),
        }));
        self.outbound.register(scheme, transport).await;
    }

    /// dispatch resolves the owning tenant, runs the delivery hook for authenticated messages
    /// and invokes the handler registered for the message type. The tenant handle is released
    /// on every exit path
    pub async fn dispatch(&self, envelope: &[u8]) -> Result<(), RouterError> {
        let Resolved { handle, unpacked } = self.resolver.resolve(envelope).await?;
        let tenant = handle.tenant();

        if let (Some(hook), Some(their_key)) = (&self.hook, &unpacked.sender_key) {
            hook.on_authenticated_delivery(tenant, their_key, &unpacked.recipient_key)
                .await?;
        }

        let message_type = message::message_type(&unpacked.message)
            .ok_or_else(|| RouterError::UnsupportedMessageType("<missing>".to_string()))?
            .to_string();

        let handler = self.handler(&message_type).await?;
        debug!("dispatching {} to tenant {}", message_type, tenant.id());
        handler.handle(tenant, unpacked).await
    }

    pub async fn send(
        &self,
        tenant: &Tenant,
        message: &Value,
        target: &Target,
    ) -> Result<(), RouterError> {
        self.outbound.send(tenant, message, target).await
    }

    async fn handler(&self, message_type: &str) -> Result<Arc<dyn MessageHandler>, RouterError> {
        let handlers = self.handlers.read().await;
        handlers
            .get(message_type)
            .cloned()
            .ok_or_else(|| RouterError::UnsupportedMessageType(message_type.to_string()))
    }
}

struct RouterSink {
    router: Weak<Router>,
}

#[async_trait]
impl InboundSink for RouterSink {
    async fn deliver(&self, payload: Vec<u8>) -> Result<(), RouterError> {
        let router = self.router.upgrade().ok_or(RouterError::Unavailable)?;
        router.dispatch(&payload).await
    }
}
