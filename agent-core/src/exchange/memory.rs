use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::tenant::TenantID;

use super::types::{ExchangeError, ExchangeMessage, RepoExchangeBuilder};

type Partition = HashMap<String, Vec<u8>>;

/// MemoryExchanges keeps exchange messages in their serialized form, one partition per tenant
#[derive(Clone, Default)]
pub struct MemoryExchanges {
    partitions: Arc<RwLock<HashMap<TenantID, Partition>>>,
}

impl MemoryExchanges {
    pub fn new() -> Self {
        Self::default()
    }

    async fn decoded(&self, tenant: &TenantID) -> Result<Vec<ExchangeMessage>, ExchangeError> {
        let partitions = self.partitions.read().await;
        let mut messages = match partitions.get(tenant) {
            Some(partition) => partition
                .values()
                .map(|bytes| ExchangeMessage::try_from(bytes.to_owned()))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(messages)
    }
}

#[async_trait]
impl RepoExchangeBuilder for MemoryExchanges {
    async fn save(
        &self,
        tenant: &TenantID,
        message: &ExchangeMessage,
    ) -> Result<(), ExchangeError> {
        let bytes: Vec<u8> = message.to_owned().try_into()?;

        let mut partitions = self.partitions.write().await;
        partitions
            .entry(tenant.to_owned())
            .or_default()
            .insert(message.id.clone(), bytes);
        Ok(())
    }

    async fn get(
        &self,
        tenant: &TenantID,
        id: &str,
    ) -> Result<Option<ExchangeMessage>, ExchangeError> {
        let partitions = self.partitions.read().await;
        partitions
            .get(tenant)
            .and_then(|partition| partition.get(id))
            .map(|bytes| ExchangeMessage::try_from(bytes.to_owned()))
            .transpose()
    }

    async fn find_by_thread(
        &self,
        tenant: &TenantID,
        message_type: &str,
        thread_id: &str,
    ) -> Result<Option<ExchangeMessage>, ExchangeError> {
        let found = self
            .decoded(tenant)
            .await?
            .into_iter()
            .find(|message| message.message_type == message_type && message.thread_id == thread_id);
        Ok(found)
    }

    async fn list(
        &self,
        tenant: &TenantID,
        message_type: Option<&str>,
    ) -> Result<Vec<ExchangeMessage>, ExchangeError> {
        let messages = self
            .decoded(tenant)
            .await?
            .into_iter()
            .filter(|message| message_type.map_or(true, |kind| message.message_type == kind))
            .collect();
        Ok(messages)
    }

    async fn remove(&self, tenant: &TenantID, id: &str) -> Result<(), ExchangeError> {
        let mut partitions = self.partitions.write().await;
        if let Some(partition) = partitions.get_mut(tenant) {
            partition.remove(id);
        }
        Ok(())
    }
}
