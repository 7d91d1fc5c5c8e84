use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::tenant::TenantID;

use super::connection::Connection;
use super::types::{ConnectionError, ConnectionQuery, RepoConnectionBuilder, State};

/// MemoryConnections stores serialized connections, one partition per tenant
#[derive(Clone, Default)]
pub struct MemoryConnections {
    partitions: Arc<RwLock<HashMap<TenantID, HashMap<String, Vec<u8>>>>>,
}

impl MemoryConnections {
    pub fn new() -> Self {
        Self::default()
    }

    async fn all(&self, tenant: &TenantID) -> Result<Vec<Connection>, ConnectionError> {
        let partitions = self.partitions.read().await;
        let mut connections = match partitions.get(tenant) {
            Some(partition) => partition
                .values()
                .map(|bytes| Connection::try_from(bytes.to_owned()))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        connections.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(connections)
    }
}

#[async_trait]
impl RepoConnectionBuilder for MemoryConnections {
    async fn save(
        &self,
        tenant: &TenantID,
        connection: &Connection,
    ) -> Result<(), ConnectionError> {
        let bytes: Vec<u8> = connection.to_owned().try_into()?;

        let mut partitions = self.partitions.write().await;
        partitions
            .entry(tenant.to_owned())
            .or_default()
            .insert(connection.id.clone(), bytes);
        Ok(())
    }

    async fn get(
        &self,
        tenant: &TenantID,
        id: &str,
    ) -> Result<Option<Connection>, ConnectionError> {
        let partitions = self.partitions.read().await;
        partitions
            .get(tenant)
            .and_then(|partition| partition.get(id))
            .map(|bytes| Connection::try_from(bytes.to_owned()))
            .transpose()
    }

    async fn find(
        &self,
        tenant: &TenantID,
        query: &ConnectionQuery,
    ) -> Result<Option<Connection>, ConnectionError> {
        let found = self
            .all(tenant)
            .await?
            .into_iter()
            .find(|connection| query.matches(connection));
        Ok(found)
    }

    async fn list(
        &self,
        tenant: &TenantID,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError> {
        let query = ConnectionQuery {
            state,
            ..Default::default()
        };

        let connections = self
            .all(tenant)
            .await?
            .into_iter()
            .filter(|connection| query.matches(connection))
            .collect();
        Ok(connections)
    }

    async fn remove(&self, tenant: &TenantID, id: &str) -> Result<(), ConnectionError> {
        let mut partitions = self.partitions.write().await;
        if let Some(partition) = partitions.get_mut(tenant) {
            partition.remove(id);
        }
        Ok(())
    }
}
