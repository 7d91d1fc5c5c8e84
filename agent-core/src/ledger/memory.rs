use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::info;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::keystore::{Did, Verkey};

use super::types::{CredentialDefinition, Ledger, LedgerError, Schema};

/// IdentifierRecord is a registered identifier as seen by [`MemoryLedger`]
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifierRecord {
    pub submitter: Did,
    pub did: Did,
    pub key: Verkey,
    pub role: Option<String>,
}

#[derive(Default)]
struct Registry {
    schemas: HashMap<String, Schema>,
    definitions: HashMap<String, CredentialDefinition>,
    revocation_definitions: HashMap<String, Value>,
    identifiers: Vec<IdentifierRecord>,
    revocation_deltas: HashMap<String, Vec<Value>>,
}

/// MemoryLedger is an in-process ledger used by the daemon until a real pool is configured,
/// and by tests
#[derive(Clone, Default)]
pub struct MemoryLedger {
    registry: Arc<RwLock<Registry>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_schema(&self, schema: Schema) {
        let mut registry = self.registry.write().await;
        registry.schemas.insert(schema.id.clone(), schema);
    }

    pub async fn add_credential_definition(&self, definition: CredentialDefinition) {
        let mut registry = self.registry.write().await;
        registry
            .definitions
            .insert(definition.id.clone(), definition);
    }

    pub async fn add_revocation_registry_definition(&self, id: &str, definition: Value) {
        let mut registry = self.registry.write().await;
        registry
            .revocation_definitions
            .insert(id.to_string(), definition);
    }

    pub async fn identifiers(&self) -> Vec<IdentifierRecord> {
        let registry = self.registry.read().await;
        registry.identifiers.clone()
    }

    pub async fn revocation_deltas(&self, registry_id: &str) -> Vec<Value> {
        let registry = self.registry.read().await;
        registry
            .revocation_deltas
            .get(registry_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn resolve_schema(&self, id: &str) -> Result<Option<Schema>, LedgerError> {
        let registry = self.registry.read().await;
        Ok(registry.schemas.get(id).cloned())
    }

    async fn resolve_schema_by_seq_no(&self, seq_no: u64) -> Result<Option<Schema>, LedgerError> {
        let registry = self.registry.read().await;
        Ok(registry
            .schemas
            .values()
            .find(|schema| schema.seq_no == seq_no)
            .cloned())
    }

    async fn resolve_credential_definition(
        &self,
        id: &str,
    ) -> Result<Option<CredentialDefinition>, LedgerError> {
        let registry = self.registry.read().await;
        Ok(registry.definitions.get(id).cloned())
    }

    async fn resolve_revocation_registry_definition(
        &self,
        id: &str,
    ) -> Result<Option<Value>, LedgerError> {
        let registry = self.registry.read().await;
        Ok(registry.revocation_definitions.get(id).cloned())
    }

    async fn register_identifier(
        &self,
        submitter: &Did,
        did: &Did,
        key: &Verkey,
        role: Option<String>,
    ) -> Result<(), LedgerError> {
        info!("registering identifier: {} (role: {:?})", did, role);

        let mut registry = self.registry.write().await;
        registry.identifiers.push(IdentifierRecord {
            submitter: submitter.to_owned(),
            did: did.to_owned(),
            key: key.to_owned(),
            role,
        });
        Ok(())
    }

    async fn publish_revocation_delta(
        &self,
        _submitter: &Did,
        registry_id: &str,
        delta: &Value,
    ) -> Result<(), LedgerError> {
        let mut registry = self.registry.write().await;
        registry
            .revocation_deltas
            .entry(registry_id.to_string())
            .or_default()
            .push(delta.to_owned());
        Ok(())
    }
}
