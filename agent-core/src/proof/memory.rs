use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::with_tokio::tokio::sync::RwLock;

use crate::tenant::TenantID;

use super::proof::{Proof, ProofTemplate};
use super::types::{ProofError, RepoProofBuilder};

type Partitions = Arc<RwLock<HashMap<TenantID, HashMap<String, Vec<u8>>>>>;

/// MemoryProofs keeps serialized proof placeholders and templates, one partition per tenant
#[derive(Clone, Default)]
pub struct MemoryProofs {
    proofs: Partitions,
    templates: Partitions,
}

impl MemoryProofs {
    pub fn new() -> Self {
        Self::default()
    }
}

async fn put(partitions: &Partitions, tenant: &TenantID, id: &str, bytes: Vec<u8>) {
    let mut partitions = partitions.write().await;
    partitions
        .entry(tenant.to_owned())
        .or_default()
        .insert(id.to_string(), bytes);
}

async fn fetch(partitions: &Partitions, tenant: &TenantID, id: &str) -> Option<Vec<u8>> {
    let partitions = partitions.read().await;
    partitions
        .get(tenant)
        .and_then(|partition| partition.get(id))
        .cloned()
}

async fn all(partitions: &Partitions, tenant: &TenantID) -> Vec<Vec<u8>> {
    let partitions = partitions.read().await;
    partitions
        .get(tenant)
        .map(|partition| partition.values().cloned().collect())
        .unwrap_or_default()
}

async fn delete(partitions: &Partitions, tenant: &TenantID, id: &str) {
    let mut partitions = partitions.write().await;
    if let Some(partition) = partitions.get_mut(tenant) {
        partition.remove(id);
    }
}

#[async_trait]
impl RepoProofBuilder for MemoryProofs {
    async fn save_proof(&self, tenant: &TenantID, proof: &Proof) -> Result<(), ProofError> {
        let bytes: Vec<u8> = proof.to_owned().try_into()?;
        put(&self.proofs, tenant, &proof.id, bytes).await;
        Ok(())
    }

    async fn get_proof(&self, tenant: &TenantID, id: &str) -> Result<Option<Proof>, ProofError> {
        fetch(&self.proofs, tenant, id)
            .await
            .map(Proof::try_from)
            .transpose()
    }

    async fn list_proofs(&self, tenant: &TenantID) -> Result<Vec<Proof>, ProofError> {
        let mut proofs = all(&self.proofs, tenant)
            .await
            .into_iter()
            .map(Proof::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        proofs.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(proofs)
    }

    async fn remove_proof(&self, tenant: &TenantID, id: &str) -> Result<(), ProofError> {
        delete(&self.proofs, tenant, id).await;
        Ok(())
    }

    async fn save_template(
        &self,
        tenant: &TenantID,
        template: &ProofTemplate,
    ) -> Result<(), ProofError> {
        let bytes: Vec<u8> = template.to_owned().try_into()?;
        put(&self.templates, tenant, &template.id, bytes).await;
        Ok(())
    }

    async fn get_template(
        &self,
        tenant: &TenantID,
        id: &str,
    ) -> Result<Option<ProofTemplate>, ProofError> {
        fetch(&self.templates, tenant, id)
            .await
            .map(ProofTemplate::try_from)
            .transpose()
    }

    async fn list_templates(&self, tenant: &TenantID) -> Result<Vec<ProofTemplate>, ProofError> {
        let mut templates = all(&self.templates, tenant)
            .await
            .into_iter()
            .map(ProofTemplate::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        templates.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(templates)
    }

    async fn remove_template(&self, tenant: &TenantID, id: &str) -> Result<(), ProofError> {
        delete(&self.templates, tenant, id).await;
        Ok(())
    }
}
