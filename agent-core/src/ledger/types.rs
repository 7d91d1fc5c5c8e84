use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::keystore::{Did, Verkey};

/// LedgerError is a base error types for the `ledger` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum LedgerError {
    #[error("ledger request error: {0}")]
    RequestError(String),

    #[error("ledger rejected: {0}")]
    Rejected(String),

    #[error("invalid ledger data: {0}")]
    InvalidData(String),
}

/// Schema is the ledger descriptor of a credential's attribute set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct Schema {
    pub id: String,
    pub name: String,
    pub version: String,
    pub attr_names: Vec<String>,
    pub seq_no: u64,
}

impl Schema {
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attr_names.iter().any(|attr| attr == name)
    }
}

/// CredentialDefinition is the issuer specific descriptor of a credential
///
/// Its `schema_id` holds the registry sequence number of the schema, not the schema id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct CredentialDefinition {
    pub id: String,
    pub schema_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_registry_id: Option<String>,
    #[serde(default)]
    pub value: Value,
}

impl CredentialDefinition {
    pub fn schema_seq_no(&self) -> Option<u64> {
        self.schema_id.trim().parse().ok()
    }
}

/// `Ledger` is the external public registry
///
/// Resolution returns `Ok(None)` when the ledger doesn't know the id (yet)
#[async_trait]
pub trait Ledger: Clone + Send + Sync {
    async fn resolve_schema(&self, id: &str) -> Result<Option<Schema>, LedgerError>;

    async fn resolve_schema_by_seq_no(&self, seq_no: u64) -> Result<Option<Schema>, LedgerError>;

    async fn resolve_credential_definition(
        &self,
        id: &str,
    ) -> Result<Option<CredentialDefinition>, LedgerError>;

    async fn resolve_revocation_registry_definition(
        &self,
        id: &str,
    ) -> Result<Option<Value>, LedgerError>;

    async fn register_identifier(
        &self,
        submitter: &Did,
        did: &Did,
        key: &Verkey,
        role: Option<String>,
    ) -> Result<(), LedgerError>;

    async fn publish_revocation_delta(
        &self,
        submitter: &Did,
        registry_id: &str,
        delta: &Value,
    ) -> Result<(), LedgerError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::{self, json};

    #[test]
    fn test_credential_definition_wire_format() {
        let definition: CredentialDefinition = serde_json::from_value(json!({
            "id": "Th7MpTaRZVRYnPiabds81Y:3:CL:12:tag",
            "schemaId": "12",
            "value": {"primary": {}}
        }))
        .unwrap();

        assert_eq!(definition.schema_seq_no(), Some(12));
        assert!(definition.revocation_registry_id.is_none())
    }

    #[test]
    fn test_schema_has_attribute() {
        let schema: Schema = serde_json::from_value(json!({
            "id": "Th7MpTaRZVRYnPiabds81Y:2:person:1.0",
            "name": "person",
            "version": "1.0",
            "attrNames": ["name", "age"],
            "seqNo": 12
        }))
        .unwrap();

        assert!(schema.has_attribute("age"));
        assert!(!schema.has_attribute("email"))
    }
}
