use std::future::Future;
use std::time::Duration;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::debug;
use rst_common::with_tokio::tokio;

use crate::keystore::{Did, Verkey};

use super::types::{CredentialDefinition, Ledger, LedgerError, Schema};

pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// RetryingLedger retries reads while the ledger answers "not found"
///
/// A freshly written entry may not be readable on the next request. Errors are returned
/// right away and writes are never retried
#[derive(Clone)]
pub struct RetryingLedger<L: Ledger> {
    inner: L,
    attempts: u32,
    backoff: Duration,
}

impl<L: Ledger> RetryingLedger<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            attempts: DEFAULT_RETRY_ATTEMPTS,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_policy(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    async fn read<T, F, Fut>(&self, what: &str, mut fetch: F) -> Result<Option<T>, LedgerError>
    where
        T: Send,
        F: FnMut() -> Fut + Send,
        Fut: Future<Output = Result<Option<T>, LedgerError>> + Send,
    {
        for attempt in 1..=self.attempts {
            if let Some(found) = fetch().await? {
                return Ok(Some(found));
            }

            if attempt < self.attempts {
                debug!("{} not found, attempt {} of {}", what, attempt, self.attempts);
                tokio::time::sleep(self.backoff * attempt).await;
            }
        }

        Ok(None)
    }
}

#[async_trait]
impl<L: Ledger> Ledger for RetryingLedger<L> {
    async fn resolve_schema(&self, id: &str) -> Result<Option<Schema>, LedgerError> {
        self.read("schema", || self.inner.resolve_schema(id)).await
    }

    async fn resolve_schema_by_seq_no(&self, seq_no: u64) -> Result<Option<Schema>, LedgerError> {
        self.read("schema", || self.inner.resolve_schema_by_seq_no(seq_no))
            .await
    }

    async fn resolve_credential_definition(
        &self,
        id: &str,
    ) -> Result<Option<CredentialDefinition>, LedgerError> {
        self.read("credential definition", || {
            self.inner.resolve_credential_definition(id)
        })
        .await
    }

    async fn resolve_revocation_registry_definition(
        &self,
        id: &str,
    ) -> Result<Option<Value>, LedgerError> {
        self.read("revocation registry definition", || {
            self.inner.resolve_revocation_registry_definition(id)
        })
        .await
    }

    async fn register_identifier(
        &self,
        submitter: &Did,
        did: &Did,
        key: &Verkey,
        role: Option<String>,
    ) -> Result<(), LedgerError> {
        self.inner.register_identifier(submitter, did, key, role).await
    }

    async fn publish_revocation_delta(
        &self,
        submitter: &Did,
        registry_id: &str,
        delta: &Value,
    ) -> Result<(), LedgerError> {
        self.inner
            .publish_revocation_delta(submitter, registry_id, delta)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;
    use mockall::predicate::eq;
    use mockall::Sequence;

    mock!(
        FakeLedger{}

        impl Clone for FakeLedger {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl Ledger for FakeLedger {
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
    );

    fn schema() -> Schema {
        Schema {
            id: "schema-1".to_string(),
            name: "person".to_string(),
            version: "1.0".to_string(),
            attr_names: vec!["name".to_string()],
            seq_no: 7,
        }
    }

    #[tokio::test]
    async fn test_retry_until_found() {
        let mut seq = Sequence::new();
        let mut ledger = MockFakeLedger::new();
        ledger
            .expect_resolve_schema()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        ledger
            .expect_resolve_schema()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some(schema())));

        let retrying = RetryingLedger::new(ledger).with_policy(3, Duration::from_millis(1));
        let found = retrying.resolve_schema("schema-1").await.unwrap();
        assert_eq!(found, Some(schema()))
    }

    #[tokio::test]
    async fn test_retry_is_bounded() {
        let mut ledger = MockFakeLedger::new();
        ledger
            .expect_resolve_credential_definition()
            .times(3)
            .returning(|_| Ok(None));

        let retrying = RetryingLedger::new(ledger).with_policy(3, Duration::from_millis(1));
        let found = retrying.resolve_credential_definition("def-1").await.unwrap();
        assert!(found.is_none())
    }

    #[tokio::test]
    async fn test_errors_are_not_retried() {
        let mut ledger = MockFakeLedger::new();
        ledger
            .expect_resolve_revocation_registry_definition()
            .times(1)
            .returning(|_| Err(LedgerError::RequestError("pool closed".to_string())));

        let retrying = RetryingLedger::new(ledger).with_policy(3, Duration::from_millis(1));
        let result = retrying.resolve_revocation_registry_definition("reg-1").await;
        assert!(matches!(result.unwrap_err(), LedgerError::RequestError(_)))
    }

    #[tokio::test]
    async fn test_writes_are_not_retried() {
        let mut ledger = MockFakeLedger::new();
        ledger
            .expect_register_identifier()
            .with(
                mockall::predicate::always(),
                mockall::predicate::always(),
                mockall::predicate::always(),
                eq(Some("TRUST_ANCHOR".to_string())),
            )
            .times(1)
            .returning(|_, _, _, _| Err(LedgerError::Rejected("unauthorized".to_string())));

        let did = Did::from("did".to_string());
        let key = Verkey::from("key".to_string());
        let retrying = RetryingLedger::new(ledger).with_policy(3, Duration::from_millis(1));
        let result = retrying
            .register_identifier(&did, &did, &key, Some("TRUST_ANCHOR".to_string()))
            .await;
        assert!(result.is_err())
    }
}
