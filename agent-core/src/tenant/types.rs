use derive_more::{AsRef, Display, From, Into};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::uuid::Uuid;
use rst_common::with_errors::thiserror::{self, Error};

use crate::envelope::{EnvelopeError, Unpacked};
use crate::keystore::{KeyError, Verkey};

use super::pool::TenantHandle;
use super::tenant::Tenant;

/// TenantError is a base error types for the `tenant` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum TenantError {
    #[error("no tenant found for envelope")]
    NoTenantFound,

    #[error("tenant not found: {0}")]
    TenantNotFound(String),

    #[error("duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    #[error("key error: {0}")]
    KeyError(#[from] KeyError),

    #[error("envelope error: {0}")]
    EnvelopeError(#[from] EnvelopeError),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("handle error: {0}")]
    HandleError(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, From, Into, AsRef, Display)]
#[serde(crate = "self::serde")]
pub struct TenantID(String);

impl TenantID {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Resolved is the outcome of a successful resolution. The handle stays acquired until
/// this value (or the handle moved out of it) is dropped
pub struct Resolved {
    pub handle: TenantHandle,
    pub unpacked: Unpacked,
}

/// `RoutingTable` maps every locally minted key to the tenant owning it
#[async_trait]
pub trait RoutingTable: Send + Sync {
    async fn add_route(&self, key: &Verkey, tenant: &TenantID) -> Result<(), TenantError>;
    async fn lookup(&self, key: &Verkey) -> Result<Option<TenantID>, TenantError>;
    async fn remove_routes(&self, tenant: &TenantID) -> Result<(), TenantError>;
}

/// `TenantDirectory` knows every tenant served by this agent
///
/// `insert` must reject a tenant whose own identifier is already used by another tenant
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn insert(&self, tenant: Tenant) -> Result<(), TenantError>;
    async fn get(&self, id: &TenantID) -> Result<Option<Tenant>, TenantError>;
    async fn list(&self) -> Result<Vec<Tenant>, TenantError>;
    async fn remove(&self, id: &TenantID) -> Result<(), TenantError>;
}

/// `TenantResolver` turns raw inbound bytes into a decrypted message and a scoped tenant handle
///
/// Fails with [`TenantError::NoTenantFound`] when no tenant can decrypt the envelope
#[async_trait]
pub trait TenantResolver: Send + Sync {
    async fn resolve(&self, envelope: &[u8]) -> Result<Resolved, TenantError>;
}
