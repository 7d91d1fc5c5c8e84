use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_errors::thiserror::{self, Error};

use crate::envelope::EnvelopeError;
use crate::keystore::{Did, KeyError, Verkey};
use crate::ledger::LedgerError;
use crate::tenant::{Tenant, TenantError, TenantID};

use super::connection::Connection;
use super::messages::{ConnectionRequest, ConnectionResponse, Invitation};

/// ConnectionError is a base error types for the `connection` domain
#[derive(Debug, PartialEq, Error, Clone)]
pub enum ConnectionError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("protocol state error: {0}")]
    ProtocolStateError(String),

    #[error("connection not found: {0}")]
    NotFound(String),

    #[error("invalid did doc: {0}")]
    InvalidDidDoc(String),

    #[error("entity error: {0}")]
    EntityError(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("send error: {0}")]
    SendError(String),

    #[error("tenant error: {0}")]
    TenantError(#[from] TenantError),

    #[error("envelope error: {0}")]
    EnvelopeError(#[from] EnvelopeError),

    #[error("key error: {0}")]
    KeyError(#[from] KeyError),

    #[error("ledger error: {0}")]
    LedgerError(#[from] LedgerError),
}

/// State is the handshake progress of a [`Connection`]
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(crate = "self::serde", rename_all = "UPPERCASE")]
pub enum State {
    Null,
    Invited,
    Requested,
    Responded,
    Complete,
    Errored,
}

/// Direction tells whether the local party sent or received the step behind the current state
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(crate = "self::serde", rename_all = "UPPERCASE")]
pub enum Direction {
    In,
    Out,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(crate = "self::serde", rename_all = "UPPERCASE")]
pub enum Initiator {
    Me,
    Other,
}

/// ConnectionMeta is the invitation stage metadata, it ends up in the pairwise record
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct ConnectionMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub auto_respond: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Value>,
}

impl ConnectionMeta {
    /// responds_automatically is true when an incoming request must be answered without
    /// waiting for the owner
    pub fn responds_automatically(&self) -> bool {
        self.auto_respond || self.role.is_some()
    }
}

/// InvitationOptions are the caller supplied parts of a new invitation
#[derive(Debug, Clone, Default)]
pub struct InvitationOptions {
    pub label: Option<String>,
    pub role: Option<String>,
    pub data: Option<Value>,
    pub meta: Option<Value>,
    pub auto_respond: bool,
}

/// ConnectionQuery matches connections on every field that is set
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionQuery {
    pub state: Option<State>,
    pub direction: Option<Direction>,
    pub thread_id: Option<String>,
    pub my_key: Option<Verkey>,
    pub their_key: Option<Verkey>,
    pub their_did: Option<Did>,
}

impl ConnectionQuery {
    pub fn matches(&self, connection: &Connection) -> bool {
        fn check<T: PartialEq>(expected: &Option<T>, actual: Option<&T>) -> bool {
            expected.as_ref().map_or(true, |expected| Some(expected) == actual)
        }

        check(&self.state, Some(&connection.state))
            && check(&self.direction, connection.state_direction.as_ref())
            && check(&self.thread_id, connection.thread_id.as_ref())
            && check(&self.my_key, connection.my_key.as_ref())
            && check(&self.their_key, connection.their_key.as_ref())
            && check(&self.their_did, connection.their_did.as_ref())
    }
}

/// RepoConnectionBuilder is a `Connection Repository` abstraction, partitioned by tenant
#[async_trait]
pub trait RepoConnectionBuilder: Clone + Sync + Send {
    async fn save(&self, tenant: &TenantID, connection: &Connection)
        -> Result<(), ConnectionError>;

    async fn get(
        &self,
        tenant: &TenantID,
        id: &str,
    ) -> Result<Option<Connection>, ConnectionError>;

    async fn find(
        &self,
        tenant: &TenantID,
        query: &ConnectionQuery,
    ) -> Result<Option<Connection>, ConnectionError>;

    async fn list(
        &self,
        tenant: &TenantID,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError>;

    async fn remove(&self, tenant: &TenantID, id: &str) -> Result<(), ConnectionError>;

    /// find_usable returns the relationship with `their_did` once it can carry
    /// authenticated messages, i.e. `RESPONDED` or `COMPLETE`
    async fn find_usable(
        &self,
        tenant: &TenantID,
        their_did: &Did,
    ) -> Result<Option<Connection>, ConnectionError> {
        let query = ConnectionQuery {
            their_did: Some(their_did.to_owned()),
            ..Default::default()
        };

        let found = self.find(tenant, &query).await?;
        Ok(found.filter(|connection| {
            matches!(connection.state, State::Responded | State::Complete)
        }))
    }

    /// find_by_keys correlates an authenticated inbound message with its relationship
    async fn find_by_keys(
        &self,
        tenant: &TenantID,
        their_key: &Verkey,
        my_key: &Verkey,
    ) -> Result<Option<Connection>, ConnectionError> {
        let query = ConnectionQuery {
            my_key: Some(my_key.to_owned()),
            their_key: Some(their_key.to_owned()),
            ..Default::default()
        };

        self.find(tenant, &query).await
    }
}

/// ConnectionAPI is the entrypoint of the handshake state machine
#[async_trait]
pub trait ConnectionAPI: Clone {
    /// create_invitation mints a single use invitation key, the connection starts as `INVITED/OUT`
    async fn create_invitation(
        &self,
        tenant: &Tenant,
        options: InvitationOptions,
    ) -> Result<Connection, ConnectionError>;

    async fn receive_invitation(
        &self,
        tenant: &Tenant,
        invitation: Invitation,
    ) -> Result<Connection, ConnectionError>;

    /// accept_invitation stores the invitation and immediately answers it with a request
    async fn accept_invitation(
        &self,
        tenant: &Tenant,
        invitation: Invitation,
        label: Option<String>,
    ) -> Result<Connection, ConnectionError>;

    async fn create_request(
        &self,
        tenant: &Tenant,
        connection_id: &str,
        label: Option<String>,
    ) -> Result<Connection, ConnectionError>;

    async fn receive_request(
        &self,
        tenant: &Tenant,
        request: ConnectionRequest,
        recipient_key: &Verkey,
    ) -> Result<Connection, ConnectionError>;

    /// create_response answers a received request, or resends the stored response when
    /// the connection already responded
    async fn create_response(
        &self,
        tenant: &Tenant,
        connection_id: &str,
    ) -> Result<Connection, ConnectionError>;

    /// receive_response returns `None` when the response was dropped
    async fn receive_response(
        &self,
        tenant: &Tenant,
        response: ConnectionResponse,
    ) -> Result<Option<Connection>, ConnectionError>;

    async fn complete_on_delivery(
        &self,
        tenant: &Tenant,
        their_key: &Verkey,
        my_key: &Verkey,
    ) -> Result<Option<Connection>, ConnectionError>;

    async fn get_connection(
        &self,
        tenant: &Tenant,
        connection_id: &str,
    ) -> Result<Connection, ConnectionError>;

    async fn list_connections(
        &self,
        tenant: &Tenant,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError>;

    async fn remove_connection(
        &self,
        tenant: &Tenant,
        connection_id: &str,
    ) -> Result<(), ConnectionError>;
}
