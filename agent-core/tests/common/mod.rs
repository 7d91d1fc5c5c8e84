#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{json, Map, Value};
use rst_common::standard::uuid::Uuid;
use rst_common::with_tokio::tokio::sync::RwLock;

use prople_agent_core::connection::{
    self, Connection, ConnectionAPI, InvitationOptions, MemoryConnections,
};
use prople_agent_core::credential::{self, CredentialError, ValueSource};
use prople_agent_core::did_auth;
use prople_agent_core::engine::{
    CredentialBlob, CredentialEngine, CredentialValues, EngineError, Issued, OfferBlob,
    PresentationBlob, RequestBlob,
};
use prople_agent_core::exchange::MemoryExchanges;
use prople_agent_core::keystore::MemoryStore;
use prople_agent_core::ledger::{CredentialDefinition, MemoryLedger, Schema};
use prople_agent_core::proof::{self, MemoryProofs, ProofRequest};
use prople_agent_core::router::{LoopbackTransport, Outbound, Router, LOOPBACK_SCHEME};
use prople_agent_core::tenant::{
    Domain, HandlePool, MemoryRoutes, MemoryTenants, RoutingResolver, Tenant, TenantDirectory,
    TenantID,
};

pub const ENDPOINT: &str = "local://agent";
pub const SCHEMA_ID: &str = "Th7MpTaRZVRYnPiabds81Y:2:person:1.0";
pub const DEFINITION_ID: &str = "Th7MpTaRZVRYnPiabds81Y:3:CL:12:tag";
pub const REGISTRY_ID: &str = "Th7MpTaRZVRYnPiabds81Y:4:registry";

/// FakeEngine is a deterministic stand-in for the credential engine, presentations verify
/// when they echo the request nonce
#[derive(Clone, Default)]
pub struct FakeEngine {
    wallets: Arc<RwLock<HashMap<TenantID, Vec<Value>>>>,
}

impl FakeEngine {
    pub async fn credentials(&self, tenant: &TenantID) -> Vec<Value> {
        let wallets = self.wallets.read().await;
        wallets.get(tenant).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CredentialEngine for FakeEngine {
    async fn create_offer(
        &self,
        _: &TenantID,
        definition_id: &str,
    ) -> Result<OfferBlob, EngineError> {
        Ok(OfferBlob::from(json!({
            "schema_id": SCHEMA_ID,
            "cred_def_id": definition_id,
            "nonce": "1",
        })))
    }

    async fn create_request(
        &self,
        tenant: &TenantID,
        offer: &OfferBlob,
        _: &CredentialDefinition,
        master_secret_id: &str,
    ) -> Result<(RequestBlob, Value), EngineError> {
        let request = json!({"prover": tenant.as_str(), "cred_def_id": offer.cred_def_id()});
        Ok((
            RequestBlob::from(request),
            json!({"master_secret": master_secret_id}),
        ))
    }

    async fn issue(
        &self,
        _: &TenantID,
        offer: &OfferBlob,
        _: &RequestBlob,
        values: &CredentialValues,
        revocation_registry_id: Option<String>,
    ) -> Result<Issued, EngineError> {
        let raw: Map<String, Value> = values
            .iter()
            .map(|(name, value)| (name.to_owned(), json!(value.raw)))
            .collect();

        Ok(Issued {
            credential: CredentialBlob::from(json!({
                "cred_def_id": offer.cred_def_id(),
                "rev_reg_id": revocation_registry_id,
                "values": raw,
            })),
            revocation_id: revocation_registry_id.as_ref().map(|_| "1".to_string()),
            registry_delta: revocation_registry_id.map(|_| json!({"issued": [1]})),
        })
    }

    async fn store_credential(
        &self,
        tenant: &TenantID,
        _: &Value,
        credential: &CredentialBlob,
        _: &CredentialDefinition,
        _: Option<Value>,
    ) -> Result<String, EngineError> {
        let mut wallets = self.wallets.write().await;
        wallets
            .entry(tenant.to_owned())
            .or_default()
            .push(credential.as_value().to_owned());
        Ok(Uuid::new_v4().to_string())
    }

    async fn create_presentation(
        &self,
        tenant: &TenantID,
        _: &str,
        request: &ProofRequest,
        self_attested: &Map<String, Value>,
    ) -> Result<PresentationBlob, EngineError> {
        Ok(PresentationBlob::from(json!({
            "nonce": request.nonce,
            "prover": tenant.as_str(),
            "self_attested_attrs": self_attested,
        })))
    }

    async fn verify_presentation(
        &self,
        request: &ProofRequest,
        presentation: &PresentationBlob,
    ) -> Result<bool, EngineError> {
        Ok(presentation.as_value()["nonce"] == json!(request.nonce))
    }

    async fn revoke(
        &self,
        _: &TenantID,
        revocation_id: &str,
        _: &str,
    ) -> Result<Value, EngineError> {
        Ok(json!({"revoked": [revocation_id]}))
    }
}

/// FixedValues answers every value location with the same attributes
#[derive(Clone, Default)]
pub struct FixedValues {
    values: Map<String, Value>,
}

impl FixedValues {
    pub fn new(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

#[async_trait]
impl ValueSource for FixedValues {
    async fn fetch(&self, _: &str) -> Result<Map<String, Value>, CredentialError> {
        Ok(self.values.clone())
    }
}

pub type Connections = connection::Usecase<MemoryConnections, MemoryLedger, Outbound>;

pub type Credentials = credential::Usecase<
    MemoryExchanges,
    MemoryConnections,
    MemoryLedger,
    FakeEngine,
    Outbound,
    FixedValues,
>;

pub type Proofs = proof::Usecase<
    MemoryExchanges,
    MemoryConnections,
    MemoryProofs,
    MemoryLedger,
    FakeEngine,
    Outbound,
>;

pub type DidAuth = did_auth::Usecase<MemoryExchanges, MemoryConnections, Outbound>;

/// Agent is one in-process agent: a router behind `local://agent` with every state machine
/// registered and any number of tenants
pub struct Agent {
    pub router: Arc<Router>,
    pub ledger: MemoryLedger,
    pub engine: FakeEngine,
    pub exchanges: MemoryExchanges,
    pub proof_store: MemoryProofs,
    pub connections: Connections,
    pub credentials: Credentials,
    pub proofs: Proofs,
    pub did_auth: DidAuth,
    routes: Arc<MemoryRoutes>,
    tenants: Arc<MemoryTenants>,
}

impl Agent {
    pub async fn start(values: Map<String, Value>) -> Self {
        let routes = Arc::new(MemoryRoutes::new());
        let tenants = Arc::new(MemoryTenants::new());
        let domain = Domain::provision(Arc::new(MemoryStore::new()), ENDPOINT.to_string())
            .await
            .unwrap();

        let resolver = RoutingResolver::new(routes.clone(), tenants.clone(), HandlePool::new())
            .with_domain(domain.clone());
        let outbound = Outbound::new();

        let ledger = ledger().await;
        let engine = FakeEngine::default();
        let exchanges = MemoryExchanges::new();
        let connection_repo = MemoryConnections::new();
        let proof_store = MemoryProofs::new();

        let connections = connection::Usecase::new(
            connection_repo.clone(),
            ledger.clone(),
            outbound.clone(),
            domain,
        );
        let credentials = credential::Usecase::new(
            exchanges.clone(),
            connection_repo.clone(),
            ledger.clone(),
            engine.clone(),
            outbound.clone(),
            FixedValues::new(values),
        );
        let did_auth = did_auth::Usecase::new(
            exchanges.clone(),
            connection_repo.clone(),
            outbound.clone(),
        );
        let proofs = proof::Usecase::new(
            exchanges.clone(),
            connection_repo,
            proof_store.clone(),
            ledger.clone(),
            engine.clone(),
            outbound.clone(),
        );

        let router = Arc::new(
            Router::new(Arc::new(resolver), outbound)
                .with_delivery_hook(Arc::new(connections.clone())),
        );
        router
            .register_handlers(
                &connection::messages::message_types(),
                Arc::new(connections.clone()),
            )
            .await;
        router
            .register_handlers(
                &credential::messages::message_types(),
                Arc::new(credentials.clone()),
            )
            .await;
        router
            .register_handlers(&proof::messages::message_types(), Arc::new(proofs.clone()))
            .await;
        router
            .register_handlers(
                &did_auth::messages::message_types(),
                Arc::new(did_auth.clone()),
            )
            .await;
        router
            .register_transport(LOOPBACK_SCHEME, Arc::new(LoopbackTransport::new()))
            .await;

        Self {
            router,
            ledger,
            engine,
            exchanges,
            proof_store,
            connections,
            credentials,
            proofs,
            did_auth,
            routes,
            tenants,
        }
    }

    pub async fn tenant(&self, name: &str) -> Tenant {
        let tenant = Tenant::provision(
            TenantID::from(name.to_string()),
            Arc::new(MemoryStore::new()),
            self.routes.clone(),
        )
        .await
        .unwrap();

        self.tenants.insert(tenant.clone()).await.unwrap();
        tenant
    }

    /// connect runs an automatic handshake, `inviter` ends up RESPONDED and `invitee` COMPLETE
    pub async fn connect(&self, inviter: &Tenant, invitee: &Tenant) -> (Connection, Connection) {
        let invited = self
            .connections
            .create_invitation(
                inviter,
                InvitationOptions {
                    auto_respond: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let invitation = invited.get_invitation().cloned().unwrap();
        let requested = self
            .connections
            .accept_invitation(invitee, invitation, None)
            .await
            .unwrap();

        let inviter_side = self
            .connections
            .get_connection(inviter, invited.get_id())
            .await
            .unwrap();
        let invitee_side = self
            .connections
            .get_connection(invitee, requested.get_id())
            .await
            .unwrap();
        (inviter_side, invitee_side)
    }
}

async fn ledger() -> MemoryLedger {
    let ledger = MemoryLedger::new();
    ledger
        .add_schema(Schema {
            id: SCHEMA_ID.to_string(),
            name: "person".to_string(),
            version: "1.0".to_string(),
            attr_names: vec!["name".to_string(), "age".to_string()],
            seq_no: 12,
        })
        .await;
    ledger
        .add_credential_definition(CredentialDefinition {
            id: DEFINITION_ID.to_string(),
            schema_id: "12".to_string(),
            revocation_registry_id: None,
            value: json!({}),
        })
        .await;
    ledger
}

pub fn values(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_owned()))
        .collect()
}
