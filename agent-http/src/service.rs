use std::sync::Arc;

use rst_common::with_http_tokio::axum;
use rst_common::with_logging::log::info;

use prople_agent_core::connection::{self, MemoryConnections};
use prople_agent_core::credential;
use prople_agent_core::did_auth;
use prople_agent_core::engine::UnconfiguredEngine;
use prople_agent_core::exchange::MemoryExchanges;
use prople_agent_core::keystore::MemoryStore;
use prople_agent_core::ledger::{MemoryLedger, RetryingLedger};
use prople_agent_core::proof::{self, MemoryProofs};
use prople_agent_core::router::{LoopbackTransport, Outbound, Router, LOOPBACK_SCHEME};
use prople_agent_core::tenant::{
    Domain, HandlePool, MemoryRoutes, MemoryTenants, RoutingResolver, Tenant, TenantDirectory,
    TenantID,
};

use crate::common::types::CommonError;
use crate::config::{Config, Parser};
use crate::transport::{HttpTransport, HttpValueSource, HTTPS_SCHEME, HTTP_SCHEME};

pub type ServiceLedger = RetryingLedger<MemoryLedger>;

pub type Connections = connection::Usecase<MemoryConnections, ServiceLedger, Outbound>;

pub type Credentials = credential::Usecase<
    MemoryExchanges,
    MemoryConnections,
    ServiceLedger,
    UnconfiguredEngine,
    Outbound,
    HttpValueSource,
>;

pub type Proofs = proof::Usecase<
    MemoryExchanges,
    MemoryConnections,
    MemoryProofs,
    ServiceLedger,
    UnconfiguredEngine,
    Outbound,
>;

pub type DidAuth = did_auth::Usecase<MemoryExchanges, MemoryConnections, Outbound>;

/// AgentService wires stores, router, state machines and transports from a [`Config`]
///
/// The credential engine stays unconfigured: credential and proof operations reaching the
/// engine fail with an engine error until a real engine is plugged in.
pub struct AgentService {
    config: Config,
    router: Arc<Router>,
    http: HttpTransport,
    routes: Arc<MemoryRoutes>,
    tenants: Arc<MemoryTenants>,
    ledger: MemoryLedger,
    connections: Connections,
    credentials: Credentials,
    proofs: Proofs,
    did_auth: DidAuth,
}

impl AgentService {
    pub async fn from_file(conf_file: &str) -> Result<Self, CommonError> {
        let config = Parser::new(conf_file.to_string()).parse()?;
        Self::build(config).await
    }

    /// build provisions the agent domain and every configured tenant, then registers the
    /// handlers of every protocol and the `http`, `https` and `local` transports
    pub async fn build(config: Config) -> Result<Self, CommonError> {
        let agent = config.agent();

        let routes = Arc::new(MemoryRoutes::new());
        let tenants = Arc::new(MemoryTenants::new());
        let domain = Domain::provision(Arc::new(MemoryStore::new()), agent.get_endpoint())
            .await
            .map_err(|err| CommonError::ServiceError(err.to_string()))?;

        let resolver = RoutingResolver::new(routes.clone(), tenants.clone(), HandlePool::new())
            .with_domain(domain.clone())
            .with_trial_limit(agent.get_trial_limit());
        let outbound = Outbound::new();

        let (attempts, backoff) = config.ledger().get_retry_policy();
        let ledger = MemoryLedger::new();
        let retrying = RetryingLedger::new(ledger.clone()).with_policy(attempts, backoff);

        let exchanges = MemoryExchanges::new();
        let connection_repo = MemoryConnections::new();

        let connections = connection::Usecase::new(
            connection_repo.clone(),
            retrying.clone(),
            outbound.clone(),
            domain,
        )
        .with_nym_always(agent.get_nym_always());
        let credentials = credential::Usecase::new(
            exchanges.clone(),
            connection_repo.clone(),
            retrying.clone(),
            UnconfiguredEngine,
            outbound.clone(),
            HttpValueSource::new(),
        );
        let did_auth = did_auth::Usecase::new(
            exchanges.clone(),
            connection_repo.clone(),
            outbound.clone(),
        );
        let proofs = proof::Usecase::new(
            exchanges,
            connection_repo,
            MemoryProofs::new(),
            retrying,
            UnconfiguredEngine,
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

        let http = HttpTransport::new();
        router
            .register_transport(HTTP_SCHEME, Arc::new(http.clone()))
            .await;
        router
            .register_transport(HTTPS_SCHEME, Arc::new(http.clone()))
            .await;
        router
            .register_transport(LOOPBACK_SCHEME, Arc::new(LoopbackTransport::new()))
            .await;

        let service = Self {
            config,
            router,
            http,
            routes,
            tenants,
            ledger,
            connections,
            credentials,
            proofs,
            did_auth,
        };

        for name in service.config.agent().get_tenants() {
            service.provision_tenant(&name).await?;
        }

        info!(
            "agent service ready at {} ({} tenants)",
            service.config.agent().get_endpoint(),
            service.config.agent().get_tenants().len()
        );
        Ok(service)
    }

    pub async fn provision_tenant(&self, name: &str) -> Result<Tenant, CommonError> {
        let tenant = Tenant::provision(
            TenantID::from(name.to_string()),
            Arc::new(MemoryStore::new()),
            self.routes.clone(),
        )
        .await
        .map_err(|err| CommonError::ServiceError(err.to_string()))?;

        self.tenants
            .insert(tenant.clone())
            .await
            .map_err(|err| CommonError::ServiceError(err.to_string()))?;

        info!("tenant provisioned: {}", tenant.id());
        Ok(tenant)
    }

    pub async fn tenant(&self, name: &str) -> Result<Option<Tenant>, CommonError> {
        self.tenants
            .get(&TenantID::from(name.to_string()))
            .await
            .map_err(|err| CommonError::ServiceError(err.to_string()))
    }

    /// app is the inbound route, mounted at the configured agent path
    pub fn app(&self) -> axum::Router {
        self.http.routes(&self.config.agent().get_path())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn router(&self) -> Arc<Router> {
        self.router.clone()
    }

    /// ledger is the in-memory registry behind the retrying client
    pub fn ledger(&self) -> &MemoryLedger {
        &self.ledger
    }

    pub fn connections(&self) -> &Connections {
        &self.connections
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn proofs(&self) -> &Proofs {
        &self.proofs
    }

    pub fn did_auth(&self) -> &DidAuth {
        &self.did_auth
    }
}
