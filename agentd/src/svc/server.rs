use std::time::Duration;

use rst_common::with_http_tokio::axum::{self, Router};
use rst_common::with_http_tokio::tower_http::timeout::TimeoutLayer;
use rst_common::with_http_tokio::tower_http::trace::TraceLayer;
use rst_common::with_logging::log::info;
use rst_common::with_tokio::tokio::net::TcpListener;
use rst_common::with_tracing::tracing_subscriber::{
    self, layer::SubscriberExt, util::SubscriberInitExt,
};

use prople_agent_http::common::types::CommonError;
use prople_agent_http::AgentService;

use crate::errors::AgentdError;

pub struct Server {
    config: String,
}

impl Server {
    pub fn new(config: String) -> Server {
        Self { config }
    }

    /// svc builds the agent service and its inbound app, the service must outlive the app
    /// since the router behind the inbound route is owned by it
    pub async fn svc(&self) -> Result<(AgentService, Router), AgentdError> {
        let service = AgentService::from_file(&self.config)
            .await
            .map_err(|err| match err {
                CommonError::ConfigError(msg) | CommonError::ValidationError(msg) => {
                    AgentdError::ConfigError(msg)
                }
                CommonError::ServiceError(msg) => AgentdError::ServiceError(msg),
            })?;

        let app = service.app().layer((
            TraceLayer::new_for_http(),
            TimeoutLayer::new(Duration::from_secs(10)),
        ));

        Ok((service, app))
    }

    pub async fn serve(&self) -> Result<(), AgentdError> {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                    format!(
                        "{}=debug,prople_agent_core=debug,prople_agent_http=debug,tower_http=debug,axum=trace",
                        env!("CARGO_CRATE_NAME")
                    )
                    .into()
                }),
            )
            .with(tracing_subscriber::fmt::layer().without_time())
            .init();

        let (service, app) = self.svc().await?;
        let address = service.config().app().address();

        let listener = TcpListener::bind(&address)
            .await
            .map_err(|err| AgentdError::ServerError(err.to_string()))?;

        info!(
            "agentd listening on {}{}",
            address,
            service.config().agent().get_path()
        );

        axum::serve(listener, app)
            .await
            .map_err(|err| AgentdError::ServerError(err.to_string()))
    }
}
