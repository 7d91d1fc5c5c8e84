use std::sync::{Arc, RwLock};

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Url};

use rst_common::standard::async_trait::async_trait;
use rst_common::with_http_tokio::axum::body::Bytes;
use rst_common::with_http_tokio::axum::extract::State;
use rst_common::with_http_tokio::axum::http::StatusCode;
use rst_common::with_http_tokio::axum::routing::post;
use rst_common::with_http_tokio::axum::Router;
use rst_common::with_logging::log::{debug, warn};

use prople_agent_core::router::{InboundSink, Transport, TransportError};

pub const HTTP_SCHEME: &str = "http";
pub const HTTPS_SCHEME: &str = "https";

const ENVELOPE_CONTENT_TYPE: &str = "application/json";

/// HttpTransport posts envelopes to `http(s)` service endpoints and serves the inbound route
/// that hands received envelopes to the router
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    sink: Arc<RwLock<Option<Arc<dyn InboundSink>>>>,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            sink: Arc::new(RwLock::new(None)),
        }
    }

    /// routes builds the inbound route mounted at `path`
    pub fn routes(&self, path: &str) -> Router {
        Router::new()
            .route(path, post(inbound))
            .with_state(self.clone())
    }

    fn receiver(&self) -> Result<Arc<dyn InboundSink>, TransportError> {
        let sink = self
            .sink
            .read()
            .map_err(|err| TransportError::SendError(err.to_string()))?;

        sink.clone().ok_or(TransportError::NoReceiver)
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

async fn inbound(State(transport): State<HttpTransport>, body: Bytes) -> StatusCode {
    let sink = match transport.receiver() {
        Ok(sink) => sink,
        Err(err) => {
            warn!("inbound envelope refused: {}", err);
            return StatusCode::SERVICE_UNAVAILABLE;
        }
    };

    match sink.deliver(body.to_vec()).await {
        Ok(_) => StatusCode::ACCEPTED,
        Err(err) => {
            warn!("inbound envelope rejected: {}", err);
            StatusCode::BAD_REQUEST
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, endpoint: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        let url = Url::parse(endpoint)
            .map_err(|err| TransportError::InvalidEndpoint(format!("{}: {}", endpoint, err)))?;
        if url.scheme() != HTTP_SCHEME && url.scheme() != HTTPS_SCHEME {
            return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
        }

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, ENVELOPE_CONTENT_TYPE)
            .body(payload)
            .send()
            .await
            .map_err(|err| TransportError::SendError(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Rejected(format!(
                "{} answered {}",
                endpoint, status
            )));
        }

        debug!("envelope delivered: {} ({})", endpoint, status);
        Ok(())
    }

    fn on_receive(&self, sink: Arc<dyn InboundSink>) {
        match self.sink.write() {
            Ok(mut current) => *current = Some(sink),
            Err(err) => warn!("inbound receiver not registered: {}", err),
        }
    }
}
