use std::sync::{Arc, RwLock};

use rst_common::standard::async_trait::async_trait;
use rst_common::with_logging::log::debug;

use super::types::{InboundSink, Transport, TransportError};

pub const LOOPBACK_SCHEME: &str = "local";

/// LoopbackTransport delivers `local://` envelopes to the router of this same process
///
/// Delivery is inline, the sender gets the receiver's dispatch result back
#[derive(Clone, Default)]
pub struct LoopbackTransport {
    sink: Arc<RwLock<Option<Arc<dyn InboundSink>>>>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn receiver(&self) -> Result<Arc<dyn InboundSink>, TransportError> {
        let sink = self
            .sink
            .read()
            .map_err(|err| TransportError::SendError(err.to_string()))?;

        sink.clone().ok_or(TransportError::NoReceiver)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn send(&self, endpoint: &str, payload: Vec<u8>) -> Result<(), TransportError> {
        if !endpoint.starts_with(LOOPBACK_SCHEME) {
            return Err(TransportError::InvalidEndpoint(endpoint.to_string()));
        }

        debug!("loopback delivery: {}", endpoint);
        let sink = self.receiver()?;
        sink.deliver(payload)
            .await
            .map_err(|err| TransportError::Rejected(err.to_string()))
    }

    fn on_receive(&self, sink: Arc<dyn InboundSink>) {
        if let Ok(mut current) = self.sink.write() {
            *current = Some(sink);
        }
    }
}
