use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::{debug, info, warn};

use crate::connection::{Connection, RepoConnectionBuilder};
use crate::envelope::signed::{unwrap_signed_field, verify_signed_field, wrap_signed_field};
use crate::envelope::{message, SignedField, Unpacked};
use crate::exchange::{DidAuthMeta, ExchangeMessage, ExchangeMeta, RepoExchangeBuilder};
use crate::keystore::{Did, Verkey};
use crate::proof::request::generate_nonce;
use crate::router::{MessageHandler, MessageSender, RouterError};
use crate::tenant::Tenant;

use super::messages::{
    Answer, Challenge, DidAuthRequest, DidAuthResponse, REQUEST_MESSAGE_TYPE,
    RESPONSE_MESSAGE_TYPE,
};
use super::types::{DidAuthAPI, DidAuthError, DidAuthStage};

/// signed_by accepts a field only when it was signed by `key`
fn signed_by(field: &SignedField, key: Option<&Verkey>) -> bool {
    key == Some(&field.signer) && matches!(verify_signed_field(field), Ok(true))
}

#[derive(Clone)]
pub struct Usecase<TExchanges, TConnections, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TSender: MessageSender,
{
    exchanges: TExchanges,
    connections: TConnections,
    sender: TSender,
}

impl<TExchanges, TConnections, TSender> Usecase<TExchanges, TConnections, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TSender: MessageSender,
{
    pub fn new(exchanges: TExchanges, connections: TConnections, sender: TSender) -> Self {
        Self {
            exchanges,
            connections,
            sender,
        }
    }

    async fn usable_connection(
        &self,
        tenant: &Tenant,
        their_did: &Did,
    ) -> Result<Connection, DidAuthError> {
        self.connections
            .find_usable(tenant.id(), their_did)
            .await?
            .ok_or_else(|| {
                DidAuthError::ValidationError(format!("no usable connection with {}", their_did))
            })
    }

    fn my_key(connection: &Connection) -> Result<Verkey, DidAuthError> {
        connection.my_key.clone().ok_or_else(|| {
            DidAuthError::ValidationError(format!("connection {} has no key", connection.id))
        })
    }

    async fn load(
        &self,
        tenant: &Tenant,
        stage: DidAuthStage,
        id: &str,
    ) -> Result<Option<ExchangeMessage>, DidAuthError> {
        let found = self.exchanges.get(tenant.id(), id).await?;
        Ok(found.filter(|record| record.message_type == stage.message_type()))
    }
}

#[async_trait]
impl<TExchanges, TConnections, TSender> DidAuthAPI for Usecase<TExchanges, TConnections, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TSender: MessageSender,
{
    async fn create_request(
        &self,
        tenant: &Tenant,
        their_did: &Did,
        meta: Option<Value>,
    ) -> Result<ExchangeMessage, DidAuthError> {
        let connection = self.usable_connection(tenant, their_did).await?;
        let my_key = Self::my_key(&connection)?;
        let my_did = connection.my_did.clone().ok_or_else(|| {
            DidAuthError::ValidationError(format!("connection {} has no did", connection.id))
        })?;

        let challenge = Challenge {
            nonce: generate_nonce(),
        };
        let request = DidAuthRequest {
            id: message::generate_id(),
            message_type: REQUEST_MESSAGE_TYPE.to_string(),
            origin: my_did.clone(),
            challenge: wrap_signed_field(tenant.store(), &my_key, &challenge).await?,
        };

        let record = ExchangeMessage::new(
            request.id.clone(),
            REQUEST_MESSAGE_TYPE,
            request.id.clone(),
            message::to_value(&request)?,
            ExchangeMeta::DidAuth(DidAuthMeta {
                meta,
                ..Default::default()
            }),
        )
        .with_parties(Some(my_did), connection.their_did.clone());
        self.exchanges.save(tenant.id(), &record).await?;

        info!("did-auth request created: {} (tenant {})", record.id, tenant.id());
        Ok(record)
    }

    async fn create_response(
        &self,
        tenant: &Tenant,
        request: DidAuthRequest,
    ) -> Result<ExchangeMessage, DidAuthError> {
        let connection = self.usable_connection(tenant, &request.origin).await?;
        if !signed_by(&request.challenge, connection.their_key.as_ref()) {
            return Err(DidAuthError::SignatureError(format!(
                "challenge of request {} is not signed by {}",
                request.id, request.origin
            )));
        }

        let (_, challenge): (i64, Challenge) = unwrap_signed_field(&request.challenge)?;
        let my_key = Self::my_key(&connection)?;
        let my_did = connection.my_did.clone().ok_or_else(|| {
            DidAuthError::ValidationError(format!("connection {} has no did", connection.id))
        })?;

        let answer = Answer {
            nonce: challenge.nonce,
            did: my_did.clone(),
        };
        let response = DidAuthResponse {
            id: request.id.clone(),
            message_type: RESPONSE_MESSAGE_TYPE.to_string(),
            origin: my_did.clone(),
            answer: wrap_signed_field(tenant.store(), &my_key, &answer).await?,
        };

        let payload = message::to_value(&response)?;
        let record = ExchangeMessage::new(
            response.id.clone(),
            RESPONSE_MESSAGE_TYPE,
            request.id,
            payload.clone(),
            ExchangeMeta::DidAuth(DidAuthMeta::default()),
        )
        .with_parties(Some(my_did), connection.their_did.clone());
        self.exchanges.save(tenant.id(), &record).await?;

        let target = connection.target()?;
        if let Err(err) = self.sender.send(tenant, &payload, &target).await {
            warn!("did-auth response delivery failed: {}", err);
            self.exchanges.remove(tenant.id(), &record.id).await?;
            return Err(DidAuthError::SendError(err.to_string()));
        }

        info!("did-auth response sent: {} (tenant {})", record.id, tenant.id());
        Ok(record)
    }

    async fn receive_response(
        &self,
        tenant: &Tenant,
        response: DidAuthResponse,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, DidAuthError> {
        let _guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("did-auth response without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        if connection.their_did.as_ref() != Some(&response.origin)
            || !signed_by(&response.answer, connection.their_key.as_ref())
        {
            warn!("did-auth response with foreign signature dropped: {}", response.id);
            return Ok(None);
        }

        let answer: Answer = match unwrap_signed_field(&response.answer) {
            Ok((_, answer)) => answer,
            Err(err) => {
                warn!("did-auth response with unreadable answer dropped: {}", err);
                return Ok(None);
            }
        };

        let request = self
            .load(tenant, DidAuthStage::Request, &response.id)
            .await?
            .filter(|request| request.sender_did == connection.my_did);
        let request = match request {
            Some(request) => request,
            None => {
                warn!("did-auth response without pending request dropped: {}", response.id);
                return Ok(None);
            }
        };
        self.exchanges.remove(tenant.id(), &request.id).await?;

        let requested: DidAuthRequest = message::from_value(&request.payload)?;
        let (_, challenge): (i64, Challenge) = unwrap_signed_field(&requested.challenge)?;
        let is_valid = challenge.nonce == answer.nonce && answer.did == response.origin;
        if !is_valid {
            debug!("did-auth response {} does not answer its challenge", response.id);
        }

        let meta = match request.meta {
            ExchangeMeta::DidAuth(meta) => meta.meta,
            _ => None,
        };
        let record = ExchangeMessage::new(
            response.id.clone(),
            RESPONSE_MESSAGE_TYPE,
            request.thread_id,
            message::to_value(&response)?,
            ExchangeMeta::DidAuth(DidAuthMeta {
                meta,
                is_valid: Some(is_valid),
                content: Some(message::to_value(&answer)?),
            }),
        )
        .with_parties(connection.their_did.clone(), connection.my_did.clone());
        self.exchanges.save(tenant.id(), &record).await?;

        info!(
            "did-auth response received: {} valid: {} (tenant {})",
            record.id,
            is_valid,
            tenant.id()
        );
        Ok(Some(record))
    }

    async fn list(
        &self,
        tenant: &Tenant,
        stage: DidAuthStage,
    ) -> Result<Vec<ExchangeMessage>, DidAuthError> {
        let records = self
            .exchanges
            .list(tenant.id(), Some(stage.message_type()))
            .await?;
        Ok(records)
    }

    async fn get(
        &self,
        tenant: &Tenant,
        stage: DidAuthStage,
        id: &str,
    ) -> Result<ExchangeMessage, DidAuthError> {
        self.load(tenant, stage, id)
            .await?
            .ok_or_else(|| DidAuthError::NotFound(id.to_string()))
    }

    async fn remove(
        &self,
        tenant: &Tenant,
        stage: DidAuthStage,
        id: &str,
    ) -> Result<(), DidAuthError> {
        self.get(tenant, stage, id).await?;
        self.exchanges.remove(tenant.id(), id).await?;
        Ok(())
    }
}

#[async_trait]
impl<TExchanges, TConnections, TSender> MessageHandler
    for Usecase<TExchanges, TConnections, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TSender: MessageSender,
{
    async fn handle(&self, tenant: &Tenant, inbound: Unpacked) -> Result<(), RouterError> {
        let sender_key = match &inbound.sender_key {
            Some(sender_key) => sender_key,
            None => {
                warn!("anonymous did-auth message dropped (tenant {})", tenant.id());
                return Ok(());
            }
        };

        match message::message_type(&inbound.message) {
            Some(RESPONSE_MESSAGE_TYPE) => {
                let response: DidAuthResponse = message::from_value(&inbound.message)?;
                self.receive_response(tenant, response, sender_key, &inbound.recipient_key)
                    .await?;
            }
            other => {
                return Err(RouterError::UnsupportedMessageType(
                    other.unwrap_or("<missing>").to_string(),
                ))
            }
        }

        Ok(())
    }
}
