use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{Map, Value};
use rst_common::with_logging::log::{debug, info, warn};

use crate::connection::{Connection, RepoConnectionBuilder};
use crate::engine::{CredentialBlob, CredentialEngine, OfferBlob, RequestBlob};
use crate::envelope::{message, Attachment, Thread, Unpacked};
use crate::exchange::{
    ExchangeMessage, ExchangeMeta, IssuedMeta, OfferMeta, RepoExchangeBuilder,
    RequestReceivedMeta, RequestSentMeta,
};
use crate::keystore::{Did, Verkey};
use crate::ledger::{CredentialDefinition, Ledger};
use crate::router::{MessageHandler, MessageSender, RouterError};
use crate::tenant::Tenant;

use super::encode::to_credential_values;
use super::messages::{
    CredentialOffer, CredentialPreview, CredentialProposal, CredentialRequest, IssuedCredential,
    CREDENTIAL_MESSAGE_TYPE, OFFER_MESSAGE_TYPE, PROPOSAL_MESSAGE_TYPE, REQUEST_MESSAGE_TYPE,
};
use super::types::{
    CredentialAPI, CredentialError, CredentialStage, OfferOptions, ProposalOptions, ValueSource,
};

/// `Usecase` drives the issue-credential flow for both the issuer and the holder
///
/// All steps of one flow share the thread id set by its first message
#[derive(Clone)]
pub struct Usecase<TExchanges, TConnections, TLedger, TEngine, TSender, TValues>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
    TValues: ValueSource,
{
    exchanges: TExchanges,
    connections: TConnections,
    ledger: TLedger,
    engine: TEngine,
    sender: TSender,
    values: TValues,
}

impl<TExchanges, TConnections, TLedger, TEngine, TSender, TValues>
    Usecase<TExchanges, TConnections, TLedger, TEngine, TSender, TValues>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
    TValues: ValueSource,
{
    pub fn new(
        exchanges: TExchanges,
        connections: TConnections,
        ledger: TLedger,
        engine: TEngine,
        sender: TSender,
        values: TValues,
    ) -> Self {
        Self {
            exchanges,
            connections,
            ledger,
            engine,
            sender,
            values,
        }
    }

    pub fn exchanges(&self) -> TExchanges {
        self.exchanges.clone()
    }

    async fn usable_connection(
        &self,
        tenant: &Tenant,
        their_did: &Did,
    ) -> Result<Connection, CredentialError> {
        self.connections
            .find_usable(tenant.id(), their_did)
            .await?
            .ok_or_else(|| {
                CredentialError::ValidationError(format!(
                    "no usable connection with {}",
                    their_did
                ))
            })
    }

    async fn send(
        &self,
        tenant: &Tenant,
        message: &Value,
        connection: &Connection,
    ) -> Result<(), CredentialError> {
        let target = connection.target()?;
        self.sender
            .send(tenant, message, &target)
            .await
            .map_err(|err| CredentialError::SendError(err.to_string()))
    }

    async fn load(
        &self,
        tenant: &Tenant,
        stage: CredentialStage,
        id: &str,
    ) -> Result<Option<ExchangeMessage>, CredentialError> {
        let found = self.exchanges.get(tenant.id(), id).await?;
        Ok(found.filter(|record| record.message_type == stage.message_type()))
    }

    async fn resolve_definition(&self, id: &str) -> Result<CredentialDefinition, CredentialError> {
        self.ledger
            .resolve_credential_definition(id)
            .await?
            .ok_or_else(|| CredentialError::NotFound(format!("credential definition {}", id)))
    }

    /// check_proposal validates the schema and definition a proposal refers to, and the
    /// proposed attribute names against the schema
    async fn check_proposal(&self, proposal: &CredentialProposal) -> Result<(), CredentialError> {
        let schema = match &proposal.schema_id {
            Some(id) => Some(self.ledger.resolve_schema(id).await?.ok_or_else(|| {
                CredentialError::ValidationError(format!("unknown schema {}", id))
            })?),
            None => None,
        };

        let definition = match &proposal.cred_def_id {
            Some(id) => Some(
                self.ledger
                    .resolve_credential_definition(id)
                    .await?
                    .ok_or_else(|| {
                        CredentialError::ValidationError(format!(
                            "unknown credential definition {}",
                            id
                        ))
                    })?,
            ),
            None => None,
        };

        if let (Some(schema), Some(definition)) = (&schema, &definition) {
            if definition.schema_seq_no() != Some(schema.seq_no) {
                return Err(CredentialError::SchemaMismatch(format!(
                    "credential definition {} is not based on schema {}",
                    definition.id, schema.id
                )));
            }
        }

        let schema = match (schema, &definition) {
            (Some(schema), _) => Some(schema),
            (None, Some(definition)) => match definition.schema_seq_no() {
                Some(seq_no) => self.ledger.resolve_schema_by_seq_no(seq_no).await?,
                None => None,
            },
            (None, None) => None,
        };

        if let Some(schema) = schema {
            let unknown: Vec<String> = proposal
                .credential_proposal
                .names()
                .filter(|name| !schema.has_attribute(name))
                .map(str::to_string)
                .collect();

            if !unknown.is_empty() {
                return Err(CredentialError::InvalidAttribute(unknown));
            }
        }

        Ok(())
    }
}

/// offer_matches_proposal is the holder's automatic acceptance rule: every identifier the
/// proposal named must be the one offered, and the previewed attributes must be identical
fn offer_matches_proposal(
    proposal: &CredentialProposal,
    offer: &CredentialOffer,
    blob: &OfferBlob,
) -> bool {
    let schema_matches = proposal
        .schema_id
        .as_deref()
        .map_or(true, |id| blob.schema_id() == Some(id));
    let definition_matches = proposal
        .cred_def_id
        .as_deref()
        .map_or(true, |id| blob.cred_def_id() == Some(id));
    let attributes_match = offer
        .credential_preview
        .as_ref()
        .is_some_and(|preview| preview.same_attributes(&proposal.credential_proposal));

    schema_matches && definition_matches && attributes_match
}

#[async_trait]
impl<TExchanges, TConnections, TLedger, TEngine, TSender, TValues> CredentialAPI
    for Usecase<TExchanges, TConnections, TLedger, TEngine, TSender, TValues>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
    TValues: ValueSource,
{
    async fn propose(
        &self,
        tenant: &Tenant,
        options: ProposalOptions,
    ) -> Result<ExchangeMessage, CredentialError> {
        let connection = self.usable_connection(tenant, &options.their_did).await?;

        let proposal = CredentialProposal {
            id: message::generate_id(),
            message_type: PROPOSAL_MESSAGE_TYPE.to_string(),
            thread: None,
            comment: options.comment.unwrap_or_default(),
            credential_proposal: CredentialPreview::new(options.attributes),
            schema_id: options.schema_id,
            cred_def_id: options.definition_id,
        };
        self.check_proposal(&proposal).await?;

        let payload = message::to_value(&proposal)?;
        let record = ExchangeMessage::new(
            proposal.id.clone(),
            PROPOSAL_MESSAGE_TYPE,
            proposal.id.clone(),
            payload.clone(),
            ExchangeMeta::Proposal,
        )
        .with_parties(connection.my_did.clone(), connection.their_did.clone());
        self.exchanges.save(tenant.id(), &record).await?;

        self.send(tenant, &payload, &connection).await?;
        info!("credential proposal sent: {} (tenant {})", record.id, tenant.id());
        Ok(record)
    }

    async fn receive_proposal(
        &self,
        tenant: &Tenant,
        proposal: CredentialProposal,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, CredentialError> {
        let _guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("credential proposal without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        self.check_proposal(&proposal).await?;

        let thread_id = proposal
            .thread
            .as_ref()
            .map(|thread| thread.thid.clone())
            .unwrap_or_else(|| proposal.id.clone());
        let record = ExchangeMessage::new(
            proposal.id.clone(),
            PROPOSAL_MESSAGE_TYPE,
            thread_id,
            message::to_value(&proposal)?,
            ExchangeMeta::Proposal,
        )
        .with_parties(connection.their_did.clone(), connection.my_did.clone());
        self.exchanges.save(tenant.id(), &record).await?;

        debug!("credential proposal received: {} (tenant {})", record.id, tenant.id());
        Ok(Some(record))
    }

    async fn create_offer(
        &self,
        tenant: &Tenant,
        options: OfferOptions,
    ) -> Result<ExchangeMessage, CredentialError> {
        let guard = tenant.serialize().await;
        let connection = self.usable_connection(tenant, &options.their_did).await?;

        let proposal = match &options.proposal_id {
            Some(id) => {
                let record = self
                    .load(tenant, CredentialStage::Proposal, id)
                    .await?
                    .ok_or_else(|| CredentialError::NotFound(format!("credential proposal {}", id)))?;

                if record.sender_did.as_ref() != Some(&options.their_did) {
                    return Err(CredentialError::ValidationError(format!(
                        "proposal {} was not received from {}",
                        id, options.their_did
                    )));
                }

                let proposal: CredentialProposal = message::from_value(&record.payload)?;
                Some((record, proposal))
            }
            None => None,
        };

        let definition_id = options
            .definition_id
            .clone()
            .or_else(|| {
                proposal
                    .as_ref()
                    .and_then(|(_, proposal)| proposal.cred_def_id.clone())
            })
            .ok_or_else(|| {
                CredentialError::ValidationError("missing credential definition id".to_string())
            })?;

        let preview = match options.attributes {
            Some(attributes) => Some(CredentialPreview::new(attributes)),
            None => proposal
                .as_ref()
                .map(|(_, proposal)| proposal.credential_proposal.clone()),
        };

        let offer_blob = self.engine.create_offer(tenant.id(), &definition_id).await?;

        let id = message::generate_id();
        let (thread, thread_id) = match &proposal {
            Some((record, _)) => (
                Some(Thread::new(record.thread_id.clone())),
                record.thread_id.clone(),
            ),
            None => (None, id.clone()),
        };

        let offer = CredentialOffer {
            id: id.clone(),
            message_type: OFFER_MESSAGE_TYPE.to_string(),
            thread,
            comment: options.comment.unwrap_or_default(),
            credential_preview: preview,
            offers_attach: vec![Attachment::json(&id, &offer_blob)?],
        };

        let payload = message::to_value(&offer)?;
        let record = ExchangeMessage::new(
            id,
            OFFER_MESSAGE_TYPE,
            thread_id,
            payload.clone(),
            ExchangeMeta::Offer(OfferMeta {
                offer: offer_blob,
                credential_location: options.credential_location,
            }),
        )
        .with_parties(connection.my_did.clone(), connection.their_did.clone());

        self.exchanges.save(tenant.id(), &record).await?;
        if let Some((proposal_record, _)) = &proposal {
            self.exchanges.remove(tenant.id(), &proposal_record.id).await?;
        }
        drop(guard);

        self.send(tenant, &payload, &connection).await?;
        info!("credential offer sent: {} (tenant {})", record.id, tenant.id());
        Ok(record)
    }

    async fn receive_offer(
        &self,
        tenant: &Tenant,
        offer: CredentialOffer,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, CredentialError> {
        let guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("credential offer without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        let blob: OfferBlob = Attachment::first(&offer.offers_attach)?;
        let thread_id = offer.thread_id().to_string();

        let record = ExchangeMessage::new(
            offer.id.clone(),
            OFFER_MESSAGE_TYPE,
            thread_id.clone(),
            message::to_value(&offer)?,
            ExchangeMeta::Offer(OfferMeta {
                offer: blob.clone(),
                credential_location: None,
            }),
        )
        .with_parties(connection.their_did.clone(), connection.my_did.clone());
        self.exchanges.save(tenant.id(), &record).await?;

        let proposal = match &offer.thread {
            Some(_) => self
                .exchanges
                .find_by_thread(tenant.id(), PROPOSAL_MESSAGE_TYPE, &thread_id)
                .await?
                .filter(|proposal| proposal.sender_did == connection.my_did),
            None => None,
        };
        drop(guard);

        let proposal = match proposal {
            Some(candidate) => {
                let proposed: CredentialProposal = message::from_value(&candidate.payload)?;
                offer_matches_proposal(&proposed, &offer, &blob).then_some(candidate)
            }
            None => None,
        };

        let proposal = match proposal {
            Some(proposal) => proposal,
            None => {
                debug!("credential offer stored: {} (tenant {})", record.id, tenant.id());
                return Ok(Some(record));
            }
        };

        debug!("credential offer matches proposal, requesting: {}", record.id);
        let request = self.create_request(tenant, &record.id, None).await?;
        self.exchanges.remove(tenant.id(), &proposal.id).await?;
        Ok(Some(request))
    }

    async fn create_request(
        &self,
        tenant: &Tenant,
        offer_id: &str,
        comment: Option<String>,
    ) -> Result<ExchangeMessage, CredentialError> {
        let guard = tenant.serialize().await;

        let no_offer = || CredentialError::NoApplicableOffer(offer_id.to_string());
        let record = self
            .load(tenant, CredentialStage::Offer, offer_id)
            .await?
            .ok_or_else(no_offer)?;

        let offer_blob = match &record.meta {
            ExchangeMeta::Offer(meta) => meta.offer.clone(),
            _ => return Err(no_offer()),
        };

        let connection = match &record.sender_did {
            Some(their_did) => self.connections.find_usable(tenant.id(), their_did).await?,
            None => None,
        }
        .filter(|connection| connection.my_did == record.recipient_did)
        .ok_or_else(no_offer)?;

        let definition_id = offer_blob.cred_def_id().ok_or_else(|| {
            CredentialError::ValidationError("offer without credential definition id".to_string())
        })?;
        let definition = self.resolve_definition(definition_id).await?;

        let (request_blob, binding) = self
            .engine
            .create_request(
                tenant.id(),
                &offer_blob,
                &definition,
                tenant.master_secret_id(),
            )
            .await?;

        let id = message::generate_id();
        let request = CredentialRequest {
            id: id.clone(),
            message_type: REQUEST_MESSAGE_TYPE.to_string(),
            thread: Thread::new(record.thread_id.clone()),
            comment: comment.unwrap_or_default(),
            requests_attach: vec![Attachment::json(&id, &request_blob)?],
        };

        let payload = message::to_value(&request)?;
        let request_record = ExchangeMessage::new(
            id,
            REQUEST_MESSAGE_TYPE,
            record.thread_id.clone(),
            payload.clone(),
            ExchangeMeta::RequestSent(RequestSentMeta {
                offer: offer_blob,
                request: request_blob,
                binding,
            }),
        )
        .with_parties(connection.my_did.clone(), connection.their_did.clone());

        self.exchanges.save(tenant.id(), &request_record).await?;
        self.exchanges.remove(tenant.id(), &record.id).await?;
        drop(guard);

        self.send(tenant, &payload, &connection).await?;
        info!("credential request sent: {} (tenant {})", request_record.id, tenant.id());
        Ok(request_record)
    }

    async fn receive_request(
        &self,
        tenant: &Tenant,
        request: CredentialRequest,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, CredentialError> {
        let guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("credential request without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        let thread_id = request.thread.thid.clone();
        let offer = self
            .exchanges
            .find_by_thread(tenant.id(), OFFER_MESSAGE_TYPE, &thread_id)
            .await?
            .filter(|offer| {
                offer.sender_did == connection.my_did && offer.recipient_did == connection.their_did
            });

        let (offer, offer_meta) = match offer {
            Some(offer) => match offer.meta.clone() {
                ExchangeMeta::Offer(meta) => (offer, meta),
                _ => return Ok(None),
            },
            None => {
                warn!("credential request without applicable offer dropped, thread: {}", thread_id);
                return Ok(None);
            }
        };

        let request_blob: RequestBlob = Attachment::first(&request.requests_attach)?;
        let credential_location = offer_meta.credential_location.clone();
        let record = ExchangeMessage::new(
            request.id.clone(),
            REQUEST_MESSAGE_TYPE,
            thread_id,
            message::to_value(&request)?,
            ExchangeMeta::RequestReceived(RequestReceivedMeta {
                offer: offer_meta.offer,
                request: request_blob,
                credential_location: credential_location.clone(),
            }),
        )
        .with_parties(connection.their_did.clone(), connection.my_did.clone());

        self.exchanges.remove(tenant.id(), &offer.id).await?;
        self.exchanges.save(tenant.id(), &record).await?;
        drop(guard);

        if credential_location.is_some() {
            debug!("credential location known, issuing automatically: {}", record.id);
            let issued = self.issue(tenant, &record.id, Map::new()).await?;
            return Ok(Some(issued));
        }

        debug!("credential request received: {} (tenant {})", record.id, tenant.id());
        Ok(Some(record))
    }

    async fn issue(
        &self,
        tenant: &Tenant,
        request_id: &str,
        values: Map<String, Value>,
    ) -> Result<ExchangeMessage, CredentialError> {
        let no_request = || CredentialError::NoApplicableRequest(request_id.to_string());
        let record = self
            .load(tenant, CredentialStage::Request, request_id)
            .await?
            .ok_or_else(no_request)?;

        let meta = match &record.meta {
            ExchangeMeta::RequestReceived(meta) => meta.clone(),
            _ => return Err(no_request()),
        };

        let their_did = record.sender_did.clone().ok_or_else(no_request)?;
        let connection = self.usable_connection(tenant, &their_did).await?;

        let mut merged = match &meta.credential_location {
            Some(location) => self.values.fetch(location).await?,
            None => Map::new(),
        };
        merged.extend(values);

        if merged.is_empty() {
            return Err(CredentialError::ValidationError(
                "missing credential values and value location".to_string(),
            ));
        }

        let definition_id = meta.offer.cred_def_id().ok_or_else(|| {
            CredentialError::ValidationError("offer without credential definition id".to_string())
        })?;
        let definition = self.resolve_definition(definition_id).await?;
        let credential_values = to_credential_values(&merged);

        let guard = tenant.serialize().await;
        if self
            .load(tenant, CredentialStage::Request, request_id)
            .await?
            .is_none()
        {
            return Err(no_request());
        }

        let issued = self
            .engine
            .issue(
                tenant.id(),
                &meta.offer,
                &meta.request,
                &credential_values,
                definition.revocation_registry_id.clone(),
            )
            .await?;

        if let (Some(registry_id), Some(delta)) =
            (&definition.revocation_registry_id, &issued.registry_delta)
        {
            self.ledger
                .publish_revocation_delta(tenant.own_did(), registry_id, delta)
                .await?;
        }

        let id = message::generate_id();
        let credential = IssuedCredential {
            id: id.clone(),
            message_type: CREDENTIAL_MESSAGE_TYPE.to_string(),
            thread: Thread::new(record.thread_id.clone()),
            comment: String::new(),
            credentials_attach: vec![Attachment::json(&id, &issued.credential)?],
        };

        let payload = message::to_value(&credential)?;
        let issued_record = ExchangeMessage::new(
            id,
            CREDENTIAL_MESSAGE_TYPE,
            record.thread_id.clone(),
            payload.clone(),
            ExchangeMeta::Issued(IssuedMeta {
                revocation_registry_id: issued
                    .revocation_id
                    .as_ref()
                    .and(definition.revocation_registry_id.clone()),
                revocation_id: issued.revocation_id.clone(),
                registry_delta: issued.registry_delta.clone(),
            }),
        )
        .with_parties(connection.my_did.clone(), connection.their_did.clone());

        self.exchanges.save(tenant.id(), &issued_record).await?;
        self.exchanges.remove(tenant.id(), request_id).await?;
        drop(guard);

        if let Err(err) = self.send(tenant, &payload, &connection).await {
            warn!("credential delivery failed, request {} kept: {}", request_id, err);
            let _guard = tenant.serialize().await;
            self.exchanges.remove(tenant.id(), &issued_record.id).await?;
            self.exchanges.save(tenant.id(), &record).await?;
            return Err(err);
        }

        info!("credential issued: {} (tenant {})", issued_record.id, tenant.id());
        Ok(issued_record)
    }

    async fn receive_credential(
        &self,
        tenant: &Tenant,
        credential: IssuedCredential,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<String>, CredentialError> {
        let _guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("credential without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        let thread_id = &credential.thread.thid;
        let request = self
            .exchanges
            .find_by_thread(tenant.id(), REQUEST_MESSAGE_TYPE, thread_id)
            .await?
            .filter(|request| request.sender_did == connection.my_did);

        let (request, meta) = match request {
            Some(request) => match request.meta.clone() {
                ExchangeMeta::RequestSent(meta) => (request, meta),
                _ => return Ok(None),
            },
            None => {
                warn!("credential without applicable request dropped, thread: {}", thread_id);
                return Ok(None);
            }
        };

        let blob: CredentialBlob = Attachment::first(&credential.credentials_attach)?;
        let definition_id = blob
            .cred_def_id()
            .or_else(|| meta.offer.cred_def_id())
            .ok_or_else(|| {
                CredentialError::ValidationError(
                    "credential without credential definition id".to_string(),
                )
            })?;
        let definition = self.resolve_definition(definition_id).await?;

        let revocation_definition = match blob.rev_reg_id() {
            Some(id) => Some(
                self.ledger
                    .resolve_revocation_registry_definition(id)
                    .await?
                    .ok_or_else(|| {
                        CredentialError::NotFound(format!("revocation registry definition {}", id))
                    })?,
            ),
            None => None,
        };

        let credential_id = self
            .engine
            .store_credential(
                tenant.id(),
                &meta.binding,
                &blob,
                &definition,
                revocation_definition,
            )
            .await?;
        self.exchanges.remove(tenant.id(), &request.id).await?;

        info!("credential stored: {} (tenant {})", credential_id, tenant.id());
        Ok(Some(credential_id))
    }

    async fn revoke(&self, tenant: &Tenant, issued_id: &str) -> Result<Value, CredentialError> {
        let _guard = tenant.serialize().await;

        let mut record = self
            .load(tenant, CredentialStage::Issued, issued_id)
            .await?
            .ok_or_else(|| CredentialError::NotFound(format!("issued credential {}", issued_id)))?;

        let mut meta = match &record.meta {
            ExchangeMeta::Issued(meta) => meta.clone(),
            _ => {
                return Err(CredentialError::NotFound(format!(
                    "issued credential {}",
                    issued_id
                )))
            }
        };

        let (registry_id, revocation_id) =
            match (&meta.revocation_registry_id, &meta.revocation_id) {
                (Some(registry_id), Some(revocation_id)) => {
                    (registry_id.clone(), revocation_id.clone())
                }
                _ => {
                    return Err(CredentialError::ValidationError(format!(
                        "credential {} is not revocable",
                        issued_id
                    )))
                }
            };

        let delta = self
            .engine
            .revoke(tenant.id(), &revocation_id, &registry_id)
            .await?;
        self.ledger
            .publish_revocation_delta(tenant.own_did(), &registry_id, &delta)
            .await?;

        meta.registry_delta = Some(delta.clone());
        record.update_meta(ExchangeMeta::Issued(meta));
        self.exchanges.save(tenant.id(), &record).await?;

        info!("credential revoked: {} (tenant {})", issued_id, tenant.id());
        Ok(delta)
    }

    async fn list(
        &self,
        tenant: &Tenant,
        stage: CredentialStage,
    ) -> Result<Vec<ExchangeMessage>, CredentialError> {
        let records = self
            .exchanges
            .list(tenant.id(), Some(stage.message_type()))
            .await?;
        Ok(records)
    }

    async fn get(
        &self,
        tenant: &Tenant,
        stage: CredentialStage,
        id: &str,
    ) -> Result<ExchangeMessage, CredentialError> {
        self.load(tenant, stage, id)
            .await?
            .ok_or_else(|| CredentialError::NotFound(id.to_string()))
    }

    async fn remove(
        &self,
        tenant: &Tenant,
        stage: CredentialStage,
        id: &str,
    ) -> Result<(), CredentialError> {
        self.get(tenant, stage, id).await?;
        self.exchanges.remove(tenant.id(), id).await?;
        Ok(())
    }
}

#[async_trait]
impl<TExchanges, TConnections, TLedger, TEngine, TSender, TValues> MessageHandler
    for Usecase<TExchanges, TConnections, TLedger, TEngine, TSender, TValues>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
    TValues: ValueSource,
{
    async fn handle(&self, tenant: &Tenant, inbound: Unpacked) -> Result<(), RouterError> {
        let sender_key = match &inbound.sender_key {
            Some(sender_key) => sender_key,
            None => {
                warn!("anonymous credential message dropped (tenant {})", tenant.id());
                return Ok(());
            }
        };
        let recipient_key = &inbound.recipient_key;

        match message::message_type(&inbound.message) {
            Some(PROPOSAL_MESSAGE_TYPE) => {
                let proposal: CredentialProposal = message::from_value(&inbound.message)?;
                self.receive_proposal(tenant, proposal, sender_key, recipient_key)
                    .await?;
            }
            Some(OFFER_MESSAGE_TYPE) => {
                let offer: CredentialOffer = message::from_value(&inbound.message)?;
                self.receive_offer(tenant, offer, sender_key, recipient_key)
                    .await?;
            }
            Some(REQUEST_MESSAGE_TYPE) => {
                let request: CredentialRequest = message::from_value(&inbound.message)?;
                self.receive_request(tenant, request, sender_key, recipient_key)
                    .await?;
            }
            Some(CREDENTIAL_MESSAGE_TYPE) => {
                let credential: IssuedCredential = message::from_value(&inbound.message)?;
                self.receive_credential(tenant, credential, sender_key, recipient_key)
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
