use std::collections::{BTreeMap, BTreeSet};

use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{Map, Value};
use rst_common::with_logging::log::{debug, info, warn};

use crate::connection::{Connection, RepoConnectionBuilder};
use crate::engine::{CredentialEngine, PresentationBlob};
use crate::envelope::{message, Attachment, Thread, Unpacked};
use crate::exchange::{ExchangeMessage, ExchangeMeta, ProofRequestMeta, RepoExchangeBuilder};
use crate::keystore::{Did, Verkey};
use crate::ledger::{Ledger, Schema};
use crate::router::{MessageHandler, MessageSender, RouterError};
use crate::tenant::Tenant;

use super::messages::{
    Presentation, PresentationPreview, PresentationProposal, RequestPresentation,
    PRESENTATION_MESSAGE_TYPE, PROPOSAL_MESSAGE_TYPE, REQUEST_MESSAGE_TYPE,
};
use super::proof::{Proof, ProofTemplate};
use super::request::ProofRequest;
use super::template;
use super::types::{
    ProofAPI, ProofError, ProofStage, ProposalOptions, RepoProofBuilder, RequestOptions,
    RequestSource,
};

/// `Usecase` drives the present-proof flow for both the prover and the verifier
#[derive(Clone)]
pub struct Usecase<TExchanges, TConnections, TProofs, TLedger, TEngine, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TProofs: RepoProofBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
{
    exchanges: TExchanges,
    connections: TConnections,
    proofs: TProofs,
    ledger: TLedger,
    engine: TEngine,
    sender: TSender,
}

impl<TExchanges, TConnections, TProofs, TLedger, TEngine, TSender>
    Usecase<TExchanges, TConnections, TProofs, TLedger, TEngine, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TProofs: RepoProofBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
{
    pub fn new(
        exchanges: TExchanges,
        connections: TConnections,
        proofs: TProofs,
        ledger: TLedger,
        engine: TEngine,
        sender: TSender,
    ) -> Self {
        Self {
            exchanges,
            connections,
            proofs,
            ledger,
            engine,
            sender,
        }
    }

    async fn usable_connection(
        &self,
        tenant: &Tenant,
        their_did: &Did,
    ) -> Result<Connection, ProofError> {
        self.connections
            .find_usable(tenant.id(), their_did)
            .await?
            .ok_or_else(|| {
                ProofError::ValidationError(format!("no usable connection with {}", their_did))
            })
    }

    async fn send(
        &self,
        tenant: &Tenant,
        message: &Value,
        connection: &Connection,
    ) -> Result<(), ProofError> {
        let target = connection.target()?;
        self.sender
            .send(tenant, message, &target)
            .await
            .map_err(|err| ProofError::SendError(err.to_string()))
    }

    async fn load(
        &self,
        tenant: &Tenant,
        stage: ProofStage,
        id: &str,
    ) -> Result<Option<ExchangeMessage>, ProofError> {
        let found = self.exchanges.get(tenant.id(), id).await?;
        Ok(found.filter(|record| record.message_type == stage.message_type()))
    }

    /// validate_proposal checks every restricted attribute and predicate name against the
    /// schema behind its credential definition
    async fn validate_proposal(&self, preview: &PresentationPreview) -> Result<(), ProofError> {
        let restricted: Vec<(&str, &str)> = preview
            .attributes
            .iter()
            .filter_map(|attr| attr.cred_def_id.as_deref().map(|id| (attr.name.as_str(), id)))
            .chain(
                preview.predicates.iter().filter_map(|pred| {
                    pred.cred_def_id.as_deref().map(|id| (pred.name.as_str(), id))
                }),
            )
            .collect();

        let definition_ids: BTreeSet<&str> = restricted.iter().map(|(_, id)| *id).collect();
        let mut schemas: BTreeMap<&str, Option<Schema>> = BTreeMap::new();
        for id in definition_ids {
            let definition = self
                .ledger
                .resolve_credential_definition(id)
                .await?
                .ok_or_else(|| {
                    ProofError::ValidationError(format!("unknown credential definition {}", id))
                })?;

            let schema = match definition.schema_seq_no() {
                Some(seq_no) => self.ledger.resolve_schema_by_seq_no(seq_no).await?,
                None => None,
            };
            schemas.insert(id, schema);
        }

        let offenders: Vec<String> = restricted
            .iter()
            .filter(|(name, id)| {
                schemas
                    .get(id)
                    .and_then(Option::as_ref)
                    .is_some_and(|schema| !schema.has_attribute(name))
            })
            .map(|(name, _)| name.to_string())
            .collect();

        if !offenders.is_empty() {
            return Err(ProofError::InvalidAttribute(offenders));
        }

        Ok(())
    }

    async fn resolve_request(
        &self,
        tenant: &Tenant,
        their_did: &Did,
        source: RequestSource,
    ) -> Result<(ProofRequest, Option<ExchangeMessage>), ProofError> {
        match source {
            RequestSource::Direct(request) => Ok((request, None)),
            RequestSource::Template { id, values } => {
                let stored = self
                    .proofs
                    .get_template(tenant.id(), &id)
                    .await?
                    .ok_or_else(|| ProofError::NotFound(format!("proof template {}", id)))?;
                let request = template::render(stored.get_template(), &values)?;
                Ok((request, None))
            }
            RequestSource::Proposal { id, name, version } => {
                let record = self
                    .load(tenant, ProofStage::Proposal, &id)
                    .await?
                    .ok_or_else(|| ProofError::NotFound(format!("proof proposal {}", id)))?;

                if record.sender_did.as_ref() != Some(their_did) {
                    return Err(ProofError::ValidationError(format!(
                        "proposal {} was not received from {}",
                        id, their_did
                    )));
                }

                let proposal: PresentationProposal = message::from_value(&record.payload)?;
                let request = proposal.presentation_proposal.to_request(&name, &version);
                Ok((request, Some(record)))
            }
        }
    }
}

/// self_attested places the given values on the unrestricted referents of a request, a value
/// is looked up by referent first and by attribute name second
fn self_attested(request: &ProofRequest, values: &Map<String, Value>) -> Map<String, Value> {
    request
        .requested_attributes
        .iter()
        .filter(|(_, attribute)| attribute.restrictions.is_empty())
        .filter_map(|(referent, attribute)| {
            values
                .get(referent)
                .or_else(|| values.get(&attribute.name))
                .map(|value| (referent.to_owned(), value.to_owned()))
        })
        .collect()
}

/// presentable is the prover's automatic answer rule: the request must have the proposal's
/// exact shape and every unrestricted proposed attribute must carry a value, which becomes
/// its self-attested value
fn presentable(preview: &PresentationPreview, request: &ProofRequest) -> Option<Map<String, Value>> {
    if !preview.matches_request(request) {
        return None;
    }

    let mut values = Map::new();
    for attribute in preview.attributes.iter().filter(|attr| attr.cred_def_id.is_none()) {
        let value = attribute.value.as_ref()?;
        values.insert(attribute.name.clone(), value.to_owned());
    }

    Some(values)
}

#[async_trait]
impl<TExchanges, TConnections, TProofs, TLedger, TEngine, TSender> ProofAPI
    for Usecase<TExchanges, TConnections, TProofs, TLedger, TEngine, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TProofs: RepoProofBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
{
    async fn propose(
        &self,
        tenant: &Tenant,
        options: ProposalOptions,
    ) -> Result<ExchangeMessage, ProofError> {
        let connection = self.usable_connection(tenant, &options.their_did).await?;

        let preview = PresentationPreview::new(options.attributes, options.predicates);
        self.validate_proposal(&preview).await?;

        let proposal = PresentationProposal {
            id: message::generate_id(),
            message_type: PROPOSAL_MESSAGE_TYPE.to_string(),
            thread: None,
            comment: options.comment.unwrap_or_default(),
            presentation_proposal: preview,
        };

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
        info!("proof proposal sent: {} (tenant {})", record.id, tenant.id());
        Ok(record)
    }

    async fn receive_proposal(
        &self,
        tenant: &Tenant,
        proposal: PresentationProposal,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, ProofError> {
        let _guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("proof proposal without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        self.validate_proposal(&proposal.presentation_proposal)
            .await?;

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

        debug!("proof proposal received: {} (tenant {})", record.id, tenant.id());
        Ok(Some(record))
    }

    async fn create_request(
        &self,
        tenant: &Tenant,
        options: RequestOptions,
    ) -> Result<(ExchangeMessage, Proof), ProofError> {
        let guard = tenant.serialize().await;
        let connection = self.usable_connection(tenant, &options.their_did).await?;

        let (mut request, proposal) = self
            .resolve_request(tenant, &options.their_did, options.source)
            .await?;
        request.ensure_nonce();

        let proof = Proof::new(connection.their_did.clone(), request.clone());
        self.proofs.save_proof(tenant.id(), &proof).await?;

        let id = message::generate_id();
        let thread_id = proposal
            .as_ref()
            .map(|record| record.thread_id.clone())
            .unwrap_or_else(|| id.clone());

        let message = RequestPresentation {
            id: id.clone(),
            message_type: REQUEST_MESSAGE_TYPE.to_string(),
            thread: Thread::new(thread_id.clone()),
            comment: options.comment.unwrap_or_default(),
            request_presentations_attach: vec![Attachment::json(&id, &request)?],
        };

        let payload = message::to_value(&message)?;
        let record = ExchangeMessage::new(
            id,
            REQUEST_MESSAGE_TYPE,
            thread_id,
            payload.clone(),
            ExchangeMeta::ProofRequest(ProofRequestMeta {
                request,
                proof_id: Some(proof.id.clone()),
            }),
        )
        .with_parties(connection.my_did.clone(), connection.their_did.clone());

        self.exchanges.save(tenant.id(), &record).await?;
        if let Some(proposal) = &proposal {
            self.exchanges.remove(tenant.id(), &proposal.id).await?;
        }
        drop(guard);

        self.send(tenant, &payload, &connection).await?;
        info!(
            "proof request sent: {}, awaiting proof {} (tenant {})",
            record.id,
            proof.id,
            tenant.id()
        );
        Ok((record, proof))
    }

    async fn receive_request(
        &self,
        tenant: &Tenant,
        request: RequestPresentation,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<ExchangeMessage>, ProofError> {
        let guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("proof request without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        let proof_request: ProofRequest = Attachment::first(&request.request_presentations_attach)?;
        let thread_id = request.thread.thid.clone();

        let record = ExchangeMessage::new(
            request.id.clone(),
            REQUEST_MESSAGE_TYPE,
            thread_id.clone(),
            message::to_value(&request)?,
            ExchangeMeta::ProofRequest(ProofRequestMeta {
                request: proof_request.clone(),
                proof_id: None,
            }),
        )
        .with_parties(connection.their_did.clone(), connection.my_did.clone());
        self.exchanges.save(tenant.id(), &record).await?;

        let proposal = self
            .exchanges
            .find_by_thread(tenant.id(), PROPOSAL_MESSAGE_TYPE, &thread_id)
            .await?
            .filter(|proposal| {
                proposal.sender_did == connection.my_did
                    && proposal.recipient_did == connection.their_did
            });
        drop(guard);

        let answer = match proposal {
            Some(candidate) => {
                let proposed: PresentationProposal = message::from_value(&candidate.payload)?;
                presentable(&proposed.presentation_proposal, &proof_request)
                    .map(|values| (candidate, values))
            }
            None => None,
        };

        let (proposal, values) = match answer {
            Some(answer) => answer,
            None => {
                debug!("proof request stored: {} (tenant {})", record.id, tenant.id());
                return Ok(Some(record));
            }
        };

        debug!("proof request matches proposal, presenting: {}", record.id);
        let presentation = self.create_presentation(tenant, &record.id, values).await?;
        self.exchanges.remove(tenant.id(), &proposal.id).await?;
        Ok(Some(presentation))
    }

    async fn create_presentation(
        &self,
        tenant: &Tenant,
        request_id: &str,
        values: Map<String, Value>,
    ) -> Result<ExchangeMessage, ProofError> {
        let no_request = || ProofError::NoApplicableRequest(request_id.to_string());
        let record = self
            .load(tenant, ProofStage::Request, request_id)
            .await?
            .ok_or_else(no_request)?;

        let request = match &record.meta {
            ExchangeMeta::ProofRequest(ProofRequestMeta {
                request,
                proof_id: None,
            }) => request.clone(),
            _ => return Err(no_request()),
        };

        let their_did = record.sender_did.clone().ok_or_else(no_request)?;
        let connection = self.usable_connection(tenant, &their_did).await?;

        let attested = self_attested(&request, &values);
        let blob = self
            .engine
            .create_presentation(tenant.id(), tenant.master_secret_id(), &request, &attested)
            .await?;

        let id = message::generate_id();
        let presentation = Presentation {
            id: id.clone(),
            message_type: PRESENTATION_MESSAGE_TYPE.to_string(),
            thread: Thread::new(record.thread_id.clone()),
            comment: String::new(),
            presentations_attach: vec![Attachment::json(&id, &blob)?],
        };

        let payload = message::to_value(&presentation)?;
        let presented = ExchangeMessage::new(
            id,
            PRESENTATION_MESSAGE_TYPE,
            record.thread_id.clone(),
            payload.clone(),
            ExchangeMeta::Presentation,
        )
        .with_parties(connection.my_did.clone(), connection.their_did.clone());

        let guard = tenant.serialize().await;
        if self
            .load(tenant, ProofStage::Request, request_id)
            .await?
            .is_none()
        {
            return Err(no_request());
        }
        self.exchanges.remove(tenant.id(), request_id).await?;
        drop(guard);

        if let Err(err) = self.send(tenant, &payload, &connection).await {
            warn!("presentation delivery failed, request {} kept: {}", request_id, err);
            self.exchanges.save(tenant.id(), &record).await?;
            return Err(err);
        }

        info!("presentation sent: {} (tenant {})", presented.id, tenant.id());
        Ok(presented)
    }

    async fn receive_presentation(
        &self,
        tenant: &Tenant,
        presentation: Presentation,
        sender_key: &Verkey,
        recipient_key: &Verkey,
    ) -> Result<Option<Proof>, ProofError> {
        let _guard = tenant.serialize().await;

        let connection = match self
            .connections
            .find_by_keys(tenant.id(), sender_key, recipient_key)
            .await?
        {
            Some(connection) => connection,
            None => {
                warn!("presentation without connection dropped (tenant {})", tenant.id());
                return Ok(None);
            }
        };

        let thread_id = &presentation.thread.thid;
        let request = self
            .exchanges
            .find_by_thread(tenant.id(), REQUEST_MESSAGE_TYPE, thread_id)
            .await?
            .filter(|request| request.sender_did == connection.my_did);

        let (request, proof_id) = match request {
            Some(request) => {
                let proof_id = match &request.meta {
                    ExchangeMeta::ProofRequest(ProofRequestMeta {
                        proof_id: Some(proof_id),
                        ..
                    }) => proof_id.clone(),
                    _ => return Ok(None),
                };
                (request, proof_id)
            }
            None => {
                warn!("presentation without applicable request dropped, thread: {}", thread_id);
                return Ok(None);
            }
        };

        let blob: PresentationBlob = Attachment::first(&presentation.presentations_attach)?;
        self.exchanges.remove(tenant.id(), &request.id).await?;

        let mut proof = match self.proofs.get_proof(tenant.id(), &proof_id).await? {
            Some(proof) => proof,
            None => {
                debug!("proof {} was removed, presentation discarded", proof_id);
                return Ok(None);
            }
        };

        proof.receive(blob);
        self.proofs.save_proof(tenant.id(), &proof).await?;

        info!("presentation received for proof {} (tenant {})", proof.id, tenant.id());
        Ok(Some(proof))
    }

    async fn get_proof(&self, tenant: &Tenant, id: &str) -> Result<Proof, ProofError> {
        let mut proof = self
            .proofs
            .get_proof(tenant.id(), id)
            .await?
            .ok_or_else(|| ProofError::NotFound(format!("proof {}", id)))?;

        let verdict = match &proof.presentation {
            Some(presentation) => Some(
                self.engine
                    .verify_presentation(&proof.request, presentation)
                    .await?,
            ),
            None => None,
        };

        if let Some(is_valid) = verdict {
            if proof.is_valid != Some(is_valid) {
                proof.set_verdict(is_valid);
                self.proofs.save_proof(tenant.id(), &proof).await?;
            }
        }

        Ok(proof)
    }

    async fn list_proofs(&self, tenant: &Tenant) -> Result<Vec<Proof>, ProofError> {
        self.proofs.list_proofs(tenant.id()).await
    }

    async fn remove_proof(&self, tenant: &Tenant, id: &str) -> Result<(), ProofError> {
        if self.proofs.get_proof(tenant.id(), id).await?.is_none() {
            return Err(ProofError::NotFound(format!("proof {}", id)));
        }

        self.proofs.remove_proof(tenant.id(), id).await
    }

    async fn list(
        &self,
        tenant: &Tenant,
        stage: ProofStage,
    ) -> Result<Vec<ExchangeMessage>, ProofError> {
        let records = self
            .exchanges
            .list(tenant.id(), Some(stage.message_type()))
            .await?;
        Ok(records)
    }

    async fn get(
        &self,
        tenant: &Tenant,
        stage: ProofStage,
        id: &str,
    ) -> Result<ExchangeMessage, ProofError> {
        self.load(tenant, stage, id)
            .await?
            .ok_or_else(|| ProofError::NotFound(id.to_string()))
    }

    async fn remove(&self, tenant: &Tenant, stage: ProofStage, id: &str) -> Result<(), ProofError> {
        self.get(tenant, stage, id).await?;
        self.exchanges.remove(tenant.id(), id).await?;
        Ok(())
    }

    async fn create_template(
        &self,
        tenant: &Tenant,
        name: String,
        template: String,
    ) -> Result<ProofTemplate, ProofError> {
        if name.trim().is_empty() || template.trim().is_empty() {
            return Err(ProofError::ValidationError(
                "template name and content are required".to_string(),
            ));
        }

        let template = ProofTemplate::new(name, template);
        self.proofs.save_template(tenant.id(), &template).await?;
        Ok(template)
    }

    async fn get_template(&self, tenant: &Tenant, id: &str) -> Result<ProofTemplate, ProofError> {
        self.proofs
            .get_template(tenant.id(), id)
            .await?
            .ok_or_else(|| ProofError::NotFound(format!("proof template {}", id)))
    }

    async fn list_templates(&self, tenant: &Tenant) -> Result<Vec<ProofTemplate>, ProofError> {
        self.proofs.list_templates(tenant.id()).await
    }

    async fn remove_template(&self, tenant: &Tenant, id: &str) -> Result<(), ProofError> {
        self.get_template(tenant, id).await?;
        self.proofs.remove_template(tenant.id(), id).await
    }
}

#[async_trait]
impl<TExchanges, TConnections, TProofs, TLedger, TEngine, TSender> MessageHandler
    for Usecase<TExchanges, TConnections, TProofs, TLedger, TEngine, TSender>
where
    TExchanges: RepoExchangeBuilder,
    TConnections: RepoConnectionBuilder,
    TProofs: RepoProofBuilder,
    TLedger: Ledger,
    TEngine: CredentialEngine,
    TSender: MessageSender,
{
    async fn handle(&self, tenant: &Tenant, inbound: Unpacked) -> Result<(), RouterError> {
        let sender_key = match &inbound.sender_key {
            Some(sender_key) => sender_key,
            None => {
                warn!("anonymous proof message dropped (tenant {})", tenant.id());
                return Ok(());
            }
        };
        let recipient_key = &inbound.recipient_key;

        match message::message_type(&inbound.message) {
            Some(PROPOSAL_MESSAGE_TYPE) => {
                let proposal: PresentationProposal = message::from_value(&inbound.message)?;
                self.receive_proposal(tenant, proposal, sender_key, recipient_key)
                    .await?;
            }
            Some(REQUEST_MESSAGE_TYPE) => {
                let request: RequestPresentation = message::from_value(&inbound.message)?;
                self.receive_request(tenant, request, sender_key, recipient_key)
                    .await?;
            }
            Some(PRESENTATION_MESSAGE_TYPE) => {
                let presentation: Presentation = message::from_value(&inbound.message)?;
                self.receive_presentation(tenant, presentation, sender_key, recipient_key)
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
