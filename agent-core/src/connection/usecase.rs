use rst_common::standard::async_trait::async_trait;
use rst_common::standard::serde_json::{self, Value};
use rst_common::with_logging::log::{debug, info, warn};

use crate::envelope::message;
use crate::envelope::signed::{unwrap_signed_field, verify_signed_field, wrap_signed_field};
use crate::envelope::{Target, Thread, Unpacked};
use crate::keystore::{Did, Pairwise, Verkey};
use crate::ledger::Ledger;
use crate::router::{DeliveryHook, MessageHandler, MessageSender, RouterError};
use crate::tenant::{Domain, Tenant};

use super::connection::Connection;
use super::diddoc::{build_peer_did_doc, didcomm_service, parse_did_with_method, RoutingContext};
use super::messages::{
    ConnectionField, ConnectionRequest, ConnectionResponse, Invitation, INVITATION_MESSAGE_TYPE,
    REQUEST_MESSAGE_TYPE, RESPONSE_MESSAGE_TYPE,
};
use super::types::{
    ConnectionAPI, ConnectionError, ConnectionMeta, ConnectionQuery, Direction, Initiator,
    InvitationOptions, RepoConnectionBuilder, State,
};

/// Role registered for our own identifier when every relationship is written to the ledger
pub const NYM_ROLE_NONE: &str = "NONE";

/// `Usecase` is the connection handshake state machine
///
/// Every read-check-write runs under the tenant's serialization guard, the guard is always
/// released before a message is sent
#[derive(Clone)]
pub struct Usecase<TRepo, TLedger, TSender>
where
    TRepo: RepoConnectionBuilder,
    TLedger: Ledger,
    TSender: MessageSender,
{
    repo: TRepo,
    ledger: TLedger,
    sender: TSender,
    domain: Domain,
    nym_always: bool,
}

impl<TRepo, TLedger, TSender> Usecase<TRepo, TLedger, TSender>
where
    TRepo: RepoConnectionBuilder,
    TLedger: Ledger,
    TSender: MessageSender,
{
    pub fn new(repo: TRepo, ledger: TLedger, sender: TSender, domain: Domain) -> Self {
        Self {
            repo,
            ledger,
            sender,
            domain,
            nym_always: false,
        }
    }

    /// with_nym_always registers both identifiers of every new relationship on the ledger
    pub fn with_nym_always(mut self, nym_always: bool) -> Self {
        self.nym_always = nym_always;
        self
    }

    pub fn repo(&self) -> TRepo {
        self.repo.clone()
    }

    fn routing(&self, tenant: &Tenant) -> RoutingContext {
        RoutingContext {
            tenant_key: tenant.primary_key().to_owned(),
            domain_did: self.domain.did().to_owned(),
            domain_key: self.domain.key().to_owned(),
            endpoint: self.domain.endpoint().to_string(),
        }
    }

    async fn load(&self, tenant: &Tenant, id: &str) -> Result<Connection, ConnectionError> {
        self.repo
            .get(tenant.id(), id)
            .await?
            .ok_or_else(|| ConnectionError::NotFound(id.to_string()))
    }

    async fn send(
        &self,
        tenant: &Tenant,
        message: &Value,
        target: &Target,
    ) -> Result<(), ConnectionError> {
        self.sender
            .send(tenant, message, target)
            .await
            .map_err(|err| ConnectionError::SendError(err.to_string()))
    }

    async fn store_pairwise(
        &self,
        tenant: &Tenant,
        connection: &Connection,
    ) -> Result<(), ConnectionError> {
        let (their_did, my_did) = match (&connection.their_did, &connection.my_did) {
            (Some(their_did), Some(my_did)) => (their_did.to_owned(), my_did.to_owned()),
            _ => {
                return Err(ConnectionError::ProtocolStateError(
                    "pairwise requires both identifiers".to_string(),
                ))
            }
        };

        let their_key = recipient_key(connection.endpoint.as_ref())?;
        let metadata = serde_json::to_value(&connection.meta)
            .map_err(|err| ConnectionError::EntityError(err.to_string()))?;

        tenant
            .store()
            .store_pairwise(Pairwise {
                their_did,
                their_key,
                my_did,
                metadata: Some(metadata),
            })
            .await?;
        Ok(())
    }

    async fn register_identifiers(
        &self,
        tenant: &Tenant,
        connection: &Connection,
    ) -> Result<(), ConnectionError> {
        if !self.nym_always && connection.meta.role.is_none() {
            return Ok(());
        }

        if let Some(their_did) = &connection.their_did {
            let their_key = recipient_key(connection.endpoint.as_ref())?;
            self.ledger
                .register_identifier(
                    tenant.own_did(),
                    their_did,
                    &their_key,
                    connection.meta.role.clone(),
                )
                .await?;
        }

        if self.nym_always {
            if let (Some(my_did), Some(my_key)) = (&connection.my_did, &connection.my_key) {
                self.ledger
                    .register_identifier(
                        tenant.own_did(),
                        my_did,
                        my_key,
                        Some(NYM_ROLE_NONE.to_string()),
                    )
                    .await?;
            }
        }

        Ok(())
    }
}

fn recipient_key(endpoint: Option<&Target>) -> Result<Verkey, ConnectionError> {
    endpoint
        .and_then(|endpoint| endpoint.recipient_keys.first())
        .cloned()
        .ok_or_else(|| ConnectionError::ProtocolStateError("missing recipient key".to_string()))
}

#[async_trait]
impl<TRepo, TLedger, TSender> ConnectionAPI for Usecase<TRepo, TLedger, TSender>
where
    TRepo: RepoConnectionBuilder,
    TLedger: Ledger,
    TSender: MessageSender,
{
    async fn create_invitation(
        &self,
        tenant: &Tenant,
        options: InvitationOptions,
    ) -> Result<Connection, ConnectionError> {
        if options.role.as_deref().is_some_and(str::is_empty) {
            return Err(ConnectionError::ValidationError(
                "role must not be empty".to_string(),
            ));
        }

        let invitation_key = tenant.create_key().await?;
        let invitation = Invitation {
            id: message::generate_id(),
            message_type: INVITATION_MESSAGE_TYPE.to_string(),
            label: Some(options.label.unwrap_or_else(message::generate_id)),
            recipient_keys: vec![invitation_key.clone()],
            routing_keys: self.routing(tenant).routing_keys(),
            service_endpoint: self.domain.endpoint().to_string(),
            attach: options.data,
        };

        let mut connection = Connection::new(Initiator::Me, invitation.label.clone());
        connection.my_key = Some(invitation_key);
        connection.invitation = Some(invitation);
        connection.meta = ConnectionMeta {
            role: options.role,
            auto_respond: options.auto_respond,
            extra: options.meta,
        };
        connection.update_state(State::Invited, Direction::Out);

        self.repo.save(tenant.id(), &connection).await?;
        info!("invitation created: {} (tenant {})", connection.id, tenant.id());
        Ok(connection)
    }

    async fn receive_invitation(
        &self,
        tenant: &Tenant,
        invitation: Invitation,
    ) -> Result<Connection, ConnectionError> {
        let their_key = invitation.recipient_keys.first().cloned().ok_or_else(|| {
            ConnectionError::ValidationError("invitation without recipient keys".to_string())
        })?;

        if invitation.service_endpoint.is_empty() {
            return Err(ConnectionError::ValidationError(
                "invitation without service endpoint".to_string(),
            ));
        }

        let mut connection = Connection::new(Initiator::Other, invitation.label.clone());
        connection.their_key = Some(their_key);
        connection.endpoint = Some(invitation.target());
        connection.invitation = Some(invitation);
        connection.update_state(State::Invited, Direction::In);

        self.repo.save(tenant.id(), &connection).await?;
        debug!("invitation received: {} (tenant {})", connection.id, tenant.id());
        Ok(connection)
    }

    async fn accept_invitation(
        &self,
        tenant: &Tenant,
        invitation: Invitation,
        label: Option<String>,
    ) -> Result<Connection, ConnectionError> {
        let connection = self.receive_invitation(tenant, invitation).await?;
        self.create_request(tenant, &connection.id, label).await
    }

    async fn create_request(
        &self,
        tenant: &Tenant,
        connection_id: &str,
        label: Option<String>,
    ) -> Result<Connection, ConnectionError> {
        let guard = tenant.serialize().await;

        let mut connection = self.load(tenant, connection_id).await?;
        if !connection.is_at(State::Invited, Direction::In) {
            return Err(ConnectionError::ProtocolStateError(format!(
                "connection {} holds no received invitation",
                connection_id
            )));
        }

        let target = connection
            .endpoint
            .as_ref()
            .map(Target::anonymous)
            .ok_or_else(|| ConnectionError::ProtocolStateError("missing endpoint".to_string()))?;

        let (my_did, my_key) = tenant.create_did().await?;
        let did_doc = build_peer_did_doc(&my_did, &my_key, &self.routing(tenant));
        let request = ConnectionRequest {
            id: message::generate_id(),
            message_type: REQUEST_MESSAGE_TYPE.to_string(),
            label: Some(label.unwrap_or_else(message::generate_id)),
            connection: ConnectionField {
                did: did_doc.id.clone(),
                did_doc: did_doc.clone(),
            },
        };

        connection.my_did = Some(my_did);
        connection.my_key = Some(my_key);
        connection.my_did_doc = Some(did_doc);
        connection.thread_id = Some(request.id.clone());
        connection.request = Some(request.clone());
        connection.update_state(State::Requested, Direction::Out);
        self.repo.save(tenant.id(), &connection).await?;
        drop(guard);

        let message = message::to_value(&request)?;
        self.send(tenant, &message, &target).await?;
        Ok(connection)
    }

    async fn receive_request(
        &self,
        tenant: &Tenant,
        request: ConnectionRequest,
        recipient_key: &Verkey,
    ) -> Result<Connection, ConnectionError> {
        let guard = tenant.serialize().await;

        let query = ConnectionQuery {
            state: Some(State::Invited),
            direction: Some(Direction::Out),
            my_key: Some(recipient_key.to_owned()),
            ..Default::default()
        };

        let mut connection = match self.repo.find(tenant.id(), &query).await? {
            Some(connection) => connection,
            None => {
                info!("invalid connection request, no invitation found (tenant {})", tenant.id());
                return Err(ConnectionError::InvalidRequest(
                    "no invitation found".to_string(),
                ));
            }
        };

        let their_did = parse_did_with_method(&request.connection.did)?;
        let endpoint = didcomm_service(&request.connection.did_doc)?;

        connection.their_key = endpoint.recipient_keys.first().cloned();
        connection.their_did = Some(their_did);
        connection.their_did_doc = Some(request.connection.did_doc.clone());
        connection.their_label = request.label.clone();
        connection.endpoint = Some(endpoint);
        connection.thread_id = Some(request.id.clone());
        connection.request = Some(request);
        connection.update_state(State::Requested, Direction::In);
        self.repo.save(tenant.id(), &connection).await?;
        drop(guard);

        if connection.meta.responds_automatically() {
            debug!("responding automatically to connection {}", connection.id);
            return self.create_response(tenant, &connection.id).await;
        }

        Ok(connection)
    }

    async fn create_response(
        &self,
        tenant: &Tenant,
        connection_id: &str,
    ) -> Result<Connection, ConnectionError> {
        let guard = tenant.serialize().await;
        let mut connection = self.load(tenant, connection_id).await?;

        if connection.state == State::Responded {
            let response = connection.response.clone().ok_or_else(|| {
                ConnectionError::ProtocolStateError("missing stored response".to_string())
            })?;
            let target = connection
                .endpoint
                .as_ref()
                .map(Target::anonymous)
                .ok_or_else(|| {
                    ConnectionError::ProtocolStateError("missing endpoint".to_string())
                })?;
            drop(guard);

            debug!("already responded, resending response for {}", connection_id);
            let message = message::to_value(&response)?;
            self.send(tenant, &message, &target).await?;
            return Ok(connection);
        }

        if !connection.is_at(State::Requested, Direction::In) {
            return Err(ConnectionError::ProtocolStateError(format!(
                "connection {} has no request to respond to",
                connection_id
            )));
        }

        let invitation_key = connection.my_key.clone().ok_or_else(|| {
            ConnectionError::ProtocolStateError("missing invitation key".to_string())
        })?;
        let thread_id = connection.thread_id.clone().ok_or_else(|| {
            ConnectionError::ProtocolStateError("missing thread id".to_string())
        })?;

        let (my_did, my_key) = tenant.create_did().await?;
        let did_doc = build_peer_did_doc(&my_did, &my_key, &self.routing(tenant));
        let field = ConnectionField {
            did: did_doc.id.clone(),
            did_doc: did_doc.clone(),
        };
        let connection_sig = wrap_signed_field(tenant.store(), &invitation_key, &field).await?;
        let response = ConnectionResponse {
            id: message::generate_id(),
            message_type: RESPONSE_MESSAGE_TYPE.to_string(),
            thread: Thread::new(thread_id),
            connection_sig,
        };

        let endpoint = connection.endpoint.clone().ok_or_else(|| {
            ConnectionError::ProtocolStateError("missing endpoint".to_string())
        })?;
        let target = endpoint.anonymous();

        connection.my_did = Some(my_did);
        connection.my_key = Some(my_key.clone());
        connection.my_did_doc = Some(did_doc);
        connection.response = Some(response.clone());
        connection.endpoint = Some(endpoint.with_sender(my_key));
        connection.update_state(State::Responded, Direction::Out);
        self.repo.save(tenant.id(), &connection).await?;

        self.register_identifiers(tenant, &connection).await?;
        self.store_pairwise(tenant, &connection).await?;
        drop(guard);

        let message = message::to_value(&response)?;
        self.send(tenant, &message, &target).await?;
        info!("connection responded: {} (tenant {})", connection.id, tenant.id());
        Ok(connection)
    }

    async fn receive_response(
        &self,
        tenant: &Tenant,
        response: ConnectionResponse,
    ) -> Result<Option<Connection>, ConnectionError> {
        let _guard = tenant.serialize().await;

        let query = ConnectionQuery {
            state: Some(State::Requested),
            direction: Some(Direction::Out),
            thread_id: Some(response.thread.thid.clone()),
            ..Default::default()
        };

        let mut connection = match self.repo.find(tenant.id(), &query).await? {
            Some(connection) => connection,
            None => {
                debug!("no applicable connection for response, thread: {}", response.thread.thid);
                return Ok(None);
            }
        };

        let signature = &response.connection_sig;
        let verified = verify_signed_field(signature).unwrap_or(false);
        if !verified || connection.their_key.as_ref() != Some(&signature.signer) {
            warn!("invalid signature on connection response, thread: {}", response.thread.thid);
            return Ok(None);
        }

        let (_, field): (i64, ConnectionField) = unwrap_signed_field(signature)
            .map_err(|err| ConnectionError::ValidationError(err.to_string()))?;

        let their_did = parse_did_with_method(&field.did)?;
        let endpoint = didcomm_service(&field.did_doc)?;
        let my_did: Did = connection.my_did.clone().ok_or_else(|| {
            ConnectionError::ProtocolStateError("missing own identifier".to_string())
        })?;
        let my_key = tenant.key_for_local_did(&my_did).await?;

        connection.their_key = endpoint.recipient_keys.first().cloned();
        connection.their_did = Some(their_did);
        connection.their_did_doc = Some(field.did_doc);
        connection.endpoint = Some(endpoint.with_sender(my_key));
        connection.response = Some(response);
        connection.update_state(State::Complete, Direction::In);
        self.repo.save(tenant.id(), &connection).await?;
        self.store_pairwise(tenant, &connection).await?;

        info!("connection complete: {} (tenant {})", connection.id, tenant.id());
        Ok(Some(connection))
    }

    async fn complete_on_delivery(
        &self,
        tenant: &Tenant,
        their_key: &Verkey,
        my_key: &Verkey,
    ) -> Result<Option<Connection>, ConnectionError> {
        let _guard = tenant.serialize().await;

        match self.repo.find_by_keys(tenant.id(), their_key, my_key).await? {
            Some(mut connection) if connection.state == State::Responded => {
                debug!("authenticated delivery, completing connection {}", connection.id);
                connection.update_state(State::Complete, Direction::In);
                self.repo.save(tenant.id(), &connection).await?;
                Ok(Some(connection))
            }
            _ => Ok(None),
        }
    }

    async fn get_connection(
        &self,
        tenant: &Tenant,
        connection_id: &str,
    ) -> Result<Connection, ConnectionError> {
        self.load(tenant, connection_id).await
    }

    async fn list_connections(
        &self,
        tenant: &Tenant,
        state: Option<State>,
    ) -> Result<Vec<Connection>, ConnectionError> {
        self.repo.list(tenant.id(), state).await
    }

    async fn remove_connection(
        &self,
        tenant: &Tenant,
        connection_id: &str,
    ) -> Result<(), ConnectionError> {
        self.load(tenant, connection_id).await?;
        self.repo.remove(tenant.id(), connection_id).await
    }
}

#[async_trait]
impl<TRepo, TLedger, TSender> MessageHandler for Usecase<TRepo, TLedger, TSender>
where
    TRepo: RepoConnectionBuilder,
    TLedger: Ledger,
    TSender: MessageSender,
{
    async fn handle(&self, tenant: &Tenant, inbound: Unpacked) -> Result<(), RouterError> {
        match message::message_type(&inbound.message) {
            Some(INVITATION_MESSAGE_TYPE) => {
                let invitation: Invitation = message::from_value(&inbound.message)?;
                self.receive_invitation(tenant, invitation).await?;
            }
            Some(REQUEST_MESSAGE_TYPE) => {
                let request: ConnectionRequest = message::from_value(&inbound.message)?;
                self.receive_request(tenant, request, &inbound.recipient_key)
                    .await?;
            }
            Some(RESPONSE_MESSAGE_TYPE) => {
                let response: ConnectionResponse = message::from_value(&inbound.message)?;
                self.receive_response(tenant, response).await?;
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

#[async_trait]
impl<TRepo, TLedger, TSender> DeliveryHook for Usecase<TRepo, TLedger, TSender>
where
    TRepo: RepoConnectionBuilder,
    TLedger: Ledger,
    TSender: MessageSender,
{
    async fn on_authenticated_delivery(
        &self,
        tenant: &Tenant,
        their_key: &Verkey,
        my_key: &Verkey,
    ) -> Result<(), RouterError> {
        self.complete_on_delivery(tenant, their_key, my_key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::mock;

    use std::sync::{Arc, Mutex};

    use rst_common::standard::serde::de::DeserializeOwned;
    use rst_common::with_tokio::tokio;

    use crate::connection::MemoryConnections;
    use crate::envelope::SignedField;
    use crate::keystore::MemoryStore;
    use crate::ledger::MemoryLedger;
    use crate::tenant::{MemoryRoutes, RoutingTable, TenantID};

    mock!(
        FakeSender{}

        impl Clone for FakeSender {
            fn clone(&self) -> Self;
        }

        #[async_trait]
        impl MessageSender for FakeSender {
            async fn send(
                &self,
                tenant: &Tenant,
                message: &Value,
                target: &Target,
            ) -> Result<(), RouterError>;
        }
    );

    type Outbox = Arc<Mutex<Vec<(Value, Target)>>>;

    fn recording_sender(outbox: Outbox) -> MockFakeSender {
        let mut sender = MockFakeSender::new();
        sender.expect_send().returning(move |_, message, target| {
            outbox
                .lock()
                .unwrap()
                .push((message.to_owned(), target.to_owned()));
            Ok(())
        });
        sender
    }

    async fn tenant(name: &str, routes: Arc<MemoryRoutes>) -> Tenant {
        Tenant::provision(
            TenantID::from(name.to_string()),
            Arc::new(MemoryStore::new()),
            routes,
        )
        .await
        .unwrap()
    }

    async fn domain() -> Domain {
        Domain::provision(Arc::new(MemoryStore::new()), "local://agent".to_string())
            .await
            .unwrap()
    }

    fn last_message<T: DeserializeOwned>(outbox: &Outbox) -> (T, Target) {
        let (message, target) = outbox.lock().unwrap().last().cloned().unwrap();
        (message::from_value(&message).unwrap(), target)
    }

    #[tokio::test]
    async fn test_create_invitation() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes.clone()).await;
        let domain = domain().await;

        let usecase = Usecase::new(
            MemoryConnections::new(),
            MemoryLedger::new(),
            MockFakeSender::new(),
            domain.clone(),
        );

        let connection = usecase
            .create_invitation(
                &alice,
                InvitationOptions {
                    label: Some("alice".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(connection.is_at(State::Invited, Direction::Out));
        assert_eq!(connection.get_initiator(), Initiator::Me);

        let invitation = connection.get_invitation().unwrap();
        assert_eq!(invitation.label, Some("alice".to_string()));
        assert_eq!(
            invitation.routing_keys,
            vec![alice.primary_key().to_owned(), domain.key().to_owned()]
        );
        assert_eq!(invitation.service_endpoint, "local://agent");

        let invitation_key = &invitation.recipient_keys[0];
        assert_eq!(connection.get_my_key(), Some(invitation_key));

        let routed = routes.lookup(invitation_key).await.unwrap();
        assert_eq!(routed, Some(alice.id().to_owned()))
    }

    #[tokio::test]
    async fn test_create_invitation_rejects_empty_role() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes).await;

        let usecase = Usecase::new(
            MemoryConnections::new(),
            MemoryLedger::new(),
            MockFakeSender::new(),
            domain().await,
        );

        let result = usecase
            .create_invitation(
                &alice,
                InvitationOptions {
                    role: Some("".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(
            result.unwrap_err(),
            ConnectionError::ValidationError(_)
        ))
    }

    #[tokio::test]
    async fn test_handshake_with_role_responds_and_registers() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes.clone()).await;
        let bob = tenant("bob", routes).await;
        let domain = domain().await;
        let ledger = MemoryLedger::new();
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));

        let usecase = Usecase::new(
            MemoryConnections::new(),
            ledger.clone(),
            recording_sender(outbox.clone()),
            domain,
        );

        let invitation = usecase
            .create_invitation(
                &alice,
                InvitationOptions {
                    role: Some("TRUST_ANCHOR".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let invitation_message = invitation.get_invitation().unwrap().clone();
        let invitation_key = invitation_message.recipient_keys[0].clone();

        let requester = usecase
            .accept_invitation(&bob, invitation_message, Some("bob".to_string()))
            .await
            .unwrap();
        assert!(requester.is_at(State::Requested, Direction::Out));

        let (request, target): (ConnectionRequest, Target) = last_message(&outbox);
        assert!(target.sender_key.is_none());
        assert_eq!(target.recipient_keys, vec![invitation_key.clone()]);
        assert_eq!(requester.get_thread_id(), Some(&request.id));

        let inviter = usecase
            .receive_request(&alice, request, &invitation_key)
            .await
            .unwrap();
        assert!(inviter.is_at(State::Responded, Direction::Out));
        assert_eq!(inviter.get_their_did(), requester.get_my_did());
        assert_eq!(inviter.get_their_key(), requester.get_my_key());

        let identifiers = ledger.identifiers().await;
        assert_eq!(identifiers.len(), 1);
        assert_eq!(identifiers[0].role, Some("TRUST_ANCHOR".to_string()));
        assert_eq!(Some(&identifiers[0].did), requester.get_my_did());

        let (response, target): (ConnectionResponse, Target) = last_message(&outbox);
        assert!(target.sender_key.is_none());
        assert_eq!(response.connection_sig.signer, invitation_key);

        let complete = usecase
            .receive_response(&bob, response)
            .await
            .unwrap()
            .unwrap();
        assert!(complete.is_at(State::Complete, Direction::In));
        assert_eq!(complete.get_their_key(), inviter.get_my_key());
        assert_eq!(
            complete.get_endpoint().and_then(|endpoint| endpoint.sender_key.as_ref()),
            complete.get_my_key()
        );

        let pairwise = bob
            .store()
            .get_pairwise(inviter.get_my_did().unwrap())
            .await
            .unwrap();
        assert!(pairwise.is_some())
    }

    #[tokio::test]
    async fn test_receive_request_without_invitation() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes.clone()).await;
        let bob = tenant("bob", routes).await;
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));

        let usecase = Usecase::new(
            MemoryConnections::new(),
            MemoryLedger::new(),
            recording_sender(outbox.clone()),
            domain().await,
        );

        let invitation = usecase
            .create_invitation(&alice, InvitationOptions::default())
            .await
            .unwrap();
        usecase
            .accept_invitation(&bob, invitation.get_invitation().unwrap().clone(), None)
            .await
            .unwrap();

        let (request, _): (ConnectionRequest, Target) = last_message(&outbox);
        let unknown_key = alice.create_key().await.unwrap();
        let result = usecase.receive_request(&alice, request, &unknown_key).await;
        assert!(matches!(
            result.unwrap_err(),
            ConnectionError::InvalidRequest(_)
        ))
    }

    #[tokio::test]
    async fn test_manual_response_and_resend() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes.clone()).await;
        let bob = tenant("bob", routes).await;
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));

        let usecase = Usecase::new(
            MemoryConnections::new(),
            MemoryLedger::new(),
            recording_sender(outbox.clone()),
            domain().await,
        );

        let invitation = usecase
            .create_invitation(&alice, InvitationOptions::default())
            .await
            .unwrap();
        let invitation_key = invitation.get_my_key().unwrap().clone();
        usecase
            .accept_invitation(&bob, invitation.get_invitation().unwrap().clone(), None)
            .await
            .unwrap();

        let (request, _): (ConnectionRequest, Target) = last_message(&outbox);
        let requested = usecase
            .receive_request(&alice, request, &invitation_key)
            .await
            .unwrap();
        assert!(requested.is_at(State::Requested, Direction::In));
        assert_eq!(outbox.lock().unwrap().len(), 1);

        let responded = usecase
            .create_response(&alice, requested.get_id())
            .await
            .unwrap();
        assert!(responded.is_at(State::Responded, Direction::Out));
        let (first, _): (Value, Target) = last_message(&outbox);

        let resent = usecase
            .create_response(&alice, requested.get_id())
            .await
            .unwrap();
        let (second, _): (Value, Target) = last_message(&outbox);

        assert_eq!(first, second);
        assert_eq!(resent.get_my_did(), responded.get_my_did());
        assert_eq!(resent.get_my_key(), responded.get_my_key());
        assert_eq!(outbox.lock().unwrap().len(), 3)
    }

    #[tokio::test]
    async fn test_create_response_in_wrong_state() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes).await;

        let usecase = Usecase::new(
            MemoryConnections::new(),
            MemoryLedger::new(),
            MockFakeSender::new(),
            domain().await,
        );

        let invitation = usecase
            .create_invitation(&alice, InvitationOptions::default())
            .await
            .unwrap();

        let result = usecase.create_response(&alice, invitation.get_id()).await;
        assert!(matches!(
            result.unwrap_err(),
            ConnectionError::ProtocolStateError(_)
        ));

        let result = usecase.create_response(&alice, "unknown").await;
        assert!(matches!(result.unwrap_err(), ConnectionError::NotFound(_)))
    }

    #[tokio::test]
    async fn test_tampered_response_is_dropped() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes.clone()).await;
        let bob = tenant("bob", routes).await;
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));

        let usecase = Usecase::new(
            MemoryConnections::new(),
            MemoryLedger::new(),
            recording_sender(outbox.clone()),
            domain().await,
        );

        let invitation = usecase
            .create_invitation(
                &alice,
                InvitationOptions {
                    auto_respond: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let invitation_key = invitation.get_my_key().unwrap().clone();
        let requester = usecase
            .accept_invitation(&bob, invitation.get_invitation().unwrap().clone(), None)
            .await
            .unwrap();

        let (request, _): (ConnectionRequest, Target) = last_message(&outbox);
        usecase
            .receive_request(&alice, request, &invitation_key)
            .await
            .unwrap();
        let (response, _): (ConnectionResponse, Target) = last_message(&outbox);

        let mut forged = response.clone();
        let impostor = alice.create_key().await.unwrap();
        let field: (i64, ConnectionField) = unwrap_signed_field(&response.connection_sig).unwrap();
        let signed: SignedField = wrap_signed_field(alice.store(), &impostor, &field.1)
            .await
            .unwrap();
        forged.connection_sig = signed;

        let before = usecase.get_connection(&bob, requester.get_id()).await.unwrap();
        let dropped = usecase.receive_response(&bob, forged).await.unwrap();
        assert!(dropped.is_none());

        let after = usecase.get_connection(&bob, requester.get_id()).await.unwrap();
        assert_eq!(before.get_state(), after.get_state());
        assert_eq!(before.get_their_key(), after.get_their_key());

        let mut unknown_thread = response;
        unknown_thread.thread = Thread::new("unknown");
        assert!(usecase
            .receive_response(&bob, unknown_thread)
            .await
            .unwrap()
            .is_none())
    }

    #[tokio::test]
    async fn test_complete_on_delivery_only_from_responded() {
        let routes = Arc::new(MemoryRoutes::new());
        let alice = tenant("alice", routes.clone()).await;
        let bob = tenant("bob", routes).await;
        let outbox: Outbox = Arc::new(Mutex::new(Vec::new()));

        let usecase = Usecase::new(
            MemoryConnections::new(),
            MemoryLedger::new(),
            recording_sender(outbox.clone()),
            domain().await,
        );

        let invitation = usecase
            .create_invitation(
                &alice,
                InvitationOptions {
                    auto_respond: true,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let invitation_key = invitation.get_my_key().unwrap().clone();
        usecase
            .accept_invitation(&bob, invitation.get_invitation().unwrap().clone(), None)
            .await
            .unwrap();

        let (request, _): (ConnectionRequest, Target) = last_message(&outbox);
        let responded = usecase
            .receive_request(&alice, request, &invitation_key)
            .await
            .unwrap();

        let my_key = responded.get_my_key().unwrap().clone();
        let their_key = responded.get_their_key().unwrap().clone();

        let unrelated = usecase
            .complete_on_delivery(&alice, &my_key, &their_key)
            .await
            .unwrap();
        assert!(unrelated.is_none());

        let completed = usecase
            .complete_on_delivery(&alice, &their_key, &my_key)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(completed.get_state(), State::Complete);

        let again = usecase
            .complete_on_delivery(&alice, &their_key, &my_key)
            .await
            .unwrap();
        assert!(again.is_none())
    }
}
