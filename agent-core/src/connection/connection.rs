use rst_common::standard::chrono::serde::ts_seconds;
use rst_common::standard::chrono::{DateTime, Utc};
use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json;
use rst_common::standard::uuid::Uuid;

use rstdev_domain::entity::ToJSON;
use rstdev_domain::BaseError;

use crate::envelope::Target;
use crate::keystore::{Did, Verkey};

use super::diddoc::DidDoc;
use super::messages::{ConnectionRequest, ConnectionResponse, Invitation};
use super::types::{ConnectionError, ConnectionMeta, Direction, Initiator, State};

/// Connection is a relationship with one remote party, owned by a single tenant
///
/// Only the connection state machine mutates it. `my_key` starts as the invitation key on the
/// inviter side and is replaced by the pairwise key once the response is created
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct Connection {
    pub(crate) id: String,
    pub(crate) label: Option<String>,
    pub(crate) initiator: Initiator,
    pub(crate) state: State,
    pub(crate) state_direction: Option<Direction>,
    pub(crate) thread_id: Option<String>,

    pub(crate) invitation: Option<Invitation>,
    pub(crate) request: Option<ConnectionRequest>,
    pub(crate) response: Option<ConnectionResponse>,

    pub(crate) my_did: Option<Did>,
    pub(crate) my_key: Option<Verkey>,
    pub(crate) my_did_doc: Option<DidDoc>,

    pub(crate) their_did: Option<Did>,
    pub(crate) their_key: Option<Verkey>,
    pub(crate) their_did_doc: Option<DidDoc>,
    pub(crate) their_label: Option<String>,

    pub(crate) endpoint: Option<Target>,
    pub(crate) meta: ConnectionMeta,

    #[serde(with = "ts_seconds")]
    pub(crate) created_at: DateTime<Utc>,

    #[serde(with = "ts_seconds")]
    pub(crate) updated_at: DateTime<Utc>,
}

impl Connection {
    pub fn new(initiator: Initiator, label: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            label,
            initiator,
            state: State::Null,
            state_direction: None,
            thread_id: None,
            invitation: None,
            request: None,
            response: None,
            my_did: None,
            my_key: None,
            my_did_doc: None,
            their_did: None,
            their_key: None,
            their_did_doc: None,
            their_label: None,
            endpoint: None,
            meta: ConnectionMeta::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_state(&mut self, state: State, direction: Direction) {
        self.state = state;
        self.state_direction = Some(direction);
        self.updated_at = Utc::now();
    }

    /// is_at matches both the state and the direction of the last step
    pub fn is_at(&self, state: State, direction: Direction) -> bool {
        self.state == state && self.state_direction == Some(direction)
    }

    pub fn get_id(&self) -> &str {
        &self.id
    }

    pub fn get_label(&self) -> Option<&String> {
        self.label.as_ref()
    }

    pub fn get_initiator(&self) -> Initiator {
        self.initiator
    }

    pub fn get_state(&self) -> State {
        self.state
    }

    pub fn get_state_direction(&self) -> Option<Direction> {
        self.state_direction
    }

    pub fn get_thread_id(&self) -> Option<&String> {
        self.thread_id.as_ref()
    }

    pub fn get_invitation(&self) -> Option<&Invitation> {
        self.invitation.as_ref()
    }

    pub fn get_request(&self) -> Option<&ConnectionRequest> {
        self.request.as_ref()
    }

    pub fn get_response(&self) -> Option<&ConnectionResponse> {
        self.response.as_ref()
    }

    pub fn get_my_did(&self) -> Option<&Did> {
        self.my_did.as_ref()
    }

    pub fn get_my_key(&self) -> Option<&Verkey> {
        self.my_key.as_ref()
    }

    pub fn get_my_did_doc(&self) -> Option<&DidDoc> {
        self.my_did_doc.as_ref()
    }

    pub fn get_their_did(&self) -> Option<&Did> {
        self.their_did.as_ref()
    }

    pub fn get_their_key(&self) -> Option<&Verkey> {
        self.their_key.as_ref()
    }

    pub fn get_their_did_doc(&self) -> Option<&DidDoc> {
        self.their_did_doc.as_ref()
    }

    pub fn get_their_label(&self) -> Option<&String> {
        self.their_label.as_ref()
    }

    pub fn get_endpoint(&self) -> Option<&Target> {
        self.endpoint.as_ref()
    }

    pub fn get_meta(&self) -> &ConnectionMeta {
        &self.meta
    }

    pub fn get_created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn get_updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// target is the authenticated delivery target of a completed relationship
    pub fn target(&self) -> Result<Target, ConnectionError> {
        let endpoint = self.endpoint.as_ref().ok_or_else(|| {
            ConnectionError::ProtocolStateError(format!("connection {} has no endpoint", self.id))
        })?;

        if endpoint.sender_key.is_none() {
            return Err(ConnectionError::ProtocolStateError(format!(
                "connection {} is not established",
                self.id
            )));
        }

        Ok(endpoint.to_owned())
    }
}

impl ToJSON for Connection {
    fn to_json(&self) -> Result<String, BaseError> {
        serde_json::to_string(self).map_err(|e| BaseError::ToJSONError(e.to_string()))
    }
}

impl TryInto<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_into(self) -> Result<Vec<u8>, Self::Error> {
        serde_json::to_vec(&self).map_err(|e| ConnectionError::EntityError(e.to_string()))
    }
}

impl TryFrom<Vec<u8>> for Connection {
    type Error = ConnectionError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        serde_json::from_slice(&bytes).map_err(|e| ConnectionError::EntityError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::Value;

    #[test]
    fn test_wire_state_names() {
        let mut connection = Connection::new(Initiator::Me, Some("alice".to_string()));
        connection.update_state(State::Invited, Direction::Out);

        let json = connection.to_json();
        assert!(!json.is_err());

        let value: Value = serde_json::from_str(&json.unwrap()).unwrap();
        assert_eq!(value["state"], "INVITED");
        assert_eq!(value["stateDirection"], "OUT");
        assert_eq!(value["initiator"], "ME");
        assert!(value["createdAt"].is_i64())
    }

    #[test]
    fn test_bytes_roundtrip_keeps_state() {
        let mut connection = Connection::new(Initiator::Other, None);
        connection.update_state(State::Requested, Direction::In);
        connection.their_key = Some(Verkey::from("TheirKey".to_string()));

        let bytes: Result<Vec<u8>, _> = connection.clone().try_into();
        assert!(!bytes.is_err());

        let restored = Connection::try_from(bytes.unwrap()).unwrap();
        assert!(restored.is_at(State::Requested, Direction::In));
        assert_eq!(restored.get_their_key(), connection.get_their_key())
    }

    #[test]
    fn test_target_requires_sender_key() {
        let mut connection = Connection::new(Initiator::Me, None);
        assert!(matches!(
            connection.target().unwrap_err(),
            ConnectionError::ProtocolStateError(_)
        ));

        connection.endpoint = Some(Target::new(
            vec![Verkey::from("TheirKey".to_string())],
            vec![],
            "local://agent".to_string(),
        ));
        assert!(connection.target().is_err());

        connection.endpoint = connection
            .endpoint
            .map(|endpoint| endpoint.with_sender(Verkey::from("MyKey".to_string())));
        assert!(!connection.target().is_err())
    }
}
