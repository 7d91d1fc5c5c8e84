use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;
use rst_common::with_logging::log::warn;

use crate::envelope::Target;
use crate::keystore::{Did, Verkey};

use super::types::ConnectionError;

pub const DID_DOC_CONTEXT: &str = "https://w3id.org/did/v1";
pub const DID_PEER_METHOD: &str = "did:peer";
pub const KEY_TYPE_ED25519: &str = "Ed25519VerificationKey2018";
pub const SERVICE_TYPE_DIDCOMM: &str = "did-communication";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PublicKey {
    pub id: String,
    #[serde(rename = "type")]
    pub key_type: String,
    pub controller: String,
    #[serde(rename = "publicKeyBase58")]
    pub public_key_base58: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde", rename_all = "camelCase")]
pub struct Service {
    pub id: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub priority: i64,
    pub recipient_keys: Vec<String>,
    #[serde(default)]
    pub routing_keys: Vec<String>,
    pub service_endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct DidDoc {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "publicKey")]
    pub public_key: Vec<PublicKey>,
    #[serde(default)]
    pub authentication: Vec<Value>,
    pub service: Vec<Service>,
}

/// RoutingContext holds the keys every peer document routes through: the tenant's primary key
/// and the agent domain key, plus the shared service endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingContext {
    pub tenant_key: Verkey,
    pub domain_did: Did,
    pub domain_key: Verkey,
    pub endpoint: String,
}

impl RoutingContext {
    pub fn routing_keys(&self) -> Vec<Verkey> {
        vec![self.tenant_key.to_owned(), self.domain_key.to_owned()]
    }
}

fn peer_did(did: &Did) -> String {
    format!("{}:{}", DID_PEER_METHOD, did)
}

fn ed25519_key(id: &str, controller: String, key: &Verkey) -> PublicKey {
    PublicKey {
        id: id.to_string(),
        key_type: KEY_TYPE_ED25519.to_string(),
        controller,
        public_key_base58: key.to_string(),
    }
}

/// build_peer_did_doc describes `did` with `recipient_key` as key `1`, the tenant key as `2`
/// and the domain key as `3`
pub fn build_peer_did_doc(did: &Did, recipient_key: &Verkey, routing: &RoutingContext) -> DidDoc {
    let id = peer_did(did);

    DidDoc {
        context: DID_DOC_CONTEXT.to_string(),
        id: id.clone(),
        public_key: vec![
            ed25519_key("1", id.clone(), recipient_key),
            ed25519_key("2", id.clone(), &routing.tenant_key),
            ed25519_key("3", peer_did(&routing.domain_did), &routing.domain_key),
        ],
        authentication: Vec::new(),
        service: vec![Service {
            id: format!("{};{}", id, SERVICE_TYPE_DIDCOMM),
            service_type: SERVICE_TYPE_DIDCOMM.to_string(),
            priority: 0,
            recipient_keys: vec![format!("{}#1", id)],
            routing_keys: vec![format!("{}#2", id), format!("{}#3", id)],
            service_endpoint: routing.endpoint.to_owned(),
        }],
    }
}

/// parse_did_with_method strips the method prefix, only `did:peer` is supported
pub fn parse_did_with_method(did: &str) -> Result<Did, ConnectionError> {
    let prefix = format!("{}:", DID_PEER_METHOD);
    match did.strip_prefix(&prefix) {
        Some(id) if !id.is_empty() => Ok(Did::from(id.to_string())),
        _ => {
            warn!("unsupported did method: {}", did);
            Err(ConnectionError::InvalidDidDoc(format!(
                "unsupported did method: {}",
                did
            )))
        }
    }
}

/// resolve_did_key turns a `did#id` reference into the referenced key, raw keys pass through
pub fn resolve_did_key(reference: &str, doc: &DidDoc) -> Result<Verkey, ConnectionError> {
    let key_id = match reference.split_once('#') {
        Some((_, key_id)) => key_id,
        None if !reference.starts_with("did:") => return Ok(Verkey::from(reference.to_string())),
        None => {
            return Err(ConnectionError::InvalidDidDoc(format!(
                "did does not specify key id: {}",
                reference
            )))
        }
    };

    let key = doc
        .public_key
        .iter()
        .find(|key| key.id == key_id || key.id.ends_with(&format!("#{}", key_id)))
        .ok_or_else(|| ConnectionError::InvalidDidDoc(format!("unknown key: {}", reference)))?;

    if key.key_type != KEY_TYPE_ED25519 {
        return Err(ConnectionError::InvalidDidDoc(format!(
            "unsupported key type: {}",
            key.key_type
        )));
    }

    Ok(Verkey::from(key.public_key_base58.to_owned()))
}

/// didcomm_service extracts the delivery target of the lowest priority `did-communication` service
pub fn didcomm_service(doc: &DidDoc) -> Result<Target, ConnectionError> {
    let service = doc
        .service
        .iter()
        .filter(|service| service.service_type == SERVICE_TYPE_DIDCOMM)
        .min_by_key(|service| service.priority)
        .ok_or_else(|| ConnectionError::InvalidDidDoc("missing didcomm service".to_string()))?;

    if service.service_endpoint.starts_with("did:") {
        return Err(ConnectionError::InvalidDidDoc(
            "did as service endpoint is unsupported".to_string(),
        ));
    }

    let recipient_keys = service
        .recipient_keys
        .iter()
        .map(|reference| resolve_did_key(reference, doc))
        .collect::<Result<Vec<_>, _>>()?;

    if recipient_keys.is_empty() {
        return Err(ConnectionError::InvalidDidDoc(
            "service without recipient keys".to_string(),
        ));
    }

    let routing_keys = service
        .routing_keys
        .iter()
        .map(|reference| resolve_did_key(reference, doc))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Target::new(
        recipient_keys,
        routing_keys,
        service.service_endpoint.to_owned(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use table_test::table_test;

    fn routing() -> RoutingContext {
        RoutingContext {
            tenant_key: Verkey::from("TenantKey".to_string()),
            domain_did: Did::from("DomainDid".to_string()),
            domain_key: Verkey::from("DomainKey".to_string()),
            endpoint: "https://agent.example.com/indy".to_string(),
        }
    }

    #[test]
    fn test_build_and_extract_service() {
        let did = Did::from("MyDid".to_string());
        let key = Verkey::from("MyKey".to_string());
        let doc = build_peer_did_doc(&did, &key, &routing());

        assert_eq!(doc.id, "did:peer:MyDid");
        assert_eq!(doc.public_key[2].controller, "did:peer:DomainDid");

        let target = didcomm_service(&doc).unwrap();
        assert_eq!(target.recipient_keys, vec![key]);
        assert_eq!(target.routing_keys, routing().routing_keys());
        assert_eq!(target.service_endpoint, "https://agent.example.com/indy");
        assert!(target.sender_key.is_none())
    }

    #[test]
    fn test_lowest_priority_service_wins() {
        let did = Did::from("MyDid".to_string());
        let mut doc = build_peer_did_doc(&did, &Verkey::from("MyKey".to_string()), &routing());

        let mut preferred = doc.service[0].clone();
        preferred.priority = -1;
        preferred.recipient_keys = vec!["RawKey".to_string()];
        preferred.routing_keys = vec![];
        doc.service.push(preferred);

        let target = didcomm_service(&doc).unwrap();
        assert_eq!(target.recipient_keys, vec![Verkey::from("RawKey".to_string())]);
        assert!(target.routing_keys.is_empty())
    }

    #[test]
    fn test_did_service_endpoint_rejected() {
        let did = Did::from("MyDid".to_string());
        let mut doc = build_peer_did_doc(&did, &Verkey::from("MyKey".to_string()), &routing());
        doc.service[0].service_endpoint = "did:sov:abc".to_string();

        assert!(matches!(
            didcomm_service(&doc).unwrap_err(),
            ConnectionError::InvalidDidDoc(_)
        ))
    }

    #[test]
    fn test_parse_did_with_method() {
        let table = vec![
            ("did:peer:abc", Some("abc")),
            ("did:sov:abc", None),
            ("did:peer:", None),
            ("abc", None),
        ];

        for (validator, input, expected) in table_test!(table) {
            let parsed = parse_did_with_method(input).ok();

            validator
                .given(input)
                .when("parse did with method")
                .then("strips the peer method")
                .assert_eq(expected.map(|did| Did::from(did.to_string())), parsed);
        }
    }

    #[test]
    fn test_resolve_did_key() {
        let did = Did::from("MyDid".to_string());
        let doc = build_peer_did_doc(&did, &Verkey::from("MyKey".to_string()), &routing());

        let table = vec![
            ("did:peer:MyDid#1", Some("MyKey")),
            ("did:peer:MyDid#3", Some("DomainKey")),
            ("RawKey", Some("RawKey")),
            ("did:peer:MyDid", None),
            ("did:peer:MyDid#9", None),
        ];

        for (validator, input, expected) in table_test!(table) {
            let resolved = resolve_did_key(input, &doc).ok();

            validator
                .given(input)
                .when("resolve did key")
                .then("returns the referenced key")
                .assert_eq(expected.map(|key| Verkey::from(key.to_string())), resolved);
        }
    }
}
