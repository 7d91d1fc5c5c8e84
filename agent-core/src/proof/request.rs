use std::collections::BTreeMap;

use rand_core::{OsRng, RngCore};

use rst_common::standard::serde::{self, Deserialize, Serialize};

const NONCE_BYTES: usize = 8;

/// Restriction limits which credentials may satisfy a requested attribute or predicate
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Restriction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
}

impl Restriction {
    pub fn definition(cred_def_id: &str) -> Self {
        Self {
            cred_def_id: Some(cred_def_id.to_string()),
            schema_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RequestedAttribute {
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RequestedPredicate {
    pub name: String,
    pub p_type: String,
    pub p_value: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<Restriction>,
}

/// ProofRequest is what the verifier asks for, attributes and predicates keyed by referent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct ProofRequest {
    pub name: String,
    pub version: String,

    #[serde(default)]
    pub nonce: String,

    #[serde(default)]
    pub requested_attributes: BTreeMap<String, RequestedAttribute>,

    #[serde(default)]
    pub requested_predicates: BTreeMap<String, RequestedPredicate>,
}

impl ProofRequest {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            nonce: String::new(),
            requested_attributes: BTreeMap::new(),
            requested_predicates: BTreeMap::new(),
        }
    }

    /// ensure_nonce generates a nonce unless the request already carries one
    pub fn ensure_nonce(&mut self) {
        if self.nonce.is_empty() {
            self.nonce = generate_nonce();
        }
    }
}

/// generate_nonce joins the decimal values of eight random bytes
pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| byte.to_string()).collect()
}
