use rst_common::standard::serde::{self, Deserialize, Serialize};
use rst_common::standard::serde_json::Value;

use crate::envelope::{Attachment, Thread};

use super::request::{ProofRequest, RequestedAttribute, RequestedPredicate, Restriction};

pub const PROPOSAL_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/propose-presentation";
pub const PREVIEW_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/presentation-preview";
pub const REQUEST_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/request-presentation";
pub const PRESENTATION_MESSAGE_TYPE: &str =
    "did:sov:BzCbsNYhMrjHiqZDTUASHg;spec/present-proof/1.0/presentation";

pub fn message_types() -> [&'static str; 3] {
    [
        PROPOSAL_MESSAGE_TYPE,
        REQUEST_MESSAGE_TYPE,
        PRESENTATION_MESSAGE_TYPE,
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PreviewAttribute {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,

    #[serde(rename = "mime-type", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PreviewPredicate {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,

    pub predicate: String,
    pub threshold: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PresentationPreview {
    #[serde(rename = "@type")]
    pub preview_type: String,

    #[serde(default)]
    pub attributes: Vec<PreviewAttribute>,

    #[serde(default)]
    pub predicates: Vec<PreviewPredicate>,
}

type AttributeShape = (String, Vec<Restriction>);
type PredicateShape = (String, Vec<Restriction>, String, i64);

fn restrictions(cred_def_id: &Option<String>) -> Vec<Restriction> {
    cred_def_id
        .as_deref()
        .map(|id| vec![Restriction::definition(id)])
        .unwrap_or_default()
}

impl PresentationPreview {
    pub fn new(attributes: Vec<PreviewAttribute>, predicates: Vec<PreviewPredicate>) -> Self {
        Self {
            preview_type: PREVIEW_TYPE.to_string(),
            attributes,
            predicates,
        }
    }

    /// to_request transcodes the preview into a request, restrictions become their
    /// structured form and referents are numbered in preview order
    pub fn to_request(&self, name: &str, version: &str) -> ProofRequest {
        let mut request = ProofRequest::new(name, version);

        for (index, attribute) in self.attributes.iter().enumerate() {
            request.requested_attributes.insert(
                format!("attr_{}", index),
                RequestedAttribute {
                    name: attribute.name.clone(),
                    restrictions: restrictions(&attribute.cred_def_id),
                },
            );
        }

        for (index, predicate) in self.predicates.iter().enumerate() {
            request.requested_predicates.insert(
                format!("predicate_{}", index),
                RequestedPredicate {
                    name: predicate.name.clone(),
                    p_type: predicate.predicate.clone(),
                    p_value: predicate.threshold,
                    restrictions: restrictions(&predicate.cred_def_id),
                },
            );
        }

        request
    }

    /// matches_request compares the restriction structure only: the same attribute names
    /// with the same definition restrictions, the same predicates with operator and threshold
    pub fn matches_request(&self, request: &ProofRequest) -> bool {
        let mut proposed_attributes: Vec<AttributeShape> = self
            .attributes
            .iter()
            .map(|attr| (attr.name.clone(), restrictions(&attr.cred_def_id)))
            .collect();
        let mut requested_attributes: Vec<AttributeShape> = request
            .requested_attributes
            .values()
            .map(|attr| {
                let mut restrictions = attr.restrictions.clone();
                restrictions.sort();
                (attr.name.clone(), restrictions)
            })
            .collect();

        let mut proposed_predicates: Vec<PredicateShape> = self
            .predicates
            .iter()
            .map(|pred| {
                (
                    pred.name.clone(),
                    restrictions(&pred.cred_def_id),
                    pred.predicate.clone(),
                    pred.threshold,
                )
            })
            .collect();
        let mut requested_predicates: Vec<PredicateShape> = request
            .requested_predicates
            .values()
            .map(|pred| {
                let mut restrictions = pred.restrictions.clone();
                restrictions.sort();
                (
                    pred.name.clone(),
                    restrictions,
                    pred.p_type.clone(),
                    pred.p_value,
                )
            })
            .collect();

        proposed_attributes.sort();
        requested_attributes.sort();
        proposed_predicates.sort();
        requested_predicates.sort();

        proposed_attributes == requested_attributes && proposed_predicates == requested_predicates
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct PresentationProposal {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread", default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<Thread>,

    #[serde(default)]
    pub comment: String,

    pub presentation_proposal: PresentationPreview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct RequestPresentation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,

    #[serde(default)]
    pub comment: String,

    #[serde(rename = "request_presentations~attach")]
    pub request_presentations_attach: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(crate = "self::serde")]
pub struct Presentation {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type")]
    pub message_type: String,

    #[serde(rename = "~thread")]
    pub thread: Thread,

    #[serde(default)]
    pub comment: String,

    #[serde(rename = "presentations~attach")]
    pub presentations_attach: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rst_common::standard::serde_json::json;

    fn preview() -> PresentationPreview {
        PresentationPreview::new(
            vec![
                PreviewAttribute {
                    name: "name".to_string(),
                    cred_def_id: Some("def-1".to_string()),
                    mime_type: None,
                    value: None,
                },
                PreviewAttribute {
                    name: "nickname".to_string(),
                    cred_def_id: None,
                    mime_type: None,
                    value: Some(json!("bobby")),
                },
            ],
            vec![PreviewPredicate {
                name: "age".to_string(),
                cred_def_id: Some("def-1".to_string()),
                predicate: ">=".to_string(),
                threshold: 18,
            }],
        )
    }

    #[test]
    fn test_to_request_transcodes_restrictions() {
        let request = preview().to_request("proof", "1.0");

        assert_eq!(request.requested_attributes.len(), 2);
        assert_eq!(
            request.requested_attributes["attr_0"].restrictions,
            vec![Restriction::definition("def-1")]
        );
        assert!(request.requested_attributes["attr_1"].restrictions.is_empty());

        let predicate = &request.requested_predicates["predicate_0"];
        assert_eq!(predicate.p_type, ">=");
        assert_eq!(predicate.p_value, 18)
    }

    #[test]
    fn test_matches_request() {
        let preview = preview();
        let request = preview.to_request("proof", "1.0");
        assert!(preview.matches_request(&request));

        let mut stricter = request.clone();
        if let Some(predicate) = stricter.requested_predicates.get_mut("predicate_0") {
            predicate.p_value = 21;
        }
        assert!(!preview.matches_request(&stricter));

        let mut unrestricted = request;
        if let Some(attribute) = unrestricted.requested_attributes.get_mut("attr_0") {
            attribute.restrictions.clear();
        }
        assert!(!preview.matches_request(&unrestricted))
    }
}
