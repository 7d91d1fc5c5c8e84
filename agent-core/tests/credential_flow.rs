mod common;

use rst_common::standard::serde_json::{json, Map};
use rst_common::with_tokio::tokio;

use prople_agent_core::credential::{
    CredentialAPI, CredentialError, CredentialStage, OfferOptions, PreviewAttribute,
    ProposalOptions,
};
use prople_agent_core::ledger::CredentialDefinition;
use prople_agent_core::tenant::Tenant;

use common::{values, Agent, DEFINITION_ID, SCHEMA_ID};

async fn assert_no_pending_exchanges(agent: &Agent, tenant: &Tenant) {
    for stage in [
        CredentialStage::Proposal,
        CredentialStage::Offer,
        CredentialStage::Request,
    ] {
        let pending = agent.credentials.list(tenant, stage).await.unwrap();
        assert!(pending.is_empty(), "{:?} left for {}", stage, tenant.id());
    }
}

fn person() -> Vec<PreviewAttribute> {
    vec![
        PreviewAttribute::new("name", json!("Bob")),
        PreviewAttribute::new("age", json!("30")),
    ]
}

#[tokio::test]
async fn test_offer_request_issue() {
    let agent = Agent::start(Map::new()).await;
    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;
    let (issuer_side, _) = agent.connect(&alice, &bob).await;

    let mut options = OfferOptions::new(issuer_side.get_their_did().cloned().unwrap());
    options.definition_id = Some(DEFINITION_ID.to_string());
    options.attributes = Some(person());
    agent.credentials.create_offer(&alice, options).await.unwrap();

    let offers = agent
        .credentials
        .list(&bob, CredentialStage::Offer)
        .await
        .unwrap();
    assert_eq!(offers.len(), 1);

    agent
        .credentials
        .create_request(&bob, &offers[0].id, None)
        .await
        .unwrap();

    let requests = agent
        .credentials
        .list(&alice, CredentialStage::Request)
        .await
        .unwrap();
    assert_eq!(requests.len(), 1);

    agent
        .credentials
        .issue(
            &alice,
            &requests[0].id,
            values(&[("name", json!("Bob")), ("age", json!(30))]),
        )
        .await
        .unwrap();

    let stored = agent.engine.credentials(bob.id()).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["cred_def_id"], json!(DEFINITION_ID));
    assert_eq!(stored[0]["values"]["name"], json!("Bob"));

    assert!(agent.engine.credentials(alice.id()).await.is_empty());
    assert_no_pending_exchanges(&agent, &alice).await;
    assert_no_pending_exchanges(&agent, &bob).await;

    let issued = agent
        .credentials
        .list(&alice, CredentialStage::Issued)
        .await
        .unwrap();
    assert_eq!(issued.len(), 1);
}

#[tokio::test]
async fn test_proposal_with_value_location_issues_without_intervention() {
    let agent = Agent::start(values(&[("name", json!("Bob")), ("age", json!(30))])).await;
    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;
    let (issuer_side, holder_side) = agent.connect(&alice, &bob).await;

    let mut proposal = ProposalOptions::new(holder_side.get_their_did().cloned().unwrap());
    proposal.schema_id = Some(SCHEMA_ID.to_string());
    proposal.definition_id = Some(DEFINITION_ID.to_string());
    proposal.attributes = person();
    agent.credentials.propose(&bob, proposal).await.unwrap();

    let received = agent
        .credentials
        .list(&alice, CredentialStage::Proposal)
        .await
        .unwrap();
    assert_eq!(received.len(), 1);

    let mut offer = OfferOptions::new(issuer_side.get_their_did().cloned().unwrap());
    offer.proposal_id = Some(received[0].id.clone());
    offer.credential_location = Some("https://values.example/bob".to_string());
    agent.credentials.create_offer(&alice, offer).await.unwrap();

    let stored = agent.engine.credentials(bob.id()).await;
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["values"]["age"], json!("30"));

    assert_no_pending_exchanges(&agent, &alice).await;
    assert_no_pending_exchanges(&agent, &bob).await;
}

#[tokio::test]
async fn test_proposal_for_foreign_schema_is_rejected() {
    let agent = Agent::start(Map::new()).await;
    agent
        .ledger
        .add_credential_definition(CredentialDefinition {
            id: "Th7MpTaRZVRYnPiabds81Y:3:CL:13:tag".to_string(),
            schema_id: "13".to_string(),
            revocation_registry_id: None,
            value: json!({}),
        })
        .await;

    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;
    let (_, holder_side) = agent.connect(&alice, &bob).await;

    let mut proposal = ProposalOptions::new(holder_side.get_their_did().cloned().unwrap());
    proposal.schema_id = Some(SCHEMA_ID.to_string());
    proposal.definition_id = Some("Th7MpTaRZVRYnPiabds81Y:3:CL:13:tag".to_string());
    proposal.attributes = person();

    let result = agent.credentials.propose(&bob, proposal).await;
    assert!(matches!(result, Err(CredentialError::SchemaMismatch(_))));

    assert_no_pending_exchanges(&agent, &alice).await;
    assert_no_pending_exchanges(&agent, &bob).await;
}
