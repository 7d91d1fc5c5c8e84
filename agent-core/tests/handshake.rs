mod common;

use rst_common::standard::serde_json::Map;
use rst_common::with_tokio::tokio;

use prople_agent_core::connection::{
    Connection, ConnectionAPI, Direction, InvitationOptions, State,
};
use prople_agent_core::keystore::SecureStore;
use prople_agent_core::tenant::Tenant;

use common::Agent;

async fn invite(agent: &Agent, inviter: &Tenant, auto_respond: bool) -> Connection {
    agent
        .connections
        .create_invitation(
            inviter,
            InvitationOptions {
                auto_respond,
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

async fn accept(agent: &Agent, invitee: &Tenant, invited: &Connection) -> Connection {
    let invitation = invited.get_invitation().cloned().unwrap();
    agent
        .connections
        .accept_invitation(invitee, invitation, Some("bob".to_string()))
        .await
        .unwrap()
}

async fn reload(agent: &Agent, tenant: &Tenant, connection: &Connection) -> Connection {
    agent
        .connections
        .get_connection(tenant, connection.get_id())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_handshake_with_automatic_response() {
    let agent = Agent::start(Map::new()).await;
    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;

    let invited = invite(&agent, &alice, true).await;
    assert!(invited.is_at(State::Invited, Direction::Out));

    let requested = accept(&agent, &bob, &invited).await;

    let inviter = reload(&agent, &alice, &invited).await;
    let invitee = reload(&agent, &bob, &requested).await;

    assert!(inviter.is_at(State::Responded, Direction::Out));
    assert!(invitee.is_at(State::Complete, Direction::In));

    assert_eq!(inviter.get_their_did(), invitee.get_my_did());
    assert_eq!(inviter.get_their_key(), invitee.get_my_key());
    assert_eq!(invitee.get_their_did(), inviter.get_my_did());
    assert_eq!(invitee.get_their_key(), inviter.get_my_key());
    assert_eq!(inviter.get_their_label(), Some(&"bob".to_string()));
    assert_eq!(inviter.get_thread_id(), invitee.get_thread_id());
}

#[tokio::test]
async fn test_inviter_waits_for_an_explicit_response() {
    let agent = Agent::start(Map::new()).await;
    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;

    let invited = invite(&agent, &alice, false).await;
    let requested = accept(&agent, &bob, &invited).await;

    let inviter = reload(&agent, &alice, &invited).await;
    assert!(inviter.is_at(State::Requested, Direction::In));
    assert!(inviter.get_response().is_none());
    assert!(reload(&agent, &bob, &requested)
        .await
        .is_at(State::Requested, Direction::Out));

    let responded = agent
        .connections
        .create_response(&alice, invited.get_id())
        .await
        .unwrap();
    assert!(responded.is_at(State::Responded, Direction::Out));

    let invitee = reload(&agent, &bob, &requested).await;
    assert!(invitee.is_at(State::Complete, Direction::In));
    assert_eq!(invitee.get_their_did(), responded.get_my_did());
}

#[tokio::test]
async fn test_resending_a_response_keeps_the_connection() {
    let agent = Agent::start(Map::new()).await;
    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;

    let invited = invite(&agent, &alice, true).await;
    let requested = accept(&agent, &bob, &invited).await;
    let before = reload(&agent, &alice, &invited).await;

    let resent = agent
        .connections
        .create_response(&alice, invited.get_id())
        .await
        .unwrap();

    let after = reload(&agent, &alice, &invited).await;
    assert!(after.is_at(State::Responded, Direction::Out));
    assert_eq!(after.get_my_did(), before.get_my_did());
    assert_eq!(after.get_my_key(), before.get_my_key());
    assert_eq!(after.get_response(), before.get_response());
    assert_eq!(resent.get_response(), before.get_response());

    let invitee = reload(&agent, &bob, &requested).await;
    assert!(invitee.is_at(State::Complete, Direction::In));
}

#[tokio::test]
async fn test_response_with_foreign_signature_is_dropped() {
    let agent = Agent::start(Map::new()).await;
    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;

    let first = invite(&agent, &alice, true).await;
    accept(&agent, &bob, &first).await;
    let signed = reload(&agent, &alice, &first)
        .await
        .get_response()
        .cloned()
        .unwrap();

    let second = invite(&agent, &alice, false).await;
    let pending = accept(&agent, &bob, &second).await;
    let thread_id = pending.get_thread_id().cloned().unwrap();

    // valid signature, but by the key of another invitation
    let mut replayed = signed.clone();
    replayed.thread.thid = thread_id.clone();
    let dropped = agent
        .connections
        .receive_response(&bob, replayed)
        .await
        .unwrap();
    assert!(dropped.is_none());

    // claims the right signer, the signature does not match it
    let mut forged = signed;
    forged.thread.thid = thread_id;
    forged.connection_sig.signer = pending.get_their_key().cloned().unwrap();
    let dropped = agent
        .connections
        .receive_response(&bob, forged)
        .await
        .unwrap();
    assert!(dropped.is_none());

    let unchanged = reload(&agent, &bob, &pending).await;
    assert!(unchanged.is_at(State::Requested, Direction::Out));
    assert!(unchanged.get_response().is_none());

    agent
        .connections
        .create_response(&alice, second.get_id())
        .await
        .unwrap();
    assert!(reload(&agent, &bob, &pending)
        .await
        .is_at(State::Complete, Direction::In));
}

#[tokio::test]
async fn test_concurrent_responses_mint_a_single_pairwise_did() {
    let agent = Agent::start(Map::new()).await;
    let alice = agent.tenant("alice").await;
    let bob = agent.tenant("bob").await;

    let invited = invite(&agent, &alice, false).await;
    let requested = accept(&agent, &bob, &invited).await;
    assert!(reload(&agent, &alice, &invited)
        .await
        .is_at(State::Requested, Direction::In));

    let (first, second) = tokio::join!(
        agent.connections.create_response(&alice, invited.get_id()),
        agent.connections.create_response(&alice, invited.get_id()),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    let stored = reload(&agent, &alice, &invited).await;
    assert!(stored.is_at(State::Responded, Direction::Out));
    assert!(stored.get_response().is_some());
    for responded in [&first, &second] {
        assert_eq!(responded.get_my_did(), stored.get_my_did());
        assert_eq!(responded.get_my_key(), stored.get_my_key());
        assert_eq!(responded.get_response(), stored.get_response());
    }

    let invitee = reload(&agent, &bob, &requested).await;
    assert!(invitee.is_at(State::Complete, Direction::In));
    assert_eq!(invitee.get_their_did(), stored.get_my_did());

    let their_did = stored.get_my_did().cloned().unwrap();
    let pairwise = bob.store().get_pairwise(&their_did).await.unwrap();
    assert_eq!(
        pairwise.map(|pairwise| pairwise.their_key),
        stored.get_my_key().cloned()
    );
}
