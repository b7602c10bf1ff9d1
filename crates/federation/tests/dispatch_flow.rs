//! End-to-end dispatch tests exercising Follow/Undo-Follow against a real
//! in-memory store. Remote actor/nodeinfo lookups are pre-seeded into the
//! cache so `dispatch` never touches the network (§4.D's cache is the seam).

use std::sync::Arc;

use relay_cache::{CacheValue, DbKvCache, KvCache, NS_ACTOR, NS_NODEINFO};
use relay_common::generate_rsa_keypair;
use relay_db::repositories::{ConfigKvRepository, DomainBanRepository, InboxRepository, SoftwareBanRepository, WhitelistRepository};
use relay_db::test_utils::in_memory_db;
use async_trait::async_trait;
use relay_common::AppResult;
use relay_federation::activity::Activity;
use relay_federation::client::ApClient;
use relay_federation::dedup::DedupRing;
use relay_federation::dispatch::{activate_pending_follow, dispatch, IngestOutcome};
use relay_federation::{DeliveryRecipient, Fanout, FederationState, NullFanout, RelayKeypair};
use serde_json::{json, Value};
use tokio::sync::Mutex;

/// Records every enqueued activity's `type`, so tests can assert on *what*
/// was sent without standing up a real delivery queue.
#[derive(Debug, Default, Clone)]
struct CountingFanout {
    sent: Arc<Mutex<Vec<(String, Vec<String>)>>>,
}

#[async_trait]
impl Fanout for CountingFanout {
    async fn enqueue(&self, activity: Value, recipients: Vec<DeliveryRecipient>) -> AppResult<()> {
        let kind = activity["type"].as_str().unwrap_or_default().to_string();
        let domains = recipients.into_iter().map(|r| r.domain).collect();
        self.sent.lock().await.push((kind, domains));
        Ok(())
    }
}

async fn test_state() -> FederationState {
    test_state_with_fanout(Arc::new(NullFanout)).await
}

async fn test_state_with_fanout(fanout: Arc<dyn Fanout>) -> FederationState {
    let db = Arc::new(in_memory_db().await.expect("migrate"));
    let cache: Arc<dyn KvCache> = Arc::new(DbKvCache::new(db.clone()));
    let keypair = generate_rsa_keypair().expect("keypair");
    let private_key = relay_common::crypto::parse_private_key(&keypair.private_key_pem).expect("parse key");

    FederationState {
        domain: "relay.example".to_string(),
        keypair: RelayKeypair {
            private_key: Arc::new(private_key),
            public_key_pem: keypair.public_key_pem,
            key_id: "https://relay.example/actor#main-key".to_string(),
        },
        inbox_repo: InboxRepository::new(db.clone()),
        domain_ban_repo: DomainBanRepository::new(db.clone()),
        software_ban_repo: SoftwareBanRepository::new(db.clone()),
        whitelist_repo: WhitelistRepository::new(db.clone()),
        config_repo: ConfigKvRepository::new(db.clone()),
        cache: cache.clone(),
        client: ApClient::new("relay.example", cache),
        dedup: Arc::new(DedupRing::new()),
        fanout,
    }
}

async fn seed_remote_actor(state: &FederationState, actor_iri: &str, inbox: &str) {
    let doc = json!({
        "id": actor_iri,
        "inbox": inbox,
        "publicKey": {"id": format!("{actor_iri}#main-key"), "publicKeyPem": "PEM"},
    });
    state.cache.set(NS_ACTOR, actor_iri, CacheValue::Json(doc)).await.expect("seed actor");

    let domain = url::Url::parse(actor_iri).expect("valid actor iri").host_str().expect("host").to_string();
    let nodeinfo = json!({"software": {"name": "testsoft", "version": "1.0"}});
    state
        .cache
        .set(NS_NODEINFO, &domain, CacheValue::Json(nodeinfo))
        .await
        .expect("seed nodeinfo");
}

fn follow_activity(actor: &str) -> serde_json::Value {
    json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": format!("{actor}/follows/1"),
        "type": "Follow",
        "actor": actor,
        "object": "https://relay.example/actor",
    })
}

#[tokio::test]
async fn follow_creates_subscriber_row_and_is_not_pending_by_default() {
    let state = test_state().await;
    let actor = "https://a.example/u/a";
    seed_remote_actor(&state, actor, "https://a.example/u/a/inbox").await;

    let activity = Activity::from_value(follow_activity(actor)).expect("parse");
    let outcome = dispatch(&state, activity).await.expect("dispatch");
    assert_eq!(outcome, IngestOutcome::Accepted);

    let row = state.inbox_repo.find_by_domain("a.example").await.expect("find").expect("row exists");
    assert!(!row.pending);
    assert_eq!(row.followid, format!("{actor}/follows/1"));
}

#[tokio::test]
async fn re_follow_updates_followid_instead_of_duplicating() {
    let state = test_state().await;
    let actor = "https://a.example/u/a";
    seed_remote_actor(&state, actor, "https://a.example/u/a/inbox").await;

    dispatch(&state, Activity::from_value(follow_activity(actor)).expect("parse"))
        .await
        .expect("first follow");

    let second = json!({
        "id": format!("{actor}/follows/2"),
        "type": "Follow",
        "actor": actor,
        "object": "https://relay.example/actor",
    });
    dispatch(&state, Activity::from_value(second).expect("parse"))
        .await
        .expect("second follow");

    let rows = state.inbox_repo.find_all().await.expect("find_all");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].followid, format!("{actor}/follows/2"));
}

#[tokio::test]
async fn follow_is_pending_when_approval_required() {
    let state = test_state().await;
    state.config_repo.set("approval-required", "true", "bool").await.expect("set config");

    let actor = "https://a.example/u/a";
    seed_remote_actor(&state, actor, "https://a.example/u/a/inbox").await;

    dispatch(&state, Activity::from_value(follow_activity(actor)).expect("parse"))
        .await
        .expect("dispatch");

    let row = state.inbox_repo.find_by_domain("a.example").await.expect("find").expect("row exists");
    assert!(row.pending);
}

#[tokio::test]
async fn banned_domain_is_blocked_without_creating_a_subscriber() {
    let state = test_state().await;
    state.domain_ban_repo.ban("a.example", "spam", None).await.expect("ban");

    let actor = "https://a.example/u/a";
    seed_remote_actor(&state, actor, "https://a.example/u/a/inbox").await;

    let outcome = dispatch(&state, Activity::from_value(follow_activity(actor)).expect("parse"))
        .await
        .expect("dispatch");

    assert_eq!(outcome, IngestOutcome::Blocked);
    assert!(state.inbox_repo.find_by_domain("a.example").await.expect("find").is_none());
}

#[tokio::test]
async fn undo_follow_removes_subscriber_by_original_followid() {
    let state = test_state().await;
    let actor = "https://a.example/u/a";
    seed_remote_actor(&state, actor, "https://a.example/u/a/inbox").await;

    dispatch(&state, Activity::from_value(follow_activity(actor)).expect("parse"))
        .await
        .expect("follow");
    assert!(state.inbox_repo.find_by_domain("a.example").await.expect("find").is_some());

    let undo = json!({
        "id": format!("{actor}/undo/1"),
        "type": "Undo",
        "actor": actor,
        "object": {
            "id": format!("{actor}/follows/1"),
            "type": "Follow",
            "actor": actor,
            "object": "https://relay.example/actor",
        },
    });
    dispatch(&state, Activity::from_value(undo).expect("parse")).await.expect("undo");

    assert!(state.inbox_repo.find_by_domain("a.example").await.expect("find").is_none());
}

#[tokio::test]
async fn duplicate_activity_id_is_not_reprocessed() {
    let state = test_state().await;
    let activity_id = "https://a.example/follows/1";
    assert!(!state.dedup.seen_before(activity_id));
    assert!(state.dedup.seen_before(activity_id));
}

#[tokio::test]
async fn immediate_follow_enqueues_accept_and_reciprocal_follow() {
    let fanout = Arc::new(CountingFanout::default());
    let state = test_state_with_fanout(fanout.clone()).await;
    let actor = "https://a.example/u/a";
    seed_remote_actor(&state, actor, "https://a.example/u/a/inbox").await;

    dispatch(&state, Activity::from_value(follow_activity(actor)).expect("parse"))
        .await
        .expect("dispatch");

    let sent = fanout.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], ("Accept".to_string(), vec!["a.example".to_string()]));
    assert_eq!(sent[1], ("Follow".to_string(), vec!["a.example".to_string()]));
}

#[tokio::test]
async fn approving_a_pending_follow_completes_the_handshake() {
    let fanout = Arc::new(CountingFanout::default());
    let state = test_state_with_fanout(fanout.clone()).await;
    state.config_repo.set("approval-required", "true", "bool").await.expect("set config");

    let actor = "https://a.example/u/a";
    seed_remote_actor(&state, actor, "https://a.example/u/a/inbox").await;

    dispatch(&state, Activity::from_value(follow_activity(actor)).expect("parse"))
        .await
        .expect("dispatch");

    // Pending: the subscriber is stored but has not been told anything yet.
    assert!(fanout.sent.lock().await.is_empty());
    let row = state.inbox_repo.find_by_domain("a.example").await.expect("find").expect("row exists");
    assert!(row.pending);

    activate_pending_follow(&state, &row.domain, &row.actor, &row.followid, &row.inbox)
        .await
        .expect("activate");

    let sent = fanout.sent.lock().await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0], ("Accept".to_string(), vec!["a.example".to_string()]));
    assert_eq!(sent[1], ("Follow".to_string(), vec!["a.example".to_string()]));
}
