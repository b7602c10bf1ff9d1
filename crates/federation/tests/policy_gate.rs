//! Integration tests for [`FederationState::evaluate_policy`] against a real
//! (in-memory) store: domain ban / software ban / whitelist precedence as
//! actually read from the `domain_ban`, `software_ban`, and `whitelist`
//! tables, not just the pure function in `relay-policy`.

use std::sync::Arc;

use relay_cache::DbKvCache;
use relay_common::generate_rsa_keypair;
use relay_db::repositories::{ConfigKvRepository, DomainBanRepository, InboxRepository, SoftwareBanRepository, WhitelistRepository};
use relay_db::test_utils::in_memory_db;
use relay_federation::client::ApClient;
use relay_federation::dedup::DedupRing;
use relay_federation::{FederationState, NullFanout, RelayKeypair};
use relay_policy::Decision;

async fn test_state() -> FederationState {
    let db = Arc::new(in_memory_db().await.expect("migrate"));
    let cache: Arc<dyn relay_cache::KvCache> = Arc::new(DbKvCache::new(db.clone()));
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
        fanout: Arc::new(NullFanout),
    }
}

#[tokio::test]
async fn allows_unknown_domain_by_default() {
    let state = test_state().await;
    let decision = state.evaluate_policy("a.example", None).await.expect("evaluate");
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn domain_ban_wins_over_whitelist() {
    let state = test_state().await;
    state
        .domain_ban_repo
        .ban("a.example", "spam", None)
        .await
        .expect("ban");
    state.whitelist_repo.add("a.example").await.expect("whitelist");

    let decision = state.evaluate_policy("a.example", None).await.expect("evaluate");
    assert_eq!(decision, Decision::DenyBannedDomain);
}

#[tokio::test]
async fn software_ban_blocks_matching_nodeinfo_software() {
    let state = test_state().await;
    state.software_ban_repo.ban("evilsoft", "malicious fork", None).await.expect("ban");

    let decision = state.evaluate_policy("a.example", Some("evilsoft")).await.expect("evaluate");
    assert_eq!(decision, Decision::DenyBannedSoftware);
}

#[tokio::test]
async fn whitelist_enabled_blocks_unlisted_domain() {
    let state = test_state().await;
    state
        .config_repo
        .set("whitelist-enabled", "true", "bool")
        .await
        .expect("set config");

    let decision = state.evaluate_policy("unlisted.example", None).await.expect("evaluate");
    assert_eq!(decision, Decision::DenyNotWhitelisted);

    state.whitelist_repo.add("listed.example").await.expect("whitelist");
    let decision = state.evaluate_policy("listed.example", None).await.expect("evaluate");
    assert_eq!(decision, Decision::Allow);
}

#[tokio::test]
async fn domain_ban_cascades_to_remove_existing_subscriber() {
    let state = test_state().await;
    state
        .inbox_repo
        .put_inbox(
            "a.example",
            "https://a.example/u/a",
            "https://a.example/u/a/inbox",
            "https://a.example/f/1",
            None,
            false,
        )
        .await
        .expect("put_inbox");

    state.domain_ban_repo.ban("a.example", "spam", None).await.expect("ban");

    assert!(state.inbox_repo.find_by_domain("a.example").await.expect("find").is_none());
}
