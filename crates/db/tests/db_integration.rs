//! Integration tests exercising repositories against a migrated in-memory
//! sqlite database (no external services required).

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use relay_db::repositories::{DomainBanRepository, InboxRepository, WhitelistRepository};
use relay_db::test_utils::in_memory_db;

#[tokio::test]
async fn put_inbox_then_find_by_any_field() {
    let db = Arc::new(in_memory_db().await.unwrap());
    let repo = InboxRepository::new(db);

    repo.put_inbox(
        "relay.example",
        "https://relay.example/actor",
        "https://relay.example/inbox",
        "https://relay.example/follow/1",
        Some("activityrelay".to_string()),
        false,
    )
    .await
    .unwrap();

    let by_domain = repo.find_by_any("relay.example").await.unwrap();
    let by_inbox = repo
        .find_by_any("https://relay.example/inbox")
        .await
        .unwrap();

    assert_eq!(by_domain.unwrap().domain, "relay.example");
    assert_eq!(by_inbox.unwrap().domain, "relay.example");
}

#[tokio::test]
async fn refollow_updates_followid_without_duplicating_row() {
    let db = Arc::new(in_memory_db().await.unwrap());
    let repo = InboxRepository::new(db);

    repo.put_inbox(
        "relay.example",
        "https://relay.example/actor",
        "https://relay.example/inbox",
        "https://relay.example/follow/1",
        None,
        false,
    )
    .await
    .unwrap();

    repo.put_inbox(
        "relay.example",
        "https://relay.example/actor",
        "https://relay.example/inbox",
        "https://relay.example/follow/2",
        None,
        false,
    )
    .await
    .unwrap();

    let all = repo.find_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].followid, "https://relay.example/follow/2");
}

#[tokio::test]
async fn banning_a_domain_removes_its_inbox_and_whitelist_rows() {
    let db = Arc::new(in_memory_db().await.unwrap());
    let inboxes = InboxRepository::new(db.clone());
    let whitelist = WhitelistRepository::new(db.clone());
    let bans = DomainBanRepository::new(db);

    inboxes
        .put_inbox(
            "bad.example",
            "https://bad.example/actor",
            "https://bad.example/inbox",
            "https://bad.example/follow/1",
            None,
            false,
        )
        .await
        .unwrap();
    whitelist.add("bad.example").await.unwrap();

    bans.ban("bad.example", "spam", None).await.unwrap();

    assert!(inboxes.find_by_domain("bad.example").await.unwrap().is_none());
    assert!(!whitelist.is_whitelisted("bad.example").await.unwrap());
    assert!(bans.is_banned("bad.example").await.unwrap());
}

#[tokio::test]
async fn find_recipients_excludes_origin_domain_and_pending_rows() {
    let db = Arc::new(in_memory_db().await.unwrap());
    let repo = InboxRepository::new(db);

    repo.put_inbox(
        "origin.example",
        "https://origin.example/actor",
        "https://origin.example/inbox",
        "https://origin.example/follow/1",
        None,
        false,
    )
    .await
    .unwrap();
    repo.put_inbox(
        "subscriber.example",
        "https://subscriber.example/actor",
        "https://subscriber.example/inbox",
        "https://subscriber.example/follow/1",
        None,
        false,
    )
    .await
    .unwrap();
    repo.put_inbox(
        "pending.example",
        "https://pending.example/actor",
        "https://pending.example/inbox",
        "https://pending.example/follow/1",
        None,
        true,
    )
    .await
    .unwrap();

    let recipients = repo.find_recipients("origin.example").await.unwrap();
    let domains: Vec<_> = recipients.iter().map(|r| r.domain.as_str()).collect();

    assert_eq!(domains, vec!["subscriber.example"]);
}
