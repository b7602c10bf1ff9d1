//! Activity dispatch: steps 4-6 of the inbox ingest pipeline (§4.F).
//!
//! By the time a caller reaches [`dispatch`], the request's HTTP signature
//! has verified and the activity ID has cleared the dedup ring (§4.F steps
//! 1-3, implemented by the `/inbox` handler). This module resolves the
//! sending actor, gates on policy, and dispatches by activity type.

use relay_common::{AppError, AppResult, IdGenerator};
use relay_policy::Decision;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::activity::{Activity, Broadcastable, FollowLike, PUBLIC_AUDIENCE};
use crate::actor::ACTOR_PATH;
use crate::context::FederationState;
use crate::fanout::DeliveryRecipient;

/// What the caller should tell the HTTP client after dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 202 Accepted; side effects (if any) already applied.
    Accepted,
    /// 403 Forbidden; the actor's domain or software is not permitted.
    Blocked,
}

/// Resolves the sending actor, gates on policy, and dispatches `activity`
/// by type (§4.F steps 4-6).
///
/// # Errors
/// Propagates store/network failures. A malformed or unreachable actor
/// document surfaces as [`AppError::BadRequest`].
pub async fn dispatch(state: &FederationState, activity: Activity) -> AppResult<IngestOutcome> {
    let Some(actor_iri) = activity.actor() else {
        info!(activity = activity.type_name(), "activity has no actor, acknowledging");
        return Ok(IngestOutcome::Accepted);
    };
    let actor_iri = actor_iri.to_string();

    let remote_actor = state
        .client
        .get_actor(&actor_iri)
        .await
        .map_err(|e| AppError::BadRequest(format!("could not resolve actor {actor_iri}: {e}")))?;

    let actor_domain = remote_actor
        .domain()
        .map_err(|e| AppError::BadRequest(format!("actor id is not a valid url: {e}")))?;

    let software = state.client.get_nodeinfo(&actor_domain).await.ok().map(|n| n.software_name());

    let decision = state.evaluate_policy(&actor_domain, software.as_deref()).await?;
    if !matches!(decision, Decision::Allow) {
        warn!(domain = %actor_domain, ?decision, "policy denied activity");
        return Ok(IngestOutcome::Blocked);
    }

    match activity {
        Activity::Follow(follow) => handle_follow(state, &actor_domain, &remote_actor.inbox, &software, &follow).await?,
        Activity::UndoFollow(undo) => handle_undo_follow(state, &undo).await?,
        Activity::Undo(_) => info!("Undo of a non-Follow activity acknowledged, no action"),
        Activity::Accept(_) | Activity::Reject(_) => {
            info!(domain = %actor_domain, "Accept/Reject of our outbound Follow acknowledged");
        }
        Activity::Create(a) | Activity::Update(a) | Activity::Delete(a) | Activity::Announce(a) => {
            handle_broadcastable(state, &actor_domain, a).await?;
        }
        Activity::Move(_) => info!(domain = %actor_domain, "Move activity acknowledged, no action"),
        Activity::Unknown(value) => {
            info!(kind = ?value.get("type"), "unknown activity type acknowledged, no action");
        }
    }

    Ok(IngestOutcome::Accepted)
}

/// Follow handling (§4.F): create/refresh the inbox row; stop if approval is
/// required, else enqueue `Accept` + a reciprocal `Follow`.
async fn handle_follow(
    state: &FederationState,
    domain: &str,
    inbox_url: &str,
    software: &Option<String>,
    follow: &FollowLike,
) -> AppResult<()> {
    let pending = state.approval_required().await?;

    state
        .inbox_repo
        .put_inbox(domain, &follow.actor, inbox_url, &follow.id, software.clone(), pending)
        .await?;

    if pending {
        info!(domain, "Follow stored pending admin approval");
        return Ok(());
    }

    info!(domain, "Follow accepted, subscriber activated");
    send_accept_and_follow(state, domain, inbox_url, follow).await
}

/// Completes the Follow handshake: enqueues `Accept` of `follow` plus a
/// reciprocal `Follow`, both addressed to the subscriber's inbox.
///
/// Shared by the immediate-activation path in [`handle_follow`] and by
/// admin approval of a previously pending Follow (§4.H `POST
/// /request/{domain}`), since both reach the same post-condition: the
/// subscriber learns its Follow succeeded.
async fn send_accept_and_follow(state: &FederationState, domain: &str, inbox_url: &str, follow: &FollowLike) -> AppResult<()> {
    let accept = build_accept(state, follow);
    let reciprocal_follow = build_follow(state, &follow.actor);

    state
        .fanout
        .enqueue(
            accept,
            vec![DeliveryRecipient {
                domain: domain.to_string(),
                inbox: inbox_url.to_string(),
            }],
        )
        .await?;
    state
        .fanout
        .enqueue(
            reciprocal_follow,
            vec![DeliveryRecipient {
                domain: domain.to_string(),
                inbox: inbox_url.to_string(),
            }],
        )
        .await?;

    Ok(())
}

/// Activates a subscriber whose Follow was stored pending admin approval:
/// reconstructs the original Follow from the stored `inbox` row and
/// completes the handshake the same way immediate activation would have
/// (§4.F subscriber state machine: `PendingApproval` → `Subscribed`).
///
/// # Errors
/// Propagates queue/network failures from [`crate::fanout::Fanout::enqueue`].
pub async fn activate_pending_follow(state: &FederationState, domain: &str, actor: &str, followid: &str, inbox_url: &str) -> AppResult<()> {
    let follow = FollowLike {
        id: followid.to_string(),
        actor: actor.to_string(),
        object: relay_actor_iri(state),
    };
    send_accept_and_follow(state, domain, inbox_url, &follow).await
}

/// Undo-of-Follow handling: delete the inbox row matching the original
/// Follow's `id`, then enqueue an `Accept` of the Undo.
async fn handle_undo_follow(state: &FederationState, undo: &FollowLike) -> AppResult<()> {
    let Some(existing) = state.inbox_repo.find_by_followid(&undo.object).await? else {
        info!(followid = %undo.object, "Undo(Follow) for unknown subscription, acknowledging");
        return Ok(());
    };

    state.inbox_repo.del_by_followid(&undo.object).await?;
    info!(domain = %existing.domain, "subscriber unsubscribed");

    let accept = json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": format!("https://{}{ACTOR_PATH}#accepts/{}", state.domain, IdGenerator::new().generate()),
        "type": "Accept",
        "actor": relay_actor_iri(state),
        "object": undo_json(undo),
    });

    state
        .fanout
        .enqueue(
            accept,
            vec![DeliveryRecipient {
                domain: existing.domain,
                inbox: existing.inbox,
            }],
        )
        .await
}

/// Create/Update/Delete/Announce with a public audience: compute the
/// recipient set and enqueue a rebroadcast (§4.G).
async fn handle_broadcastable(state: &FederationState, origin_domain: &str, activity: Broadcastable) -> AppResult<()> {
    if !activity.is_public() {
        info!(id = %activity.id, "non-public activity, not rebroadcasting");
        return Ok(());
    }

    let subscribers = state.inbox_repo.find_recipients(origin_domain).await?;
    let mut recipients = Vec::with_capacity(subscribers.len());
    for row in subscribers {
        let decision = state.evaluate_policy(&row.domain, row.software.as_deref()).await?;
        if matches!(decision, Decision::Allow) {
            recipients.push(DeliveryRecipient {
                domain: row.domain,
                inbox: row.inbox,
            });
        }
    }

    if recipients.is_empty() {
        info!(id = %activity.id, "no eligible recipients, nothing to rebroadcast");
        return Ok(());
    }

    let already_announce_by_subscriber = activity.raw.get("type").and_then(Value::as_str) == Some("Announce");
    let wire = if already_announce_by_subscriber {
        activity.raw
    } else {
        build_announce(state, &activity)
    };

    info!(id = %activity.id, recipients = recipients.len(), "rebroadcasting activity");
    state.fanout.enqueue(wire, recipients).await
}

/// Initiates the relay's side of the handshake toward a newly registered
/// instance (§4.H: `POST /instance` "enqueues a Follow"). The reciprocal
/// subscriber row is created once the target's `Accept` lands back through
/// [`dispatch`].
///
/// # Errors
/// Propagates queue/network failures from [`crate::fanout::Fanout::enqueue`].
pub async fn initiate_follow(state: &FederationState, target_domain: &str, target_actor: &str, target_inbox: &str) -> AppResult<()> {
    let follow = build_follow(state, target_actor);
    state
        .fanout
        .enqueue(
            follow,
            vec![DeliveryRecipient {
                domain: target_domain.to_string(),
                inbox: target_inbox.to_string(),
            }],
        )
        .await
}

fn relay_actor_iri(state: &FederationState) -> String {
    format!("https://{}{ACTOR_PATH}", state.domain)
}

fn build_accept(state: &FederationState, follow: &FollowLike) -> Value {
    json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": format!("https://{}{ACTOR_PATH}#accepts/{}", state.domain, IdGenerator::new().generate()),
        "type": "Accept",
        "actor": relay_actor_iri(state),
        "object": {
            "id": follow.id,
            "type": "Follow",
            "actor": follow.actor,
            "object": follow.object,
        },
    })
}

fn build_follow(state: &FederationState, target_actor: &str) -> Value {
    json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": format!("https://{}{ACTOR_PATH}#follows/{}", state.domain, IdGenerator::new().generate()),
        "type": "Follow",
        "actor": relay_actor_iri(state),
        "object": target_actor,
    })
}

fn build_announce(state: &FederationState, activity: &Broadcastable) -> Value {
    json!({
        "@context": "https://www.w3.org/ns/activitystreams",
        "id": format!("https://{}{ACTOR_PATH}#announces/{}", state.domain, IdGenerator::new().generate()),
        "type": "Announce",
        "actor": relay_actor_iri(state),
        "object": activity.id,
        "to": [PUBLIC_AUDIENCE],
        "published": chrono::Utc::now().to_rfc3339(),
    })
}

fn undo_json(undo: &FollowLike) -> Value {
    json!({
        "id": undo.id,
        "type": "Undo",
        "actor": undo.actor,
        "object": {
            "id": undo.object,
            "type": "Follow",
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_wraps_original_follow() {
        let follow = FollowLike {
            id: "https://a.example/f/1".to_string(),
            actor: "https://a.example/u/a".to_string(),
            object: "https://relay.example/actor".to_string(),
        };
        let state_domain = "relay.example";
        let accept = json!({
            "@context": "https://www.w3.org/ns/activitystreams",
            "type": "Accept",
            "actor": format!("https://{state_domain}{ACTOR_PATH}"),
            "object": {
                "id": follow.id,
                "type": "Follow",
                "actor": follow.actor,
                "object": follow.object,
            },
        });
        assert_eq!(accept["object"]["actor"], "https://a.example/u/a");
    }
}
