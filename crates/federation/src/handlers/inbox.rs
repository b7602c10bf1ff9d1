//! `POST /inbox` — the inbox ingest pipeline (§4.F).

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use relay_common::signature::{verify_digest, verify_signature, HttpSignature, SignatureError};
use serde_json::json;
use tracing::warn;

use crate::activity::Activity;
use crate::context::FederationState;
use crate::dispatch::{dispatch, IngestOutcome};

/// §4.F step 1: "Read body (reject >1 MiB)".
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// `POST /inbox`: verify, dedup, gate, dispatch.
pub async fn inbox_handler(State(state): State<FederationState>, headers: HeaderMap, body: Bytes) -> Response {
    if body.len() > MAX_BODY_BYTES {
        return (StatusCode::PAYLOAD_TOO_LARGE, Json(json!({"error": "body too large"}))).into_response();
    }

    let key_owner_domain = match verify_inbox_signature(&state, &headers, &body).await {
        Ok(domain) => domain,
        Err(e) => {
            warn!(error = %e, "inbox signature verification failed");
            return signature_error_response(&e);
        }
    };

    let value: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response(),
    };

    let activity = match Activity::from_value(value) {
        Ok(a) => a,
        Err(e) => return (StatusCode::BAD_REQUEST, Json(json!({"error": e.to_string()}))).into_response(),
    };

    let Some(activity_id) = activity.id().map(str::to_string) else {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "activity missing id"}))).into_response();
    };

    if state.dedup.seen_before(&activity_id) {
        return StatusCode::ACCEPTED.into_response();
    }

    if let Some(actor_iri) = activity.actor() {
        match url::Url::parse(actor_iri).ok().and_then(|u| u.host_str().map(str::to_string)) {
            Some(actor_domain) if actor_domain == key_owner_domain => {}
            _ => {
                warn!(actor_iri, key_owner_domain, "actor domain does not match signature key owner");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"error": "actor does not match signing key"})),
                )
                    .into_response();
            }
        }
    }

    match dispatch(&state, activity).await {
        Ok(IngestOutcome::Accepted) => StatusCode::ACCEPTED.into_response(),
        Ok(IngestOutcome::Blocked) => (StatusCode::FORBIDDEN, Json(json!({"error": "blocked"}))).into_response(),
        Err(e) => e.into_response(),
    }
}

/// §4.C verify procedure, steps done specifically for the inbox path:
/// parse `Signature`, fetch the signer's actor document by `keyId`, verify
/// the digest (if present) and the signature itself.
///
/// Returns the domain of the actor owning the signing key, used by the
/// caller to cross-check against the activity's `actor` field (§4.F step 4).
async fn verify_inbox_signature(
    state: &FederationState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<String, SignatureError> {
    let header_value = headers
        .get("signature")
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::Missing)?;

    let signature = HttpSignature::parse(header_value)?;

    if let Some(digest_header) = headers.get("digest").and_then(|v| v.to_str().ok()) {
        verify_digest(body, digest_header)?;
    }

    let actor_url = signature.key_id.split('#').next().unwrap_or(&signature.key_id);
    let actor = state
        .client
        .get_actor(actor_url)
        .await
        .map_err(|e| SignatureError::KeyUnavailable(e.to_string()))?;

    let mut header_map = HashMap::new();
    for name in &signature.headers {
        if name == "(request-target)" {
            continue;
        }
        if let Some(value) = headers.get(name.as_str()).and_then(|v| v.to_str().ok()) {
            header_map.insert(name.clone(), value.to_string());
        }
    }

    verify_signature(&signature, &actor.public_key.public_key_pem, "POST", "/inbox", &header_map)?;

    actor.domain().map_err(|e| SignatureError::KeyUnavailable(e.to_string()))
}

fn signature_error_response(e: &SignatureError) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": e.to_string()}))).into_response()
}
