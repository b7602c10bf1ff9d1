//! `ActivityPub` client: actor/nodeinfo/webfinger GETs and signed delivery
//! POSTs (§4.D), shared by the inbox ingest pipeline and the fan-out engine.
//!
//! Callers are responsible for the policy gate ("if banned, fail with
//! `Blocked` without touching the network", §4.D) — this client only speaks
//! HTTP and manages the GET cache.

use std::sync::Arc;
use std::time::Duration;

use relay_cache::{ACTOR_MAX_AGE_SECS, CacheValue, KvCache, NODEINFO_MAX_AGE_SECS, NS_ACTOR, NS_NODEINFO};
use relay_common::signature::{calculate_digest, sign_request};
use reqwest::{Client, StatusCode};
use rsa::RsaPrivateKey;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::actor::RemoteActor;
use crate::nodeinfo::{RemoteNodeInfo, nodeinfo_url_from_discovery};

/// Errors talking to a remote instance.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("response was not valid json: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("remote returned {status}")]
    Remote { status: u16, transient: bool },
    #[error("cache error: {0}")]
    Cache(#[from] relay_common::AppError),
}

impl ClientError {
    /// §4.D: "timeout, 5xx, connection reset" are transient; 4xx (except
    /// 408/429) are permanent.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Remote { transient, .. } => *transient,
            Self::InvalidUrl(_) | Self::Decode(_) | Self::Cache(_) => false,
        }
    }
}

fn classify_status(status: StatusCode) -> ClientError {
    let transient = status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS;
    ClientError::Remote {
        status: status.as_u16(),
        transient,
    }
}

/// Outcome of a single delivery POST, for the fan-out engine's accounting
/// (§4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Success,
    /// 410 Gone — the fan-out engine marks the inbox failed immediately.
    Gone,
    /// 404 Not Found — three consecutive occurrences mark the inbox failed.
    NotFound,
    /// Any other non-2xx response; `transient` decides whether to retry.
    Failed { status: u16, transient: bool },
}

/// `ActivityPub` HTTP client: GETs (cached) and signed delivery POSTs.
#[derive(Clone)]
pub struct ApClient {
    http: Client,
    cache: Arc<dyn KvCache>,
    user_agent: String,
}

impl ApClient {
    /// Builds a client. `domain` is advertised in the `User-Agent` string.
    ///
    /// # Panics
    /// Panics if the underlying `reqwest` client fails to build, which only
    /// happens for an invalid TLS configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(domain: &str, cache: Arc<dyn KvCache>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build reqwest client");
        Self {
            http,
            cache,
            user_agent: format!("activity-relay/{} (+https://{domain}/)", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Fetches and parses a remote actor document, using the 6h actor cache.
    pub async fn get_actor(&self, actor_url: &str) -> Result<RemoteActor, ClientError> {
        if let Some((cached, age)) = self.cache.get(NS_ACTOR, actor_url).await?
            && age < Duration::from_secs(ACTOR_MAX_AGE_SECS as u64)
            && let Some(json) = cached.as_json()
        {
            return Ok(RemoteActor::from_value(json)?);
        }

        let value = self.get_json(actor_url, ACTIVITY_JSON_ACCEPT).await?;
        let actor = RemoteActor::from_value(&value)?;
        self.cache
            .set(NS_ACTOR, actor_url, CacheValue::Json(value))
            .await?;
        Ok(actor)
    }

    /// Resolves a domain's nodeinfo document via the well-known discovery
    /// indirection, using the 1h nodeinfo cache.
    pub async fn get_nodeinfo(&self, domain: &str) -> Result<RemoteNodeInfo, ClientError> {
        if let Some((cached, age)) = self.cache.get(NS_NODEINFO, domain).await?
            && age < Duration::from_secs(NODEINFO_MAX_AGE_SECS as u64)
            && let Some(json) = cached.as_json()
        {
            return Ok(serde_json::from_value(json.clone())?);
        }

        let discovery_url = format!("https://{domain}/.well-known/nodeinfo");
        let discovery = self.get_json(&discovery_url, "application/json").await?;
        let nodeinfo_url = nodeinfo_url_from_discovery(&discovery).ok_or(ClientError::Remote {
            status: 0,
            transient: false,
        })?;

        let value = self.get_json(&nodeinfo_url, "application/json").await?;
        self.cache
            .set(NS_NODEINFO, domain, CacheValue::Json(value.clone()))
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Performs a webfinger lookup for `acct:user@domain`.
    pub async fn webfinger(&self, user: &str, domain: &str) -> Result<Value, ClientError> {
        let url = format!("https://{domain}/.well-known/webfinger?resource=acct:{user}@{domain}");
        self.get_json(&url, "application/jrd+json, application/json").await
    }

    async fn get_json(&self, url: &str, accept: &str) -> Result<Value, ClientError> {
        debug!(url, "fetching remote resource");
        let response = self
            .http
            .get(url)
            .header("Accept", accept)
            .header("User-Agent", &self.user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(classify_status(status));
        }
        Ok(response.json().await?)
    }

    /// Signs and delivers `activity` to `inbox_url` as the relay actor.
    pub async fn deliver(
        &self,
        inbox_url: &str,
        activity: &Value,
        private_key: &RsaPrivateKey,
        key_id: &str,
    ) -> Result<DeliveryOutcome, ClientError> {
        let url = url::Url::parse(inbox_url)?;
        let host = url.host_str().unwrap_or_default().to_string();
        let path = if url.query().is_some() {
            format!("{}?{}", url.path(), url.query().unwrap_or_default())
        } else {
            url.path().to_string()
        };

        let body = serde_json::to_vec(activity).map_err(ClientError::Decode)?;
        let digest = calculate_digest(&body);
        let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let mut headers = HashMap::new();
        headers.insert("host".to_string(), host.clone());
        headers.insert("date".to_string(), date.clone());
        headers.insert("digest".to_string(), digest.clone());
        headers.insert("content-type".to_string(), "application/activity+json".to_string());

        let signature = sign_request(
            private_key,
            key_id,
            "POST",
            &path,
            &headers,
            &["(request-target)", "host", "date", "digest", "content-type"],
        )
        .map_err(|e| ClientError::Cache(relay_common::AppError::SignatureError(e)))?;

        let response = self
            .http
            .post(inbox_url)
            .header("Host", host)
            .header("Date", date)
            .header("Digest", digest)
            .header("Signature", signature)
            .header("Content-Type", "application/activity+json")
            .header("Accept", ACTIVITY_JSON_ACCEPT)
            .header("User-Agent", &self.user_agent)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        Ok(match status.as_u16() {
            200..=299 => DeliveryOutcome::Success,
            410 => DeliveryOutcome::Gone,
            404 => DeliveryOutcome::NotFound,
            _ => {
                warn!(inbox_url, %status, "delivery failed");
                DeliveryOutcome::Failed {
                    status: status.as_u16(),
                    transient: status.is_server_error()
                        || status == StatusCode::REQUEST_TIMEOUT
                        || status == StatusCode::TOO_MANY_REQUESTS,
                }
            }
        })
    }
}

const ACTIVITY_JSON_ACCEPT: &str = "application/activity+json, application/ld+json";
