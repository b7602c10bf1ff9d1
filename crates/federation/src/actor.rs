//! The relay's own `ActivityPub` actor document, and the shape we expect
//! from remote actor documents (§4.D, §6).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Relative path of the relay's actor document, also used as the default
/// audience in outbound `Announce`s.
pub const ACTOR_PATH: &str = "/actor";

/// Builds the relay's own actor document: a `Service` actor, per §6
/// (`GET /actor`).
#[must_use]
pub fn build_actor_document(domain: &str, public_key_pem: &str) -> Value {
    let base = format!("https://{domain}");
    json!({
        "@context": [
            "https://www.w3.org/ns/activitystreams",
            "https://w3id.org/security/v1",
        ],
        "id": format!("{base}{ACTOR_PATH}"),
        "type": "Service",
        "preferredUsername": "relay",
        "name": "ActivityRelay",
        "inbox": format!("{base}/inbox"),
        "outbox": format!("{base}/outbox"),
        "followers": format!("{base}/followers"),
        "following": format!("{base}/following"),
        "endpoints": {
            "sharedInbox": format!("{base}/inbox"),
        },
        "publicKey": {
            "id": format!("{base}{ACTOR_PATH}#main-key"),
            "owner": format!("{base}{ACTOR_PATH}"),
            "publicKeyPem": public_key_pem,
        },
    })
}

/// Key fields we need out of a fetched remote actor document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteActor {
    pub id: String,
    pub inbox: String,
    #[serde(rename = "sharedInbox", default)]
    pub shared_inbox: Option<String>,
    #[serde(rename = "publicKey")]
    pub public_key: RemotePublicKey,
}

/// The `publicKey` sub-object of a remote actor document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemotePublicKey {
    pub id: String,
    #[serde(rename = "publicKeyPem")]
    pub public_key_pem: String,
}

impl RemoteActor {
    /// Parses the fields this relay cares about out of a full actor
    /// document. Tolerant of `endpoints.sharedInbox` instead of a top-level
    /// `sharedInbox`, since both forms are common in the wild.
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        let mut actor: Self = serde_json::from_value(value.clone())?;
        if actor.shared_inbox.is_none() {
            actor.shared_inbox = value
                .get("endpoints")
                .and_then(|e| e.get("sharedInbox"))
                .and_then(Value::as_str)
                .map(str::to_string);
        }
        Ok(actor)
    }

    /// The domain this actor belongs to, extracted from its `id` IRI.
    pub fn domain(&self) -> Result<String, url::ParseError> {
        let url = url::Url::parse(&self.id)?;
        Ok(url.host_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_service_actor_with_main_key() {
        let doc = build_actor_document("relay.example", "PEM");
        assert_eq!(doc["type"], "Service");
        assert_eq!(doc["id"], "https://relay.example/actor");
        assert_eq!(doc["publicKey"]["publicKeyPem"], "PEM");
    }

    #[test]
    fn parses_remote_actor_with_nested_shared_inbox() {
        let value = json!({
            "id": "https://a.example/u/a",
            "inbox": "https://a.example/u/a/inbox",
            "endpoints": {"sharedInbox": "https://a.example/inbox"},
            "publicKey": {"id": "https://a.example/u/a#main-key", "publicKeyPem": "PEM"},
        });
        let actor = RemoteActor::from_value(&value).unwrap();
        assert_eq!(actor.shared_inbox.as_deref(), Some("https://a.example/inbox"));
        assert_eq!(actor.domain().unwrap(), "a.example");
    }
}
