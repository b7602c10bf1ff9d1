//! Nodeinfo discovery document types, both ours (served at `/nodeinfo/2.0.json`)
//! and the minimal shape we parse out of a remote instance's (§4.D, §6).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Builds the relay's own nodeinfo 2.0 document.
#[must_use]
pub fn build_nodeinfo_document(domain: &str, subscriber_count: u64) -> Value {
    json!({
        "version": "2.0",
        "software": {
            "name": "activityrelay",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "protocols": ["activitypub"],
        "services": {"inbound": [], "outbound": []},
        "openRegistrations": false,
        "usage": {
            "users": {"total": 1},
            "localPosts": 0,
        },
        "metadata": {
            "nodeName": domain,
            "peers": subscriber_count,
        },
    })
}

/// The `.well-known/nodeinfo` discovery document, pointing at the real one.
#[must_use]
pub fn build_nodeinfo_discovery(domain: &str) -> Value {
    json!({
        "links": [{
            "rel": "http://nodeinfo.diaspora.software/ns/schema/2.0",
            "href": format!("https://{domain}/nodeinfo/2.0.json"),
        }]
    })
}

/// Subset of a remote nodeinfo document the policy engine needs: the
/// software name, lowercased (§3 `Instance.software`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteNodeInfo {
    pub software: RemoteSoftware,
}

/// The `software` object of a nodeinfo document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteSoftware {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

impl RemoteNodeInfo {
    /// Lowercased software name, as stored in `inboxes.software` (§3).
    #[must_use]
    pub fn software_name(&self) -> String {
        self.software.name.to_lowercase()
    }
}

/// Extracts the nodeinfo 2.x document URL from a `.well-known/nodeinfo`
/// discovery response.
#[must_use]
pub fn nodeinfo_url_from_discovery(discovery: &Value) -> Option<String> {
    discovery
        .get("links")?
        .as_array()?
        .iter()
        .find(|link| {
            link.get("rel")
                .and_then(Value::as_str)
                .is_some_and(|rel| rel.contains("nodeinfo.diaspora.software/ns/schema/2"))
        })
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Builds a webfinger response for `acct:relay@domain` (§6).
#[must_use]
pub fn build_webfinger_document(domain: &str) -> Value {
    let actor = format!("https://{domain}/actor");
    json!({
        "subject": format!("acct:relay@{domain}"),
        "aliases": [actor],
        "links": [{
            "rel": "self",
            "type": "application/activity+json",
            "href": actor,
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_nodeinfo_url_from_discovery_links() {
        let discovery = json!({
            "links": [
                {"rel": "http://nodeinfo.diaspora.software/ns/schema/2.0", "href": "https://a.example/nodeinfo/2.0"},
                {"rel": "http://nodeinfo.diaspora.software/ns/schema/2.1", "href": "https://a.example/nodeinfo/2.1"},
            ]
        });
        assert_eq!(
            nodeinfo_url_from_discovery(&discovery).as_deref(),
            Some("https://a.example/nodeinfo/2.0")
        );
    }

    #[test]
    fn webfinger_document_has_self_link() {
        let doc = build_webfinger_document("relay.example");
        assert_eq!(doc["subject"], "acct:relay@relay.example");
        assert_eq!(doc["links"][0]["href"], "https://relay.example/actor");
    }
}
