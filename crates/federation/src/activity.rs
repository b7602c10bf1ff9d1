//! Tagged activity dispatch types (§4.F, §9 design note).
//!
//! The inbox ingest pipeline never reflects on a raw JSON-LD dict: the wire
//! payload is parsed once into [`Activity`], a tagged enum with one variant
//! per activity type the relay understands, each carrying only the fields
//! the corresponding processor needs.

use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::Value;

/// IRI marking an audience as public in ActivityStreams.
pub const PUBLIC_AUDIENCE: &str = "https://www.w3.org/ns/activitystreams#Public";
const PUBLIC_AUDIENCE_SHORT: &str = "as:Public";
const PUBLIC_AUDIENCE_BARE: &str = "Public";

/// A parsed inbound activity, dispatched by `type` (§9).
#[derive(Debug, Clone)]
pub enum Activity {
    Follow(FollowLike),
    UndoFollow(FollowLike),
    Undo(UndoLike),
    Accept(FollowLike),
    Reject(FollowLike),
    Create(Broadcastable),
    Update(Broadcastable),
    Delete(Broadcastable),
    Announce(Broadcastable),
    Move(MoveLike),
    Unknown(Value),
}

impl Activity {
    /// The activity's own IRI, used for the dedup ring (§4.F step 3).
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Follow(a) | Self::Accept(a) | Self::Reject(a) => Some(&a.id),
            Self::UndoFollow(a) => Some(&a.id),
            Self::Undo(a) => Some(&a.id),
            Self::Create(a) | Self::Update(a) | Self::Delete(a) | Self::Announce(a) => {
                Some(&a.id)
            }
            Self::Move(a) => Some(&a.id),
            Self::Unknown(v) => v.get("id").and_then(Value::as_str),
        }
    }

    /// The actor IRI that sent this activity.
    #[must_use]
    pub fn actor(&self) -> Option<&str> {
        match self {
            Self::Follow(a) | Self::Accept(a) | Self::Reject(a) => Some(&a.actor),
            Self::UndoFollow(a) => Some(&a.actor),
            Self::Undo(a) => Some(&a.actor),
            Self::Create(a) | Self::Update(a) | Self::Delete(a) | Self::Announce(a) => {
                Some(&a.actor)
            }
            Self::Move(a) => Some(&a.actor),
            Self::Unknown(v) => v.get("actor").and_then(value_as_iri),
        }
    }

    /// The machine-readable type name, for logging.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Follow(_) => "Follow",
            Self::UndoFollow(_) => "Undo(Follow)",
            Self::Undo(_) => "Undo",
            Self::Accept(_) => "Accept",
            Self::Reject(_) => "Reject",
            Self::Create(_) => "Create",
            Self::Update(_) => "Update",
            Self::Delete(_) => "Delete",
            Self::Announce(_) => "Announce",
            Self::Move(_) => "Move",
            Self::Unknown(_) => "Unknown",
        }
    }

    /// Parses a JSON-LD activity body into a typed [`Activity`].
    ///
    /// # Errors
    /// Returns an error if the body is not a JSON object, or a recognized
    /// type is missing required fields (`id`/`actor`/`object`).
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| serde_json::Error::custom("missing activity `type`"))?
            .to_string();

        match kind.as_str() {
            "Follow" => Ok(Self::Follow(FollowLike::from_value(value)?)),
            "Accept" => Ok(Self::Accept(FollowLike::from_value(value)?)),
            "Reject" => Ok(Self::Reject(FollowLike::from_value(value)?)),
            "Create" => Ok(Self::Create(Broadcastable::from_value(value)?)),
            "Update" => Ok(Self::Update(Broadcastable::from_value(value)?)),
            "Delete" => Ok(Self::Delete(Broadcastable::from_value(value)?)),
            "Announce" => Ok(Self::Announce(Broadcastable::from_value(value)?)),
            "Move" => Ok(Self::Move(MoveLike::from_value(value)?)),
            "Undo" => {
                let undo = UndoLike::from_value(value)?;
                if undo
                    .object
                    .get("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t == "Follow")
                {
                    Ok(Self::UndoFollow(FollowLike {
                        id: undo.id,
                        actor: undo.actor,
                        object: undo
                            .object
                            .get("id")
                            .and_then(Value::as_str)
                            .unwrap_or_default()
                            .to_string(),
                    }))
                } else {
                    Ok(Self::Undo(undo))
                }
            }
            _ => Ok(Self::Unknown(value)),
        }
    }
}

fn value_as_iri(v: &Value) -> Option<&str> {
    match v {
        Value::String(s) => Some(s.as_str()),
        Value::Object(o) => o.get("id").and_then(Value::as_str),
        _ => None,
    }
}

fn require_str(value: &Value, field: &str) -> Result<String, serde_json::Error> {
    value
        .get(field)
        .and_then(value_as_iri)
        .map(str::to_string)
        .ok_or_else(|| serde_json::Error::custom(format!("activity missing `{field}`")))
}

/// Shape shared by Follow/Accept/Reject and Undo-of-Follow: an actor acting
/// on an object IRI (the followee, or the original Follow's `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowLike {
    pub id: String,
    pub actor: String,
    pub object: String,
}

impl FollowLike {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: require_str(&value, "id")?,
            actor: require_str(&value, "actor")?,
            object: require_str(&value, "object")?,
        })
    }
}

/// An Undo activity whose object has not yet been narrowed to a known shape.
#[derive(Debug, Clone)]
pub struct UndoLike {
    pub id: String,
    pub actor: String,
    pub object: Value,
}

impl UndoLike {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: require_str(&value, "id")?,
            actor: require_str(&value, "actor")?,
            object: value
                .get("object")
                .cloned()
                .ok_or_else(|| serde_json::Error::custom("Undo missing `object`"))?,
        })
    }
}

/// Create/Update/Delete/Announce: activities eligible for rebroadcast when
/// addressed to the public audience (§4.F step 6, §4.G).
#[derive(Debug, Clone)]
pub struct Broadcastable {
    pub id: String,
    pub actor: String,
    pub object: Value,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub raw: Value,
}

impl Broadcastable {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let id = require_str(&value, "id")?;
        let actor = require_str(&value, "actor")?;
        let object = value.get("object").cloned().unwrap_or(Value::Null);
        let to = string_list(value.get("to"));
        let cc = string_list(value.get("cc"));
        Ok(Self {
            id,
            actor,
            object,
            to,
            cc,
            raw: value,
        })
    }

    /// True if the ActivityStreams `Public` collection is addressed in
    /// `to` or `cc`, per §4.F step 6 ("with public audience").
    #[must_use]
    pub fn is_public(&self) -> bool {
        is_public_audience(&self.to) || is_public_audience(&self.cc)
    }
}

/// A `Move` activity: actor's old identity moving to a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveLike {
    pub id: String,
    pub actor: String,
    pub object: String,
    pub target: Option<String>,
}

impl MoveLike {
    fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: require_str(&value, "id")?,
            actor: require_str(&value, "actor")?,
            object: require_str(&value, "object")?,
            target: value.get("target").and_then(value_as_iri).map(str::to_string),
        })
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn is_public_audience(addresses: &[String]) -> bool {
    addresses
        .iter()
        .any(|a| a == PUBLIC_AUDIENCE || a == PUBLIC_AUDIENCE_SHORT || a == PUBLIC_AUDIENCE_BARE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_follow() {
        let value = json!({
            "type": "Follow",
            "id": "https://a.example/f/1",
            "actor": "https://a.example/u/a",
            "object": "https://relay.example/actor",
        });
        let activity = Activity::from_value(value).unwrap();
        assert!(matches!(activity, Activity::Follow(_)));
        assert_eq!(activity.actor(), Some("https://a.example/u/a"));
    }

    #[test]
    fn parses_undo_of_follow_as_undo_follow() {
        let value = json!({
            "type": "Undo",
            "id": "https://a.example/u/1",
            "actor": "https://a.example/u/a",
            "object": {
                "type": "Follow",
                "id": "https://a.example/f/1",
                "actor": "https://a.example/u/a",
                "object": "https://relay.example/actor",
            },
        });
        let activity = Activity::from_value(value).unwrap();
        assert!(matches!(activity, Activity::UndoFollow(_)));
    }

    #[test]
    fn create_with_public_audience_is_broadcastable() {
        let value = json!({
            "type": "Create",
            "id": "https://a.example/s/1",
            "actor": "https://a.example/u/a",
            "object": {"id": "https://a.example/s/1/obj"},
            "to": ["https://www.w3.org/ns/activitystreams#Public"],
        });
        let Activity::Create(create) = Activity::from_value(value).unwrap() else {
            panic!("expected Create");
        };
        assert!(create.is_public());
    }

    #[test]
    fn create_without_public_audience_is_not_broadcastable() {
        let value = json!({
            "type": "Create",
            "id": "https://a.example/s/2",
            "actor": "https://a.example/u/a",
            "object": {"id": "https://a.example/s/2/obj"},
            "to": ["https://a.example/u/a/followers"],
        });
        let Activity::Create(create) = Activity::from_value(value).unwrap() else {
            panic!("expected Create");
        };
        assert!(!create.is_public());
    }

    #[test]
    fn unknown_type_does_not_error() {
        let value = json!({"type": "IntransitiveActivity", "id": "https://a.example/x/1"});
        let activity = Activity::from_value(value).unwrap();
        assert!(matches!(activity, Activity::Unknown(_)));
    }
}
