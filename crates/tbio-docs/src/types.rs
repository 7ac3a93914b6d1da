//! Core document types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    ARTICLE_TYPE, COMMENT_TYPE, ID_FIELD, MIGRATION_TYPE, PROFILE_TYPE, StoreError, TYPE_FIELD,
    USER_TYPE,
};

/// Generate a fresh document id.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Kind of a stored document, derived from its `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    User,
    Article,
    Profile,
    Comment,
    Migration,
    /// Any type this site does not attach behavior to.
    Other,
}

impl DocKind {
    /// Classify a `type` field value.
    pub fn from_type(doc_type: &str) -> Self {
        match doc_type {
            USER_TYPE => Self::User,
            ARTICLE_TYPE => Self::Article,
            PROFILE_TYPE => Self::Profile,
            COMMENT_TYPE => Self::Comment,
            MIGRATION_TYPE => Self::Migration,
            _ => Self::Other,
        }
    }
}

/// A schemaless stored document.
///
/// Documents are JSON objects. Typed views ([`User`], [`Profile`], ...) are
/// obtained with [`Document::decode`] and written back with
/// [`Document::encode`]; fields a typed view does not know about are only
/// preserved by views that flatten them (see [`Article`]).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize a typed record into a document.
    pub fn encode<T: Serialize>(record: &T) -> Result<Self, StoreError> {
        match serde_json::to_value(record)? {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::Invalid(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// Deserialize this document into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }

    pub fn id(&self) -> Option<&str> {
        self.get_str(ID_FIELD)
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.set(ID_FIELD, id.into());
    }

    pub fn doc_type(&self) -> Option<&str> {
        self.get_str(TYPE_FIELD)
    }

    pub fn kind(&self) -> DocKind {
        self.doc_type()
            .map(DocKind::from_type)
            .unwrap_or(DocKind::Other)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Whether the key is present at all, even if its value is `null`.
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }
}

impl From<Map<String, Value>> for Document {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Document {
    type Error = StoreError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StoreError::Invalid(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }
}

/// CMS user account. Owned by the CMS user subsystem; read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    /// Display name.
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    /// URL-safe name, usually prefixed with `user-`.
    #[serde(default, deserialize_with = "lenient_string")]
    pub slug: String,
    /// Opaque image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Value>,
    /// When the account was last updated, in whatever form the CMS stored it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Value>,
}

/// Accept `null` as empty and any non-string scalar as its JSON text, so a
/// sloppy display field never makes a user undecodable.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Public author profile, one per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type", default = "profile_type")]
    pub doc_type: String,
    /// Owning user.
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    /// Controls visibility of the profile page, not author attribution.
    #[serde(default = "default_published")]
    pub published: bool,
    /// Copied from the user when the profile is created; not kept in sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Value>,
    /// Creation time for new profiles; a backfilled profile carries its
    /// user's `updatedAt` verbatim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Value>,
    #[serde(default)]
    pub doc_permissions: Vec<Value>,
}

fn profile_type() -> String {
    PROFILE_TYPE.to_string()
}

fn default_published() -> bool {
    true
}

/// Article (blog post).
///
/// Only the author references are modelled; everything else rides along in
/// `extra` so a decode/encode cycle never drops content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    /// Deprecated author reference to a user. Legacy data may hold `null`
    /// or a non-string here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Value>,
    /// Author reference to a profile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_profile_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Reader comment on a piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub comment: String,
    /// Piece the comment was left on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub piece_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(comment: impl Into<String>, piece_id: Option<String>) -> Self {
        Self {
            id: generate_id(),
            doc_type: COMMENT_TYPE.to_string(),
            comment: comment.into(),
            piece_id,
            created_at: Utc::now(),
        }
    }
}
