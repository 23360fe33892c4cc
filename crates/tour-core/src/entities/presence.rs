//! Presence records and the typing projection derived from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

use crate::value_objects::UserId;

/// Field holding the participant's user id
pub const USER_ID_FIELD: &str = "user_id";
/// Field holding the participant's display name
pub const USER_NAME_FIELD: &str = "user_name";
/// Field holding the typing flag
pub const TYPING_FIELD: &str = "typing";
/// Field holding the announcement timestamp (RFC 3339)
pub const ONLINE_AT_FIELD: &str = "online_at";

/// One participant's announced presence record
///
/// Records are opaque key-value maps; only `user_id` and `typing` carry
/// meaning for the typing projection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PresenceRecord(Map<String, Value>);

/// Presence state of a channel: presence key -> latest record
pub type PresenceState = HashMap<String, PresenceRecord>;

impl PresenceRecord {
    /// Wrap an arbitrary JSON object
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Record announcing presence without typing
    pub fn idle(user_id: &UserId) -> Self {
        let mut map = Map::new();
        map.insert(USER_ID_FIELD.to_string(), Value::from(user_id.as_str()));
        map.insert(TYPING_FIELD.to_string(), Value::Bool(false));
        map.insert(ONLINE_AT_FIELD.to_string(), Value::from(Utc::now().to_rfc3339()));
        Self(map)
    }

    /// Record announcing that the user is typing
    pub fn typing(user_id: &UserId, display_name: &str, at: DateTime<Utc>) -> Self {
        let mut map = Map::new();
        map.insert(USER_ID_FIELD.to_string(), Value::from(user_id.as_str()));
        map.insert(USER_NAME_FIELD.to_string(), Value::from(display_name));
        map.insert(TYPING_FIELD.to_string(), Value::Bool(true));
        map.insert(ONLINE_AT_FIELD.to_string(), Value::from(at.to_rfc3339()));
        Self(map)
    }

    pub fn user_id(&self) -> Option<UserId> {
        self.0.get(USER_ID_FIELD).and_then(Value::as_str).map(UserId::from)
    }

    /// Only a literal `true` counts as typing
    pub fn is_typing(&self) -> bool {
        self.0.get(TYPING_FIELD).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn display_name(&self) -> Option<&str> {
        self.0.get(USER_NAME_FIELD).and_then(Value::as_str)
    }

    pub fn online_at(&self) -> Option<DateTime<Utc>> {
        self.0
            .get(ONLINE_AT_FIELD)
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// A remote participant currently typing in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypingUser {
    pub user_id: UserId,
    pub display_name: String,
}

impl TypingUser {
    pub fn new(user_id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }

    /// Collect the participants of `state` that are typing, excluding `local`.
    ///
    /// A record without a `user_id` field is attributed to its presence key.
    pub fn collect(state: &PresenceState, local: &UserId) -> HashSet<TypingUser> {
        state
            .iter()
            .filter(|(_, record)| record.is_typing())
            .filter_map(|(key, record)| {
                let user_id = record.user_id().unwrap_or_else(|| UserId::from(key.as_str()));
                if &user_id == local {
                    return None;
                }
                let display_name = record
                    .display_name()
                    .map_or_else(|| user_id.to_string(), str::to_string);
                Some(TypingUser {
                    user_id,
                    display_name,
                })
            })
            .collect()
    }
}
