use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::types::{Row, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    pub id: Uuid,
    pub user_id: UserId,
    #[serde(rename = "type", default)]
    pub memory_type: Option<String>,
    pub content: String,
    #[serde(default)]
    pub importance: Option<i32>,
    #[serde(default)]
    pub pii: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The writable fields of a memory. Written as a whole: unset fields become `null`.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryFields {
    pub memory_type: Option<String>,
    pub content: String,
    pub importance: Option<i32>,
    pub pii: Option<bool>,
}

impl MemoryFields {
    pub fn to_row(&self) -> Row {
        let mut row = Row::new();
        row.insert("type".to_string(), self.memory_type.clone().map(Value::String).unwrap_or(Value::Null));
        row.insert("content".to_string(), Value::String(self.content.clone()));
        row.insert("importance".to_string(), self.importance.map(Value::from).unwrap_or(Value::Null));
        row.insert("pii".to_string(), self.pii.map(Value::Bool).unwrap_or(Value::Null));
        row
    }

    /// Row for an insert, owned by the session user.
    pub fn to_owned_row(&self, owner: UserId) -> Row {
        let mut row = self.to_row();
        row.insert("user_id".to_string(), Value::String(owner.to_string()));
        row
    }
}
