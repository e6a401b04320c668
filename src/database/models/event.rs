use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::types::{Row, UserId};

/// An immutable activity record owned by one user.
///
/// `ts` is the store's insertion time. `payload.timestamp` is the server clock
/// at request time, written into the payload; both are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub user_id: UserId,
    pub kind: String,
    pub payload: Value,
    pub ts: DateTime<Utc>,
}

/// Validated input for an event insert.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub kind: String,
    pub payload: Map<String, Value>,
    pub site: Option<String>,
    pub provider: Option<String>,
}

impl NewEvent {
    /// Row for the insert. `user_id` always comes from the session.
    pub fn into_row(self, owner: UserId, now: DateTime<Utc>) -> Row {
        let payload = enrich_payload(self.payload, self.site, self.provider, now);

        let mut row = Row::new();
        row.insert("user_id".to_string(), Value::String(owner.to_string()));
        row.insert("kind".to_string(), Value::String(self.kind));
        row.insert("payload".to_string(), Value::Object(payload));
        row
    }
}

/// Adds `site`, `provider` and an ISO-8601 `timestamp` to the client payload.
/// Injected keys win over client keys of the same name; absent values are `null`.
pub fn enrich_payload(
    mut payload: Map<String, Value>,
    site: Option<String>,
    provider: Option<String>,
    now: DateTime<Utc>,
) -> Map<String, Value> {
    payload.insert("site".to_string(), site.map(Value::String).unwrap_or(Value::Null));
    payload.insert("provider".to_string(), provider.map(Value::String).unwrap_or(Value::Null));
    payload.insert(
        "timestamp".to_string(),
        Value::String(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
    );
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn enrichment_overrides_client_keys() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let payload = json!({ "x": 1, "timestamp": "client", "site": "spoofed" });
        let out = enrich_payload(
            payload.as_object().unwrap().clone(),
            Some("example.com".to_string()),
            None,
            now,
        );

        assert_eq!(out["x"], 1);
        assert_eq!(out["site"], "example.com");
        assert_eq!(out["provider"], Value::Null);
        assert_eq!(out["timestamp"], "2024-03-01T12:30:00.000Z");
    }

    #[test]
    fn row_is_owned_by_session_user() {
        let owner = UserId::new(Uuid::new_v4());
        let row = NewEvent {
            kind: "click".to_string(),
            payload: Map::new(),
            site: None,
            provider: Some("chatgpt".to_string()),
        }
        .into_row(owner, Utc::now());

        assert_eq!(row["user_id"], owner.to_string());
        assert_eq!(row["kind"], "click");
        assert_eq!(row["payload"]["provider"], "chatgpt");
        assert!(!row.contains_key("ts"));
    }
}
