use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A frame sent or received over the websocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeMessage {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub message_ref: Value,
}

/// Phoenix and realtime events this client sends or understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    PhoenixJoin,
    PhoenixLeave,
    PhoenixReply,
    PhoenixError,
    PhoenixClose,
    Heartbeat,
    PostgresChanges,
    Insert,
    Update,
    Delete,
}

impl ChannelEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelEvent::PhoenixJoin => "phx_join",
            ChannelEvent::PhoenixLeave => "phx_leave",
            ChannelEvent::PhoenixReply => "phx_reply",
            ChannelEvent::PhoenixError => "phx_error",
            ChannelEvent::PhoenixClose => "phx_close",
            ChannelEvent::Heartbeat => "heartbeat",
            ChannelEvent::PostgresChanges => "postgres_changes",
            ChannelEvent::Insert => "INSERT",
            ChannelEvent::Update => "UPDATE",
            ChannelEvent::Delete => "DELETE",
        }
    }

    pub fn from_wire(event: &str) -> Option<Self> {
        Some(match event {
            "phx_join" => ChannelEvent::PhoenixJoin,
            "phx_leave" => ChannelEvent::PhoenixLeave,
            "phx_reply" => ChannelEvent::PhoenixReply,
            "phx_error" => ChannelEvent::PhoenixError,
            "phx_close" => ChannelEvent::PhoenixClose,
            "heartbeat" => ChannelEvent::Heartbeat,
            "postgres_changes" => ChannelEvent::PostgresChanges,
            "INSERT" => ChannelEvent::Insert,
            "UPDATE" => ChannelEvent::Update,
            "DELETE" => ChannelEvent::Delete,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ChannelEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    fn from_wire(value: &str) -> Option<Self> {
        match value {
            "INSERT" => Some(ChangeKind::Insert),
            "UPDATE" => Some(ChangeKind::Update),
            "DELETE" => Some(ChangeKind::Delete),
            _ => None,
        }
    }
}

/// A row changed in `table`. Row data is deliberately not carried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostgresChange {
    pub table: String,
    pub kind: ChangeKind,
}

impl RealtimeMessage {
    pub fn new(topic: &str, event: ChannelEvent, payload: Value, message_ref: String) -> Self {
        Self {
            topic: topic.to_string(),
            event: event.as_str().to_string(),
            payload,
            message_ref: Value::String(message_ref),
        }
    }

    /// Join request listening for every change on `schema.table`
    pub fn join(topic: &str, schema: &str, table: &str, token: Option<&str>, message_ref: String) -> Self {
        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": [
                    { "event": "*", "schema": schema, "table": table }
                ]
            }
        });
        if let Some(token) = token {
            payload["access_token"] = Value::String(token.to_string());
        }
        Self::new(topic, ChannelEvent::PhoenixJoin, payload, message_ref)
    }

    pub fn leave(topic: &str, message_ref: String) -> Self {
        Self::new(topic, ChannelEvent::PhoenixLeave, json!({}), message_ref)
    }

    pub fn heartbeat(message_ref: String) -> Self {
        Self::new("phoenix", ChannelEvent::Heartbeat, json!({}), message_ref)
    }

    /// Reads a row change out of the frame, if it carries one.
    ///
    /// Accepts both the `postgres_changes` envelope and the older
    /// per-event frames (`INSERT`, `UPDATE`, `DELETE`).
    pub fn as_change(&self) -> Option<PostgresChange> {
        let body = match ChannelEvent::from_wire(&self.event)? {
            ChannelEvent::PostgresChanges => self.payload.get("data")?,
            ChannelEvent::Insert | ChannelEvent::Update | ChannelEvent::Delete => &self.payload,
            _ => return None,
        };
        let kind = body
            .get("type")
            .or_else(|| body.get("eventType"))
            .and_then(Value::as_str)
            .and_then(ChangeKind::from_wire)?;
        let table = body.get("table").and_then(Value::as_str)?.to_string();
        Some(PostgresChange { table, kind })
    }

    /// `Some(reason)` when this is a reply reporting a failed request
    pub fn reply_error(&self) -> Option<String> {
        if ChannelEvent::from_wire(&self.event)? != ChannelEvent::PhoenixReply {
            return None;
        }
        match self.payload.get("status").and_then(Value::as_str) {
            Some("error") => Some(
                self.payload
                    .get("response")
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "unknown".to_string()),
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: Value) -> RealtimeMessage {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn join_lists_all_events_for_table() {
        let msg = RealtimeMessage::join("realtime:services-1", "public", "services", None, "1".into());
        let text = serde_json::to_value(&msg).unwrap();
        assert_eq!(text["event"], "phx_join");
        assert_eq!(text["ref"], "1");
        let change = &text["payload"]["config"]["postgres_changes"][0];
        assert_eq!(change["event"], "*");
        assert_eq!(change["table"], "services");
        assert!(text["payload"].get("access_token").is_none());
    }

    #[test]
    fn reads_postgres_changes_envelope() {
        let msg = parse(json!({
            "topic": "realtime:contact_messages-1",
            "event": "postgres_changes",
            "payload": {
                "ids": [1],
                "data": {
                    "schema": "public",
                    "table": "contact_messages",
                    "type": "INSERT",
                    "record": {"id": 4, "name": "Ann"}
                }
            },
            "ref": null
        }));
        assert_eq!(
            msg.as_change(),
            Some(PostgresChange {
                table: "contact_messages".into(),
                kind: ChangeKind::Insert
            })
        );
    }

    #[test]
    fn reads_legacy_frames() {
        let msg = parse(json!({
            "topic": "realtime:public:doctors",
            "event": "DELETE",
            "payload": {"type": "DELETE", "table": "doctors", "old_record": {"id": 2}},
            "ref": null
        }));
        assert_eq!(msg.as_change().map(|c| c.kind), Some(ChangeKind::Delete));
    }

    #[test]
    fn replies_are_not_changes() {
        let msg = parse(json!({
            "topic": "realtime:faqs-1",
            "event": "phx_reply",
            "payload": {"status": "error", "response": {"reason": "unmatched topic"}},
            "ref": "3"
        }));
        assert!(msg.as_change().is_none());
        assert!(msg.reply_error().unwrap().contains("unmatched topic"));
    }
}
