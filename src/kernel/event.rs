use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kinds of transitions the agent reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Boot,
    Input,
    Output,
    Propose,
    Edit,
    Reflect,
    Exit,
    Health,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Boot => "BOOT",
            EventType::Input => "INPUT",
            EventType::Output => "OUTPUT",
            EventType::Propose => "PROPOSE",
            EventType::Edit => "EDIT",
            EventType::Reflect => "REFLECT",
            EventType::Exit => "EXIT",
            EventType::Health => "HEALTH",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical log record. Immutable once built; one JSON line on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub source: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

impl Event {
    pub fn new(kind: EventType, source: impl Into<String>, payload: Value) -> Self {
        Self::at(Utc::now(), kind, source, payload)
    }

    /// Build an event with an explicit timestamp.
    /// Non-object payloads are wrapped as `{"value": ...}`.
    pub fn at(time: DateTime<Utc>, kind: EventType, source: impl Into<String>, payload: Value) -> Self {
        let payload = match payload {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };
        Self {
            timestamp: time.timestamp(),
            kind,
            source: source.into(),
            payload,
        }
    }

    pub fn time(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.timestamp, 0).unwrap_or_default()
    }
}
