//! Event protocol.
//!
//! Frames are JSON objects `{"event": <name>, "data": <payload>}`.
//!
//! Client → server: `subscribe-topic {topic}`, `get-time`,
//! `change-topic {topic}`.
//! Server → client: `time-update {type, topic, current_time, timestamp}`,
//! `error {type, topic, error, timestamp}`.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    SubscribeTopic { topic: String },
    GetTime,
    ChangeTopic { topic: String },
}

impl ClientEvent {
    pub fn from_json(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

/// Value of the `type` field inside server payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    TimeUpdate,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeUpdate {
    #[serde(rename = "type")]
    pub kind: PayloadType,
    pub topic: String,
    pub current_time: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicError {
    #[serde(rename = "type")]
    pub kind: PayloadType,
    pub topic: String,
    pub error: String,
    pub timestamp: String,
}

/// Events the server emits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    TimeUpdate(TimeUpdate),
    Error(TopicError),
}

impl ServerEvent {
    pub fn time_update(topic: &str, current_time: String) -> Self {
        ServerEvent::TimeUpdate(TimeUpdate {
            kind: PayloadType::TimeUpdate,
            topic: topic.to_string(),
            current_time,
            timestamp: generated_at(),
        })
    }

    pub fn error(topic: &str, error: impl Into<String>) -> Self {
        ServerEvent::Error(TopicError {
            kind: PayloadType::Error,
            topic: topic.to_string(),
            error: error.into(),
            timestamp: generated_at(),
        })
    }

    pub fn topic(&self) -> &str {
        match self {
            ServerEvent::TimeUpdate(update) => &update.topic,
            ServerEvent::Error(error) => &error.topic,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ServerEvent::Error(_))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn generated_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
