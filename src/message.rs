use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "Assistant",
        }
    }
}

/// One transcript entry. Fields are private so an entry cannot change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    id: String,
    role: Role,
    content: String,
    timestamp: String,
}

impl Message {
    /// Build a new entry with a fresh id and the current UTC time
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content: content.into(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// ISO-8601 creation time, e.g. `2024-05-01T12:00:00.000Z`
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Wall-clock `HH:MM:SS` for display, or the raw timestamp if it does not parse
    pub fn clock_time(&self) -> String {
        chrono::DateTime::parse_from_rfc3339(self.timestamp())
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|_| self.timestamp().to_string())
    }
}
