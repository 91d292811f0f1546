use serde::Serialize;

use convoy_channels::{MessageKind, Platform};

/// A resolved external identity: one row per (tenant, platform, platform user).
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: String,
    pub tenant_id: String,
    pub platform: Platform,
    /// External user identifier on the platform.
    pub platform_id: String,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub last_seen: i64,
    /// 0–100, clamped in storage.
    pub lead_score: i64,
    pub lifecycle_stage: String,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "closed" {
            Self::Closed
        } else {
            Self::Active
        }
    }
}

/// Conversation priority. Ordering matters: the classifier only ever raises
/// it, never lowers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An open or closed thread between a contact and the system on one platform.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub contact_id: String,
    pub platform: Platform,
    /// Platform chat / phone id.
    pub thread_id: String,
    pub status: ConversationStatus,
    pub priority: Priority,
    pub last_message_at: i64,
    pub last_message_preview: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "outbound" {
            Self::Outbound
        } else {
            Self::Inbound
        }
    }
}

/// A persisted message, unique on `(platform, platform_message_id)`.
#[derive(Debug, Clone, Serialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub contact_id: String,
    pub platform: Platform,
    pub platform_message_id: String,
    pub direction: Direction,
    pub kind: MessageKind,
    pub content: String,
    pub media_ref: Option<String>,
    /// Provider message id this message replies to.
    pub reply_to: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_orders_for_escalation() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::parse("bogus"), Priority::Medium);
    }
}
