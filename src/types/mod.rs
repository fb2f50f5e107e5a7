// src/types/mod.rs - Core data types shared across the moderation pipeline

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of channel a message was posted in, as reported by the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Standard guild text channel, the only kind eligible for moderation
    #[default]
    Text,
    Voice,
    Forum,
    Thread,
    Announcement,
    Other,
}

/// Inbound message record handed to the moderation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    pub message_id: String,
    pub author_id: String,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub author_is_bot: bool,
    /// Absent for direct messages
    #[serde(default)]
    pub guild_id: Option<String>,
    pub channel_id: String,
    #[serde(default)]
    pub channel_name: String,
    #[serde(default)]
    pub channel_kind: ChannelKind,
    /// Missing text is treated as an empty message
    #[serde(default)]
    pub content: Option<String>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub permalink: String,
}

impl MessageEvent {
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Display name for logs, falling back to the raw author id
    pub fn author_display(&self) -> &str {
        self.author_name.as_deref().unwrap_or(&self.author_id)
    }
}

/// Why a message triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    WordMatch,
    PricePattern,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerType::WordMatch => "word_match",
            TriggerType::PricePattern => "price_pattern",
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying a single message.
///
/// The matched collections are de-duplicated and lower-cased, in first-seen
/// order. An exception match always yields the default (empty, untriggered)
/// verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub triggered: bool,
    pub matched_terms: Vec<String>,
    pub matched_price_signals: Vec<String>,
    pub trigger_types: Vec<TriggerType>,
}

impl Verdict {
    pub fn has_trigger(&self, trigger: TriggerType) -> bool {
        self.trigger_types.contains(&trigger)
    }

    /// Metric keys for every matched term and price signal
    pub fn rule_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.matched_terms
            .iter()
            .map(|term| format!("term:{}", term))
            .chain(
                self.matched_price_signals
                    .iter()
                    .map(|signal| format!("price:{}", signal)),
            )
    }
}

/// Outcome of the user-facing warning attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningStatus {
    Sent,
    CooldownSuppressed,
    Failed(String),
}

impl fmt::Display for WarningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningStatus::Sent => f.write_str("sent"),
            WarningStatus::CooldownSuppressed => f.write_str("cooldown_suppressed"),
            WarningStatus::Failed(error) => write!(f, "failed ({})", error),
        }
    }
}

/// Opaque reference to a resolved audit-log channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHandle {
    pub id: String,
    pub name: Option<String>,
}

impl ChannelHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), name: None }
    }

    pub fn named(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: Some(name.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_event_defaults_from_json() {
        let raw = r#"{
            "message_id": "1",
            "author_id": "42",
            "channel_id": "100",
            "timestamp": "2026-01-01T12:00:00Z"
        }"#;
        let event: MessageEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.text(), "");
        assert_eq!(event.author_display(), "42");
        assert_eq!(event.channel_kind, ChannelKind::Text);
        assert!(event.guild_id.is_none());
        assert!(!event.author_is_bot);
    }

    #[test]
    fn test_rule_keys_prefix_by_kind() {
        let verdict = Verdict {
            triggered: true,
            matched_terms: vec!["sell".to_string()],
            matched_price_signals: vec!["$400".to_string(), "shipped".to_string()],
            trigger_types: vec![TriggerType::WordMatch, TriggerType::PricePattern],
        };

        let keys: Vec<String> = verdict.rule_keys().collect();
        assert_eq!(keys, vec!["term:sell", "price:$400", "price:shipped"]);
    }

    #[test]
    fn test_warning_status_display() {
        assert_eq!(WarningStatus::Sent.to_string(), "sent");
        assert_eq!(WarningStatus::CooldownSuppressed.to_string(), "cooldown_suppressed");
        assert_eq!(
            WarningStatus::Failed("missing permissions".to_string()).to_string(),
            "failed (missing permissions)"
        );
    }
}
