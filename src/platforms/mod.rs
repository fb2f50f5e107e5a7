use async_trait::async_trait;
use thiserror::Error;

use crate::types::{ChannelHandle, MessageEvent};

pub mod console;

/// Failures reported by an outward transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("delivery failed: {0}")]
    Delivery(String),
    #[error("transport closed")]
    Closed,
}

/// Where audit logs for a guild should go, as configured
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget<'a> {
    pub channel_id: Option<&'a str>,
    pub channel_name: &'a str,
}

/// Narrow interface the moderation pipeline uses to reach the chat platform
#[async_trait]
pub trait ModerationTransport: Send + Sync {
    /// Reply to the offending message with a warning
    async fn send_warning(&self, target: &MessageEvent, text: &str) -> Result<(), TransportError>;

    /// Find the audit log channel for a guild; `Ok(None)` when none exists
    async fn resolve_log_channel(
        &self,
        guild_id: &str,
        target: &LogTarget<'_>,
    ) -> Result<Option<ChannelHandle>, TransportError>;

    /// Post an audit log entry
    async fn send_log(&self, channel: &ChannelHandle, text: &str) -> Result<(), TransportError>;

    /// Get the platform identifier
    fn platform_name(&self) -> &str;
}
