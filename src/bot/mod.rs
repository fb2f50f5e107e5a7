use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::config::ModerationConfig;
use crate::platforms::{LogTarget, ModerationTransport};
use crate::types::{ChannelKind, MessageEvent, Verdict, WarningStatus};

pub mod classifier;
pub mod cooldown;
pub mod messages;
pub mod metrics;
pub mod rules;
pub mod session;

use messages::{compose_audit_log, compose_warning, AuditEntry};
use rules::CompiledRules;
use session::ModerationSession;

/// What happened to a message that triggered the filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModerationOutcome {
    pub verdict: Verdict,
    pub warning: WarningStatus,
    pub log_delivered: bool,
}

/// Decision orchestrator: runs the moderation pipeline for each message and
/// is the only component that talks to the transport.
pub struct ModerationBot {
    config: Arc<ModerationConfig>,
    rules: Arc<CompiledRules>,
    session: Arc<ModerationSession>,
    transport: Arc<dyn ModerationTransport>,
}

impl ModerationBot {
    /// Compile the configured rules and start a fresh session
    pub fn new(config: ModerationConfig, transport: Arc<dyn ModerationTransport>) -> Result<Self> {
        let rules = CompiledRules::compile(&config.rule_set())?;
        let session = ModerationSession::new(&config, Utc::now());

        Ok(Self::with_session(
            Arc::new(config),
            Arc::new(rules),
            Arc::new(session),
            transport,
        ))
    }

    /// Assemble a bot from already built parts, e.g. to share compiled rules
    /// between sessions
    pub fn with_session(
        config: Arc<ModerationConfig>,
        rules: Arc<CompiledRules>,
        session: Arc<ModerationSession>,
        transport: Arc<dyn ModerationTransport>,
    ) -> Self {
        info!(
            "Moderation bot ready on {} ({} terms, {} exceptions, price patterns {})",
            transport.platform_name(),
            rules.terms.len(),
            rules.exceptions.len(),
            if rules.price_patterns_enabled { "on" } else { "off" }
        );

        Self {
            config,
            rules,
            session,
            transport,
        }
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<ModerationSession> {
        &self.session
    }

    /// Scope checks on the inbound event. Pure; failures are silent.
    pub fn is_eligible(&self, event: &MessageEvent) -> bool {
        if !self.config.enabled {
            return false;
        }

        let guild_id = match event.guild_id.as_deref() {
            Some(guild_id) => guild_id,
            None => return false,
        };

        if event.author_is_bot {
            return false;
        }

        if let Some(filter) = self.config.guild_id.as_deref() {
            if filter != guild_id {
                return false;
            }
        }

        if event.channel_kind != ChannelKind::Text {
            return false;
        }

        if !self.config.rule_channel_ids.is_empty() {
            return self.config.rule_channel_ids.iter().any(|id| *id == event.channel_id);
        }

        let channel_name = event.channel_name.to_lowercase();
        self.config
            .rule_channel_names
            .iter()
            .any(|name| name.to_lowercase() == channel_name)
    }

    /// Run the pipeline for one message using the current time
    pub async fn handle_message(&self, event: &MessageEvent) -> Option<ModerationOutcome> {
        self.handle_message_at(event, Utc::now()).await
    }

    /// Run the pipeline for one message as of `now`.
    ///
    /// Returns `None` when the event is out of scope or clean. Delivery
    /// failures are folded into the outcome and never abort the pipeline.
    pub async fn handle_message_at(
        &self,
        event: &MessageEvent,
        now: DateTime<Utc>,
    ) -> Option<ModerationOutcome> {
        if !self.is_eligible(event) {
            return None;
        }

        let verdict = classifier::classify(event.text(), &self.rules);
        if !verdict.triggered {
            return None;
        }

        let metrics = self
            .session
            .record_trigger(&verdict, &event.channel_id, now)
            .await;

        info!(
            "Message {} from {} in #{} triggered: {:?}",
            event.message_id,
            event.author_display(),
            event.channel_name,
            verdict.trigger_types
        );

        let warning = self.deliver_warning(event, &verdict, now).await;

        let log_text = compose_audit_log(&AuditEntry {
            event,
            verdict: &verdict,
            warning: &warning,
            metrics: &metrics,
            include_matches: self.config.log_matched_terms,
        });

        // eligibility guarantees a guild id
        let log_delivered = match event.guild_id.as_deref() {
            Some(guild_id) => self.deliver_log(guild_id, &log_text, now).await,
            None => false,
        };

        Some(ModerationOutcome {
            verdict,
            warning,
            log_delivered,
        })
    }

    async fn deliver_warning(&self, event: &MessageEvent, verdict: &Verdict, now: DateTime<Utc>) -> WarningStatus {
        if self
            .session
            .should_suppress_warning(&event.author_id, &event.channel_id, now)
            .await
        {
            return WarningStatus::CooldownSuppressed;
        }

        let text = compose_warning(verdict, &self.config.rules_url);
        match self.transport.send_warning(event, &text).await {
            Ok(()) => WarningStatus::Sent,
            Err(e) => {
                warn!("Failed to send warning for message {}: {}", event.message_id, e);
                WarningStatus::Failed(e.to_string())
            }
        }
    }

    /// Send an audit log entry, re-resolving once if a cached channel fails
    async fn deliver_log(&self, guild_id: &str, text: &str, now: DateTime<Utc>) -> bool {
        if let Some(cached) = self.session.cached_log_channel(guild_id).await {
            match self.transport.send_log(&cached, text).await {
                Ok(()) => return true,
                Err(e) => {
                    warn!(
                        "Cached log channel {} for guild {} failed ({}), resolving again",
                        cached.id, guild_id, e
                    );
                    self.session.evict_log_channel(guild_id).await;
                }
            }
        }

        let target = LogTarget {
            channel_id: self.config.log_channel_id.as_deref(),
            channel_name: &self.config.log_channel_name,
        };

        let channel = match self.transport.resolve_log_channel(guild_id, &target).await {
            Ok(Some(channel)) => channel,
            Ok(None) => {
                warn!("No log channel found for guild {}", guild_id);
                return false;
            }
            Err(e) => {
                error!("Failed to resolve log channel for guild {}: {}", guild_id, e);
                return false;
            }
        };

        self.session
            .cache_log_channel(guild_id, channel.clone(), now)
            .await;

        match self.transport.send_log(&channel, text).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send moderation log to {}: {}", channel.id, e);
                false
            }
        }
    }

    /// Consume events one at a time until the sender side closes.
    ///
    /// A single consumer keeps per (user, channel) ordering intact.
    pub async fn run(&self, mut events: mpsc::Receiver<MessageEvent>) -> usize {
        info!("Moderation loop started");
        let mut processed = 0usize;

        while let Some(event) = events.recv().await {
            self.handle_message(&event).await;
            processed += 1;
        }

        info!("Moderation loop stopped after {} events", processed);
        processed
    }

    /// Summary of the session state
    pub async fn stats(&self) -> serde_json::Value {
        let metrics = self.session.metrics_snapshot(Utc::now()).await;

        serde_json::json!({
            "platform": self.transport.platform_name(),
            "enabled": self.config.enabled,
            "triggers_today": metrics.triggers_today,
            "top_channels": metrics.top_channels,
            "top_rules": metrics.top_rules,
            "cooldown_entries": self.session.cooldown_entries().await,
            "log_channel_cache": self.session.log_channel_cache_len().await,
        })
    }
}
