// src/bot/session.rs - Long-lived moderation state for one served community

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{Mutex, RwLock};

use crate::bot::cooldown::CooldownTracker;
use crate::bot::metrics::DailyMetrics;
use crate::config::ModerationConfig;
use crate::types::{ChannelHandle, Verdict};

/// Number of entries reported in top channel / rule summaries
pub const TOP_N: usize = 3;

/// Point-in-time view of the daily counters, taken right after a trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub triggers_today: u64,
    pub top_channels: Vec<(String, u64)>,
    pub top_rules: Vec<(String, u64)>,
}

#[derive(Debug, Clone)]
struct CachedChannel {
    handle: ChannelHandle,
    cached_at: DateTime<Utc>,
}

/// Owns the cooldown tracker, daily metrics and log channel cache.
///
/// Constructed explicitly and passed to the orchestrator, so independent
/// sessions never share state. Each lock is held only for a single map
/// update and never across an outward call.
pub struct ModerationSession {
    cooldowns: Mutex<CooldownTracker>,
    metrics: Mutex<DailyMetrics>,
    log_channels: RwLock<HashMap<String, CachedChannel>>,
    max_log_channel_cache: usize,
}

impl ModerationSession {
    pub fn new(config: &ModerationConfig, now: DateTime<Utc>) -> Self {
        Self {
            cooldowns: Mutex::new(CooldownTracker::new(
                config.cooldown(),
                config.max_cooldown_entries,
            )),
            metrics: Mutex::new(DailyMetrics::new(now)),
            log_channels: RwLock::new(HashMap::new()),
            max_log_channel_cache: config.max_log_channel_cache.max(1),
        }
    }

    /// Update the daily counters and return the figures the audit log needs
    pub async fn record_trigger(
        &self,
        verdict: &Verdict,
        channel_id: &str,
        now: DateTime<Utc>,
    ) -> MetricsSnapshot {
        let mut metrics = self.metrics.lock().await;
        metrics.record(verdict, channel_id, now);

        MetricsSnapshot {
            triggers_today: metrics.triggers_today(),
            top_channels: metrics.top_channels(TOP_N),
            top_rules: metrics.top_rules(TOP_N),
        }
    }

    /// Current counters without recording anything
    pub async fn metrics_snapshot(&self, now: DateTime<Utc>) -> MetricsSnapshot {
        let mut metrics = self.metrics.lock().await;
        metrics.roll_over(now);

        MetricsSnapshot {
            triggers_today: metrics.triggers_today(),
            top_channels: metrics.top_channels(TOP_N),
            top_rules: metrics.top_rules(TOP_N),
        }
    }

    pub async fn should_suppress_warning(
        &self,
        user_id: &str,
        channel_id: &str,
        now: DateTime<Utc>,
    ) -> bool {
        self.cooldowns
            .lock()
            .await
            .should_suppress(user_id, channel_id, now)
    }

    pub async fn cooldown_entries(&self) -> usize {
        self.cooldowns.lock().await.len()
    }

    pub async fn cached_log_channel(&self, guild_id: &str) -> Option<ChannelHandle> {
        self.log_channels
            .read()
            .await
            .get(guild_id)
            .map(|cached| cached.handle.clone())
    }

    /// Remember the resolved log channel for a guild, evicting the oldest
    /// entry when the cache is full.
    pub async fn cache_log_channel(&self, guild_id: &str, handle: ChannelHandle, now: DateTime<Utc>) {
        let mut cache = self.log_channels.write().await;

        if !cache.contains_key(guild_id) && cache.len() >= self.max_log_channel_cache {
            let oldest = cache
                .iter()
                .min_by_key(|(_, cached)| cached.cached_at)
                .map(|(guild, _)| guild.clone());
            if let Some(oldest) = oldest {
                debug!("Log channel cache full, evicting guild {}", oldest);
                cache.remove(&oldest);
            }
        }

        cache.insert(
            guild_id.to_string(),
            CachedChannel { handle, cached_at: now },
        );
    }

    pub async fn evict_log_channel(&self, guild_id: &str) {
        self.log_channels.write().await.remove(guild_id);
    }

    pub async fn log_channel_cache_len(&self) -> usize {
        self.log_channels.read().await.len()
    }
}
