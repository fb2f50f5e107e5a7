// src/bot/cooldown.rs - Per (user, channel) warning suppression window

use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::collections::HashMap;

/// Key identifying a user within a channel
pub type CooldownKey = (String, String);

/// Tracks when each user was last warned in each channel.
///
/// Growth is bounded: once more than `max_entries` keys are held, entries
/// older than the cooldown window are swept, and if that is not enough the
/// oldest entries are evicted down to a low-water mark below the cap.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    last_warning: HashMap<CooldownKey, DateTime<Utc>>,
    duration: Duration,
    max_entries: usize,
}

impl CooldownTracker {
    pub fn new(duration: Duration, max_entries: usize) -> Self {
        Self {
            last_warning: HashMap::new(),
            duration,
            max_entries: max_entries.max(1),
        }
    }

    /// Decide whether a warning for this user and channel must be suppressed.
    ///
    /// A suppressed check leaves the stored timestamp untouched. Otherwise
    /// `now` is recorded before the warning is attempted, whether or not the
    /// delivery later succeeds. A zero duration never suppresses, and a
    /// stored timestamp later than `now` counts as expired.
    pub fn should_suppress(&mut self, user_id: &str, channel_id: &str, now: DateTime<Utc>) -> bool {
        let key = (user_id.to_string(), channel_id.to_string());

        if let Some(last) = self.last_warning.get(&key) {
            let elapsed = now.signed_duration_since(*last);
            if self.is_live(elapsed) {
                debug!(
                    "Warning for user {} in channel {} on cooldown for {}s more",
                    user_id,
                    channel_id,
                    (self.duration - elapsed).num_seconds()
                );
                return true;
            }
        }

        self.last_warning.insert(key, now);
        self.enforce_bound(now);
        false
    }

    pub fn last_warning(&self, user_id: &str, channel_id: &str) -> Option<DateTime<Utc>> {
        self.last_warning
            .get(&(user_id.to_string(), channel_id.to_string()))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.last_warning.len()
    }

    /// Drop every entry whose window has elapsed
    pub fn sweep(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.last_warning.len();
        let duration = self.duration;
        self.last_warning.retain(|_, last| {
            let elapsed = now.signed_duration_since(*last);
            elapsed >= Duration::zero() && elapsed < duration
        });
        before - self.last_warning.len()
    }

    fn is_live(&self, elapsed: Duration) -> bool {
        self.duration > Duration::zero() && elapsed >= Duration::zero() && elapsed < self.duration
    }

    /// Size the tracker is cut back to once live entries overflow the cap
    fn low_water_mark(&self) -> usize {
        (self.max_entries - self.max_entries / 10).max(1)
    }

    fn enforce_bound(&mut self, now: DateTime<Utc>) {
        if self.last_warning.len() <= self.max_entries {
            return;
        }

        let swept = self.sweep(now);
        if self.last_warning.len() <= self.max_entries {
            debug!("Swept {} expired cooldown entries", swept);
            return;
        }

        // Still over the cap with live entries: evict the oldest down to the
        // low-water mark.
        let excess = self.last_warning.len() - self.low_water_mark();
        let mut by_age: Vec<(CooldownKey, DateTime<Utc>)> = self
            .last_warning
            .iter()
            .map(|(key, last)| (key.clone(), *last))
            .collect();
        by_age.sort_by_key(|(_, last)| *last);

        for (key, _) in by_age.into_iter().take(excess) {
            self.last_warning.remove(&key);
        }
        debug!(
            "Evicted {} live cooldown entries over cap {}",
            excess, self.max_entries
        );
    }
}
