// src/bot/metrics.rs - Day-bucketed trigger counters

use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::Verdict;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Counter {
    count: u64,
    /// Insertion sequence, breaks ties in top-N queries
    order: u64,
}

/// Ordered count table with stable tie-breaking
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CountTable {
    counters: HashMap<String, Counter>,
    next_order: u64,
}

impl CountTable {
    pub fn increment(&mut self, key: &str) {
        let next_order = &mut self.next_order;
        let counter = self.counters.entry(key.to_string()).or_insert_with(|| {
            let counter = Counter { count: 0, order: *next_order };
            *next_order += 1;
            counter
        });
        counter.count += 1;
    }

    pub fn get(&self, key: &str) -> u64 {
        self.counters.get(key).map(|c| c.count).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.counters.clear();
        self.next_order = 0;
    }

    /// Highest counts first; equal counts keep first-seen order
    pub fn top(&self, n: usize) -> Vec<(String, u64)> {
        let mut entries: Vec<(&String, &Counter)> = self.counters.iter().collect();
        entries.sort_by(|(_, a), (_, b)| b.count.cmp(&a.count).then(a.order.cmp(&b.order)));
        entries
            .into_iter()
            .take(n)
            .map(|(key, counter)| (key.clone(), counter.count))
            .collect()
    }
}

/// Trigger counters for the current UTC day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyMetrics {
    day: NaiveDate,
    triggers_today: u64,
    by_channel: CountTable,
    by_rule: CountTable,
}

impl DailyMetrics {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            day: now.date_naive(),
            triggers_today: 0,
            by_channel: CountTable::default(),
            by_rule: CountTable::default(),
        }
    }

    /// Record one triggered verdict, rolling the counters over first if the
    /// UTC date has changed since the last update.
    pub fn record(&mut self, verdict: &Verdict, channel_id: &str, now: DateTime<Utc>) {
        self.roll_over(now);

        self.triggers_today += 1;
        self.by_channel.increment(channel_id);
        for rule_key in verdict.rule_keys() {
            self.by_rule.increment(&rule_key);
        }
    }

    /// Reset the counters if `now` falls on a different UTC day
    pub fn roll_over(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.day {
            info!(
                "Daily moderation metrics rolled over from {} ({} triggers)",
                self.day, self.triggers_today
            );
            self.triggers_today = 0;
            self.by_channel.clear();
            self.by_rule.clear();
            self.day = today;
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn triggers_today(&self) -> u64 {
        self.triggers_today
    }

    pub fn channel_count(&self, channel_id: &str) -> u64 {
        self.by_channel.get(channel_id)
    }

    pub fn rule_count(&self, rule_key: &str) -> u64 {
        self.by_rule.get(rule_key)
    }

    pub fn top_channels(&self, n: usize) -> Vec<(String, u64)> {
        self.by_channel.top(n)
    }

    pub fn top_rules(&self, n: usize) -> Vec<(String, u64)> {
        self.by_rule.top(n)
    }
}
