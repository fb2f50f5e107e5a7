// src/config/mod.rs - Moderation configuration loading and validation

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use tokio::fs;

use crate::bot::rules::RuleSet;

/// Environment variable prefix for every configuration key
pub const ENV_PREFIX: &str = "MODERATION_";

const MAX_COOLDOWN_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Complete configuration surface of the moderation filter.
///
/// Loaded once at startup; the rule lists are compiled into matchers and never
/// change for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModerationConfig {
    pub enabled: bool,

    /// Only moderate this guild when set
    pub guild_id: Option<String>,

    /// Authoritative channel allow-list; when non-empty, names are ignored
    pub rule_channel_ids: Vec<String>,
    /// Channel names to moderate (case-insensitive)
    pub rule_channel_names: Vec<String>,

    pub log_channel_id: Option<String>,
    pub log_channel_name: String,

    pub restricted_terms: Vec<String>,
    pub exception_patterns: Vec<String>,

    pub price_patterns_enabled: bool,
    pub price_keywords: Vec<String>,

    /// Minimum seconds between warnings for the same user and channel, 0 disables
    pub cooldown_seconds: u64,

    /// Include literal matched terms in audit log entries
    pub log_matched_terms: bool,

    pub rules_url: String,

    /// Cap on tracked (user, channel) cooldown entries
    pub max_cooldown_entries: usize,
    /// Cap on cached guild -> log channel resolutions
    pub max_log_channel_cache: usize,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            guild_id: None,
            rule_channel_ids: Vec::new(),
            rule_channel_names: vec!["general".to_string()],
            log_channel_id: None,
            log_channel_name: "mod-log".to_string(),
            restricted_terms: vec!["sell".to_string()],
            exception_patterns: Vec::new(),
            price_patterns_enabled: true,
            price_keywords: vec!["shipped".to_string(), "obo".to_string()],
            cooldown_seconds: 0,
            log_matched_terms: true,
            rules_url: String::new(),
            max_cooldown_entries: 10_000,
            max_log_channel_cache: 1_000,
        }
    }
}

impl ModerationConfig {
    /// Load configuration from `MODERATION_*` environment variables.
    ///
    /// Unset variables keep their defaults. List values are comma separated.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(format!("{}{}", ENV_PREFIX, key)).ok())
    }

    /// Build a configuration from an arbitrary key lookup (keys without prefix)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("ENABLED") {
            config.enabled = parse_bool("ENABLED", &value)?;
        }
        if let Some(value) = lookup("GUILD_ID") {
            config.guild_id = non_empty(value);
        }
        if let Some(value) = lookup("RULE_CHANNEL_IDS") {
            config.rule_channel_ids = parse_list(&value);
        }
        if let Some(value) = lookup("RULE_CHANNEL_NAMES") {
            config.rule_channel_names = parse_list(&value);
        }
        if let Some(value) = lookup("LOG_CHANNEL_ID") {
            config.log_channel_id = non_empty(value);
        }
        if let Some(value) = lookup("LOG_CHANNEL_NAME") {
            config.log_channel_name = value.trim().to_string();
        }
        if let Some(value) = lookup("RESTRICTED_TERMS") {
            config.restricted_terms = parse_list(&value);
        }
        if let Some(value) = lookup("EXCEPTION_PATTERNS") {
            config.exception_patterns = parse_list(&value);
        }
        if let Some(value) = lookup("PRICE_PATTERNS_ENABLED") {
            config.price_patterns_enabled = parse_bool("PRICE_PATTERNS_ENABLED", &value)?;
        }
        if let Some(value) = lookup("PRICE_KEYWORDS") {
            config.price_keywords = parse_list(&value);
        }
        if let Some(value) = lookup("COOLDOWN_SECONDS") {
            config.cooldown_seconds = value
                .trim()
                .parse()
                .with_context(|| format!("{}COOLDOWN_SECONDS must be a whole number of seconds, got '{}'", ENV_PREFIX, value))?;
        }
        if let Some(value) = lookup("LOG_MATCHED_TERMS") {
            config.log_matched_terms = parse_bool("LOG_MATCHED_TERMS", &value)?;
        }
        if let Some(value) = lookup("RULES_URL") {
            config.rules_url = value.trim().to_string();
        }
        if let Some(value) = lookup("MAX_COOLDOWN_ENTRIES") {
            config.max_cooldown_entries = value
                .trim()
                .parse()
                .with_context(|| format!("{}MAX_COOLDOWN_ENTRIES must be a number, got '{}'", ENV_PREFIX, value))?;
        }
        if let Some(value) = lookup("MAX_LOG_CHANNEL_CACHE") {
            config.max_log_channel_cache = value
                .trim()
                .parse()
                .with_context(|| format!("{}MAX_LOG_CHANNEL_CACHE must be a number, got '{}'", ENV_PREFIX, value))?;
        }

        debug!("Loaded moderation config: {:?}", config);
        Ok(config)
    }

    /// Load configuration from a TOML, YAML or JSON file
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();

        let config: Self = match extension.as_str() {
            "toml" => toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&content)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?,
            "json" => serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?,
            other => anyhow::bail!("Unsupported config format '{}' for {}", other, path.display()),
        };

        info!("Loaded moderation config from {}", path.display());
        Ok(config)
    }

    /// Check values that cannot be expressed through types alone
    pub fn validate(&self) -> Result<()> {
        if !self.rules_url.is_empty() {
            let parsed = url::Url::parse(&self.rules_url)
                .with_context(|| format!("rules_url '{}' is not a valid URL", self.rules_url))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                anyhow::bail!("rules_url must use http or https, got '{}'", parsed.scheme());
            }
        }

        if self.rule_channel_ids.is_empty() && self.rule_channel_names.is_empty() {
            anyhow::bail!("No rule channels configured: set rule_channel_ids or rule_channel_names");
        }

        if self.max_cooldown_entries == 0 {
            anyhow::bail!("max_cooldown_entries must be greater than zero");
        }

        Ok(())
    }

    /// Raw rule lists for the rule compiler
    pub fn rule_set(&self) -> RuleSet {
        RuleSet {
            restricted_terms: self.restricted_terms.clone(),
            price_keywords: self.price_keywords.clone(),
            exception_patterns: self.exception_patterns.clone(),
            price_patterns_enabled: self.price_patterns_enabled,
        }
    }

    pub fn cooldown(&self) -> chrono::Duration {
        // clamp to a year so absurd values can't overflow chrono
        chrono::Duration::seconds(self.cooldown_seconds.min(MAX_COOLDOWN_SECONDS) as i64)
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(anyhow::anyhow!("{}{} must be a boolean, got '{}'", ENV_PREFIX, key, other)),
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
