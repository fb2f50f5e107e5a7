// src/bot/messages.rs - Warning and audit log text

use crate::bot::session::MetricsSnapshot;
use crate::types::{MessageEvent, TriggerType, Verdict, WarningStatus};

const SELL_GUIDANCE: &str =
    "Selling is not allowed in this channel. Please take trades to the marketplace channels.";
const TERMS_GUIDANCE: &str = "Your message contains terms that are restricted in this channel.";
const PRICE_GUIDANCE: &str = "Please don't share or ask for prices here.";
const FALLBACK_GUIDANCE: &str = "Your message looks like it breaks this channel's rules.";

/// Build the user-facing warning for a triggered verdict
pub fn compose_warning(verdict: &Verdict, rules_url: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    if verdict.matched_terms.iter().any(|term| term == "sell") {
        lines.push(SELL_GUIDANCE.to_string());
    } else if verdict.has_trigger(TriggerType::WordMatch) {
        lines.push(TERMS_GUIDANCE.to_string());
    }

    if verdict.has_trigger(TriggerType::PricePattern) {
        lines.push(PRICE_GUIDANCE.to_string());
    }

    if lines.is_empty() {
        lines.push(FALLBACK_GUIDANCE.to_string());
    }

    if !rules_url.is_empty() {
        lines.push(format!("Rules: {}", rules_url));
    }

    lines.join("\n")
}

/// Everything the audit log entry reports about one trigger
#[derive(Debug, Clone)]
pub struct AuditEntry<'a> {
    pub event: &'a MessageEvent,
    pub verdict: &'a Verdict,
    pub warning: &'a WarningStatus,
    pub metrics: &'a MetricsSnapshot,
    pub include_matches: bool,
}

/// Build the audit log text for one trigger
pub fn compose_audit_log(entry: &AuditEntry<'_>) -> String {
    let event = entry.event;
    let trigger_types = entry
        .verdict
        .trigger_types
        .iter()
        .map(|t| t.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut lines = vec![
        "**Chat filter triggered**".to_string(),
        format!("User: {} ({})", event.author_display(), event.author_id),
        format!("Channel: #{} ({})", event.channel_name, event.channel_id),
        format!("Time: {}", event.timestamp.to_rfc3339()),
        format!("Triggers: {}", trigger_types),
    ];

    if entry.include_matches {
        if !entry.verdict.matched_terms.is_empty() {
            lines.push(format!("Matched terms: {}", entry.verdict.matched_terms.join(", ")));
        }
        if !entry.verdict.matched_price_signals.is_empty() {
            lines.push(format!(
                "Matched price signals: {}",
                entry.verdict.matched_price_signals.join(", ")
            ));
        }
    }

    lines.push(format!("Message: {}", event.permalink));

    let status = match entry.warning {
        WarningStatus::Failed(_) => "failed",
        WarningStatus::Sent => "sent",
        WarningStatus::CooldownSuppressed => "cooldown_suppressed",
    };
    lines.push(format!("Warning: {}", status));
    if let WarningStatus::Failed(error) = entry.warning {
        lines.push(format!("Warning delivery error: {}", error));
    }

    lines.push(format!("Triggers today: {}", entry.metrics.triggers_today));
    lines.push(format!("Top channels: {}", format_top(&entry.metrics.top_channels)));
    lines.push(format!("Top rules: {}", format_top(&entry.metrics.top_rules)));

    lines.join("\n")
}

fn format_top(entries: &[(String, u64)]) -> String {
    if entries.is_empty() {
        return "none".to_string();
    }

    entries
        .iter()
        .map(|(key, count)| format!("{} ({})", key, count))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChannelKind;
    use chrono::TimeZone;

    fn verdict(terms: &[&str], signals: &[&str]) -> Verdict {
        let mut trigger_types = Vec::new();
        if !terms.is_empty() {
            trigger_types.push(TriggerType::WordMatch);
        }
        if !signals.is_empty() {
            trigger_types.push(TriggerType::PricePattern);
        }
        Verdict {
            triggered: !trigger_types.is_empty(),
            matched_terms: terms.iter().map(|s| s.to_string()).collect(),
            matched_price_signals: signals.iter().map(|s| s.to_string()).collect(),
            trigger_types,
        }
    }

    fn event() -> MessageEvent {
        MessageEvent {
            message_id: "m1".to_string(),
            author_id: "42".to_string(),
            author_name: Some("trader".to_string()),
            author_is_bot: false,
            guild_id: Some("g1".to_string()),
            channel_id: "c1".to_string(),
            channel_name: "general".to_string(),
            channel_kind: ChannelKind::Text,
            content: Some("sell $40".to_string()),
            timestamp: chrono::Utc.with_ymd_and_hms(2026, 2, 3, 4, 5, 6).unwrap(),
            permalink: "https://chat.example/g1/c1/m1".to_string(),
        }
    }

    #[test]
    fn test_sell_warning_takes_precedence_over_generic_terms() {
        let text = compose_warning(&verdict(&["trade", "sell"], &[]), "");
        assert_eq!(text, SELL_GUIDANCE);
    }

    #[test]
    fn test_generic_terms_and_price_lines() {
        let text = compose_warning(&verdict(&["trade"], &["$40"]), "https://example.com/rules");
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines,
            vec![TERMS_GUIDANCE, PRICE_GUIDANCE, "Rules: https://example.com/rules"]
        );
    }

    #[test]
    fn test_fallback_warning() {
        let odd = Verdict {
            triggered: true,
            ..Verdict::default()
        };
        assert_eq!(compose_warning(&odd, ""), FALLBACK_GUIDANCE);
    }

    #[test]
    fn test_audit_log_with_matches_and_failure() {
        let event = event();
        let verdict = verdict(&["sell"], &["$40", "$"]);
        let warning = WarningStatus::Failed("missing access".to_string());
        let metrics = MetricsSnapshot {
            triggers_today: 5,
            top_channels: vec![("c1".to_string(), 4), ("c2".to_string(), 1)],
            top_rules: vec![("term:sell".to_string(), 5)],
        };

        let text = compose_audit_log(&AuditEntry {
            event: &event,
            verdict: &verdict,
            warning: &warning,
            metrics: &metrics,
            include_matches: true,
        });

        assert!(text.contains("User: trader (42)"));
        assert!(text.contains("Channel: #general (c1)"));
        assert!(text.contains("Time: 2026-02-03T04:05:06+00:00"));
        assert!(text.contains("Triggers: word_match, price_pattern"));
        assert!(text.contains("Matched terms: sell"));
        assert!(text.contains("Matched price signals: $40, $"));
        assert!(text.contains("Message: https://chat.example/g1/c1/m1"));
        assert!(text.contains("Warning: failed"));
        assert!(text.contains("Warning delivery error: missing access"));
        assert!(text.contains("Triggers today: 5"));
        assert!(text.contains("Top channels: c1 (4), c2 (1)"));
        assert!(text.contains("Top rules: term:sell (5)"));
    }

    #[test]
    fn test_audit_log_without_matches() {
        let event = event();
        let verdict = verdict(&["sell"], &[]);
        let metrics = MetricsSnapshot {
            triggers_today: 1,
            top_channels: Vec::new(),
            top_rules: Vec::new(),
        };

        let text = compose_audit_log(&AuditEntry {
            event: &event,
            verdict: &verdict,
            warning: &WarningStatus::CooldownSuppressed,
            metrics: &metrics,
            include_matches: false,
        });

        assert!(!text.contains("Matched terms"));
        assert!(text.contains("Warning: cooldown_suppressed"));
        assert!(!text.contains("delivery error"));
        assert!(text.contains("Top channels: none"));
        assert!(text.contains("Top rules: none"));
    }
}
