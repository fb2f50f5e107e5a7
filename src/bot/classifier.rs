// src/bot/classifier.rs - Turns message text into a moderation verdict

use log::debug;

use crate::bot::rules::CompiledRules;
use crate::types::{TriggerType, Verdict};

/// Classify a message against the compiled rules.
///
/// Terms and price signals are collected first; if any exception pattern is
/// present anywhere in the text the whole verdict is discarded.
pub fn classify(text: &str, rules: &CompiledRules) -> Verdict {
    let mut matched_terms = Vec::new();
    for matcher in &rules.terms {
        if matcher.is_match(text) {
            push_unique(&mut matched_terms, matcher.key());
        }
    }

    let mut matched_price_signals = Vec::new();
    if rules.price_patterns_enabled {
        for amount in rules.currency_amounts(text) {
            push_unique(&mut matched_price_signals, amount);
        }
        for symbol in rules.currency_symbols(text) {
            push_unique(&mut matched_price_signals, symbol);
        }
        for matcher in &rules.price_keywords {
            if matcher.is_match(text) {
                push_unique(&mut matched_price_signals, matcher.key());
            }
        }
    }

    if let Some(exception) = rules.exceptions.iter().find(|m| m.is_match(text)) {
        debug!(
            "Exception '{}' overrides {} term and {} price matches",
            exception.key(),
            matched_terms.len(),
            matched_price_signals.len()
        );
        return Verdict::default();
    }

    let mut trigger_types = Vec::new();
    if !matched_terms.is_empty() {
        trigger_types.push(TriggerType::WordMatch);
    }
    if !matched_price_signals.is_empty() {
        trigger_types.push(TriggerType::PricePattern);
    }

    Verdict {
        triggered: !trigger_types.is_empty(),
        matched_terms,
        matched_price_signals,
        trigger_types,
    }
}

fn push_unique(values: &mut Vec<String>, value: &str) {
    let lowered = value.to_lowercase();
    if !values.contains(&lowered) {
        values.push(lowered);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::rules::RuleSet;
    use crate::config::ModerationConfig;

    fn default_rules() -> CompiledRules {
        CompiledRules::compile(&ModerationConfig::default().rule_set()).unwrap()
    }

    fn rules_with(terms: &[&str], exceptions: &[&str], price: bool) -> CompiledRules {
        CompiledRules::compile(&RuleSet {
            restricted_terms: terms.iter().map(|s| s.to_string()).collect(),
            price_keywords: vec!["shipped".to_string(), "obo".to_string()],
            exception_patterns: exceptions.iter().map(|s| s.to_string()).collect(),
            price_patterns_enabled: price,
        })
        .unwrap()
    }

    #[test]
    fn test_word_match() {
        let verdict = classify("I want to sell my card", &rules_with(&["sell"], &[], true));

        assert!(verdict.triggered);
        assert_eq!(verdict.matched_terms, vec!["sell"]);
        assert!(verdict.matched_price_signals.is_empty());
        assert_eq!(verdict.trigger_types, vec![TriggerType::WordMatch]);
    }

    #[test]
    fn test_exception_cancels_match() {
        let verdict = classify(
            "I want to sell my card",
            &rules_with(&["sell"], &["sell my card"], true),
        );

        assert_eq!(verdict, Verdict::default());
        assert!(!verdict.triggered);
    }

    #[test]
    fn test_exception_overrides_everything() {
        let rules = rules_with(&["sell", "trade"], &["giveaway"], true);
        let verdict = classify("SELL trade $50 £ 30 shipped obo GIVEAWAY", &rules);

        assert!(!verdict.triggered);
        assert!(verdict.matched_terms.is_empty());
        assert!(verdict.matched_price_signals.is_empty());
        assert!(verdict.trigger_types.is_empty());
    }

    #[test]
    fn test_terms_are_deduplicated_and_lowercased() {
        let rules = rules_with(&["Sell", "sell"], &[], false);
        let verdict = classify("SELL sell Sell", &rules);

        assert_eq!(verdict.matched_terms, vec!["sell"]);
    }

    #[test]
    fn test_price_signals() {
        let rules = rules_with(&[], &[], true);

        for text in ["$50 each", "£ 30", "€12.5 firm", "just a $ sign"] {
            let verdict = classify(text, &rules);
            assert!(verdict.triggered, "expected trigger for {:?}", text);
            assert!(verdict.has_trigger(TriggerType::PricePattern));
            assert!(!verdict.has_trigger(TriggerType::WordMatch));
        }
    }

    #[test]
    fn test_price_detection_disabled() {
        let rules = rules_with(&[], &[], false);
        let verdict = classify("$400 shipped obo", &rules);

        assert!(!verdict.triggered);
        assert!(verdict.matched_price_signals.is_empty());
    }

    #[test]
    fn test_default_config_price_message() {
        let verdict = classify("DM me, $400 shipped", &default_rules());

        assert!(verdict.triggered);
        assert_eq!(verdict.trigger_types, vec![TriggerType::PricePattern]);
        assert!(verdict.matched_price_signals.contains(&"$400".to_string()));
        assert!(verdict.matched_price_signals.contains(&"shipped".to_string()));
        assert!(verdict.matched_price_signals.contains(&"$".to_string()));
        assert!(verdict.matched_terms.is_empty());
    }

    #[test]
    fn test_both_trigger_types() {
        let verdict = classify("Selling? no, I sell for €20", &default_rules());

        assert_eq!(verdict.matched_terms, vec!["sell"]);
        assert_eq!(
            verdict.trigger_types,
            vec![TriggerType::WordMatch, TriggerType::PricePattern]
        );
    }

    #[test]
    fn test_empty_text_never_triggers() {
        let verdict = classify("", &default_rules());
        assert_eq!(verdict, Verdict::default());
    }
}
