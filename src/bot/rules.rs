// src/bot/rules.rs - Compiles raw rule lists into reusable matchers

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

/// Currency symbol followed (optionally after whitespace) by an amount
const CURRENCY_AMOUNT_PATTERN: &str = r"[$£€]\s*[0-9]+(?:\.[0-9]{1,2})?";
/// Any currency symbol on its own
const CURRENCY_SYMBOL_PATTERN: &str = r"[$£€]";

/// Raw, uncompiled rule lists as they come out of configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub restricted_terms: Vec<String>,
    pub price_keywords: Vec<String>,
    pub exception_patterns: Vec<String>,
    pub price_patterns_enabled: bool,
}

/// How a matcher is anchored against the message text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Whole word only, used for terms and keywords
    WholeWord,
    /// Anywhere in the text, used for exceptions
    Substring,
}

/// A single case-insensitive literal matcher
#[derive(Debug, Clone)]
pub struct TermMatcher {
    key: String,
    mode: MatchMode,
    regex: Regex,
}

impl TermMatcher {
    /// Build a matcher for a user-supplied literal. Metacharacters are escaped
    /// so the text is always matched literally.
    pub fn new(literal: &str, mode: MatchMode) -> Result<Self, regex::Error> {
        let escaped = regex::escape(literal);
        let pattern = match mode {
            MatchMode::WholeWord => format!(r"\b{}\b", escaped),
            MatchMode::Substring => escaped,
        };

        let regex = RegexBuilder::new(&pattern).case_insensitive(true).build()?;

        Ok(Self {
            key: literal.to_lowercase(),
            mode,
            regex,
        })
    }

    /// Lower-cased literal this matcher was built from
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

/// Immutable matcher collections built once at startup.
///
/// Holds no per-message state, so one instance can be shared (behind an `Arc`)
/// across every pipeline run.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub terms: Vec<TermMatcher>,
    pub price_keywords: Vec<TermMatcher>,
    pub exceptions: Vec<TermMatcher>,
    pub price_patterns_enabled: bool,
    currency_amount: Regex,
    currency_symbol: Regex,
}

impl CompiledRules {
    /// Compile a rule set. Blank entries are skipped; an empty list simply
    /// never matches on that axis.
    pub fn compile(rules: &RuleSet) -> Result<Self> {
        let compiled = Self {
            terms: compile_list("restricted term", &rules.restricted_terms, MatchMode::WholeWord),
            price_keywords: compile_list("price keyword", &rules.price_keywords, MatchMode::WholeWord),
            exceptions: compile_list("exception pattern", &rules.exception_patterns, MatchMode::Substring),
            price_patterns_enabled: rules.price_patterns_enabled,
            currency_amount: Regex::new(CURRENCY_AMOUNT_PATTERN)
                .context("Failed to compile currency amount pattern")?,
            currency_symbol: Regex::new(CURRENCY_SYMBOL_PATTERN)
                .context("Failed to compile currency symbol pattern")?,
        };

        debug!(
            "Compiled {} terms, {} price keywords, {} exceptions (price patterns {})",
            compiled.terms.len(),
            compiled.price_keywords.len(),
            compiled.exceptions.len(),
            if compiled.price_patterns_enabled { "on" } else { "off" }
        );

        Ok(compiled)
    }

    /// Currency symbol plus amount occurrences, in text order
    pub fn currency_amounts<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.currency_amount.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Bare currency symbol occurrences, in text order
    pub fn currency_symbols<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.currency_symbol.find_iter(text).map(|m| m.as_str()).collect()
    }
}

fn compile_list(kind: &str, literals: &[String], mode: MatchMode) -> Vec<TermMatcher> {
    let mut matchers = Vec::with_capacity(literals.len());

    for literal in literals {
        let trimmed = literal.trim();
        if trimmed.is_empty() {
            continue;
        }

        match TermMatcher::new(trimmed, mode) {
            Ok(matcher) => matchers.push(matcher),
            Err(e) => {
                warn!("Skipping {} '{}': {}", kind, trimmed, e);
            }
        }
    }

    matchers
}
