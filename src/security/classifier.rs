//! Command classification against the rule table.

use super::rules::RuleSet;
use super::SafetyTier;

/// Outcome of classifying one command string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub tier: SafetyTier,
    /// Category of the matched rule, `None` for safe commands.
    pub category: Option<&'static str>,
    pub reason: Option<&'static str>,
}

impl Classification {
    pub fn safe() -> Self {
        Self {
            tier: SafetyTier::Safe,
            category: None,
            reason: None,
        }
    }
}

impl RuleSet {
    /// Classify a command. The most restrictive matching rule wins; a
    /// string that matches nothing is safe. Never fails.
    pub fn classify(&self, command: &str) -> Classification {
        // rules are stored most restrictive first, so the first hit wins
        self.rules()
            .iter()
            .find(|rule| rule.is_match(command))
            .map(|rule| Classification {
                tier: rule.tier,
                category: Some(rule.category),
                reason: Some(rule.reason),
            })
            .unwrap_or_else(Classification::safe)
    }
}

pub fn classify(command: &str, rules: &RuleSet) -> SafetyTier {
    rules.classify(command).tier
}
