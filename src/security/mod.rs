//! Security module for command analysis and safety checks.
//!
//! This module classifies generated commands against a versioned rule table,
//! and gates execution on the result: safe commands may run directly, risky
//! ones need confirmation, dangerous ones are refused.

mod classifier;
pub mod confirm;
pub mod policy;
mod rules;

use std::fmt;

pub use classifier::{classify, Classification};
pub use confirm::{is_affirmative, Confirm, ScriptedConfirm, StdinConfirm};
pub use policy::{gate_command, CommandGate, ExecutionDecision, GateOptions, GateState};
pub use rules::{Matcher, Rule, RuleSet, RULESET_VERSION};

/// Danger tier, ordered by increasing restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafetyTier {
    Safe,
    Risky,
    Dangerous,
}

impl fmt::Display for SafetyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafetyTier::Safe => "safe",
            SafetyTier::Risky => "risky",
            SafetyTier::Dangerous => "dangerous",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_order() {
        assert!(SafetyTier::Safe < SafetyTier::Risky);
        assert!(SafetyTier::Risky < SafetyTier::Dangerous);
        assert_eq!(
            [SafetyTier::Risky, SafetyTier::Dangerous, SafetyTier::Safe].iter().max(),
            Some(&SafetyTier::Dangerous)
        );
    }
}
