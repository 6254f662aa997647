//! Command execution gating with security verdict enforcement.
//!
//! `gate_command` maps a classification to a decision. `CommandGate` wraps
//! that decision in the per-command state machine:
//!
//! ```text
//! Received -> Classified -> Executed
//!                        -> Refused
//!                        -> ConfirmPending -> Executed
//!                                          -> Cancelled
//! ```
//!
//! The gate never runs anything itself; the caller invokes the runner only
//! when the gate reaches `Executed`.

use tracing::{debug, warn};

use crate::error::AssistError;

use super::classifier::Classification;
use super::rules::RuleSet;
use super::SafetyTier;

/// Result of evaluating a command against the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionDecision {
    /// Command should be executed immediately
    Execute,
    /// Command requires user confirmation before execution
    RequireConfirmation { reason: String },
    /// Command is denied and must not be executed
    Deny { category: String, reason: String },
}

/// Policy inputs taken from configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GateOptions {
    pub auto_execute: bool,
    /// Ask even for safe commands (used for model-suggested fixes).
    pub force_confirmation: bool,
}

/// Decide what to do with a classified command.
///
/// Dangerous commands are denied whatever the options say.
pub fn gate_command(cmd: &str, classification: &Classification, options: GateOptions) -> ExecutionDecision {
    match classification.tier {
        SafetyTier::Dangerous => ExecutionDecision::Deny {
            category: classification.category.unwrap_or("dangerous").to_string(),
            reason: format!(
                "'{}' {} and will not be executed",
                cmd,
                classification.reason.unwrap_or("matches a dangerous pattern")
            ),
        },
        SafetyTier::Risky => ExecutionDecision::RequireConfirmation {
            reason: format!(
                "Risky command ({}: {}). Execute '{}'?",
                classification.category.unwrap_or("risky"),
                classification.reason.unwrap_or("may modify the system"),
                cmd
            ),
        },
        SafetyTier::Safe if options.auto_execute && !options.force_confirmation => ExecutionDecision::Execute,
        SafetyTier::Safe => ExecutionDecision::RequireConfirmation {
            reason: format!("Execute '{}'?", cmd),
        },
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Received,
    Classified,
    ConfirmPending,
    /// Approved; the caller runs the command.
    Executed,
    Refused,
    Cancelled,
}

impl GateState {
    pub fn is_terminal(self) -> bool {
        matches!(self, GateState::Executed | GateState::Refused | GateState::Cancelled)
    }
}

/// State machine for a single generated command.
#[derive(Debug, Clone)]
pub struct CommandGate {
    command: String,
    state: GateState,
    classification: Option<Classification>,
    decision: Option<ExecutionDecision>,
}

impl CommandGate {
    /// Accept a command string. Empty or whitespace-only commands are a
    /// no-op and rejected here, before classification.
    pub fn receive(command: &str) -> Result<Self, AssistError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(AssistError::EmptyOrInvalidPrompt);
        }
        Ok(Self {
            command: command.to_string(),
            state: GateState::Received,
            classification: None,
            decision: None,
        })
    }

    pub fn classify(&mut self, rules: &RuleSet) -> Classification {
        if let Some(existing) = self.classification {
            return existing;
        }
        let classification = rules.classify(&self.command);
        debug!(command = %self.command, tier = ?classification.tier, category = ?classification.category, "classified");
        self.classification = Some(classification);
        self.state = GateState::Classified;
        classification
    }

    /// Move out of `Classified` according to the policy.
    pub fn decide(&mut self, options: GateOptions) -> ExecutionDecision {
        if let Some(decision) = &self.decision {
            return decision.clone();
        }
        let decision = match &self.classification {
            Some(classification) => gate_command(&self.command, classification, options),
            None => {
                warn!(command = %self.command, "decide() called before classify(); refusing");
                ExecutionDecision::Deny {
                    category: "unclassified".to_string(),
                    reason: format!("'{}' was not classified and will not be executed", self.command),
                }
            }
        };
        self.state = match decision {
            ExecutionDecision::Execute => GateState::Executed,
            ExecutionDecision::RequireConfirmation { .. } => GateState::ConfirmPending,
            ExecutionDecision::Deny { .. } => GateState::Refused,
        };
        self.decision = Some(decision.clone());
        decision
    }

    /// Apply the user's answer to a pending confirmation.
    pub fn respond(&mut self, affirmed: bool) -> GateState {
        if self.state != GateState::ConfirmPending {
            warn!(state = ?self.state, "confirmation response outside of ConfirmPending ignored");
            return self.state;
        }
        self.state = if affirmed {
            GateState::Executed
        } else {
            GateState::Cancelled
        };
        self.state
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn classification(&self) -> Option<Classification> {
        self.classification
    }
}
