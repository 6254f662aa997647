//! The request cycle.
//!
//! `Assistant` ties together the collaborators of one invocation: it asks
//! the generator for a command, passes it through the command gate, runs it
//! when the gate allows and records usage in the configuration store.

use anyhow::anyhow;
use chrono::Local;
use tracing::{info, warn};

use crate::ai::{extract_command, CommandGenerator};
use crate::config::{ConfigRecord, ConfigStore, RateLimiter};
use crate::context::SystemContext;
use crate::error::AssistError;
use crate::security::{CommandGate, Confirm, ExecutionDecision, GateOptions, GateState, RuleSet, SafetyTier};
use crate::shell::{RunReport, ShellRunner};
use crate::ui;

/// Behaviour switches taken from the configuration record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub auto_execute: bool,
    pub auto_fix: bool,
    pub limiter: RateLimiter,
}

impl Settings {
    pub fn from_record(record: &ConfigRecord) -> Self {
        Self {
            auto_execute: record.auto_execute,
            auto_fix: record.auto_fix,
            limiter: record.rate_limiter(),
        }
    }
}

/// A command that went through the gate and ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    pub command: String,
    pub report: RunReport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOutcome {
    pub executed: Executed,
    /// The corrected command, when the first one failed and a fix ran.
    pub fix: Option<Executed>,
}

impl RequestOutcome {
    /// Exit code of the last command that ran.
    pub fn exit_code(&self) -> i32 {
        let last = self.fix.as_ref().unwrap_or(&self.executed);
        if last.report.success() {
            0
        } else {
            last.report.exit_code.filter(|code| *code != 0).unwrap_or(1)
        }
    }
}

/// Reject requests with nothing in them.
pub fn validate_prompt(prompt: &str) -> Result<&str, AssistError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(AssistError::EmptyOrInvalidPrompt);
    }
    Ok(prompt)
}

pub struct Assistant<'a, S, G, C, R> {
    store: &'a S,
    rules: &'a RuleSet,
    settings: Settings,
    context: SystemContext,
    generator: G,
    confirm: C,
    runner: R,
}

impl<'a, S, G, C, R> Assistant<'a, S, G, C, R>
where
    S: ConfigStore,
    G: CommandGenerator,
    C: Confirm,
    R: ShellRunner,
{
    pub fn new(
        store: &'a S,
        rules: &'a RuleSet,
        settings: Settings,
        context: SystemContext,
        generator: G,
        confirm: C,
        runner: R,
    ) -> Self {
        Self {
            store,
            rules,
            settings,
            context,
            generator,
            confirm,
            runner,
        }
    }

    /// Turn `prompt` into a command and run it if the gate allows.
    ///
    /// Refusal and cancellation come back as errors so the caller can map
    /// them to an exit code.
    pub async fn handle_request(&mut self, prompt: &str) -> Result<RequestOutcome, AssistError> {
        let prompt = validate_prompt(prompt)?;
        self.admit_model_call()?;

        ui::status("Generating command...");
        let reply = self.generator.generate(prompt, &self.context).await?;
        let command = extract_command(&reply).unwrap_or_default();
        info!(command = %command, "Generated command");

        let executed = self.gate_and_run(&command, false).await?;

        let fix = if !executed.report.success() && self.settings.auto_fix {
            self.try_fix(&executed).await
        } else {
            None
        };

        Ok(RequestOutcome { executed, fix })
    }

    fn admit_model_call(&self) -> Result<(), AssistError> {
        let limiter = self.settings.limiter;
        self.store.update(|record| limiter.admit(&mut record.usage, Local::now()))?
    }

    fn record_cycle(&self, state: GateState) -> Result<(), AssistError> {
        let executed = state == GateState::Executed;
        let today = Local::now().date_naive();
        self.store
            .update(|record| record.usage.record_request(today, executed))
    }

    async fn gate_and_run(&mut self, command: &str, force_confirmation: bool) -> Result<Executed, AssistError> {
        let mut gate = CommandGate::receive(command)?;
        ui::command(gate.command());

        let classification = gate.classify(self.rules);
        let options = GateOptions {
            auto_execute: self.settings.auto_execute,
            force_confirmation,
        };
        let decision = gate.decide(options);
        if let ExecutionDecision::RequireConfirmation { reason } = &decision {
            if classification.tier == SafetyTier::Risky {
                ui::warn("This command may modify your system");
            }
            let affirmed = self.confirm.confirm(reason);
            gate.respond(affirmed);
        }

        let state = gate.state();
        self.record_cycle(state)?;
        info!(command = %gate.command(), tier = %classification.tier, state = ?state, "Gate finished");

        match (state, decision) {
            (GateState::Executed, _) => {
                let report = self
                    .runner
                    .run(gate.command())
                    .await
                    .map_err(AssistError::Execution)?;
                ui::report(&report);
                Ok(Executed {
                    command: gate.command().to_string(),
                    report,
                })
            }
            (GateState::Refused, ExecutionDecision::Deny { category, reason }) => {
                Err(AssistError::DangerousCommandRefused { category, reason })
            }
            (GateState::Cancelled, _) => Err(AssistError::UserCancelled),
            (other, _) => Err(AssistError::Execution(anyhow!(
                "command gate stopped in state {:?}",
                other
            ))),
        }
    }

    /// One attempt at a corrected command. Failures here are reported and
    /// swallowed; the original run stands.
    async fn try_fix(&mut self, failed: &Executed) -> Option<Executed> {
        if let Err(e) = self.admit_model_call() {
            ui::warn(format!("Not asking for a fix: {}", e));
            return None;
        }

        ui::status("Asking for a fix...");
        let error = failed.report.failure_text();
        let reply = match self.generator.suggest_fix(&failed.command, &error, &self.context).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Fix request failed: {}", e);
                ui::warn(format!("Could not get a fix: {}", e));
                return None;
            }
        };

        let fixed = extract_command(&reply)?;
        if fixed == failed.command {
            info!("Model suggested the same command; skipping fix");
            return None;
        }

        ui::status("Suggested fix:");
        match self.gate_and_run(&fixed, true).await {
            Ok(executed) => Some(executed),
            Err(AssistError::UserCancelled) => {
                ui::status("Fix not applied");
                None
            }
            Err(e) => {
                ui::warn(format!("Fix not applied: {}", e));
                None
            }
        }
    }
}
