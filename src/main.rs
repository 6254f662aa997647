//! Main entry point for RustyAssist.
//!
//! This file parses the command line, sets up logging next to the
//! configuration file, runs the selected mode and turns the result into a
//! process exit code.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use clap::Parser;

use rusty_assist::ai::GeminiClient;
use rusty_assist::app::{self, Assistant, Settings};
use rusty_assist::cli::{Cli, Mode};
use rusty_assist::config::{self, ConfigStore, JsonFileStore, API_KEY_ENV, CONFIG_PATH_ENV};
use rusty_assist::context::SystemContext;
use rusty_assist::error::AssistError;
use rusty_assist::manage;
use rusty_assist::security::{RuleSet, StdinConfirm};
use rusty_assist::shell::SystemShell;
use rusty_assist::ui;
use rusty_assist::utils::logger;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let path = match config::config_path(std::env::var_os(CONFIG_PATH_ENV)) {
        Ok(path) => path,
        Err(e) => return fail(&e),
    };

    // Hold the guard until exit so buffered log lines are flushed
    let _log_guard = logger::init_logging(&logger::log_dir_for(&path));
    tracing::info!(config = %path.display(), "Starting");

    match run(cli.mode(), path).await {
        Ok(code) => exit_code(code),
        Err(AssistError::UserCancelled) => {
            ui::status("Cancelled");
            ExitCode::SUCCESS
        }
        Err(e @ AssistError::DangerousCommandRefused { .. }) => {
            tracing::warn!("{}", e);
            ui::warn(&e);
            exit_code(e.exit_code())
        }
        Err(e) => fail(&e),
    }
}

fn fail(err: &AssistError) -> ExitCode {
    tracing::error!("{}", err);
    ui::error(err);
    exit_code(err.exit_code())
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn env_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}

fn builtin_rules() -> Result<RuleSet, AssistError> {
    RuleSet::builtin().map_err(|e| AssistError::Configuration(format!("invalid safety rule: {}", e)))
}

async fn run(mode: Mode, path: PathBuf) -> Result<i32, AssistError> {
    let store = JsonFileStore::new(path);

    match mode {
        Mode::Request(prompt) => {
            let prompt = app::validate_prompt(&prompt)?;
            let record = store.load()?;
            let api_key = record.require_api_key(env_api_key().as_deref())?;
            let rules = builtin_rules()?;

            let context = SystemContext::capture(record.preferred_shell.as_deref());
            let generator = GeminiClient::new(&api_key, &record.api_base, record.model.clone());
            let runner = SystemShell::new(
                context.shell.clone(),
                Duration::from_secs(record.command_timeout_secs.max(1)),
            );

            let mut assistant = Assistant::new(
                &store,
                &rules,
                Settings::from_record(&record),
                context,
                generator,
                StdinConfirm,
                runner,
            );
            let outcome = assistant.handle_request(prompt).await?;
            Ok(outcome.exit_code())
        }
        Mode::Enable => report(manage::set_auto_execute(&store, true)),
        Mode::Disable => report(manage::set_auto_execute(&store, false)),
        Mode::Status => {
            let rules = builtin_rules()?;
            let shell = SystemContext::capture(None).shell;
            report(manage::status_report(&store, &rules, env_api_key().as_deref(), &shell))
        }
        Mode::Usage => report(manage::usage_report(&store, Local::now())),
        Mode::ApiKey(key) => report(manage::api_key(&store, key.as_deref(), env_api_key().as_deref())),
        Mode::Reset => report(manage::reset(&store, &mut StdinConfirm)),
    }
}

fn report(result: Result<String, AssistError>) -> Result<i32, AssistError> {
    println!("{}", result?);
    Ok(0)
}
