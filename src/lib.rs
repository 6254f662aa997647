//! RustyAssist - turn plain-language requests into shell commands, safely
//!
//! This library provides the core functionality for RustyAssist, including:
//! - Command generation through a Gemini model
//! - Safety classification of generated commands against a versioned rule table
//! - An execution gate that refuses, confirms or runs each command
//! - A persisted configuration and usage record with rate limiting
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use rusty_assist::app::{Assistant, Settings};
//! use rusty_assist::ai::GeminiClient;
//! use rusty_assist::config::{ConfigStore, JsonFileStore};
//! use rusty_assist::context::SystemContext;
//! use rusty_assist::security::{RuleSet, StdinConfirm};
//! use rusty_assist::shell::SystemShell;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = JsonFileStore::new("/tmp/rusty-assist/config.json");
//!     let record = store.load()?;
//!     let rules = RuleSet::builtin()?;
//!     let context = SystemContext::capture(None);
//!
//!     let generator = GeminiClient::new("AIza...", &record.api_base, record.model.clone());
//!     let runner = SystemShell::new(context.shell.clone(), Duration::from_secs(30));
//!     let mut assistant = Assistant::new(
//!         &store,
//!         &rules,
//!         Settings::from_record(&record),
//!         context,
//!         generator,
//!         StdinConfirm,
//!         runner,
//!     );
//!
//!     let outcome = assistant.handle_request("list the five largest files here").await?;
//!     println!("exit code {}", outcome.exit_code());
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod app;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod manage;
pub mod security;
pub mod shell;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use app::{Assistant, RequestOutcome, Settings};
pub use config::{ConfigRecord, ConfigStore, JsonFileStore};
pub use error::AssistError;
pub use security::{classify, RuleSet, SafetyTier};
