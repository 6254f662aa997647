//! AI module for turning requests into shell commands.
//!
//! This module provides the model client, the prompts it sends, and the
//! parser that reduces a reply to a single command line.

pub mod client;
pub mod parser;
pub mod prompt;

pub use client::{with_retry, CommandGenerator, GeminiClient, RetryPolicy};
pub use parser::extract_command;
