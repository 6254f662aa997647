//! User confirmation capability.
//!
//! The policy only needs a yes/no answer; where it comes from is pluggable so
//! the request cycle can be driven by a scripted source in tests.

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crossterm::style::Stylize;

/// Returns true for "y" / "yes", ignoring case and surrounding whitespace.
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub trait Confirm {
    /// Show `message` and return the raw answer, `None` when no answer can
    /// be read (closed stdin).
    fn ask(&mut self, message: &str) -> Option<String>;

    /// Yes/no question. Anything other than an affirmative answer is a no.
    fn confirm(&mut self, message: &str) -> bool {
        self.ask(&format!("{} [y/N]", message))
            .map(|answer| is_affirmative(&answer))
            .unwrap_or(false)
    }
}

/// Blocking prompt on the terminal.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn ask(&mut self, message: &str) -> Option<String> {
        let mut stdout = io::stdout();
        if let Err(e) = write!(stdout, "{} {}: ", "?".yellow().bold(), message).and_then(|_| stdout.flush()) {
            tracing::warn!("Failed to write confirmation prompt: {}", e);
        }

        let mut input = String::new();
        match io::stdin().lock().read_line(&mut input) {
            Ok(0) => None,
            Ok(_) => Some(input.trim().to_string()),
            Err(e) => {
                tracing::warn!("Failed to read confirmation answer: {}", e);
                None
            }
        }
    }
}

/// Answers from a fixed script; records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedConfirm {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedConfirm {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }
}

impl Confirm for ScriptedConfirm {
    fn ask(&mut self, message: &str) -> Option<String> {
        self.asked.push(message.to_string());
        self.answers.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affirmative_answers() {
        for answer in ["y", "Y", "yes", "YES", " Yes \n"] {
            assert!(is_affirmative(answer), "{answer:?}");
        }
        for answer in ["", "n", "no", "yep", "sure", "yes please", "1"] {
            assert!(!is_affirmative(answer), "{answer:?}");
        }
    }

    #[test]
    fn test_scripted_confirm() {
        let mut confirm = ScriptedConfirm::new(["y", "nope"]);
        assert!(confirm.confirm("first?"));
        assert!(!confirm.confirm("second?"));
        // script exhausted behaves like closed stdin
        assert!(!confirm.confirm("third?"));
        assert_eq!(confirm.asked.len(), 3);
        assert!(confirm.asked[0].contains("[y/N]"));
    }
}
