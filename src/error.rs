//! Error types for the assistant.
//!
//! Every failure of a single invocation ends up as one of these variants,
//! is rendered once by `main`, and mapped to a process exit code.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssistError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rate limit reached, try again in {retry_after_secs} seconds")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("command refused ({category}): {reason}")]
    DangerousCommandRefused { category: String, reason: String },

    #[error("command cancelled")]
    UserCancelled,

    #[error("nothing to do: the request or generated command is empty")]
    EmptyOrInvalidPrompt,

    #[error("cannot access {}: {source}", path.display())]
    Store {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration file {}: {source} (fix it or run --reset)", path.display())]
    InvalidRecord {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to run command: {0:#}")]
    Execution(#[source] anyhow::Error),
}

impl AssistError {
    /// Process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            // graceful outcomes: nothing ran
            AssistError::UserCancelled | AssistError::DangerousCommandRefused { .. } => 0,
            AssistError::Store { .. } | AssistError::Execution(_) => 1,
            AssistError::Configuration(_) | AssistError::InvalidRecord { .. } => 2,
            AssistError::Network(_) => 4,
            AssistError::RateLimitExceeded { .. } => 5,
            AssistError::EmptyOrInvalidPrompt => 6,
        }
    }

    /// Whether a failed model call may be attempted again.
    pub fn is_transient(&self) -> bool {
        matches!(self, AssistError::Network(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(AssistError::UserCancelled.exit_code(), 0);
        assert_eq!(AssistError::Configuration("no key".into()).exit_code(), 2);
        assert_eq!(
            AssistError::DangerousCommandRefused {
                category: "disk formatting".into(),
                reason: "wipes a filesystem".into(),
            }
            .exit_code(),
            0
        );
        assert_eq!(AssistError::Network("timeout".into()).exit_code(), 4);
        assert_eq!(
            AssistError::RateLimitExceeded { retry_after_secs: 12 }.exit_code(),
            5
        );
        assert_eq!(AssistError::EmptyOrInvalidPrompt.exit_code(), 6);
    }

    #[test]
    fn test_only_network_errors_are_transient() {
        assert!(AssistError::Network("reset by peer".into()).is_transient());
        assert!(!AssistError::Configuration("bad key".into()).is_transient());
        assert!(!AssistError::RateLimitExceeded { retry_after_secs: 1 }.is_transient());
    }

    #[test]
    fn test_refusal_message_names_category() {
        let err = AssistError::DangerousCommandRefused {
            category: "fork bomb".into(),
            reason: "exhausts process table".into(),
        };
        assert!(err.to_string().contains("fork bomb"));
    }
}
