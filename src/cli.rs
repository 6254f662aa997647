//! Command-line surface.

use clap::{ArgGroup, Parser};

#[derive(Parser, Debug)]
#[command(name = "rusty-assist")]
#[command(about = "Turn plain-language requests into shell commands, with safety checks", long_about = None)]
#[command(version)]
#[command(group(
    ArgGroup::new("mode")
        .args(["prompt", "enable", "disable", "status", "usage", "api_key", "reset"])
        .required(true)
        .multiple(false)
))]
pub struct Cli {
    /// What you want to do, e.g. "list all rust files here"
    #[arg(value_name = "REQUEST", num_args = 1.., trailing_var_arg = true, allow_hyphen_values = true)]
    pub prompt: Vec<String>,

    /// Run safe commands without asking
    #[arg(long)]
    pub enable: bool,

    /// Ask before running every command
    #[arg(long)]
    pub disable: bool,

    /// Show configuration and safety status
    #[arg(long)]
    pub status: bool,

    /// Show usage statistics
    #[arg(long)]
    pub usage: bool,

    /// Save an API key; an empty value removes it, no value shows the key status
    #[arg(long, value_name = "KEY", num_args = 0..=1)]
    pub api_key: Option<Option<String>>,

    /// Restore the default configuration
    #[arg(long)]
    pub reset: bool,
}

/// The one thing a single invocation does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Request(String),
    Enable,
    Disable,
    Status,
    Usage,
    ApiKey(Option<String>),
    Reset,
}

impl Cli {
    pub fn mode(self) -> Mode {
        if self.enable {
            Mode::Enable
        } else if self.disable {
            Mode::Disable
        } else if self.status {
            Mode::Status
        } else if self.usage {
            Mode::Usage
        } else if self.reset {
            Mode::Reset
        } else if let Some(key) = self.api_key {
            Mode::ApiKey(key)
        } else {
            Mode::Request(self.prompt.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode(args: &[&str]) -> Mode {
        Cli::try_parse_from(args).unwrap().mode()
    }

    #[test]
    fn test_request_words_are_joined() {
        assert_eq!(
            mode(&["rusty-assist", "find", "large", "files"]),
            Mode::Request("find large files".to_string())
        );
        assert_eq!(
            mode(&["rusty-assist", "show files named -v"]),
            Mode::Request("show files named -v".to_string())
        );
    }

    #[test]
    fn test_flags() {
        assert_eq!(mode(&["rusty-assist", "--enable"]), Mode::Enable);
        assert_eq!(mode(&["rusty-assist", "--disable"]), Mode::Disable);
        assert_eq!(mode(&["rusty-assist", "--status"]), Mode::Status);
        assert_eq!(mode(&["rusty-assist", "--usage"]), Mode::Usage);
        assert_eq!(mode(&["rusty-assist", "--reset"]), Mode::Reset);
    }

    #[test]
    fn test_api_key_forms() {
        assert_eq!(mode(&["rusty-assist", "--api-key"]), Mode::ApiKey(None));
        assert_eq!(
            mode(&["rusty-assist", "--api-key", "AIzaTest"]),
            Mode::ApiKey(Some("AIzaTest".to_string()))
        );
        assert_eq!(mode(&["rusty-assist", "--api-key", ""]), Mode::ApiKey(Some(String::new())));
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["rusty-assist", "--enable", "--disable"]).is_err());
        assert!(Cli::try_parse_from(["rusty-assist", "--status", "list files"]).is_err());
    }

    #[test]
    fn test_something_is_required() {
        assert!(Cli::try_parse_from(["rusty-assist"]).is_err());
    }
}
