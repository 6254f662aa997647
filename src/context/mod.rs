//! System context for command generation.
//!
//! This module collects what the model needs to produce a command that works
//! here: operating system, architecture, shell, terminal, working directory
//! and which common tools are installed.

mod cwd;
mod env;

use serde::{Deserialize, Serialize};

pub use cwd::CurrentDir;
pub use env::{Environment, PROBED_TOOLS};

/// A snapshot of the system for prompt building.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemContext {
    pub os: String,
    pub arch: String,
    /// Preferred shell from configuration, else the detected one.
    pub shell: String,
    pub terminal: String,
    pub cwd: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub available_tools: Vec<String>,
}

impl SystemContext {
    /// Capture from the running process.
    pub fn capture(preferred_shell: Option<&str>) -> Self {
        Self::from_environment(&Environment::capture(), CurrentDir::capture_or_dot(), preferred_shell)
    }

    pub fn from_environment(env: &Environment, cwd: CurrentDir, preferred_shell: Option<&str>) -> Self {
        let shell = preferred_shell
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| env.shell())
            .map(str::to_string)
            .unwrap_or_else(|| default_shell().to_string());

        Self {
            os: os_name().to_string(),
            arch: std::env::consts::ARCH.to_string(),
            shell,
            terminal: env.terminal().unwrap_or("unknown").to_string(),
            cwd: cwd.path,
            available_tools: env.available_tools(PROBED_TOOLS),
        }
    }

    /// Render as the context block of a prompt.
    pub fn format_for_prompt(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("- OS: {}\n", self.os));
        out.push_str(&format!("- Architecture: {}\n", self.arch));
        out.push_str(&format!("- Shell: {}\n", self.shell));
        out.push_str(&format!("- Terminal: {}\n", self.terminal));
        if !self.available_tools.is_empty() {
            out.push_str(&format!("- Available tools: {}\n", self.available_tools.join(", ")));
        }
        out.push_str(&format!("- Current directory: {}\n", self.cwd));
        out
    }
}

fn os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "macOS",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

pub fn default_shell() -> &'static str {
    if cfg!(windows) { "cmd" } else { "/bin/sh" }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cwd(path: &str) -> CurrentDir {
        CurrentDir::new(path)
    }

    #[test]
    fn test_preferred_shell_wins() {
        let env = Environment::from_pairs([("SHELL", "/bin/bash")]);
        let ctx = SystemContext::from_environment(&env, cwd("/tmp"), Some("fish"));
        assert_eq!(ctx.shell, "fish");

        let ctx = SystemContext::from_environment(&env, cwd("/tmp"), Some("  "));
        assert_eq!(ctx.shell, "/bin/bash");
    }

    #[test]
    fn test_fallbacks() {
        let ctx = SystemContext::from_environment(&Environment::default(), cwd("/"), None);
        assert_eq!(ctx.shell, default_shell());
        assert_eq!(ctx.terminal, "unknown");
        assert!(ctx.available_tools.is_empty());
    }

    #[test]
    fn test_format_for_prompt() {
        let ctx = SystemContext {
            os: "Linux".into(),
            arch: "x86_64".into(),
            shell: "/bin/zsh".into(),
            terminal: "xterm".into(),
            cwd: "/home/user/projects".into(),
            available_tools: vec!["git".into(), "curl".into()],
        };
        let text = ctx.format_for_prompt();
        assert!(text.contains("- OS: Linux"));
        assert!(text.contains("- Shell: /bin/zsh"));
        assert!(text.contains("- Available tools: git, curl"));
        assert!(text.contains("- Current directory: /home/user/projects"));
    }

    #[test]
    fn test_format_skips_empty_tools() {
        let ctx = SystemContext::from_environment(&Environment::default(), cwd("/"), None);
        assert!(!ctx.format_for_prompt().contains("Available tools"));
    }
}
