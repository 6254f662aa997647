//! Environment variable capture.
//!
//! Captures the variables the assistant cares about once, so shell and tool
//! detection can be exercised against a fixed environment in tests.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

/// Tools worth telling the model about when present.
pub const PROBED_TOOLS: &[&str] = &["git", "docker", "npm", "pip", "curl", "wget", "grep", "find"];

#[derive(Clone, Debug, Default)]
pub struct Environment {
    pub vars: HashMap<String, String>,
}

impl Environment {
    pub fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str).filter(|v| !v.is_empty())
    }

    /// User's login shell: `$SHELL`, then `%ComSpec%` on Windows.
    pub fn shell(&self) -> Option<&str> {
        self.get("SHELL").or_else(|| self.get("ComSpec"))
    }

    pub fn terminal(&self) -> Option<&str> {
        self.get("TERM").or_else(|| self.get("TERM_PROGRAM"))
    }

    /// Which of `tools` are executables on this environment's `PATH`.
    pub fn available_tools(&self, tools: &[&str]) -> Vec<String> {
        let Some(path) = self.get("PATH").or_else(|| self.get("Path")) else {
            return Vec::new();
        };
        let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        tools
            .iter()
            .filter(|tool| which::which_in(tool, Some(path), &cwd).is_ok())
            .map(|tool| tool.to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    #[test]
    fn test_shell_and_terminal() {
        let env = Environment::from_pairs([("SHELL", "/bin/zsh"), ("TERM", "xterm-256color")]);
        assert_eq!(env.shell(), Some("/bin/zsh"));
        assert_eq!(env.terminal(), Some("xterm-256color"));

        let env = Environment::from_pairs([("SHELL", ""), ("ComSpec", "C:\\Windows\\system32\\cmd.exe")]);
        assert_eq!(env.shell(), Some("C:\\Windows\\system32\\cmd.exe"));
        assert_eq!(env.terminal(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_available_tools_scans_path() {
        let dir = tempfile::tempdir().unwrap();
        let git = dir.path().join("git");
        std::fs::write(&git, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(&git, std::fs::Permissions::from_mode(0o755)).unwrap();
        let env = Environment::from_pairs([("PATH", dir.path().to_string_lossy().to_string())]);
        assert_eq!(env.available_tools(&["git", "docker"]), vec!["git".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_executable_file_is_not_a_tool() {
        let dir = tempfile::tempdir().unwrap();
        let git = dir.path().join("git");
        std::fs::write(&git, "not a program").unwrap();
        std::fs::set_permissions(&git, std::fs::Permissions::from_mode(0o644)).unwrap();
        let env = Environment::from_pairs([("PATH", dir.path().to_string_lossy().to_string())]);
        assert!(env.available_tools(&["git"]).is_empty());
    }

    #[test]
    fn test_no_path_no_tools() {
        assert!(Environment::default().available_tools(PROBED_TOOLS).is_empty());
    }
}
