//! Runs approved commands in the user's shell.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::{info, warn};

/// What happened when a command ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// `None` when the process was killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl RunReport {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Best description of a failure, for the fix prompt and the user.
    pub fn failure_text(&self) -> String {
        if self.timed_out {
            return "command timed out".to_string();
        }
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_string();
        }
        match self.exit_code {
            Some(code) => format!("exited with status {}", code),
            None => "terminated by a signal".to_string(),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait ShellRunner {
    async fn run(&mut self, command: &str) -> Result<RunReport>;
}

/// Runs commands through `<shell> <flag> <command>`, capturing output.
#[derive(Debug, Clone)]
pub struct SystemShell {
    shell: String,
    timeout: Duration,
}

impl SystemShell {
    pub fn new(shell: impl Into<String>, timeout: Duration) -> Self {
        Self {
            shell: shell.into(),
            timeout,
        }
    }

    /// Program and arguments used to run `command`.
    pub fn invocation(&self, command: &str) -> (String, Vec<String>) {
        (
            self.shell.clone(),
            vec![command_flag(&self.shell).to_string(), command.to_string()],
        )
    }
}

/// Flag that makes `shell` run the next argument as a command string.
fn command_flag(shell: &str) -> &'static str {
    // split on both separators so Windows paths parse everywhere
    let base = shell.rsplit(['/', '\\']).next().unwrap_or(shell).to_ascii_lowercase();
    let name = base.strip_suffix(".exe").unwrap_or(&base);
    match name {
        "cmd" => "/C",
        "powershell" | "pwsh" => "-Command",
        _ => "-c",
    }
}

impl ShellRunner for SystemShell {
    async fn run(&mut self, command: &str) -> Result<RunReport> {
        let (program, args) = self.invocation(command);
        info!(shell = %program, "Running command");

        let child = Command::new(&program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        // dropping the future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(output) => output.with_context(|| format!("Failed to start shell '{}'", program))?,
            Err(_) => {
                warn!(timeout = ?self.timeout, "Command timed out");
                return Ok(RunReport {
                    timed_out: true,
                    stderr: format!("Command timed out after {} seconds", self.timeout.as_secs()),
                    ..Default::default()
                });
            }
        };

        let report = RunReport {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            timed_out: false,
        };
        info!(exit_code = ?report.exit_code, "Command finished");
        Ok(report)
    }
}
