//! User-facing terminal output.
//!
//! Everything the user reads goes through here; diagnostics go to the log
//! file via `tracing` instead.

use std::fmt::Display;

use crossterm::style::Stylize;

use crate::shell::RunReport;

pub fn status(message: impl Display) {
    println!("{} {}", "::".cyan().bold(), message);
}

pub fn command(command: &str) {
    println!("{} {}", "$".green().bold(), command.bold());
}

pub fn success(message: impl Display) {
    println!("{} {}", "ok".green().bold(), message);
}

pub fn warn(message: impl Display) {
    println!("{} {}", "warning:".yellow().bold(), message);
}

pub fn error(message: impl Display) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// Print what a command produced.
pub fn report(report: &RunReport) {
    if !report.stdout.is_empty() {
        print!("{}", report.stdout);
        if !report.stdout.ends_with('\n') {
            println!();
        }
    }
    if report.success() {
        if !report.stderr.is_empty() {
            eprint!("{}", report.stderr);
        }
        success("Command executed successfully");
    } else {
        error(format!("Command failed: {}", report.failure_text()));
    }
}

