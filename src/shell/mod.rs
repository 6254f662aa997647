//! Shell execution module.
//!
//! This module runs approved commands through the user's shell and reports
//! exit status and captured output.

mod runner;
pub use runner::{RunReport, ShellRunner, SystemShell};
