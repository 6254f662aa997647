//! Prompt building utilities for AI requests.
//!
//! This module constructs the prompts sent to the model: the natural-language
//! request or failed command, together with the system context so the
//! generated command fits the user's OS and shell.

use crate::context::SystemContext;

/// System prompt that defines the assistant's behavior.
pub const SYSTEM_PROMPT: &str = r#"You are a shell command generator running inside the user's terminal.

Rules:
1. Return only the command, no explanations and no markdown.
2. Use commands appropriate for the user's operating system and shell.
3. Assume the user is in their current directory.
4. If multiple commands are needed, separate them with ' && '.
5. Use safe, standard commands when possible.
6. Don't use sudo unless absolutely necessary.
7. For file operations, use relative paths when possible."#;

/// Build the prompt for generating a command from a request.
pub fn build_prompt(user_request: &str, ctx: &SystemContext) -> String {
    let mut prompt = String::new();

    prompt.push_str("System Information:\n");
    prompt.push_str(&ctx.format_for_prompt());
    prompt.push('\n');

    prompt.push_str("User Request: ");
    prompt.push_str(user_request.trim());
    prompt.push_str("\n\n");

    prompt.push_str(&format!(
        "Generate ONLY the {} command(s) needed to fulfill this request.\n",
        ctx.shell
    ));
    prompt.push_str("Command:");

    prompt
}

/// Build the prompt asking for a corrected version of a failed command.
pub fn build_fix_prompt(command: &str, error: &str, ctx: &SystemContext) -> String {
    format!(
        "The following command failed:\n\
         Command: {command}\n\
         Error: {error}\n\n\
         System Information:\n{context}\n\
         Generate a corrected version of this command that should work. \
         Return only the fixed command, no explanations.\n\n\
         Fixed command:",
        command = command,
        error = error.trim(),
        context = ctx.format_for_prompt()
    )
}
