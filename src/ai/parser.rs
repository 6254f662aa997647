//! Parser module for processing AI responses.
//!
//! The model is told to answer with a bare command, but replies still come
//! wrapped in code fences, prompts (`$ `) or labels (`Command:`). This module
//! reduces a reply to the single command line that gets classified.

/// Labels and prompt markers the model likes to prepend.
const PREFIXES: &[&str] = &["$ ", "> ", "command:", "fixed command:"];

/// Extract the command from a model reply.
///
/// Multi-line answers are joined with ` && `; backslash continuations are
/// kept on one line and `#` comment lines are dropped. Returns `None` when
/// nothing that looks like a command is left.
pub fn extract_command(response: &str) -> Option<String> {
    let body = code_block_body(response).unwrap_or_else(|| response.to_string());

    let mut commands: Vec<String> = Vec::new();
    let mut continued = String::new();

    for line in body.lines() {
        let line = clean_line(line);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(head) = line.strip_suffix('\\') {
            continued.push_str(head.trim_end());
            continued.push(' ');
            continue;
        }
        continued.push_str(&line);
        commands.push(std::mem::take(&mut continued));
    }
    if !continued.trim().is_empty() {
        commands.push(continued.trim().to_string());
    }

    if commands.is_empty() {
        None
    } else {
        Some(commands.join(" && "))
    }
}

/// Body of the first fenced code block, if the reply has one.
fn code_block_body(response: &str) -> Option<String> {
    let mut in_code_block = false;
    let mut body: Vec<&str> = Vec::new();

    for line in response.lines() {
        if line.trim_start().starts_with("```") {
            if in_code_block {
                return Some(body.join("\n"));
            }
            in_code_block = true;
        } else if in_code_block {
            body.push(line);
        }
    }

    // unterminated fence: take what followed it
    if in_code_block && !body.is_empty() {
        Some(body.join("\n"))
    } else {
        None
    }
}

fn clean_line(line: &str) -> String {
    let mut line = line.trim();
    loop {
        let before = line;
        for prefix in PREFIXES {
            if line.len() >= prefix.len()
                && line.is_char_boundary(prefix.len())
                && line[..prefix.len()].eq_ignore_ascii_case(prefix)
            {
                line = line[prefix.len()..].trim_start();
            }
        }
        if line.len() >= 2 && line.starts_with('`') && line.ends_with('`') {
            line = line[1..line.len() - 1].trim();
        }
        if line == before {
            return line.to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_command() {
        assert_eq!(extract_command("ls -la\n").as_deref(), Some("ls -la"));
    }

    #[test]
    fn test_code_block_format() {
        let response = r#"
Here you go:

```bash
find . -name "*.py"
```

This lists python files.
        "#;
        assert_eq!(extract_command(response).as_deref(), Some(r#"find . -name "*.py""#));
    }

    #[test]
    fn test_prefixes_and_backticks() {
        assert_eq!(extract_command("$ git status").as_deref(), Some("git status"));
        assert_eq!(extract_command("Command: `du -sh .`").as_deref(), Some("du -sh ."));
        assert_eq!(extract_command("COMMAND: $ pwd").as_deref(), Some("pwd"));
        assert_eq!(extract_command("Fixed command: ls -la").as_deref(), Some("ls -la"));
    }

    #[test]
    fn test_multiple_lines_are_chained() {
        let response = "```sh\nmkdir out\n# copy the build\ncp -r build out/\n```";
        assert_eq!(extract_command(response).as_deref(), Some("mkdir out && cp -r build out/"));
    }

    #[test]
    fn test_line_continuation() {
        let response = "tar -czf backup.tgz \\\n  src docs";
        assert_eq!(extract_command(response).as_deref(), Some("tar -czf backup.tgz src docs"));
    }

    #[test]
    fn test_unterminated_fence() {
        assert_eq!(extract_command("```\nuname -a").as_deref(), Some("uname -a"));
    }

    #[test]
    fn test_empty_replies() {
        assert_eq!(extract_command(""), None);
        assert_eq!(extract_command("   \n\t"), None);
        assert_eq!(extract_command("```bash\n```"), None);
        assert_eq!(extract_command("``"), None);
    }

    #[test]
    fn test_non_ascii_does_not_panic() {
        assert_eq!(extract_command("échoue").as_deref(), Some("échoue"));
        assert_eq!(extract_command("$ echo 漢字").as_deref(), Some("echo 漢字"));
    }
}
