//! Management operations behind the CLI flags.
//!
//! Each operation works on a `ConfigStore` and returns the text to show, so
//! the output can be checked without a terminal.

use chrono::{DateTime, Local};
use tracing::info;

use crate::config::{ConfigStore, KeySource, API_KEY_ENV};
use crate::error::AssistError;
use crate::security::{Confirm, RuleSet};

/// Days listed by the usage report.
const USAGE_DAYS: usize = 7;

pub fn set_auto_execute<S: ConfigStore>(store: &S, enabled: bool) -> Result<String, AssistError> {
    store.update(|record| record.auto_execute = enabled)?;
    info!(enabled, "Auto-execute changed");
    Ok(if enabled {
        "Auto-execute enabled: safe commands run without asking".to_string()
    } else {
        "Auto-execute disabled: every command needs confirmation".to_string()
    })
}

fn yes_no(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

fn key_status(source: Option<KeySource>) -> String {
    match source {
        Some(KeySource::Saved) => "saved in configuration".to_string(),
        Some(KeySource::Environment) => format!("from {}", API_KEY_ENV),
        None => "not configured".to_string(),
    }
}

pub fn status_report<S: ConfigStore>(
    store: &S,
    rules: &RuleSet,
    env_key: Option<&str>,
    detected_shell: &str,
) -> Result<String, AssistError> {
    let record = store.load()?;
    let limiter = record.rate_limiter();
    let source = record.resolve_api_key(env_key).map(|(_, source)| source);
    let shell = record.preferred_shell.as_deref().unwrap_or(detected_shell);

    let mut out = String::new();
    out.push_str(&format!("API key:       {}\n", key_status(source)));
    out.push_str(&format!("Auto-execute:  {}\n", yes_no(record.auto_execute)));
    out.push_str(&format!("Auto-fix:      {}\n", yes_no(record.auto_fix)));
    out.push_str(&format!("Shell:         {}\n", shell));
    out.push_str(&format!("Model:         {}\n", record.model));
    out.push_str(&format!(
        "Rate limit:    {} calls per {} minute(s)\n",
        limiter.max_calls,
        limiter.window.num_minutes()
    ));
    if let Some(limit) = limiter.daily_limit {
        out.push_str(&format!("Daily limit:   {}\n", limit));
    }
    out.push_str(&format!("Safety rules:  v{} ({} rules)\n", rules.version(), rules.len()));
    out.push_str(&format!("Config file:   {}", store.location()));
    Ok(out)
}

pub fn usage_report<S: ConfigStore>(store: &S, now: DateTime<Local>) -> Result<String, AssistError> {
    let record = store.load()?;
    let usage = &record.usage;

    let mut out = String::new();
    out.push_str(&format!("Total requests: {}\n", usage.total_requests));
    out.push_str(&format!("Commands run:   {}\n", usage.runs));
    out.push_str(&format!("Today:          {}\n", usage.requests_on(now.date_naive())));

    let days = usage.recent_days(USAGE_DAYS);
    if !days.is_empty() {
        out.push_str("Recent days:\n");
        for (day, count) in days {
            out.push_str(&format!("  {}  {}\n", day, count));
        }
    }

    match record.rate_limiter().retry_after(usage, now) {
        None => out.push_str("Rate limiter:   ready"),
        Some(secs) => out.push_str(&format!("Rate limiter:   wait {} seconds", secs)),
    }
    Ok(out)
}

/// Save, remove or report the API key.
///
/// `Some("")` removes the saved key, `None` only reports.
pub fn api_key<S: ConfigStore>(store: &S, key: Option<&str>, env_key: Option<&str>) -> Result<String, AssistError> {
    let Some(key) = key.map(str::trim) else {
        let record = store.load()?;
        let source = record.resolve_api_key(env_key).map(|(_, source)| source);
        return Ok(format!("API key: {}", key_status(source)));
    };

    if key.is_empty() {
        store.update(|record| record.api_key.clear())?;
        info!("Saved API key removed");
        return Ok("Saved API key removed".to_string());
    }

    store.update(|record| record.api_key = key.to_string())?;
    info!("API key saved");
    Ok(format!("API key saved ({})", mask_key(key)))
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Delete the configuration record after the user types "yes".
pub fn reset<S: ConfigStore, C: Confirm>(store: &S, confirm: &mut C) -> Result<String, AssistError> {
    let question = format!(
        "This deletes all settings, the saved API key and usage history in {}. Type 'yes' to continue",
        store.location()
    );
    let confirmed = confirm
        .ask(&question)
        .is_some_and(|answer| answer.trim().eq_ignore_ascii_case("yes"));
    if !confirmed {
        return Err(AssistError::UserCancelled);
    }
    store.reset()?;
    info!("Configuration reset");
    Ok("Configuration reset to defaults".to_string())
}
