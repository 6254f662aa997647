//! Versioned safety rule table.
//!
//! Each rule is tagged with the tier it assigns, a short category name that is
//! shown to the user on refusal, and the reason behind it. Patterns are
//! compiled once, case-insensitively, when the rule set is built.

use regex::{Regex, RegexBuilder};

use super::SafetyTier;

/// Bump whenever the builtin table changes.
pub const RULESET_VERSION: u32 = 1;

/// How a rule's fragment is matched against a command string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Matcher {
    /// Substring, whitespace-tolerant. Anchored to a word start when the
    /// fragment starts with a word character.
    Literal(&'static str),
    /// The fragment appears in command position: line start, after a shell
    /// separator or quote, after a wrapper such as `sudo`, `nohup` or
    /// `sh -c`, and optionally behind a directory path.
    Command(&'static str),
    /// Raw regular expression.
    Regex(&'static str),
}

impl Matcher {
    fn to_pattern(self) -> String {
        match self {
            Matcher::Literal(lit) => {
                let body = whitespace_tolerant(lit);
                if lit.starts_with(|c: char| c.is_alphanumeric()) {
                    format!(r"\b{body}")
                } else {
                    body
                }
            }
            Matcher::Command(word) => format!(
                r#"(?:^|[;&|(`'"])\s*(?:(?:\S*/)?{WRAPPERS}\s+(?:-\S+\s+|\w+=\S*\s+)*['"]?)*(?:\S*/)?{}(?:\s|$|[;&|)`'"])"#,
                whitespace_tolerant(word)
            ),
            Matcher::Regex(re) => re.to_string(),
        }
    }
}

/// Programs that run their argument as a command.
const WRAPPERS: &str = r"(?:sudo|doas|nohup|exec|env|xargs|time|command|builtin|nice\s+-n\s*\S+|nice|timeout\s+\S+|\S*sh\s+-c)";

fn whitespace_tolerant(fragment: &str) -> String {
    regex::escape(fragment).replace(' ', r"\s+")
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub tier: SafetyTier,
    pub category: &'static str,
    pub reason: &'static str,
    pattern: Regex,
}

impl Rule {
    pub fn new(
        tier: SafetyTier,
        category: &'static str,
        reason: &'static str,
        matcher: Matcher,
    ) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&matcher.to_pattern())
            .case_insensitive(true)
            .build()?;
        Ok(Self {
            tier,
            category,
            reason,
            pattern,
        })
    }

    pub fn is_match(&self, command: &str) -> bool {
        self.pattern.is_match(command)
    }
}

/// Immutable set of rules, kept ordered from most to least restrictive tier.
#[derive(Debug, Clone)]
pub struct RuleSet {
    version: u32,
    rules: Vec<Rule>,
}

type RuleRow = (SafetyTier, &'static str, &'static str, Matcher);

const DELETE: &str = "recursive forced deletion";
const WIN_DELETE: &str = "forced deletion";
const DISK: &str = "disk formatting";
const POWER: &str = "power state";
const PERMS: &str = "permission takeover";
const REMOTE: &str = "remote script execution";
const ACCOUNTS: &str = "account management";
const ESCALATE: &str = "privilege escalation";
const KILL: &str = "mass process kill";

// `rm` with recursive and force flags, clustered or separate, in any order.
const RM_RECURSIVE_FORCE: &str = r"\brm\s+(?:-\S+\s+)*(?:-[a-z]*(?:r[a-z]*f|f[a-z]*r)[a-z]*|(?:-[a-z]*r[a-z]*|--recursive)\s+(?:-\S+\s+)*(?:-[a-z]*f[a-z]*|--force)|(?:-[a-z]*f[a-z]*|--force)\s+(?:-\S+\s+)*(?:-[a-z]*r[a-z]*|--recursive))(?:\s|$)";
const RM_RECURSIVE_ROOT: &str = r"\brm\s+(?:-\S+\s+)*(?:-[a-z]*r[a-z]*|--recursive)\s+(?:-\S+\s+)*/(?:\*|\s|$)";

#[rustfmt::skip]
const BUILTIN: &[RuleRow] = &[
    // Dangerous: never executed.
    (SafetyTier::Dangerous, DELETE, "removes a directory tree without asking", Matcher::Regex(RM_RECURSIVE_FORCE)),
    (SafetyTier::Dangerous, DELETE, "deletes from the filesystem root", Matcher::Regex(RM_RECURSIVE_ROOT)),
    (SafetyTier::Dangerous, DELETE, "deletes files with root privileges", Matcher::Literal("sudo rm")),
    (SafetyTier::Dangerous, WIN_DELETE, "force-deletes files without confirmation", Matcher::Literal("del /f")),
    (SafetyTier::Dangerous, WIN_DELETE, "deletes from the system drive", Matcher::Literal(r"del c:\")),
    (SafetyTier::Dangerous, WIN_DELETE, "removes a directory tree", Matcher::Literal("rmdir /s")),
    (SafetyTier::Dangerous, DISK, "formats a drive", Matcher::Regex(r"\bformat(?:\.com)?\s+[a-z]:")),
    (SafetyTier::Dangerous, DISK, "creates a filesystem, erasing the device", Matcher::Regex(r"\bmkfs(?:\.\w+)?\b")),
    (SafetyTier::Dangerous, DISK, "edits the partition table", Matcher::Command("fdisk")),
    (SafetyTier::Dangerous, DISK, "writes raw blocks to a device", Matcher::Literal("dd if=")),
    (SafetyTier::Dangerous, DISK, "writes raw blocks with root privileges", Matcher::Literal("sudo dd")),
    (SafetyTier::Dangerous, POWER, "shuts the machine down", Matcher::Command("shutdown")),
    (SafetyTier::Dangerous, POWER, "reboots the machine", Matcher::Command("reboot")),
    (SafetyTier::Dangerous, POWER, "halts the machine", Matcher::Command("halt")),
    (SafetyTier::Dangerous, POWER, "powers the machine off", Matcher::Command("poweroff")),
    (SafetyTier::Dangerous, POWER, "switches to runlevel 0", Matcher::Command("init 0")),
    (SafetyTier::Dangerous, POWER, "switches to runlevel 6", Matcher::Command("init 6")),
    (SafetyTier::Dangerous, POWER, "changes the power state through systemd", Matcher::Regex(r"\bsystemctl\s+(?:poweroff|reboot|halt)\b")),
    (SafetyTier::Dangerous, PERMS, "makes a tree world-writable as root", Matcher::Literal("sudo chmod -R 777")),
    (SafetyTier::Dangerous, PERMS, "makes the whole filesystem world-writable", Matcher::Regex(r"\bchmod\s+-R\s+777\s+/(?:\s|$)")),
    (SafetyTier::Dangerous, PERMS, "hands files to root", Matcher::Literal("chown root")),
    (SafetyTier::Dangerous, PERMS, "changes ownership of a tree as root", Matcher::Literal("sudo chown -R")),
    (SafetyTier::Dangerous, PERMS, "takes ownership of files", Matcher::Literal("takeown /f")),
    (SafetyTier::Dangerous, PERMS, "grants full control over files", Matcher::Regex(r"\bicacls\b.*\bgrant\b.*(?::\(?f\)?|full)")),
    (SafetyTier::Dangerous, REMOTE, "pipes a downloaded script into a shell", Matcher::Regex(r"\b(?:curl|wget)\b[^|]*\|\s*(?:sudo\s+)?(?:ba|z|k|da|fi)?sh\b")),
    (SafetyTier::Dangerous, "fork bomb", "exhausts the process table", Matcher::Regex(r":\(\)\s*\{\s*:\s*\|\s*:\s*&\s*\}\s*;\s*:")),
    (SafetyTier::Dangerous, ACCOUNTS, "creates a user account", Matcher::Command("useradd")),
    (SafetyTier::Dangerous, ACCOUNTS, "deletes a user account", Matcher::Command("userdel")),
    (SafetyTier::Dangerous, ACCOUNTS, "changes a password", Matcher::Command("passwd")),
    (SafetyTier::Dangerous, ACCOUNTS, "creates a Windows user account", Matcher::Regex(r"\bnet\s+user\b.*\s/add\b")),
    (SafetyTier::Dangerous, ESCALATE, "opens a root login shell", Matcher::Command("su -")),
    (SafetyTier::Dangerous, ESCALATE, "opens a root shell", Matcher::Literal("sudo su")),
    (SafetyTier::Dangerous, KILL, "kills processes by name without cleanup", Matcher::Literal("pkill -9")),
    (SafetyTier::Dangerous, KILL, "kills processes by name without cleanup", Matcher::Literal("killall -9")),

    // Risky: always confirmed.
    (SafetyTier::Risky, "privileged execution", "runs with root privileges", Matcher::Regex(r"\bsudo\s+")),
    (SafetyTier::Risky, "file deletion", "deletes files", Matcher::Regex(r"\brm\s+")),
    (SafetyTier::Risky, "file deletion", "deletes files", Matcher::Regex(r"\bdel\s+")),
    (SafetyTier::Risky, "file move", "moves or renames files", Matcher::Regex(r"\bmv\s+")),
    (SafetyTier::Risky, "file move", "moves or renames files", Matcher::Regex(r"\bmove\s+")),
    (SafetyTier::Risky, "file copy", "copies into an absolute path", Matcher::Regex(r"\bcp\s+.*\s+/")),
    (SafetyTier::Risky, "file copy", "copies into an absolute path", Matcher::Regex(r"\bcopy\s+.*\s+(?:[a-z]:)?\\")),
    (SafetyTier::Risky, "permission change", "changes file permissions", Matcher::Regex(r"\bchmod\s+")),
    (SafetyTier::Risky, "permission change", "changes file ownership", Matcher::Regex(r"\bchown\s+")),
    (SafetyTier::Risky, "destructive git", "discards uncommitted work", Matcher::Regex(r"\bgit\s+reset\s+--hard")),
    (SafetyTier::Risky, "destructive git", "deletes untracked files", Matcher::Regex(r"\bgit\s+clean\s+-[a-z]*f")),
    (SafetyTier::Risky, "package installation", "installs a global npm package", Matcher::Regex(r"\bnpm\s+install\s+-g")),
    (SafetyTier::Risky, "package installation", "installs a Python package", Matcher::Regex(r"\bpip3?\s+install\s+")),
    (SafetyTier::Risky, "package installation", "installs a system package", Matcher::Regex(r"\bapt(?:-get)?\s+install")),
    (SafetyTier::Risky, "package installation", "installs a system package", Matcher::Regex(r"\byum\s+install")),
    (SafetyTier::Risky, "service management", "controls system services", Matcher::Regex(r"\bsystemctl\s+")),
    (SafetyTier::Risky, "service management", "controls system services", Matcher::Regex(r"\bservice\s+")),
    (SafetyTier::Risky, "scheduling", "edits scheduled jobs", Matcher::Regex(r"\bcrontab\s+")),
    (SafetyTier::Risky, "mounts", "mounts a filesystem", Matcher::Regex(r"\bmount\s+")),
    (SafetyTier::Risky, "mounts", "unmounts a filesystem", Matcher::Regex(r"\bumount\s+")),
    (SafetyTier::Risky, "partitioning", "edits partitions", Matcher::Regex(r"\bparted\s+")),
];

impl RuleSet {
    /// Build a rule set from arbitrary rules. Rules are reordered so the most
    /// restrictive tier comes first; relative order within a tier is kept.
    pub fn new(version: u32, mut rules: Vec<Rule>) -> Self {
        rules.sort_by(|a, b| b.tier.cmp(&a.tier));
        Self { version, rules }
    }

    /// The builtin table, version [`RULESET_VERSION`].
    pub fn builtin() -> Result<Self, regex::Error> {
        let rules = BUILTIN
            .iter()
            .map(|&(tier, category, reason, matcher)| Rule::new(tier, category, reason, matcher))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(RULESET_VERSION, rules))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        RuleSet::builtin().unwrap()
    }

    fn matching_categories(cmd: &str) -> Vec<&'static str> {
        rules()
            .rules()
            .iter()
            .filter(|r| r.is_match(cmd))
            .map(|r| r.category)
            .collect()
    }

    #[test]
    fn test_builtin_compiles_and_is_ordered() {
        let set = rules();
        assert_eq!(set.version(), RULESET_VERSION);
        assert!(!set.is_empty());
        let tiers: Vec<_> = set.rules().iter().map(|r| r.tier).collect();
        let mut sorted = tiers.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(tiers, sorted);
    }

    #[test]
    fn test_command_word_position() {
        assert!(matching_categories("passwd").contains(&ACCOUNTS));
        assert!(matching_categories("sudo passwd alice").contains(&ACCOUNTS));
        assert!(matching_categories("echo hi && passwd").contains(&ACCOUNTS));
        assert!(matching_categories("cat /etc/passwd").is_empty());
        assert!(matching_categories("grep reboot /var/log/syslog").is_empty());
        assert!(matching_categories("ls /sbin/reboot").is_empty());
    }

    #[test]
    fn test_command_behind_wrappers_paths_and_quotes() {
        for cmd in [
            r#"bash -c "shutdown -h now""#,
            "sh -c 'reboot'",
            "/sbin/reboot",
            "nohup shutdown now",
            "exec poweroff",
            "echo x | xargs reboot",
            "env LANG=C /usr/sbin/halt",
            "timeout 5 reboot",
            "nice -n 10 poweroff",
            "sudo nohup /sbin/shutdown -r now",
            "time passwd",
        ] {
            let categories = matching_categories(cmd);
            assert!(categories.contains(&POWER) || categories.contains(&ACCOUNTS), "{cmd}");
        }
    }

    #[test]
    fn test_literal_is_whitespace_tolerant_and_case_insensitive() {
        assert!(matching_categories("PKILL   -9 firefox").contains(&KILL));
        assert!(matching_categories("DD IF=/dev/zero of=/dev/sda").contains(&DISK));
    }

    #[test]
    fn test_literal_anchors_word_start() {
        // "add if=" must not trip the dd rule
        assert!(matching_categories("echo add if=x").is_empty());
    }

    #[test]
    fn test_regex_rules() {
        assert!(matching_categories("curl -fsSL https://x.sh | bash").contains(&REMOTE));
        assert!(matching_categories("wget -qO- https://x | sudo sh").contains(&REMOTE));
        assert!(matching_categories(":(){ :|:& };:").contains(&"fork bomb"));
        assert!(matching_categories("format C:").contains(&DISK));
        assert!(matching_categories("mkfs.ext4 /dev/sdb1").contains(&DISK));
        assert!(matching_categories("net user bob pass /add").contains(&ACCOUNTS));
    }

    #[test]
    fn test_format_flag_is_not_disk_formatting() {
        assert!(matching_categories("git log --format=%H").is_empty());
    }

    #[test]
    fn test_rm_variants() {
        for cmd in [
            "rm -rf build",
            "rm -fr build",
            "rm -Rf x",
            "rm -rfv x",
            "rm -v -rf x",
            "rm -r /",
            "rm -r -f /",
            "rm -f -r x",
            "rm -R -v -f x",
            "rm --recursive --force /",
            "rm --force -r x",
        ] {
            assert!(matching_categories(cmd).contains(&DELETE), "{cmd}");
        }
        for cmd in ["rm -r ./build", "rm -f notes.txt", "rm --force a.log"] {
            assert!(!matching_categories(cmd).contains(&DELETE), "{cmd}");
        }
    }
}
