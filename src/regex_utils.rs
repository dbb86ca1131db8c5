//! Regex well-formedness checks.
//!
//! Patterns are validated with the `regex` crate, so accepted patterns stay in
//! the RE2-compatible subset every target engine understands (Go's `regexp`
//! included). Lookarounds and backreferences are rejected here.
use regex::Regex;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexError {
    #[error("invalid regex `{pattern}`: {message}")]
    Invalid { pattern: String, message: String },
    #[error("regex `{pattern}` expected at most {max} capture group(s), got {got}")]
    TooManyGroups { pattern: String, max: usize, got: usize },
    #[error("regex `{pattern}` has {groups} capture group(s), group {group} does not exist")]
    GroupOutOfRange { pattern: String, groups: usize, group: usize },
}

impl RegexError {
    pub fn tip(&self) -> &'static str {
        match self {
            Self::Invalid { .. } => "only the RE2 syntax subset is supported (no lookarounds, no backreferences)",
            Self::TooManyGroups { .. } => "use non-capturing groups `(?:...)` for grouping",
            Self::GroupOutOfRange { .. } => "wrap the extracted part in parentheses, e.g. `(\\d+)`",
        }
    }
}

/// Limits an operation places on capture groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupPolicy {
    pub max_groups: Option<usize>,
}

impl GroupPolicy {
    /// `re` / `re_all`: one group, or none to extract the whole match.
    pub const SINGLE: GroupPolicy = GroupPolicy { max_groups: Some(1) };
    /// `re_sub`, match predicates: anything goes.
    pub const ANY: GroupPolicy = GroupPolicy { max_groups: None };
}

/// Compile `pattern` and check its capture groups; returns the group count.
pub fn analyze(pattern: &str, policy: GroupPolicy) -> Result<usize, RegexError> {
    let re = Regex::new(pattern).map_err(|err| RegexError::Invalid {
        pattern: pattern.to_string(),
        message: first_line(&err.to_string()),
    })?;
    let groups = re.captures_len() - 1;
    if let Some(max) = policy.max_groups {
        if groups > max {
            return Err(RegexError::TooManyGroups { pattern: pattern.to_string(), max, got: groups });
        }
    }
    Ok(groups)
}

/// Check an explicit group index against the pattern.
pub fn check_group(pattern: &str, group: usize) -> Result<(), RegexError> {
    let groups = analyze(pattern, GroupPolicy::ANY)?;
    if group > groups {
        return Err(RegexError::GroupOutOfRange { pattern: pattern.to_string(), groups, group });
    }
    Ok(())
}

/// Prefix inline flags, e.g. `(?is)`.
pub fn with_inline_flags(pattern: &str, ignore_case: bool, dotall: bool) -> String {
    let mut flags = String::new();
    if ignore_case {
        flags.push('i');
    }
    if dotall {
        flags.push('s');
    }
    if flags.is_empty() {
        return pattern.to_string();
    }
    format!("(?{flags}){pattern}")
}

fn first_line(message: &str) -> String {
    message
        .lines()
        .rev()
        .find(|l| l.starts_with("error:"))
        .unwrap_or_else(|| message.lines().next().unwrap_or(message))
        .trim_start_matches("error:")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_groups() {
        assert_eq!(analyze(r"(\d+)", GroupPolicy::SINGLE), Ok(1));
        assert_eq!(analyze(r"(?:a|b)(c)", GroupPolicy::SINGLE), Ok(1));
        assert_eq!(analyze(r"\d+", GroupPolicy::ANY), Ok(0));
    }

    #[test]
    fn single_group_policy() {
        assert!(matches!(
            analyze(r"(a)(b)", GroupPolicy::SINGLE),
            Err(RegexError::TooManyGroups { got: 2, .. })
        ));
        assert_eq!(analyze(r"\d+", GroupPolicy::SINGLE), Ok(0));
        assert!(matches!(check_group(r"\d+", 1), Err(RegexError::GroupOutOfRange { groups: 0, .. })));
        assert!(check_group(r"(\d+)", 1).is_ok());
    }

    #[test]
    fn rejects_malformed_and_lookaround() {
        assert!(matches!(analyze(r"(\d+", GroupPolicy::ANY), Err(RegexError::Invalid { .. })));
        assert!(matches!(analyze(r"(?<=a)b", GroupPolicy::ANY), Err(RegexError::Invalid { .. })));
    }

    #[test]
    fn inline_flags() {
        assert_eq!(with_inline_flags("a", true, true), "(?is)a");
        assert_eq!(with_inline_flags("a", false, true), "(?s)a");
        assert_eq!(with_inline_flags("a", false, false), "a");
    }
}
