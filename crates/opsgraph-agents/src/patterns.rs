//! The fixed extraction rule library.
//!
//! Keyword matching is case-insensitive via scoped `(?i:...)` groups;
//! env-var tokens stay case-sensitive so ALL_CAPS detection works.

use regex_lite::Regex;

/// Rule family names, reported by `get_extraction_stats`.
pub(crate) const CATEGORIES: &[&str] = &[
    "service_envvar",
    "incident_service",
    "service_integration",
    "structured_data",
];

/// All extraction patterns, compiled once at agent construction.
#[derive(Debug, Clone)]
pub(crate) struct PatternLibrary {
    /// `<service> requires|needs VAR[, VAR2 ...]`.
    pub requires: Regex,
    /// `<service> on <platform> requires|needs VAR[, VAR2 ...]`.
    pub requires_on: Regex,
    /// `incident|issue|problem <ID> impacts|affects|blocks <service>`.
    pub incident: Regex,
    /// `<service> is down|failing ... missing|failed|error ... VAR`.
    pub failure_correlation: Regex,
    /// `missing|unset [env [var]] VAR ... for|in|on <service>`.
    pub missing_for: Regex,
    /// `<svc1> integrates with|connects to|uses <svc2>`.
    pub integrates: Regex,
    /// `KEY=VALUE` / `export KEY=VALUE` lines.
    pub assignment: Regex,
    /// Deployment-log env lines (`Missing|Required|Setting|Loading|Using ... VAR`).
    pub deploy_line: Regex,
    /// ALL_CAPS env-var token filter.
    pub env_token: Regex,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self {
            requires: Regex::new(
                r"\b([A-Za-z][A-Za-z0-9_-]*)\s+(?i:requires|needs)\s+([A-Z][A-Z0-9_]+(?:[\s,]+[A-Z][A-Z0-9_]+)*)",
            )
            .expect("requires regex is valid"),
            requires_on: Regex::new(
                r"\b([A-Za-z][A-Za-z0-9_-]*)\s+(?i:on)\s+[A-Za-z][A-Za-z0-9_-]*\s+(?i:requires|needs)\s+([A-Z][A-Z0-9_]+(?:[\s,]+[A-Z][A-Z0-9_]+)*)",
            )
            .expect("requires-on regex is valid"),
            incident: Regex::new(
                r"(?i:\b(?:incident|issue|problem))\s*#?\s*([A-Za-z0-9_-]+)\s+(?i:impacts|affects|blocks)\s+([A-Za-z][A-Za-z0-9_-]*)",
            )
            .expect("incident regex is valid"),
            failure_correlation: Regex::new(
                r"\b([A-Za-z][A-Za-z0-9_-]*)\s+(?i:is\s+)?(?i:down|failing|degraded|broken|erroring)\b[^\n.]*?(?i:missing|failed|error|unset)[^\n.]*?\b([A-Z][A-Z0-9_]+)\b",
            )
            .expect("failure-correlation regex is valid"),
            missing_for: Regex::new(
                r"(?i:\bmissing|\bunset)\s+(?i:env(?:ironment)?\s+)?(?i:var(?:iable)?\s+)?([A-Z][A-Z0-9_]+)\b[^\n.]*?\b(?i:for|in|on)\s+([A-Za-z][A-Za-z0-9_-]*)",
            )
            .expect("missing-for regex is valid"),
            integrates: Regex::new(
                r"\b([A-Za-z][A-Za-z0-9_-]*)\s+(?i:integrates\s+with|connects\s+to|uses)\s+([A-Za-z][A-Za-z0-9_-]*)",
            )
            .expect("integrates regex is valid"),
            assignment: Regex::new(r"(?m)^\s*(?:export\s+)?([A-Z][A-Z0-9_]+)\s*=\s*(.+)$")
                .expect("assignment regex is valid"),
            deploy_line: Regex::new(
                r"(?i:\b(Missing|Required|Setting|Loading|Using))\b(?:\s+(?i:env(?:ironment)?))?(?:\s+(?i:var(?:iable)?))?\s*:?\s*([A-Z][A-Z0-9_]+)\b",
            )
            .expect("deploy-line regex is valid"),
            env_token: Regex::new(r"^[A-Z][A-Z0-9_]+$").expect("env-token regex is valid"),
        }
    }

    /// Number of extraction patterns (the token filter is not a rule).
    pub fn total(&self) -> usize {
        8
    }

    pub fn categories(&self) -> Vec<String> {
        CATEGORIES.iter().map(|c| c.to_string()).collect()
    }
}
