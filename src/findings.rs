//! Findings - Stable Rule Identifiers
//!
//! Every stage reports through the same structure so that the report
//! and the tests can match on rule ids instead of message text.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Stable identifier of every rule the engine can report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    // Resources
    UnpinnedVersion,
    BlockingFontLoad,
    MalformedResourceUrl,
    // Images
    LayoutShiftRisk,
    InaccessibleImage,
    MissingResponsiveSource,
    // Structure
    DeadNavigationLink,
    MissingMetadata,
    AutoHeadingInserted,
    MissingAccessibleLabel,
    // Contact
    InconsistentContactInfo,
    MalformedContact,
    // Fatal
    StructuralConflict,
    AmbiguousControl,
    UnknownToken,
    DuplicateToken,
    InvalidTokenValue,
}

impl RuleId {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleId::UnpinnedVersion => "unpinned_version",
            RuleId::BlockingFontLoad => "blocking_font_load",
            RuleId::MalformedResourceUrl => "malformed_resource_url",
            RuleId::LayoutShiftRisk => "layout_shift_risk",
            RuleId::InaccessibleImage => "inaccessible_image",
            RuleId::MissingResponsiveSource => "missing_responsive_source",
            RuleId::DeadNavigationLink => "dead_navigation_link",
            RuleId::MissingMetadata => "missing_metadata",
            RuleId::AutoHeadingInserted => "auto_heading_inserted",
            RuleId::MissingAccessibleLabel => "missing_accessible_label",
            RuleId::InconsistentContactInfo => "inconsistent_contact_info",
            RuleId::MalformedContact => "malformed_contact",
            RuleId::StructuralConflict => "structural_conflict",
            RuleId::AmbiguousControl => "ambiguous_control",
            RuleId::UnknownToken => "unknown_token",
            RuleId::DuplicateToken => "duplicate_token",
            RuleId::InvalidTokenValue => "invalid_token_value",
        }
    }

    /// Severity a finding of this rule is reported with.
    pub fn default_severity(&self) -> Severity {
        match self {
            RuleId::AutoHeadingInserted => Severity::Info,
            RuleId::StructuralConflict
            | RuleId::AmbiguousControl
            | RuleId::UnknownToken
            | RuleId::DuplicateToken
            | RuleId::InvalidTokenValue => Severity::Error,
            _ => Severity::Warning,
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub rule: RuleId,
    pub severity: Severity,
    pub message: String,
    /// Where in the page the finding applies, e.g. `sections[2].blocks[0]`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
}

impl Finding {
    pub fn new(rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            rule,
            severity: rule.default_severity(),
            message: message.into(),
            location: None,
            remediation: vec![],
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn remedy(mut self, hint: impl Into<String>) -> Self {
        self.remediation.push(hint.into());
        self
    }
}

/// Collect the rule ids of a finding list, in order.
pub fn rule_ids(findings: &[Finding]) -> Vec<RuleId> {
    findings.iter().map(|f| f.rule).collect()
}
