//! Page Rules - Lint-Only Checks
//!
//! Rules inspect a descriptor and produce findings. They never alter the
//! page, so each one can be tested on its own.

use crate::descriptor::PageDescriptor;
use crate::findings::{Finding, RuleId};

/// Page rule trait - produces findings
pub trait PageRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, page: &PageDescriptor) -> Vec<Finding>;
}

// --- Concrete Rules ---

pub struct DeadNavigationRule;

impl DeadNavigationRule {
    fn is_dead(href: &str, page: &PageDescriptor) -> bool {
        let href = href.trim();
        if href.is_empty() || href == "#" {
            return true;
        }
        if href.to_ascii_lowercase().starts_with("javascript:") {
            return true;
        }
        match href.strip_prefix('#') {
            Some(anchor) => !page.anchor_ids().any(|id| id == anchor),
            None => false,
        }
    }
}

impl PageRule for DeadNavigationRule {
    fn name(&self) -> &'static str { "dead_navigation" }

    fn check(&self, page: &PageDescriptor) -> Vec<Finding> {
        page.nav
            .iter()
            .enumerate()
            .filter(|(_, link)| Self::is_dead(&link.href, page))
            .map(|(i, link)| {
                Finding::new(
                    RuleId::DeadNavigationLink,
                    format!("Navigation link {:?} points to {:?}, which goes nowhere", link.label, link.href),
                )
                .at(format!("nav[{}]", i))
                .remedy("Link to a page or to the id of a section on this page")
            })
            .collect()
    }
}

pub struct MetadataRule;

impl PageRule for MetadataRule {
    fn name(&self) -> &'static str { "metadata" }

    fn check(&self, page: &PageDescriptor) -> Vec<Finding> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());
        let mut findings = vec![];

        if blank(&page.description) {
            findings.push(
                Finding::new(RuleId::MissingMetadata, "Page has no meta description")
                    .remedy("Add a one-sentence description for search results"),
            );
        }
        if blank(&page.lang) {
            findings.push(
                Finding::new(RuleId::MissingMetadata, "Page does not declare a document language")
                    .remedy("Set lang, e.g. \"en\""),
            );
        }
        findings
    }
}

/// Runs the page rules in a fixed order
pub struct PageLinter {
    rules: Vec<Box<dyn PageRule>>,
}

impl PageLinter {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(DeadNavigationRule),
                Box::new(MetadataRule),
            ],
        }
    }

    pub fn check(&self, page: &PageDescriptor) -> Vec<Finding> {
        let mut all_findings = vec![];
        for rule in &self.rules {
            let findings = rule.check(page);
            if !findings.is_empty() {
                tracing::debug!("Rule {} reported {} findings on {}", rule.name(), findings.len(), page.id);
            }
            all_findings.extend(findings);
        }
        all_findings
    }
}

impl Default for PageLinter {
    fn default() -> Self {
        Self::new()
    }
}
