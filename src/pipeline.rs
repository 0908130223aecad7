//! Build Pipeline - Batch Entry Point
//!
//! Contact channels are resolved once for the whole batch, then every page
//! is built independently in parallel. A fatal error aborts only its page.

use std::path::Path;

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SiteConfig;
use crate::contact::{ContactInfoResolver, ContactResolution, ResolvedContact};
use crate::descriptor::{load_pages, LoadError, PageDescriptor};
use crate::findings::{Finding, RuleId, Severity};
use crate::hashing::{compute_document_hash, compute_input_hash};
use crate::resources::ExternalResource;
use crate::structure::{BuildError, Document, PageStructureBuilder};
use crate::tokens::{CssVariable, ThemeError, ThemeTokenRegistry};
use crate::ENGINE_VERSION;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Theme(#[from] ThemeError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Built,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageOutcome {
    pub page_id: String,
    pub status: PageStatus,
    pub input_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_hash: Option<String>,
    pub findings: Vec<Finding>,
    #[serde(skip)]
    pub document: Option<Document>,
}

/// One line of the findings report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportEntry {
    pub page_id: String,
    pub rule: RuleId,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub build_id: String,
    pub engine_version: String,
    pub generated_at: DateTime<Utc>,
    pub pages: Vec<PageOutcome>,
}

impl BuildReport {
    /// Flattened `(page_id, rule, severity, message)` entries in page order.
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.pages
            .iter()
            .flat_map(|page| {
                page.findings.iter().map(move |f| ReportEntry {
                    page_id: page.page_id.clone(),
                    rule: f.rule,
                    severity: f.severity,
                    message: f.message.clone(),
                    location: f.location.clone(),
                })
            })
            .collect()
    }

    pub fn page(&self, page_id: &str) -> Option<&PageOutcome> {
        self.pages.iter().find(|p| p.page_id == page_id)
    }

    pub fn failed_pages(&self) -> impl Iterator<Item = &PageOutcome> {
        self.pages.iter().filter(|p| p.status == PageStatus::Failed)
    }

    /// No failed page and no error-severity finding.
    pub fn passed(&self) -> bool {
        self.pages
            .iter()
            .flat_map(|p| &p.findings)
            .all(|f| f.severity != Severity::Error)
    }
}

/// Everything besides the descriptor that shapes a page's Document
#[derive(Serialize)]
struct BuildContext<'a> {
    css_variables: &'a [CssVariable],
    site_resources: &'a [ExternalResource],
    contacts: &'a [ResolvedContact],
    above_fold_sections: usize,
}

/// The build pipeline - owns the read-only registry and site config
pub struct BuildPipeline {
    registry: ThemeTokenRegistry,
    config: SiteConfig,
}

impl BuildPipeline {
    pub fn new(registry: ThemeTokenRegistry, config: SiteConfig) -> Self {
        Self { registry, config }
    }

    pub fn load(theme: &Path, config: Option<&Path>) -> Result<Self, PipelineError> {
        let registry = ThemeTokenRegistry::load(theme)?;
        let config = match config {
            Some(path) => SiteConfig::load(path)?,
            None => SiteConfig::default(),
        };
        Ok(Self::new(registry, config))
    }

    pub fn registry(&self) -> &ThemeTokenRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Build one page on its own; contact channels are only checked within the page.
    pub fn build_page(&self, page: &PageDescriptor) -> Result<(Document, Vec<Finding>), BuildError> {
        let contacts = resolve_contacts(std::slice::from_ref(page));
        PageStructureBuilder::new(&self.registry, &contacts, &self.config.site).build(page)
    }

    pub fn build_dir(&self, content: &Path) -> Result<BuildReport, PipelineError> {
        let pages = load_pages(content)?;
        self.build_all(&pages)
    }

    pub fn build_all(&self, pages: &[PageDescriptor]) -> Result<BuildReport, PipelineError> {
        tracing::info!("Building {} pages", pages.len());

        let contacts = resolve_contacts(pages);
        let builder = PageStructureBuilder::new(&self.registry, &contacts, &self.config.site);
        let css_variables = self.registry.css_custom_properties();
        let context = BuildContext {
            css_variables: &css_variables,
            site_resources: &self.config.site.resources,
            contacts: &contacts.canonical,
            above_fold_sections: self.config.site.above_fold_sections,
        };

        let outcomes = pages
            .par_iter()
            .map(|page| self.build_outcome(&builder, &context, page))
            .collect::<Result<Vec<_>, _>>()?;

        let report = BuildReport {
            build_id: Uuid::new_v4().to_string(),
            engine_version: ENGINE_VERSION.to_string(),
            generated_at: Utc::now(),
            pages: outcomes,
        };

        tracing::info!(
            "Build {} finished: {} pages, {} failed, {} findings",
            report.build_id,
            report.pages.len(),
            report.failed_pages().count(),
            report.pages.iter().map(|p| p.findings.len()).sum::<usize>()
        );

        Ok(report)
    }

    fn build_outcome(
        &self,
        builder: &PageStructureBuilder<'_>,
        context: &BuildContext<'_>,
        page: &PageDescriptor,
    ) -> Result<PageOutcome, PipelineError> {
        let input_hash = compute_input_hash(&page.id, page, context, ENGINE_VERSION)?;

        let (document, findings) = builder.build_collecting(page);
        let mut findings = self.apply_policy(findings);

        let outcome = match document {
            Ok(document) => {
                let document_hash = compute_document_hash(&document)?;
                tracing::info!("Built {} ({} findings)", page.id, findings.len());
                PageOutcome {
                    page_id: page.id.clone(),
                    status: PageStatus::Built,
                    input_hash,
                    document_hash: Some(document_hash),
                    findings,
                    document: Some(document),
                }
            }
            Err(e) => {
                tracing::warn!("Page {} failed: {}", page.id, e);
                findings.push(Finding::new(e.rule(), e.to_string()));
                PageOutcome {
                    page_id: page.id.clone(),
                    status: PageStatus::Failed,
                    input_hash,
                    document_hash: None,
                    findings,
                    document: None,
                }
            }
        };

        Ok(outcome)
    }

    /// Promote denied rules to error severity
    fn apply_policy(&self, findings: Vec<Finding>) -> Vec<Finding> {
        findings
            .into_iter()
            .map(|mut f| {
                if self.config.policy.denies(f.rule) {
                    f.severity = Severity::Error;
                }
                f
            })
            .collect()
    }
}

fn resolve_contacts(pages: &[PageDescriptor]) -> ContactResolution {
    ContactInfoResolver::resolve(
        pages
            .iter()
            .flat_map(|p| p.contacts.iter().map(move |c| (p.id.as_str(), c))),
    )
}

impl Default for BuildPipeline {
    fn default() -> Self {
        Self::new(ThemeTokenRegistry::default(), SiteConfig::default())
    }
}
