//! Page Structure Builder
//!
//! Turns a descriptor into a Document with exactly one header, main and
//! footer landmark. Findings never change page order; only structural
//! conflicts, unnamed controls and unknown tokens abort a page.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SiteSection;
use crate::contact::{ContactResolution, ResolvedContact};
use crate::descriptor::{
    ButtonBlock, ContentBlock, Landmark, LinkBlock, NavLink, PageDescriptor, Section, SectionKind,
};
use crate::findings::{Finding, RuleId};
use crate::images::{self, ImageDirective, Placement};
use crate::resources::{ExternalResource, HintPlan, ResourceHintPlanner};
use crate::rules::PageLinter;
use crate::tokens::{CssVariable, ThemeTokenRegistry, TokenError};

const NEW_CONTEXT_SUFFIX: &str = "(opens in a new tab)";

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Structural conflict: {0}")]
    StructuralConflict(String),

    #[error("Control at {location} has neither visible text nor an accessible label")]
    AmbiguousControl { location: String },

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl BuildError {
    pub fn rule(&self) -> RuleId {
        match self {
            BuildError::StructuralConflict(_) => RuleId::StructuralConflict,
            BuildError::AmbiguousControl { .. } => RuleId::AmbiguousControl,
            BuildError::Token(TokenError::UnknownToken(_)) => RuleId::UnknownToken,
            BuildError::Token(TokenError::DuplicateToken { .. }) => RuleId::DuplicateToken,
            BuildError::Token(TokenError::InvalidTokenValue { .. }) => RuleId::InvalidTokenValue,
        }
    }
}

// --- Document tree ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub page_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub head: Head,
    pub header: HeaderLandmark,
    pub main: MainLandmark,
    pub footer: FooterLandmark,
}

impl Document {
    /// Sections in document order across all landmarks.
    pub fn sections(&self) -> impl Iterator<Item = &SectionNode> {
        self.header
            .sections
            .iter()
            .chain(&self.main.sections)
            .chain(&self.footer.sections)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Head {
    pub hints: HintPlan,
    pub css_variables: Vec<CssVariable>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HeaderLandmark {
    pub nav: Vec<NavItem>,
    pub sections: Vec<SectionNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MainLandmark {
    pub sections: Vec<SectionNode>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FooterLandmark {
    pub sections: Vec<SectionNode>,
    pub contacts: Vec<ResolvedContact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NavItem {
    pub label: String,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    pub new_context: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectionNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub kind: SectionKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<HeadingNode>,
    pub blocks: Vec<BlockNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub styles: Vec<StyleBinding>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeadingNode {
    pub text: String,
    pub level: u8,
    pub visually_hidden: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StyleBinding {
    pub property: String,
    pub token: String,
    /// `var(--token)` reference emitted in markup
    pub reference: String,
    pub resolved: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BlockNode {
    Text {
        text: String,
    },
    Image {
        src: String,
        alt: String,
        decorative: bool,
        directive: ImageDirective,
    },
    Button {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        label: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        action: Option<String>,
    },
    Link {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        href: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aria_label: Option<String>,
        new_context: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rel: Option<String>,
    },
}

// --- Landmark assignment ---

/// Check the `[header] main* [footer]` shape and return each section's landmark.
pub fn assign_landmarks(sections: &[Section]) -> Result<Vec<Landmark>, BuildError> {
    let mut phase = Landmark::Header;
    let mut header_seen = false;
    let mut footer_seen = false;
    let mut landmarks = Vec::with_capacity(sections.len());

    for (i, section) in sections.iter().enumerate() {
        let landmark = section.landmark();
        match landmark {
            Landmark::Header => {
                if header_seen {
                    return Err(BuildError::StructuralConflict(format!(
                        "sections[{}] is a second header section", i
                    )));
                }
                if phase != Landmark::Header {
                    return Err(BuildError::StructuralConflict(format!(
                        "sections[{}] is a header section placed after page content", i
                    )));
                }
                header_seen = true;
            }
            Landmark::Main => {
                if phase == Landmark::Footer {
                    return Err(BuildError::StructuralConflict(format!(
                        "sections[{}] follows the footer and would need a second main landmark", i
                    )));
                }
                phase = Landmark::Main;
            }
            Landmark::Footer => {
                if footer_seen {
                    return Err(BuildError::StructuralConflict(format!(
                        "sections[{}] is a second footer section", i
                    )));
                }
                footer_seen = true;
                phase = Landmark::Footer;
            }
        }
        landmarks.push(landmark);
    }

    Ok(landmarks)
}

// --- Accessible names ---

fn visible(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

/// Label for a button; synthesized from visible text when missing.
pub fn label_button(button: &ButtonBlock, location: &str) -> Result<(String, Option<Finding>), BuildError> {
    if let Some(label) = visible(button.aria_label.as_deref()) {
        return Ok((label.to_string(), None));
    }
    let text = visible(button.text.as_deref()).ok_or_else(|| BuildError::AmbiguousControl {
        location: location.to_string(),
    })?;
    let finding = Finding::new(
        RuleId::MissingAccessibleLabel,
        format!("Button {:?} has no accessible label; using its text", text),
    )
    .at(location);
    Ok((text.to_string(), Some(finding)))
}

/// Accessible label for a link. Only links opening a new context need one
/// beyond their visible text.
pub fn label_link(
    text: Option<&str>,
    aria_label: Option<&str>,
    new_context: bool,
    location: &str,
) -> Result<(Option<String>, Option<Finding>), BuildError> {
    let text = visible(text);
    if let Some(label) = visible(aria_label) {
        return Ok((Some(label.to_string()), None));
    }
    let text = text.ok_or_else(|| BuildError::AmbiguousControl {
        location: location.to_string(),
    })?;
    if !new_context {
        return Ok((None, None));
    }
    let finding = Finding::new(
        RuleId::MissingAccessibleLabel,
        format!("Link {:?} opens a new tab without saying so", text),
    )
    .at(location)
    .remedy("Add an aria-label announcing the new tab");
    Ok((Some(format!("{} {}", text, NEW_CONTEXT_SUFFIX)), Some(finding)))
}

// --- Builder ---

pub struct PageStructureBuilder<'a> {
    registry: &'a ThemeTokenRegistry,
    contacts: &'a ContactResolution,
    site: &'a SiteSection,
    linter: PageLinter,
}

impl<'a> PageStructureBuilder<'a> {
    pub fn new(registry: &'a ThemeTokenRegistry, contacts: &'a ContactResolution, site: &'a SiteSection) -> Self {
        Self {
            registry,
            contacts,
            site,
            linter: PageLinter::new(),
        }
    }

    pub fn build(&self, page: &PageDescriptor) -> Result<(Document, Vec<Finding>), BuildError> {
        let (document, findings) = self.build_collecting(page);
        document.map(|document| (document, findings))
    }

    /// Like `build`, but hands back the findings gathered before a fatal
    /// error together with it. Contact findings for the page are always included.
    pub fn build_collecting(&self, page: &PageDescriptor) -> (Result<Document, BuildError>, Vec<Finding>) {
        let mut findings = self.linter.check(page);
        let document = self.assemble(page, &mut findings);
        findings.extend(self.contacts.findings_for(&page.id).cloned());
        (document, findings)
    }

    fn assemble(&self, page: &PageDescriptor, findings: &mut Vec<Finding>) -> Result<Document, BuildError> {
        let landmarks = assign_landmarks(&page.sections)?;

        let nav = page
            .nav
            .iter()
            .enumerate()
            .map(|(i, link)| self.build_nav_item(link, i, findings))
            .collect::<Result<Vec<_>, _>>()?;

        let mut header = HeaderLandmark { nav, sections: vec![] };
        let mut main = MainLandmark::default();
        let mut footer = FooterLandmark::default();

        for (i, (section, landmark)) in page.sections.iter().zip(landmarks).enumerate() {
            let node = self.build_section(section, i, findings)?;
            match landmark {
                Landmark::Header => header.sections.push(node),
                Landmark::Main => main.sections.push(node),
                Landmark::Footer => footer.sections.push(node),
            }
        }

        let resources: Vec<ExternalResource> = self
            .site
            .resources
            .iter()
            .chain(&page.resources)
            .cloned()
            .collect();
        let (hints, resource_findings) = ResourceHintPlanner::plan(&resources);
        findings.extend(resource_findings);

        let mut kinds = vec![];
        for channel in &page.contacts {
            if !kinds.contains(&channel.kind) {
                kinds.push(channel.kind);
            }
        }
        footer.contacts = kinds
            .into_iter()
            .filter_map(|kind| self.contacts.get(kind).cloned())
            .collect();

        Ok(Document {
            page_id: page.id.clone(),
            title: page.title.clone(),
            lang: page.lang.clone(),
            description: page.description.clone(),
            head: Head {
                hints,
                css_variables: self.registry.css_custom_properties(),
            },
            header,
            main,
            footer,
        })
    }

    fn build_nav_item(&self, link: &NavLink, index: usize, findings: &mut Vec<Finding>) -> Result<NavItem, BuildError> {
        let location = format!("nav[{}]", index);
        let (aria_label, finding) = label_link(
            Some(link.label.as_str()),
            link.aria_label.as_deref(),
            link.new_context,
            &location,
        )?;
        findings.extend(finding);
        Ok(NavItem {
            label: link.label.trim().to_string(),
            href: link.href.clone(),
            aria_label,
            new_context: link.new_context,
        })
    }

    fn build_section(&self, section: &Section, index: usize, findings: &mut Vec<Finding>) -> Result<SectionNode, BuildError> {
        let location = format!("sections[{}]", index);
        let level = if section.kind == SectionKind::Hero { 1 } else { 2 };

        let heading = match visible(section.heading.as_deref()) {
            Some(text) => Some(HeadingNode { text: text.to_string(), level, visually_hidden: false }),
            None if section.kind != SectionKind::Hero && !section.blocks.is_empty() => {
                let text = section.kind.fallback_heading();
                findings.push(
                    Finding::new(
                        RuleId::AutoHeadingInserted,
                        format!("Inserted visually-hidden heading {:?}", text),
                    )
                    .at(location.clone()),
                );
                Some(HeadingNode { text: text.to_string(), level, visually_hidden: true })
            }
            None => None,
        };

        let styles = section
            .style
            .iter()
            .map(|(property, token)| -> Result<StyleBinding, TokenError> {
                let resolved = self.registry.resolve(token)?;
                Ok(StyleBinding {
                    property: property.clone(),
                    token: token.clone(),
                    reference: resolved.css_var(),
                    resolved: resolved.value.to_string(),
                })
            })
            .collect::<Result<Vec<_>, TokenError>>()?;

        let above_fold = index < self.site.above_fold_sections;
        let mut blocks = Vec::with_capacity(section.blocks.len());
        for (j, block) in section.blocks.iter().enumerate() {
            let block_location = format!("{}.blocks[{}]", location, j);
            blocks.push(self.build_block(block, above_fold, &block_location, findings)?);
        }

        Ok(SectionNode {
            id: section.id.clone(),
            kind: section.kind,
            heading,
            blocks,
            styles,
        })
    }

    fn build_block(
        &self,
        block: &ContentBlock,
        above_fold: bool,
        location: &str,
        findings: &mut Vec<Finding>,
    ) -> Result<BlockNode, BuildError> {
        let node = match block {
            ContentBlock::Text(text) => BlockNode::Text { text: text.text.clone() },
            ContentBlock::Image(image) => {
                let below = image.below_fold.unwrap_or(!above_fold);
                let placement = if below { Placement::BelowFold } else { Placement::AboveFold };
                let (directive, image_findings) = images::resolve(image, placement);
                findings.extend(image_findings.into_iter().map(|f| f.at(location)));
                BlockNode::Image {
                    src: image.src.clone(),
                    alt: image.alt.clone().unwrap_or_default(),
                    decorative: image.decorative,
                    directive,
                }
            }
            ContentBlock::Button(button) => {
                let (label, finding) = label_button(button, location)?;
                findings.extend(finding);
                BlockNode::Button {
                    text: button.text.clone(),
                    label,
                    action: button.action.clone(),
                }
            }
            ContentBlock::Link(link) => self.build_link(link, location, findings)?,
        };
        Ok(node)
    }

    fn build_link(&self, link: &LinkBlock, location: &str, findings: &mut Vec<Finding>) -> Result<BlockNode, BuildError> {
        let (aria_label, finding) = label_link(
            link.text.as_deref(),
            link.aria_label.as_deref(),
            link.new_context,
            location,
        )?;
        findings.extend(finding);
        Ok(BlockNode::Link {
            text: link.text.clone(),
            href: link.href.clone(),
            aria_label,
            new_context: link.new_context,
            rel: link.new_context.then(|| "noopener noreferrer".to_string()),
        })
    }
}
