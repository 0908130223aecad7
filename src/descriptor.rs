//! Page Descriptors - Authored Input

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::contact::ContactChannel;
use crate::resources::ExternalResource;

pub type PageId = String;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid page descriptor {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Duplicate page id {0}")]
    DuplicatePage(PageId),

    #[error("Page id {id:?} in {path} must be a plain file name")]
    InvalidPageId { path: PathBuf, id: PageId },
}

/// Page ids name output files, so they may not leave the output directory.
pub fn is_valid_page_id(id: &str) -> bool {
    !id.trim().is_empty()
        && !id.contains(&['/', '\\'][..])
        && !id.contains("..")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageDescriptor {
    pub id: PageId,
    pub title: String,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub nav: Vec<NavLink>,
    #[serde(default)]
    pub contacts: Vec<ContactChannel>,
    #[serde(default)]
    pub resources: Vec<ExternalResource>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Hero,
    Services,
    Features,
    Footer,
    Generic,
}

impl SectionKind {
    /// Heading text used when a section has content but no heading.
    pub fn fallback_heading(&self) -> &'static str {
        match self {
            SectionKind::Hero => "Welcome",
            SectionKind::Services => "Services",
            SectionKind::Features => "Features",
            SectionKind::Footer => "Footer",
            SectionKind::Generic => "More information",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Landmark {
    Header,
    Main,
    Footer,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default)]
    pub id: Option<String>,
    pub kind: SectionKind,
    #[serde(default)]
    pub heading: Option<String>,
    /// Overrides the landmark derived from `kind`
    #[serde(default)]
    pub landmark: Option<Landmark>,
    #[serde(default)]
    pub blocks: Vec<ContentBlock>,
    /// CSS property -> theme token name
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

impl Section {
    pub fn landmark(&self) -> Landmark {
        match (self.landmark, self.kind) {
            (Some(l), _) => l,
            (None, SectionKind::Footer) => Landmark::Footer,
            (None, _) => Landmark::Main,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text(TextBlock),
    Image(ImageBlock),
    Button(ButtonBlock),
    Link(LinkBlock),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextBlock {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageBlock {
    pub src: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    /// Inferred from the section position when absent
    #[serde(default)]
    pub below_fold: Option<bool>,
    #[serde(default)]
    pub sources: Vec<ImageSource>,
    #[serde(default)]
    pub sizes: Option<String>,
    #[serde(default)]
    pub decorative: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageSource {
    pub url: String,
    pub width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ButtonBlock {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LinkBlock {
    #[serde(default)]
    pub text: Option<String>,
    pub href: String,
    #[serde(default)]
    pub aria_label: Option<String>,
    /// Opens in a new tab or window
    #[serde(default)]
    pub new_context: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NavLink {
    pub label: String,
    pub href: String,
    #[serde(default)]
    pub aria_label: Option<String>,
    #[serde(default)]
    pub new_context: bool,
}

impl PageDescriptor {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Ids addressable with `#id` inside the page.
    pub fn anchor_ids(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().filter_map(|s| s.id.as_deref())
    }
}

/// Load every `*.json` descriptor of a content directory, sorted by file name.
pub fn load_pages(dir: &Path) -> Result<Vec<PageDescriptor>, LoadError> {
    let io_err = |source| LoadError::Io { path: dir.to_path_buf(), source };

    let mut paths = vec![];
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.extension().map_or(false, |e| e == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut pages: Vec<PageDescriptor> = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path)
            .map_err(|source| LoadError::Io { path: path.clone(), source })?;
        let page = PageDescriptor::from_json(&content)
            .map_err(|source| LoadError::Json { path: path.clone(), source })?;
        if !is_valid_page_id(&page.id) {
            return Err(LoadError::InvalidPageId { path, id: page.id });
        }
        if pages.iter().any(|p| p.id == page.id) {
            return Err(LoadError::DuplicatePage(page.id));
        }
        tracing::debug!("Loaded page {} from {}", page.id, path.display());
        pages.push(page);
    }

    Ok(pages)
}
