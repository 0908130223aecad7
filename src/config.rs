//! Site Configuration
//!
//! Optional `forgepages.toml`:
//!
//! ```toml
//! [site]
//! name = "Acme Print"
//! above_fold_sections = 1
//!
//! [[site.resources]]
//! url = "https://fonts.googleapis.com/css2?family=Inter&display=swap"
//! kind = "font"
//!
//! [policy]
//! deny = ["unpinned_version"]
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::descriptor::LoadError;
use crate::findings::RuleId;
use crate::resources::ExternalResource;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    #[serde(default)]
    pub site: SiteSection,
    #[serde(default)]
    pub policy: PolicySection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SiteSection {
    #[serde(default)]
    pub name: Option<String>,
    /// Sections at the top of a page whose images load eagerly
    #[serde(default = "default_above_fold_sections")]
    pub above_fold_sections: usize,
    /// Loaded by every page, ahead of page resources
    #[serde(default)]
    pub resources: Vec<ExternalResource>,
}

fn default_above_fold_sections() -> usize { 1 }

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            name: None,
            above_fold_sections: default_above_fold_sections(),
            resources: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PolicySection {
    /// Rules whose findings fail the build status (documents are still produced)
    #[serde(default)]
    pub deny: Vec<RuleId>,
}

impl PolicySection {
    pub fn denies(&self, rule: RuleId) -> bool {
        self.deny.contains(&rule)
    }
}

impl SiteConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let content = fs::read_to_string(path)
            .map_err(|source| LoadError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml(&content).map_err(|source| LoadError::Toml { path: path.to_path_buf(), source })
    }
}
