//! Resource Hint Planner
//!
//! Decides preconnect, deferred and blocking placement for external
//! scripts, stylesheets and fonts. Pure function of the resource list.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::findings::{Finding, RuleId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Script,
    Stylesheet,
    Font,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// Critical; loads before first render
    Blocking,
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExternalResource {
    pub url: String,
    pub kind: ResourceKind,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub load: Option<LoadStrategy>,
    /// `font-display: swap` or equivalent. Inferred from `display=swap` in the url when absent.
    #[serde(default)]
    pub display_swap: Option<bool>,
}

impl ExternalResource {
    pub fn new(url: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            url: url.into(),
            kind,
            version: None,
            load: None,
            display_swap: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_load(mut self, load: LoadStrategy) -> Self {
        self.load = Some(load);
        self
    }

    fn default_load(&self) -> LoadStrategy {
        match self.kind {
            ResourceKind::Stylesheet => LoadStrategy::Blocking,
            ResourceKind::Script | ResourceKind::Font => LoadStrategy::Deferred,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreconnectHint {
    pub origin: String,
    pub crossorigin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlannedResource {
    pub url: String,
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub pinned: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HintPlan {
    pub preconnect: Vec<PreconnectHint>,
    pub blocking: Vec<PlannedResource>,
    pub deferred: Vec<PlannedResource>,
}

/// A version is pinned when it names one concrete release, e.g. `6.4.2` or `v3.7.1`.
pub fn is_pinned(version: Option<&str>) -> bool {
    version
        .map(|v| v.trim().trim_start_matches('v'))
        .map_or(false, |v| semver::Version::parse(v).is_ok())
}

fn font_swaps(resource: &ExternalResource, parsed: Option<&Url>) -> bool {
    resource.display_swap.unwrap_or_else(|| {
        parsed.map_or(false, |u| {
            u.query_pairs().any(|(k, v)| k == "display" && v == "swap")
        })
    })
}

/// `None` for same-origin paths. Protocol-relative urls (`//host/...`)
/// still name an external origin and are read as https.
fn parse_resource_url(raw: &str) -> Result<Option<Url>, url::ParseError> {
    let raw = raw.trim();
    if raw.starts_with("//") {
        return Url::parse(&format!("https:{}", raw)).map(Some);
    }
    match Url::parse(raw) {
        Ok(u) => Ok(Some(u)),
        Err(url::ParseError::RelativeUrlWithoutBase) => Ok(None),
        Err(e) => Err(e),
    }
}

pub struct ResourceHintPlanner;

impl ResourceHintPlanner {
    pub fn plan(resources: &[ExternalResource]) -> (HintPlan, Vec<Finding>) {
        let mut plan = HintPlan::default();
        let mut findings = vec![];
        let mut seen: Vec<&str> = vec![];

        for (index, resource) in resources.iter().enumerate() {
            if seen.contains(&resource.url.as_str()) {
                continue;
            }
            seen.push(&resource.url);
            let location = format!("resources[{}]", index);

            let parsed = match parse_resource_url(&resource.url) {
                Ok(u) => u,
                Err(e) => {
                    findings.push(
                        Finding::new(
                            RuleId::MalformedResourceUrl,
                            format!("Cannot parse resource url {}: {}", resource.url, e),
                        )
                        .at(location),
                    );
                    continue;
                }
            };

            if let Some(origin) = parsed.as_ref().map(|u| u.origin()).filter(|o| o.is_tuple()) {
                let origin = origin.ascii_serialization();
                let font = resource.kind == ResourceKind::Font;
                match plan.preconnect.iter_mut().find(|h| h.origin == origin) {
                    Some(hint) => hint.crossorigin |= font,
                    None => plan.preconnect.push(PreconnectHint { origin, crossorigin: font }),
                }
            }

            let pinned = is_pinned(resource.version.as_deref());
            let strategy = match resource.kind {
                ResourceKind::Script => {
                    if !pinned {
                        findings.push(
                            Finding::new(
                                RuleId::UnpinnedVersion,
                                format!(
                                    "Script {} is not pinned to a concrete version (got {})",
                                    resource.url,
                                    resource.version.as_deref().unwrap_or("none"),
                                ),
                            )
                            .at(location.clone())
                            .remedy("Reference an exact release such as 6.4.2"),
                        );
                    }
                    resource.load.unwrap_or_else(|| resource.default_load())
                }
                ResourceKind::Stylesheet => resource.load.unwrap_or_else(|| resource.default_load()),
                ResourceKind::Font => {
                    if !font_swaps(resource, parsed.as_ref()) {
                        findings.push(
                            Finding::new(
                                RuleId::BlockingFontLoad,
                                format!("Font {} blocks text rendering without display swap", resource.url),
                            )
                            .at(location.clone())
                            .remedy("Add display=swap to the font request"),
                        );
                    }
                    LoadStrategy::Deferred
                }
            };

            let planned = PlannedResource {
                url: resource.url.clone(),
                kind: resource.kind,
                version: resource.version.clone(),
                pinned,
            };
            match strategy {
                LoadStrategy::Blocking => plan.blocking.push(planned),
                LoadStrategy::Deferred => plan.deferred.push(planned),
            }
        }

        tracing::debug!(
            "Planned {} preconnect, {} blocking, {} deferred resources",
            plan.preconnect.len(),
            plan.blocking.len(),
            plan.deferred.len()
        );

        (plan, findings)
    }
}
