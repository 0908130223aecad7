//! Contact Info Resolver
//!
//! One canonical channel per type across every page of a site. The first
//! definition wins; every later divergent value is reported, never dropped
//! silently.

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::findings::{Finding, RuleId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Phone,
    Form,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContactChannel {
    pub kind: ChannelKind,
    pub value: String,
    #[serde(default)]
    pub obfuscate: bool,
}

impl ContactChannel {
    pub fn email(value: impl Into<String>) -> Self {
        Self { kind: ChannelKind::Email, value: value.into(), obfuscate: false }
    }

    pub fn phone(value: impl Into<String>) -> Self {
        Self { kind: ChannelKind::Phone, value: value.into(), obfuscate: false }
    }

    pub fn obfuscated(mut self) -> Self {
        self.obfuscate = true;
        self
    }

    /// Comparison key for the channel value.
    pub fn normalized(&self) -> String {
        let value = self.value.trim();
        match self.kind {
            ChannelKind::Email => value.to_lowercase(),
            ChannelKind::Phone => {
                let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
                if value.starts_with('+') {
                    format!("+{}", digits)
                } else {
                    digits
                }
            }
            ChannelKind::Form => value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EmailParts {
    pub user: String,
    pub domain: String,
}

impl EmailParts {
    pub fn split(address: &str) -> Option<Self> {
        let (user, domain) = address.trim().split_once('@')?;
        if user.is_empty() || domain.is_empty() || domain.contains('@') {
            return None;
        }
        Some(Self { user: user.to_string(), domain: domain.to_string() })
    }
}

/// How the output stage must emit a contact value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RenderDirective {
    Inline { value: String },
    /// Assemble the address client-side on interaction; static markup
    /// only carries the encoded parts.
    AssembleOnInteraction { user_b64: String, domain_b64: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedContact {
    pub kind: ChannelKind,
    /// Empty when the address may only be assembled on interaction
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,
    /// Page that first defined the channel
    pub source_page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parts: Option<EmailParts>,
    pub render: RenderDirective,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactResolution {
    pub canonical: Vec<ResolvedContact>,
    /// Findings keyed by the page that declared the offending channel
    pub findings: Vec<(String, Finding)>,
}

impl ContactResolution {
    pub fn get(&self, kind: ChannelKind) -> Option<&ResolvedContact> {
        self.canonical.iter().find(|c| c.kind == kind)
    }

    pub fn findings_for<'a>(&'a self, page_id: &'a str) -> impl Iterator<Item = &'a Finding> + 'a {
        self.findings
            .iter()
            .filter(move |(page, _)| page == page_id)
            .map(|(_, f)| f)
    }
}

struct CanonicalEntry<'a> {
    page: &'a str,
    channel: &'a ContactChannel,
    key: String,
    obfuscate: bool,
}

pub struct ContactInfoResolver;

impl ContactInfoResolver {
    /// Resolve `(page_id, channel)` pairs given in page order.
    pub fn resolve<'a, I>(channels: I) -> ContactResolution
    where
        I: IntoIterator<Item = (&'a str, &'a ContactChannel)>,
    {
        let mut canonical: Vec<CanonicalEntry<'a>> = vec![];
        let mut findings = vec![];

        for (page, channel) in channels {
            if channel.kind == ChannelKind::Email && EmailParts::split(&channel.value).is_none() {
                findings.push((
                    page.to_string(),
                    Finding::new(
                        RuleId::MalformedContact,
                        format!("Email address {:?} is not of the form user@domain", channel.value),
                    ),
                ));
                continue;
            }

            let key = channel.normalized();
            match canonical.iter_mut().find(|c| c.channel.kind == channel.kind) {
                Some(existing) if existing.key == key => {
                    existing.obfuscate |= channel.obfuscate;
                }
                Some(existing) => {
                    findings.push((
                        page.to_string(),
                        Finding::new(
                            RuleId::InconsistentContactInfo,
                            format!(
                                "{:?} contact {} differs from {} defined on page {}",
                                channel.kind, channel.value, existing.channel.value, existing.page
                            ),
                        )
                        .remedy("Use the same contact details on every page"),
                    ));
                }
                None => canonical.push(CanonicalEntry {
                    page,
                    channel,
                    key,
                    obfuscate: channel.obfuscate,
                }),
            }
        }

        let canonical = canonical
            .into_iter()
            .map(|c| {
                let value = c.channel.value.trim().to_string();
                let parts = match c.channel.kind {
                    ChannelKind::Email => EmailParts::split(&value),
                    _ => None,
                };
                let b64 = base64::engine::general_purpose::STANDARD;
                let (value, parts, render) = match (parts, c.obfuscate) {
                    (Some(parts), true) => {
                        let render = RenderDirective::AssembleOnInteraction {
                            user_b64: b64.encode(&parts.user),
                            domain_b64: b64.encode(&parts.domain),
                        };
                        (String::new(), None, render)
                    }
                    (parts, _) => {
                        let render = RenderDirective::Inline { value: value.clone() };
                        (value, parts, render)
                    }
                };
                ResolvedContact {
                    kind: c.channel.kind,
                    value,
                    source_page: c.page.to_string(),
                    parts,
                    render,
                }
            })
            .collect();

        ContactResolution { canonical, findings }
    }
}
