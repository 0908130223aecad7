//! Image Directives
//!
//! Loading policy and validation over image metadata. Images are never
//! fetched or decoded here.

use serde::{Deserialize, Serialize};

use crate::descriptor::ImageBlock;
use crate::findings::{Finding, RuleId};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Placement {
    AboveFold,
    BelowFold,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LoadingMode {
    Eager,
    Lazy,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DecodingMode {
    Auto,
    Async,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SourceCandidate {
    pub url: String,
    /// Width descriptor in pixels, 0 when unknown
    pub width: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageDirective {
    pub loading: LoadingMode,
    pub decoding: DecodingMode,
    pub width: u32,
    pub height: u32,
    pub candidates: Vec<SourceCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sizes: Option<String>,
}

impl ImageDirective {
    /// `srcset` attribute value, e.g. `a.jpg 480w, b.jpg 960w`
    pub fn srcset(&self) -> String {
        self.candidates
            .iter()
            .map(|c| format!("{} {}w", c.url, c.width))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Last path segment of an image url, without query or fragment.
fn file_name(src: &str) -> &str {
    let path = src.split(['?', '#']).next().unwrap_or(src);
    path.rsplit('/').next().unwrap_or(path)
}

/// Alt text that says nothing: blank, or the file name with or without extension.
fn is_generic_alt(alt: &str, src: &str) -> bool {
    let alt = alt.trim();
    if alt.is_empty() {
        return true;
    }
    let name = file_name(src);
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    alt.eq_ignore_ascii_case(name) || alt.eq_ignore_ascii_case(stem)
}

pub fn resolve(image: &ImageBlock, placement: Placement) -> (ImageDirective, Vec<Finding>) {
    let mut findings = vec![];

    let (loading, decoding) = match placement {
        Placement::AboveFold => (LoadingMode::Eager, DecodingMode::Auto),
        Placement::BelowFold => (LoadingMode::Lazy, DecodingMode::Async),
    };

    if image.width.is_none() || image.height.is_none() {
        findings.push(
            Finding::new(
                RuleId::LayoutShiftRisk,
                format!("Image {} has no intrinsic width and height", image.src),
            )
            .remedy("Declare width and height so the browser can reserve space"),
        );
    }

    if !image.decorative {
        let generic = image.alt.as_deref().map_or(true, |alt| is_generic_alt(alt, &image.src));
        if generic {
            findings.push(
                Finding::new(
                    RuleId::InaccessibleImage,
                    format!("Image {} has missing or generic alt text", image.src),
                )
                .remedy("Describe the image content, or mark it decorative"),
            );
        }
    }

    let candidates: Vec<SourceCandidate> = if image.sources.is_empty() {
        vec![SourceCandidate {
            url: image.src.clone(),
            width: image.width.unwrap_or(0),
        }]
    } else {
        image
            .sources
            .iter()
            .map(|s| SourceCandidate { url: s.url.clone(), width: s.width })
            .collect()
    };

    if candidates.len() < 2 {
        findings.push(
            Finding::new(
                RuleId::MissingResponsiveSource,
                format!("Image {} ships a single fixed-width source", image.src),
            )
            .remedy("Provide resized variants for a srcset"),
        );
    }

    let directive = ImageDirective {
        loading,
        decoding,
        width: image.width.unwrap_or(0),
        height: image.height.unwrap_or(0),
        candidates,
        sizes: image.sizes.clone(),
    };

    (directive, findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ImageSource;
    use crate::findings::rule_ids;

    fn image(src: &str, alt: Option<&str>) -> ImageBlock {
        ImageBlock {
            src: src.to_string(),
            alt: alt.map(str::to_string),
            width: Some(1200),
            height: Some(800),
            below_fold: None,
            sources: vec![
                ImageSource { url: format!("{}?w=600", src), width: 600 },
                ImageSource { url: format!("{}?w=1200", src), width: 1200 },
            ],
            sizes: Some("(max-width: 768px) 100vw, 50vw".to_string()),
            decorative: false,
        }
    }

    #[test]
    fn test_loading_follows_placement() {
        let img = image("/img/press.jpg", Some("Offset press in operation"));
        let (above, findings) = resolve(&img, Placement::AboveFold);
        assert_eq!(above.loading, LoadingMode::Eager);
        assert!(findings.is_empty());

        let (below, _) = resolve(&img, Placement::BelowFold);
        assert_eq!(below.loading, LoadingMode::Lazy);
        assert_eq!(below.decoding, DecodingMode::Async);
        assert_eq!(below.srcset(), "/img/press.jpg?w=600 600w, /img/press.jpg?w=1200 1200w");
    }

    #[test]
    fn test_missing_dimensions_default_to_zero() {
        let mut img = image("/img/press.jpg", Some("Offset press"));
        img.height = None;
        let (directive, findings) = resolve(&img, Placement::BelowFold);
        assert_eq!(rule_ids(&findings), [RuleId::LayoutShiftRisk]);
        assert_eq!(directive.height, 0);
        assert_eq!(directive.width, 1200);
    }

    #[test]
    fn test_generic_alt_text() {
        for alt in [None, Some(""), Some("  "), Some("press.jpg"), Some("PRESS")] {
            let img = image("/img/press.jpg?v=2", alt);
            let (_, findings) = resolve(&img, Placement::AboveFold);
            assert_eq!(rule_ids(&findings), [RuleId::InaccessibleImage], "alt {:?}", alt);
        }
    }

    #[test]
    fn test_decorative_image_allows_empty_alt() {
        let mut img = image("/img/divider.svg", Some(""));
        img.decorative = true;
        let (_, findings) = resolve(&img, Placement::BelowFold);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_single_source_is_sole_candidate() {
        let mut img = image("/img/logo.png", Some("Company logo"));
        img.sources.clear();
        let (directive, findings) = resolve(&img, Placement::AboveFold);
        assert_eq!(rule_ids(&findings), [RuleId::MissingResponsiveSource]);
        assert_eq!(directive.candidates, vec![SourceCandidate { url: "/img/logo.png".into(), width: 1200 }]);
    }
}
