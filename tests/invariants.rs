//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use std::path::PathBuf;

use forgepages_core::{
    BuildPipeline, PageStatus, RuleId, SiteConfig, ThemeTokenRegistry,
    contact::{ChannelKind, ContactChannel, ContactInfoResolver, RenderDirective},
    descriptor::{
        ButtonBlock, ContentBlock, ImageBlock, Landmark, PageDescriptor, Section, SectionKind, TextBlock,
    },
    findings::rule_ids,
    images::{self, LoadingMode, Placement},
    resources::{ExternalResource, ResourceHintPlanner, ResourceKind},
    structure::BlockNode,
    tokens::TokenCategory,
};

fn demo_site() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/site")
}

fn section(kind: SectionKind, heading: Option<&str>, blocks: Vec<ContentBlock>) -> Section {
    Section {
        id: None,
        kind,
        heading: heading.map(str::to_string),
        landmark: None,
        blocks,
        style: Default::default(),
    }
}

fn text(s: &str) -> ContentBlock {
    ContentBlock::Text(TextBlock { text: s.to_string() })
}

fn page(id: &str, sections: Vec<Section>) -> PageDescriptor {
    PageDescriptor {
        id: id.to_string(),
        title: id.to_string(),
        lang: Some("en".to_string()),
        description: Some("Printing services".to_string()),
        sections,
        nav: vec![],
        contacts: vec![],
        resources: vec![],
    }
}

fn image(below_fold: Option<bool>) -> ImageBlock {
    ImageBlock {
        src: "/img/banner.jpg".to_string(),
        alt: Some("Banner printing samples".to_string()),
        width: Some(1200),
        height: Some(400),
        below_fold,
        sources: vec![],
        sizes: None,
        decorative: false,
    }
}

#[test]
fn invariant_loading_mode_follows_fold() {
    for below in [None, Some(false), Some(true)] {
        let img = image(below);
        let (above, _) = images::resolve(&img, Placement::AboveFold);
        let (under, _) = images::resolve(&img, Placement::BelowFold);
        assert_eq!(above.loading, LoadingMode::Eager);
        assert_eq!(under.loading, LoadingMode::Lazy);
    }
}

#[test]
fn invariant_shared_origin_preconnected_once() {
    let resources = vec![
        ExternalResource::new("https://cdn.example.com/a.js", ResourceKind::Script).with_version("1.2.3"),
        ExternalResource::new("https://cdn.example.com/b.js", ResourceKind::Script).with_version("1.2.3"),
        ExternalResource::new("https://cdn.example.com/c.css", ResourceKind::Stylesheet),
    ];
    let (plan, _) = ResourceHintPlanner::plan(&resources);
    assert_eq!(plan.preconnect.len(), 1);
    assert_eq!(plan.preconnect[0].origin, "https://cdn.example.com");
}

#[test]
fn invariant_token_resolution_idempotent() {
    let mut registry = ThemeTokenRegistry::new();
    registry.define("primary", "#1a4d8f", TokenCategory::Color).unwrap();
    let first = registry.resolve("primary").unwrap().clone();
    for _ in 0..10 {
        assert_eq!(registry.resolve("primary").unwrap(), &first);
    }
}

#[test]
fn invariant_one_landmark_each_or_conflict() {
    let pipeline = BuildPipeline::default();

    let good = page("good", vec![
        section(SectionKind::Hero, Some("Print it today"), vec![text("Fast")]),
        section(SectionKind::Services, Some("Services"), vec![text("Cards")]),
        section(SectionKind::Footer, Some("Contact"), vec![text("Call us")]),
    ]);
    let (doc, _) = pipeline.build_page(&good).unwrap();
    assert_eq!(doc.main.sections.len(), 2);
    assert_eq!(doc.footer.sections.len(), 1);
    assert!(doc.header.sections.is_empty());

    let mut split_main = good.clone();
    split_main.sections.push(section(SectionKind::Generic, Some("Late"), vec![text("x")]));
    let err = pipeline.build_page(&split_main).unwrap_err();
    assert_eq!(err.rule(), RuleId::StructuralConflict);

    let mut two_headers = good.clone();
    let mut banner = section(SectionKind::Generic, Some("Banner"), vec![]);
    banner.landmark = Some(Landmark::Header);
    two_headers.sections.insert(0, banner.clone());
    two_headers.sections.insert(1, banner);
    let err = pipeline.build_page(&two_headers).unwrap_err();
    assert_eq!(err.rule(), RuleId::StructuralConflict);
}

#[test]
fn invariant_first_email_is_canonical() {
    let a = ContactChannel::email("a@x.com");
    let b = ContactChannel::email("b@x.com");
    let resolution = ContactInfoResolver::resolve([("page-1", &a), ("page-2", &b)]);

    assert_eq!(resolution.canonical.len(), 1);
    assert_eq!(resolution.canonical[0].value, "a@x.com");
    let inconsistent = resolution
        .findings
        .iter()
        .filter(|(_, f)| f.rule == RuleId::InconsistentContactInfo)
        .count();
    assert_eq!(inconsistent, 1);
}

#[test]
fn scenario_latest_script_is_deferred() {
    let mut p = page("home", vec![section(SectionKind::Hero, Some("Hi"), vec![])]);
    p.resources.push(
        ExternalResource::new("https://kit.example.com/icons.js", ResourceKind::Script).with_version("latest"),
    );

    let (doc, findings) = BuildPipeline::default().build_page(&p).unwrap();
    assert_eq!(rule_ids(&findings), [RuleId::UnpinnedVersion]);
    assert_eq!(doc.head.hints.deferred.len(), 1);
    assert!(doc.head.hints.blocking.is_empty());
}

#[test]
fn scenario_services_without_heading() {
    let p = page("home", vec![section(SectionKind::Services, None, vec![text("Business cards")])]);
    let (doc, findings) = BuildPipeline::default().build_page(&p).unwrap();

    let heading = doc.main.sections[0].heading.as_ref().unwrap();
    assert_eq!(heading.text, "Services");
    assert!(heading.visually_hidden);
    assert!(rule_ids(&findings).contains(&RuleId::AutoHeadingInserted));
}

#[test]
fn scenario_unnamed_button_fails_only_its_page() {
    let unnamed = ContentBlock::Button(ButtonBlock { text: None, aria_label: None, action: None });
    let pages = [
        page("home", vec![section(SectionKind::Hero, Some("Hi"), vec![text("Welcome")])]),
        page("broken", vec![section(SectionKind::Hero, Some("Hi"), vec![unnamed])]),
        page("terms", vec![section(SectionKind::Generic, Some("Terms"), vec![text("...")])]),
    ];

    let report = BuildPipeline::default().build_all(&pages).unwrap();
    let statuses: Vec<_> = report.pages.iter().map(|p| p.status).collect();
    assert_eq!(statuses, [PageStatus::Built, PageStatus::Failed, PageStatus::Built]);

    let broken = report.page("broken").unwrap();
    assert!(broken.document.is_none());
    assert_eq!(rule_ids(&broken.findings), [RuleId::AmbiguousControl]);
    assert!(report.page("terms").unwrap().document.is_some());
    assert!(!report.passed());
}

#[test]
fn scenario_failed_page_still_reports_divergent_contact() {
    let unnamed = ContentBlock::Button(ButtonBlock { text: None, aria_label: None, action: None });
    let mut home = page("home", vec![section(SectionKind::Hero, Some("Hi"), vec![text("Welcome")])]);
    home.contacts.push(ContactChannel::email("a@x.com"));
    let mut terms = page("terms", vec![section(SectionKind::Generic, Some("Terms"), vec![unnamed])]);
    terms.contacts.push(ContactChannel::email("b@x.com"));

    let report = BuildPipeline::default().build_all(&[home, terms]).unwrap();
    let rules: Vec<_> = report.entries().into_iter().map(|e| (e.page_id, e.rule)).collect();
    assert_eq!(
        rules,
        [
            ("terms".to_string(), RuleId::InconsistentContactInfo),
            ("terms".to_string(), RuleId::AmbiguousControl),
        ]
    );
    assert_eq!(report.page("terms").unwrap().status, PageStatus::Failed);
}

#[test]
fn invariant_protocol_relative_origin_preconnected() {
    let resources = vec![
        ExternalResource::new("//cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.2/css/all.min.css", ResourceKind::Stylesheet),
        ExternalResource::new("https://cdnjs.cloudflare.com/ajax/libs/jquery/3.7.1/jquery.min.js", ResourceKind::Script)
            .with_version("3.7.1"),
    ];
    let (plan, findings) = ResourceHintPlanner::plan(&resources);
    assert!(findings.is_empty());
    assert_eq!(plan.preconnect.len(), 1);
    assert_eq!(plan.preconnect[0].origin, "https://cdnjs.cloudflare.com");
}

#[test]
fn demo_site_builds_with_expected_findings() {
    let site = demo_site();
    let pipeline = BuildPipeline::load(&site.join("theme.toml"), Some(&site.join("forgepages.toml"))).unwrap();
    let report = pipeline.build_dir(&site.join("pages")).unwrap();

    let ids: Vec<_> = report.pages.iter().map(|p| p.page_id.as_str()).collect();
    assert_eq!(ids, ["index", "privacy", "terms"]);

    let index = report.page("index").unwrap();
    assert_eq!(index.status, PageStatus::Built);
    assert_eq!(
        rule_ids(&index.findings),
        [
            RuleId::DeadNavigationLink,
            RuleId::MissingAccessibleLabel,
            RuleId::MissingAccessibleLabel,
            RuleId::AutoHeadingInserted,
            RuleId::LayoutShiftRisk,
            RuleId::InaccessibleImage,
            RuleId::MissingResponsiveSource,
            RuleId::MissingAccessibleLabel,
            RuleId::BlockingFontLoad,
            RuleId::UnpinnedVersion,
        ]
    );

    let doc = index.document.as_ref().unwrap();
    let email = doc.footer.contacts.iter().find(|c| c.kind == ChannelKind::Email).unwrap();
    assert!(matches!(email.render, RenderDirective::AssembleOnInteraction { .. }));
    let written = serde_json::to_string(doc).unwrap();
    assert!(!written.contains("info@acmeprint.example"));
    let lazy = doc.main.sections[1].blocks.iter().any(|b| {
        matches!(b, BlockNode::Image { directive, .. } if directive.loading == LoadingMode::Lazy)
    });
    assert!(lazy);

    let privacy = report.page("privacy").unwrap();
    assert!(rule_ids(&privacy.findings).contains(&RuleId::InconsistentContactInfo));
    assert!(rule_ids(&privacy.findings).contains(&RuleId::MissingMetadata));

    let terms = report.page("terms").unwrap();
    assert_eq!(terms.status, PageStatus::Failed);
    assert_eq!(rule_ids(&terms.findings), [RuleId::AmbiguousControl]);
}

#[test]
fn demo_site_denied_rule_fails_status_but_keeps_documents() {
    let site = demo_site();
    let registry = ThemeTokenRegistry::load(&site.join("theme.toml")).unwrap();
    let mut config = SiteConfig::default();
    config.policy.deny.push(RuleId::UnpinnedVersion);
    config.site.resources.push(
        ExternalResource::new("https://kit.example.com/icons.js", ResourceKind::Script).with_version("latest"),
    );

    let pipeline = BuildPipeline::new(registry, config);
    let p = page("home", vec![section(SectionKind::Hero, Some("Hi"), vec![])]);
    let report = pipeline.build_all(&[p]).unwrap();

    assert_eq!(report.pages[0].status, PageStatus::Built);
    assert!(report.pages[0].document.is_some());
    assert!(!report.passed());
}

#[test]
fn report_serializes_without_documents() {
    let report = BuildPipeline::default()
        .build_all(&[page("home", vec![section(SectionKind::Hero, Some("Hi"), vec![])])])
        .unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert!(json["pages"][0].get("document").is_none());
    assert_eq!(json["pages"][0]["status"], "built");
    assert_eq!(json["engine_version"], forgepages_core::ENGINE_VERSION);
}
