//! ForgePages Core - Page Assembly Compiler
//!
//! # The Five Laws (Non-Negotiable)
//! 1. Descriptors Are Truth
//! 2. Tokens Are Defined Once
//! 3. Findings Never Reorder A Page
//! 4. Deterministic Output
//! 5. One Page Fails Alone

pub mod findings;
pub mod descriptor;
pub mod tokens;
pub mod resources;
pub mod images;
pub mod contact;
pub mod rules;
pub mod structure;
pub mod config;
pub mod hashing;
pub mod pipeline;

pub use findings::{Finding, RuleId, Severity};
pub use descriptor::{PageDescriptor, Section, SectionKind, ContentBlock, LoadError};
pub use tokens::{ThemeTokenRegistry, ThemeToken, TokenCategory, TokenError};
pub use resources::{ExternalResource, HintPlan, ResourceHintPlanner};
pub use images::{ImageDirective, Placement};
pub use contact::{ContactChannel, ContactInfoResolver, ContactResolution};
pub use structure::{BuildError, Document, PageStructureBuilder};
pub use config::SiteConfig;
pub use hashing::{compute_document_hash, compute_input_hash, canonical_json};
pub use pipeline::{BuildPipeline, BuildReport, PageOutcome, PageStatus, PipelineError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
