//! ForgePages CLI
//!
//! Commands: tokens, build
//! Outputs the JSON report to stdout (or --report), logs to stderr
//! Returns 2 when a page failed or a denied rule fired, 1 on input errors

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use forgepages_core::{BuildPipeline, BuildReport, ThemeTokenRegistry};

#[derive(Parser)]
#[command(name = "forgepages-cli")]
#[command(about = "ForgePages CLI - Page Assembly Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the theme token file
    #[arg(short, long, default_value = "theme.toml", global = true)]
    theme: PathBuf,

    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List theme tokens as CSS custom properties
    Tokens,

    /// Build every page descriptor in a content directory
    Build {
        /// Directory of *.json page descriptors
        #[arg(short, long)]
        content: PathBuf,

        /// Site configuration (forgepages.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write one <page-id>.json document per built page here
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Write the findings report here instead of stdout
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "forgepages_core=debug" } else { "forgepages_core=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(error: impl std::fmt::Display) -> ExitCode {
    let output = serde_json::json!({
        "success": false,
        "error": error.to_string(),
    });
    println!("{}", output);
    ExitCode::FAILURE
}

fn write_documents(report: &BuildReport, out: &Path) -> std::io::Result<()> {
    fs::create_dir_all(out)?;
    for page in &report.pages {
        if let Some(document) = &page.document {
            let json = serde_json::to_string_pretty(document)?;
            fs::write(out.join(format!("{}.json", page.page_id)), json)?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Tokens => {
            let registry = match ThemeTokenRegistry::load(&cli.theme) {
                Ok(r) => r,
                Err(e) => return fail(e),
            };

            let tokens: Vec<_> = registry
                .list()
                .iter()
                .map(|t| serde_json::json!({
                    "name": t.name,
                    "category": t.category,
                    "value": t.value.to_string(),
                    "css": t.css_var(),
                }))
                .collect();

            match serde_json::to_string_pretty(&tokens) {
                Ok(json) => {
                    println!("{}", json);
                    ExitCode::SUCCESS
                }
                Err(e) => fail(e),
            }
        }

        Commands::Build { content, config, out, report } => {
            let pipeline = match BuildPipeline::load(&cli.theme, config.as_deref()) {
                Ok(p) => p,
                Err(e) => return fail(e),
            };

            let build = match pipeline.build_dir(&content) {
                Ok(b) => b,
                Err(e) => return fail(e),
            };

            if let Some(out) = &out {
                if let Err(e) = write_documents(&build, out) {
                    return fail(format!("Failed to write documents to {}: {}", out.display(), e));
                }
            }

            let output = serde_json::json!({
                "success": build.passed(),
                "report": build,
                "findings": build.entries(),
            });
            let json = match serde_json::to_string_pretty(&output) {
                Ok(j) => j,
                Err(e) => return fail(e),
            };

            match &report {
                Some(path) => {
                    if let Err(e) = fs::write(path, json) {
                        return fail(format!("Failed to write report to {}: {}", path.display(), e));
                    }
                }
                None => println!("{}", json),
            }

            if build.passed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // Page failure or denied rule
            }
        }
    }
}
