//! CLI Exit Status Tests
//!
//! 0 when every page built without error findings, 1 on unreadable input,
//! 2 when a page failed or a denied rule fired.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn demo_site() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/site")
}

fn cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_forgepages-cli"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

const CLEAN_PAGE: &str = r#"{
    "id": "home",
    "title": "Acme Print",
    "lang": "en",
    "description": "Printing services",
    "sections": [
        { "kind": "hero", "heading": "Print it today", "blocks": [{ "type": "text", "text": "Fast" }] }
    ]
}"#;

#[test]
fn tokens_lists_theme_and_exits_zero() {
    let theme = demo_site().join("theme.toml");
    let output = cli(&["--theme", arg(&theme), "tokens"]);

    assert_eq!(output.status.code(), Some(0));
    let tokens = stdout_json(&output);
    assert!(!tokens.as_array().unwrap().is_empty());
    assert!(tokens[0]["css"].as_str().unwrap().starts_with("var(--"));
}

#[test]
fn clean_site_exits_zero_and_writes_documents() {
    let dir = tempfile::tempdir().unwrap();
    let content = dir.path().join("pages");
    let out = dir.path().join("out");
    fs::create_dir(&content).unwrap();
    fs::write(content.join("home.json"), CLEAN_PAGE).unwrap();
    let theme = demo_site().join("theme.toml");

    let output = cli(&["--theme", arg(&theme), "build", "--content", arg(&content), "--out", arg(&out)]);

    assert_eq!(output.status.code(), Some(0));
    let json = stdout_json(&output);
    assert_eq!(json["success"], true);
    assert!(out.join("home.json").exists());
}

#[test]
fn demo_site_with_failed_page_exits_two() {
    let site = demo_site();
    let output = cli(&[
        "--theme",
        arg(&site.join("theme.toml")),
        "build",
        "--content",
        arg(&site.join("pages")),
        "--config",
        arg(&site.join("forgepages.toml")),
    ]);

    assert_eq!(output.status.code(), Some(2));
    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    let failed: Vec<_> = json["findings"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|f| f["rule"] == "ambiguous_control")
        .map(|f| f["page_id"].as_str().unwrap())
        .collect();
    assert_eq!(failed, ["terms"]);
}

#[test]
fn broken_theme_exits_one_with_error_object() {
    let dir = tempfile::tempdir().unwrap();
    let theme = dir.path().join("theme.toml");
    fs::write(&theme, "[colors\nprimary = \"#000\"\n").unwrap();

    let output = cli(&["--theme", arg(&theme), "build", "--content", arg(&demo_site().join("pages"))]);

    assert_eq!(output.status.code(), Some(1));
    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
}

#[test]
fn path_like_page_id_exits_one_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let content = dir.path().join("pages");
    let out = dir.path().join("out");
    fs::create_dir(&content).unwrap();
    fs::write(content.join("home.json"), CLEAN_PAGE.replace("\"home\"", "\"../escape\"")).unwrap();
    let theme = demo_site().join("theme.toml");

    let output = cli(&["--theme", arg(&theme), "build", "--content", arg(&content), "--out", arg(&out)]);

    assert_eq!(output.status.code(), Some(1));
    assert_eq!(stdout_json(&output)["success"], false);
    assert!(!dir.path().join("escape.json").exists());
}
