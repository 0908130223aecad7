//! Theme Token Registry - Design Values
//!
//! Populated once from the theme file, then only read. Builds share it by
//! reference across worker threads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TokenError {
    #[error("Unknown token: {0}")]
    UnknownToken(String),

    #[error("Token {name} already defined as {existing}, cannot redefine as {attempted}")]
    DuplicateToken {
        name: String,
        existing: String,
        attempted: String,
    },

    #[error("Invalid {category} value for token {name}: {value}")]
    InvalidTokenValue {
        name: String,
        category: TokenCategory,
        value: String,
    },
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("Failed to read theme {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid theme file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Token(#[from] TokenError),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenCategory {
    Color,
    Spacing,
    Breakpoint,
}

impl fmt::Display for TokenCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenCategory::Color => "color",
            TokenCategory::Spacing => "spacing",
            TokenCategory::Breakpoint => "breakpoint",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TokenValue {
    Color(String),
    Length { amount: f64, unit: String },
    Scale(f64),
}

const LENGTH_UNITS: &[&str] = &["px", "rem", "em", "%", "vw", "vh", "ch"];
const COLOR_FUNCTIONS: &[&str] = &["rgb(", "rgba(", "hsl(", "hsla("];

impl TokenValue {
    /// Parse a raw theme value for the given category.
    pub fn parse(raw: &str, category: TokenCategory) -> Option<Self> {
        let raw = raw.trim();
        match category {
            TokenCategory::Color => parse_color(raw).map(TokenValue::Color),
            TokenCategory::Spacing => parse_length(raw)
                .or_else(|| raw.parse::<f64>().ok().filter(|n| n.is_finite() && *n >= 0.0).map(TokenValue::Scale)),
            TokenCategory::Breakpoint => parse_length(raw),
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenValue::Color(c) => f.write_str(c),
            TokenValue::Length { amount, unit } => write!(f, "{}{}", amount, unit),
            TokenValue::Scale(n) => write!(f, "{}", n),
        }
    }
}

fn parse_color(raw: &str) -> Option<String> {
    if let Some(hex) = raw.strip_prefix('#') {
        let ok = matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit());
        return ok.then(|| raw.to_ascii_lowercase());
    }
    let lower = raw.to_ascii_lowercase();
    if COLOR_FUNCTIONS.iter().any(|f| lower.starts_with(f)) {
        return lower.ends_with(')').then_some(lower);
    }
    // Named keywords such as `white` or `transparent`
    let named = !lower.is_empty() && lower.chars().all(|c| c.is_ascii_alphabetic());
    named.then_some(lower)
}

fn parse_length(raw: &str) -> Option<TokenValue> {
    if raw == "0" {
        return Some(TokenValue::Length { amount: 0.0, unit: "px".to_string() });
    }
    let unit = LENGTH_UNITS.iter().find(|u| raw.ends_with(*u))?;
    let amount: f64 = raw[..raw.len() - unit.len()].parse().ok()?;
    (amount.is_finite() && amount >= 0.0).then(|| TokenValue::Length {
        amount,
        unit: unit.to_string(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThemeToken {
    pub name: String,
    pub value: TokenValue,
    pub category: TokenCategory,
}

impl ThemeToken {
    pub fn css_var(&self) -> String {
        format!("var(--{})", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CssVariable {
    pub name: String,
    pub value: String,
}

/// Shape of the theme TOML file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ThemeFile {
    #[serde(default)]
    colors: BTreeMap<String, String>,
    #[serde(default)]
    spacing: BTreeMap<String, String>,
    #[serde(default)]
    breakpoints: BTreeMap<String, String>,
}

/// Token registry - name to value mapping
#[derive(Debug, Default)]
pub struct ThemeTokenRegistry {
    tokens: BTreeMap<String, ThemeToken>,
}

impl ThemeTokenRegistry {
    pub fn new() -> Self {
        Self { tokens: BTreeMap::new() }
    }

    pub fn define(&mut self, name: &str, raw: &str, category: TokenCategory) -> Result<(), TokenError> {
        let value = TokenValue::parse(raw, category).ok_or_else(|| TokenError::InvalidTokenValue {
            name: name.to_string(),
            category,
            value: raw.to_string(),
        })?;

        if let Some(existing) = self.tokens.get(name) {
            if existing.value == value && existing.category == category {
                return Ok(());
            }
            return Err(TokenError::DuplicateToken {
                name: name.to_string(),
                existing: format!("{} {}", existing.category, existing.value),
                attempted: format!("{} {}", category, value),
            });
        }

        self.tokens.insert(
            name.to_string(),
            ThemeToken { name: name.to_string(), value, category },
        );
        Ok(())
    }

    pub fn resolve(&self, name: &str) -> Result<&ThemeToken, TokenError> {
        self.tokens
            .get(name)
            .ok_or_else(|| TokenError::UnknownToken(name.to_string()))
    }

    pub fn list(&self) -> Vec<&ThemeToken> {
        self.tokens.values().collect()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// `:root` custom properties, in name order.
    pub fn css_custom_properties(&self) -> Vec<CssVariable> {
        self.tokens
            .values()
            .map(|t| CssVariable {
                name: format!("--{}", t.name),
                value: t.value.to_string(),
            })
            .collect()
    }

    pub fn from_toml(content: &str) -> Result<Self, ThemeError> {
        let file: ThemeFile = toml::from_str(content)?;
        Ok(Self::from_theme_file(file)?)
    }

    fn from_theme_file(file: ThemeFile) -> Result<Self, TokenError> {
        let mut registry = Self::new();
        let tables = [
            (TokenCategory::Color, &file.colors),
            (TokenCategory::Spacing, &file.spacing),
            (TokenCategory::Breakpoint, &file.breakpoints),
        ];
        for (category, table) in tables {
            for (name, raw) in table {
                registry.define(name, raw, category)?;
            }
        }
        Ok(registry)
    }

    pub fn load(path: &Path) -> Result<Self, ThemeError> {
        let content = fs::read_to_string(path)
            .map_err(|source| ThemeError::Io { path: path.to_path_buf(), source })?;
        let registry = Self::from_toml(&content)?;
        tracing::debug!("Loaded {} theme tokens from {}", registry.len(), path.display());
        Ok(registry)
    }
}
