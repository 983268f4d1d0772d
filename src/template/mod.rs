use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

pub const DEFAULT_ACCENT_COLOR: &str = "#007ec7";
const ACCENT_PLACEHOLDER: &str = "{{accentColor}}";

const CLASSIC_STYLES: &str = include_str!("classic.css");
const MODERN_STYLES: &str = include_str!("modern.css");
const LAYOUT: &str = include_str!("layout.html");

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKey {
    #[default]
    Classic,
    Modern,
}

impl TemplateKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key.trim().to_lowercase().as_str() {
            "classic" => Some(TemplateKey::Classic),
            "modern" => Some(TemplateKey::Modern),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TemplateKey::Classic => "Classic",
            TemplateKey::Modern => "Modern",
        }
    }
}

impl fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name().to_lowercase())
    }
}

/// A resolved rendering style: stylesheet with the accent colour already
/// substituted, and the layout skeleton it applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateDescriptor {
    pub key: TemplateKey,
    pub name: &'static str,
    pub style_sheet: String,
    pub layout_skeleton: &'static str,
}

/// Resolves a template by key with the default accent colour.
pub fn select_template(key: &str) -> TemplateDescriptor {
    select_template_with_accent(key, None)
}

/// Unknown keys resolve to classic.
pub fn select_template_with_accent(key: &str, accent: Option<&str>) -> TemplateDescriptor {
    let key = TemplateKey::parse(key).unwrap_or_else(|| {
        warn!("Template '{}' not found, using classic template", key);
        TemplateKey::Classic
    });
    let style_sheet = match key {
        TemplateKey::Classic => CLASSIC_STYLES.to_owned(),
        TemplateKey::Modern => MODERN_STYLES.replace(ACCENT_PLACEHOLDER, accent_color(accent)),
    };
    TemplateDescriptor {
        key,
        name: key.name(),
        style_sheet,
        layout_skeleton: LAYOUT,
    }
}

/// The stored accent colour when it is a usable hex colour, the default otherwise.
pub fn accent_color(stored: Option<&str>) -> &str {
    match stored.map(str::trim) {
        None | Some("") => DEFAULT_ACCENT_COLOR,
        Some(color) if is_hex_color(color) => color,
        Some(color) => {
            warn!("Ignoring accent color '{}', using {}", color, DEFAULT_ACCENT_COLOR);
            DEFAULT_ACCENT_COLOR
        }
    }
}

fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .map(|hex| matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()))
        .unwrap_or(false)
}

/// Replaces every `{{name}}` in `skeleton` with its binding. Unbound names
/// become empty. Bound values are inserted as is and never rescanned.
pub fn fill(skeleton: &str, bindings: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(skeleton.len() * 2);
    let mut rest = skeleton;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                if let Some(value) = bindings.get(after[..end].trim()) {
                    out.push_str(value);
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
