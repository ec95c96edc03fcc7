use indexmap::IndexMap;
use serde_json_lenient::Value;

use super::icls::IclsScheme;
use super::{ThemeFormat, strip_bom};
use crate::pipeline::ConversionError;

/// Palette references may point at other palette entries; stop after this many hops.
const MAX_PALETTE_HOPS: usize = 8;

/// A JetBrains UI theme (`*.theme.json`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JetBrainsTheme {
    pub name: Option<String>,
    pub dark: Option<bool>,
    pub author: Option<String>,
    /// Path of the bundled editor color scheme, e.g. `/themes/Foo.icls`.
    pub editor_scheme: Option<String>,
    /// Named palette, with references between entries resolved.
    pub colors: IndexMap<String, String>,
    /// `ui` section flattened to dotted keys, palette names resolved.
    pub ui: IndexMap<String, String>,
    pub icons: IndexMap<String, String>,
    /// The editor scheme referenced by `editor_scheme`, when it was found.
    pub companion: Option<IclsScheme>,
}

impl JetBrainsTheme {
    pub fn color(&self, key: &str) -> Option<&str> {
        self.colors.get(key).map(String::as_str)
    }

    pub fn ui_color(&self, key: &str) -> Option<&str> {
        self.ui.get(key).map(String::as_str)
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut IndexMap<String, String>) {
    match value {
        Value::Object(entries) => {
            for (key, nested) in entries {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, nested, out);
            }
        }
        Value::String(text) if !prefix.is_empty() => {
            out.insert(prefix.to_string(), text.trim().to_string());
        }
        _ => {}
    }
}

fn resolve_palette(value: &str, palette: &IndexMap<String, String>) -> String {
    let mut current = value;
    for _ in 0..MAX_PALETTE_HOPS {
        match palette.get(current) {
            Some(next) if next != current => current = next,
            _ => break,
        }
    }
    current.to_string()
}

fn section(document: &Value, key: &str) -> IndexMap<String, String> {
    let mut flat = IndexMap::new();
    if let Some(value) = document.get(key) {
        flatten("", value, &mut flat);
    }
    flat
}

fn string_field(document: &Value, key: &str) -> Option<String> {
    document
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn parse(text: &str) -> Result<JetBrainsTheme, ConversionError> {
    let document: Value = serde_json_lenient::from_str_lenient(strip_bom(text))
        .map_err(|e| ConversionError::malformed(ThemeFormat::JetBrainsJson, e))?;
    if !document.is_object() {
        return Err(ConversionError::malformed(
            ThemeFormat::JetBrainsJson,
            "root element must be an object",
        ));
    }

    let dark = match document.get("dark") {
        Some(Value::Bool(dark)) => Some(*dark),
        Some(Value::String(dark)) => dark.trim().parse().ok(),
        _ => None,
    };

    let raw_palette = section(&document, "colors");
    let colors: IndexMap<String, String> = raw_palette
        .iter()
        .map(|(key, value)| (key.clone(), resolve_palette(value, &raw_palette)))
        .collect();
    let resolve_all = |entries: IndexMap<String, String>| -> IndexMap<String, String> {
        entries
            .into_iter()
            .map(|(key, value)| {
                let resolved = resolve_palette(&value, &colors);
                (key, resolved)
            })
            .collect()
    };
    let ui = resolve_all(section(&document, "ui"));
    let icons = resolve_all(section(&document, "icons"));

    Ok(JetBrainsTheme {
        name: string_field(&document, "name"),
        dark,
        author: string_field(&document, "author"),
        editor_scheme: string_field(&document, "editorScheme"),
        colors,
        ui,
        icons,
        companion: None,
    })
}
