use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use serde_json_lenient::Value;

use super::{ThemeFormat, strip_bom};
use crate::pipeline::ConversionError;

/// Accepts any JSON value and keeps it only when it is a non-empty string.
fn non_empty_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string))
}

/// Accepts any JSON value and keeps it when it is a string, even an empty one.
fn any_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .map(|value| value.trim().to_string()))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VsCodeTokenScope {
    One(String),
    /// Non-string items are dropped.
    Many(Vec<Value>),
}

#[derive(Debug, Default, Deserialize)]
struct RawTokenSettings {
    #[serde(default, deserialize_with = "non_empty_string")]
    foreground: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    background: Option<String>,
    /// `""` and `"normal"` are kept: they reset an inherited style.
    #[serde(default, rename = "fontStyle", deserialize_with = "any_string")]
    font_style: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTokenColor {
    #[serde(default, deserialize_with = "non_empty_string")]
    name: Option<String>,
    #[serde(default)]
    scope: Option<VsCodeTokenScope>,
    #[serde(default)]
    settings: Option<RawTokenSettings>,
}

/// `tokenColors` is either inline rules or a path to a TextMate theme.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTokenColors {
    /// Decoded rule by rule so one broken rule does not sink the theme.
    Inline(Vec<Value>),
    External(String),
}

#[derive(Debug, Deserialize)]
struct RawTheme {
    #[serde(default, deserialize_with = "non_empty_string")]
    name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "non_empty_string")]
    kind: Option<String>,
    #[serde(default, deserialize_with = "non_empty_string")]
    include: Option<String>,
    #[serde(default)]
    colors: Option<IndexMap<String, Value>>,
    #[serde(default, rename = "tokenColors")]
    token_colors: Option<RawTokenColors>,
}

/// Text styling attached to a set of TextMate scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VsCodeTokenSettings {
    pub foreground: Option<String>,
    pub background: Option<String>,
    pub font_style: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VsCodeTokenColor {
    pub name: Option<String>,
    /// Individual selectors; comma separated scope strings are split.
    pub scopes: Vec<String>,
    pub settings: VsCodeTokenSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VsCodeTheme {
    pub name: Option<String>,
    /// The `type` field: `dark`, `light`, `hc`, `hc-black` or `hc-light`.
    pub kind: Option<String>,
    /// Relative path of a base theme this one extends.
    pub include: Option<String>,
    pub colors: IndexMap<String, String>,
    pub token_colors: Vec<VsCodeTokenColor>,
}

impl VsCodeTheme {
    /// Explicit darkness declared by `type`, if recognized.
    pub fn declared_dark(&self) -> Option<bool> {
        match self.kind.as_deref()?.to_ascii_lowercase().as_str() {
            "dark" | "hc" | "hc-black" | "vs-dark" => Some(true),
            "light" | "hc-light" | "vs" => Some(false),
            _ => None,
        }
    }

    /// Places `base` underneath this theme. Colors from `self` win; base token
    /// rules come first so that later rules of the child override them.
    pub fn merge_base(self, base: VsCodeTheme) -> VsCodeTheme {
        let mut colors = base.colors;
        colors.extend(self.colors);
        let mut token_colors = base.token_colors;
        token_colors.extend(self.token_colors);
        VsCodeTheme {
            name: self.name.or(base.name),
            kind: self.kind.or(base.kind),
            include: base.include,
            colors,
            token_colors,
        }
    }
}

fn split_selectors(scope: &str) -> impl Iterator<Item = String> + '_ {
    scope
        .split(',')
        .map(str::trim)
        .filter(|selector| !selector.is_empty())
        .map(str::to_string)
}

pub fn parse(text: &str) -> Result<VsCodeTheme, ConversionError> {
    let document: Value = serde_json_lenient::from_str_lenient(strip_bom(text))
        .map_err(|e| ConversionError::malformed(ThemeFormat::VsCode, e))?;
    if !document.is_object() {
        return Err(ConversionError::malformed(
            ThemeFormat::VsCode,
            "root element must be an object",
        ));
    }
    let raw: RawTheme = serde_json_lenient::from_value(document)
        .map_err(|e| ConversionError::malformed(ThemeFormat::VsCode, e))?;

    let colors = raw
        .colors
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(color) if !color.trim().is_empty() => {
                Some((key, color.trim().to_string()))
            }
            _ => None,
        })
        .collect();

    let token_colors = match raw.token_colors {
        Some(RawTokenColors::Inline(rules)) => rules
            .into_iter()
            .enumerate()
            .filter_map(|(index, rule)| {
                match serde_json_lenient::from_value::<RawTokenColor>(rule) {
                    Ok(rule) => Some(rule),
                    Err(e) => {
                        log::warn!("Skipping tokenColors[{index}]: {e}");
                        None
                    }
                }
            })
            .map(|rule| {
                let scopes = match rule.scope {
                    Some(VsCodeTokenScope::One(scope)) => split_selectors(&scope).collect(),
                    Some(VsCodeTokenScope::Many(scopes)) => scopes
                        .iter()
                        .filter_map(Value::as_str)
                        .flat_map(|scope| split_selectors(scope))
                        .collect(),
                    None => Vec::new(),
                };
                let settings = rule.settings.unwrap_or_default();
                VsCodeTokenColor {
                    name: rule.name,
                    scopes,
                    settings: VsCodeTokenSettings {
                        foreground: settings.foreground,
                        background: settings.background,
                        font_style: settings.font_style,
                    },
                }
            })
            .collect(),
        Some(RawTokenColors::External(path)) => {
            log::warn!("Ignoring tokenColors stored in external file '{path}'");
            Vec::new()
        }
        None => Vec::new(),
    };

    Ok(VsCodeTheme {
        name: raw.name,
        kind: raw.kind,
        include: raw.include,
        colors,
        token_colors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use claims::*;

    #[test]
    fn test_parses_colors_and_token_rules() {
        let theme = assert_ok!(parse(
            r##"{
                "name": "Night Owl",
                "type": "dark",
                "colors": { "editor.background": "#011627", "editor.foreground": "#d6deeb" },
                "tokenColors": [
                    { "scope": "comment", "settings": { "foreground": "#637777", "fontStyle": "italic" } },
                    { "scope": ["string", "constant.numeric"], "settings": { "foreground": "#ecc48d" } }
                ]
            }"##
        ));

        assert_eq!(theme.name.as_deref(), Some("Night Owl"));
        assert_eq!(theme.declared_dark(), Some(true));
        assert_eq!(theme.colors["editor.background"], "#011627");
        assert_eq!(theme.token_colors.len(), 2);
        assert_eq!(theme.token_colors[0].scopes, vec!["comment".to_string()]);
        assert_eq!(
            theme.token_colors[0].settings.font_style.as_deref(),
            Some("italic")
        );
        assert_eq!(theme.token_colors[1].scopes.len(), 2);
    }

    #[test]
    fn test_accepts_comments_and_trailing_commas() {
        let theme = assert_ok!(parse(
            "\u{feff}{\n  // generated\n  \"colors\": { \"editor.background\": \"#000000\", },\n}"
        ));
        assert_eq!(theme.colors.len(), 1);
    }

    #[test]
    fn test_broken_token_rules_are_skipped() {
        let theme = assert_ok!(parse(
            r##"{ "tokenColors": [
                { "scope": "comment", "settings": "italic" },
                { "scope": ["string", 7, null], "settings": { "foreground": "#ecc48d" } },
                { "scope": { "nested": true }, "settings": { "foreground": "#ff0000" } },
                { "scope": "keyword", "settings": { "foreground": "#c792ea", "fontStyle": "" } }
            ] }"##
        ));

        assert_eq!(theme.token_colors.len(), 2);
        assert_eq!(theme.token_colors[0].scopes, vec!["string".to_string()]);
        assert_eq!(theme.token_colors[1].scopes, vec!["keyword".to_string()]);
        assert_eq!(theme.token_colors[1].settings.font_style.as_deref(), Some(""));
    }

    #[test]
    fn test_single_scope_string_is_split_on_commas() {
        let theme = assert_ok!(parse(
            r#"{ "tokenColors": [ { "scope": "keyword.control, storage.type", "settings": {} } ] }"#
        ));
        assert_eq!(
            theme.token_colors[0].scopes,
            vec!["keyword.control".to_string(), "storage.type".to_string()]
        );
    }

    #[test]
    fn test_non_string_values_and_unknown_fields_are_ignored() {
        let theme = assert_ok!(parse(
            r##"{ "semanticHighlighting": true, "colors": { "editor.background": 12, "editor.foreground": "#fff" },
                 "tokenColors": [ { "scope": "comment", "settings": { "foreground": null } } ] }"##
        ));
        assert_eq!(theme.colors.len(), 1);
        assert_none!(theme.token_colors[0].settings.foreground.as_ref());
    }

    #[test]
    fn test_external_token_colors_are_skipped() {
        let theme = assert_ok!(parse(r#"{ "tokenColors": "./Monokai.tmTheme" }"#));
        assert!(theme.token_colors.is_empty());
    }

    #[test]
    fn test_syntax_error_is_malformed_definition() {
        let error = assert_err!(parse("{ \"colors\": "));
        assert_matches!(
            error,
            ConversionError::MalformedDefinition {
                format: ThemeFormat::VsCode,
                ..
            }
        );
    }

    #[test]
    fn test_non_object_root_is_malformed() {
        assert_err!(parse("[1, 2, 3]"));
    }

    #[test]
    fn test_high_contrast_light_is_light() {
        let theme = assert_ok!(parse(r#"{ "type": "hc-light" }"#));
        assert_eq!(theme.declared_dark(), Some(false));
    }

    #[test]
    fn test_merge_base_prefers_child_colors() {
        let base = assert_ok!(parse(
            r##"{ "name": "Base", "type": "dark", "colors": { "editor.background": "#000000", "editor.foreground": "#ffffff" },
                 "tokenColors": [ { "scope": "comment", "settings": { "foreground": "#111111" } } ] }"##
        ));
        let child = assert_ok!(parse(
            r##"{ "name": "Child", "include": "./base.json", "colors": { "editor.background": "#222222" } }"##
        ));

        let merged = child.merge_base(base);
        assert_eq!(merged.name.as_deref(), Some("Child"));
        assert_eq!(merged.kind.as_deref(), Some("dark"));
        assert_eq!(merged.colors["editor.background"], "#222222");
        assert_eq!(merged.colors["editor.foreground"], "#ffffff");
        assert_eq!(merged.token_colors.len(), 1);
        assert_none!(merged.include);
    }
}
