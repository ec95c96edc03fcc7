//! Canonical color scheme model written out for AndroidIDE.
//!
//! Every source format is normalized into a [`ThemeScheme`]. Colors used by
//! editor roles and token styles are either `#hex` literals or `@key`
//! references into [`ThemeScheme::definitions`].

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A color value as stored in the emitted scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColorRef {
    /// A `#hex` color written inline.
    Literal(String),
    /// The name of an entry in the definitions map, serialized as `@name`.
    Definition(String),
}

impl ColorRef {
    pub fn definition(key: impl Into<String>) -> Self {
        ColorRef::Definition(key.into())
    }

    pub fn literal(hex: impl Into<String>) -> Self {
        ColorRef::Literal(hex.into())
    }

    pub fn definition_key(&self) -> Option<&str> {
        match self {
            ColorRef::Definition(key) => Some(key),
            ColorRef::Literal(_) => None,
        }
    }
}

impl fmt::Display for ColorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorRef::Literal(hex) => write!(f, "{hex}"),
            ColorRef::Definition(key) => write!(f, "@{key}"),
        }
    }
}

impl Serialize for ColorRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ColorRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        match value.strip_prefix('@') {
            Some(key) if !key.is_empty() => Ok(ColorRef::Definition(key.to_string())),
            Some(_) => Err(serde::de::Error::custom("empty color reference")),
            None => Ok(ColorRef::Literal(value)),
        }
    }
}

/// Editor chrome roles every source format is mapped onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditorRole {
    Background,
    Foreground,
    GutterBackground,
    GutterForeground,
    CaretForeground,
    SelectionBackground,
    LineHighlightBackground,
    WhitespaceForeground,
}

impl EditorRole {
    pub const ALL: [EditorRole; 8] = [
        EditorRole::Background,
        EditorRole::Foreground,
        EditorRole::GutterBackground,
        EditorRole::GutterForeground,
        EditorRole::CaretForeground,
        EditorRole::SelectionBackground,
        EditorRole::LineHighlightBackground,
        EditorRole::WhitespaceForeground,
    ];

    /// Name used for definitions created from defaults or derived colors.
    pub fn key(self) -> &'static str {
        match self {
            EditorRole::Background => "editor_bg",
            EditorRole::Foreground => "editor_fg",
            EditorRole::GutterBackground => "gutter_bg",
            EditorRole::GutterForeground => "gutter_fg",
            EditorRole::CaretForeground => "caret_fg",
            EditorRole::SelectionBackground => "selection_bg",
            EditorRole::LineHighlightBackground => "line_highlight_bg",
            EditorRole::WhitespaceForeground => "whitespace_fg",
        }
    }
}

/// Editor chrome colors. Field names follow the AndroidIDE scheme reader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorColors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<ColorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fg: Option<ColorRef>,
    #[serde(default, rename = "gutter.bg", skip_serializing_if = "Option::is_none")]
    pub gutter_bg: Option<ColorRef>,
    #[serde(default, rename = "gutter.fg", skip_serializing_if = "Option::is_none")]
    pub gutter_fg: Option<ColorRef>,
    #[serde(default, rename = "caret.fg", skip_serializing_if = "Option::is_none")]
    pub caret_fg: Option<ColorRef>,
    #[serde(
        default,
        rename = "selection.bg",
        skip_serializing_if = "Option::is_none"
    )]
    pub selection_bg: Option<ColorRef>,
    #[serde(
        default,
        rename = "line.highlight.bg",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_highlight_bg: Option<ColorRef>,
    #[serde(
        default,
        rename = "whitespace.fg",
        skip_serializing_if = "Option::is_none"
    )]
    pub whitespace_fg: Option<ColorRef>,
}

impl EditorColors {
    pub fn get(&self, role: EditorRole) -> Option<&ColorRef> {
        match role {
            EditorRole::Background => self.bg.as_ref(),
            EditorRole::Foreground => self.fg.as_ref(),
            EditorRole::GutterBackground => self.gutter_bg.as_ref(),
            EditorRole::GutterForeground => self.gutter_fg.as_ref(),
            EditorRole::CaretForeground => self.caret_fg.as_ref(),
            EditorRole::SelectionBackground => self.selection_bg.as_ref(),
            EditorRole::LineHighlightBackground => self.line_highlight_bg.as_ref(),
            EditorRole::WhitespaceForeground => self.whitespace_fg.as_ref(),
        }
    }

    pub fn set(&mut self, role: EditorRole, color: ColorRef) {
        let slot = match role {
            EditorRole::Background => &mut self.bg,
            EditorRole::Foreground => &mut self.fg,
            EditorRole::GutterBackground => &mut self.gutter_bg,
            EditorRole::GutterForeground => &mut self.gutter_fg,
            EditorRole::CaretForeground => &mut self.caret_fg,
            EditorRole::SelectionBackground => &mut self.selection_bg,
            EditorRole::LineHighlightBackground => &mut self.line_highlight_bg,
            EditorRole::WhitespaceForeground => &mut self.whitespace_fg,
        };
        *slot = Some(color);
    }

    pub fn is_empty(&self) -> bool {
        EditorRole::ALL.iter().all(|role| self.get(*role).is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (EditorRole, &ColorRef)> {
        EditorRole::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|color| (role, color)))
    }
}

/// Syntax highlighting categories shared by all source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenRole {
    Comment,
    String,
    Keyword,
    NumericLiteral,
    Operator,
    Function,
    Type,
    Variable,
    Constant,
    Annotation,
}

impl TokenRole {
    pub const ALL: [TokenRole; 10] = [
        TokenRole::Comment,
        TokenRole::String,
        TokenRole::Keyword,
        TokenRole::NumericLiteral,
        TokenRole::Operator,
        TokenRole::Function,
        TokenRole::Type,
        TokenRole::Variable,
        TokenRole::Constant,
        TokenRole::Annotation,
    ];

    /// Roles that always receive a color when defaults are filled in.
    pub const MINIMUM: [TokenRole; 4] = [
        TokenRole::Comment,
        TokenRole::String,
        TokenRole::Keyword,
        TokenRole::NumericLiteral,
    ];

    /// Style name in the emitted `styles` map.
    pub fn style_name(self) -> &'static str {
        match self {
            TokenRole::Comment => "comment",
            TokenRole::String => "string",
            TokenRole::Keyword => "keyword",
            TokenRole::NumericLiteral => "number",
            TokenRole::Operator => "operator",
            TokenRole::Function => "function",
            TokenRole::Type => "type",
            TokenRole::Variable => "variable",
            TokenRole::Constant => "constant",
            TokenRole::Annotation => "annotation",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fg: Option<ColorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<ColorRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strikethrough: Option<bool>,
}

impl StyleEntry {
    pub fn is_empty(&self) -> bool {
        self.fg.is_none()
            && self.bg.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.strikethrough.is_none()
    }
}

/// Token styles applying to the listed language types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageStyling {
    pub types: Vec<String>,
    #[serde(default)]
    pub styles: IndexMap<String, StyleEntry>,
}

/// Language type under which format-independent token styles are emitted.
pub const GLOBAL_LANGUAGE: &str = "global";

/// The canonical theme written to `<scheme id>.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeScheme {
    pub name: String,
    #[serde(rename = "isDark")]
    pub is_dark: bool,
    #[serde(default)]
    pub definitions: IndexMap<String, String>,
    #[serde(default, skip_serializing_if = "EditorColors::is_empty")]
    pub editor: EditorColors,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub languages: Vec<LanguageStyling>,
}

impl ThemeScheme {
    fn color_refs(&self) -> impl Iterator<Item = &ColorRef> {
        let editor = self.editor.iter().map(|(_, color)| color);
        let styles = self
            .languages
            .iter()
            .flat_map(|language| language.styles.values())
            .flat_map(|style| style.fg.iter().chain(style.bg.iter()));
        editor.chain(styles)
    }

    /// Definition keys referenced by editor colors or styles but missing from
    /// the definitions map, in first-use order.
    pub fn dangling_references(&self) -> Vec<String> {
        let mut missing: Vec<String> = Vec::new();
        for key in self.color_refs().filter_map(ColorRef::definition_key) {
            if !self.definitions.contains_key(key) && !missing.iter().any(|m| m == key) {
                missing.push(key.to_string());
            }
        }
        missing
    }

    /// Looks up the hex value behind a color, following a definition reference.
    pub fn resolve<'a>(&'a self, color: &'a ColorRef) -> Option<&'a str> {
        match color {
            ColorRef::Literal(hex) => Some(hex),
            ColorRef::Definition(key) => self.definitions.get(key).map(String::as_str),
        }
    }

    pub fn style(&self, role: TokenRole) -> Option<&StyleEntry> {
        self.languages
            .iter()
            .find_map(|language| language.styles.get(role.style_name()))
    }
}
