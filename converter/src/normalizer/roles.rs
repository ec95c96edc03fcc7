//! Source keys consulted for each canonical role, highest priority first.

use crate::model::{EditorRole, TokenRole};

/// VS Code `colors` keys for an editor role.
pub fn vscode_editor_keys(role: EditorRole) -> &'static [&'static str] {
    match role {
        EditorRole::Background => &["editor.background"],
        EditorRole::Foreground => &["editor.foreground", "foreground"],
        EditorRole::GutterBackground => &["editorGutter.background"],
        EditorRole::GutterForeground => &["editorLineNumber.foreground"],
        EditorRole::CaretForeground => &["editorCursor.foreground"],
        EditorRole::SelectionBackground => &["editor.selectionBackground", "selection.background"],
        EditorRole::LineHighlightBackground => &["editor.lineHighlightBackground"],
        EditorRole::WhitespaceForeground => &["editorWhitespace.foreground"],
    }
}

/// TextMate scope prefixes for a token role.
pub fn vscode_token_scopes(role: TokenRole) -> &'static [&'static str] {
    match role {
        TokenRole::Comment => &["comment"],
        TokenRole::String => &["string"],
        TokenRole::Keyword => &["keyword.control", "keyword", "storage.type", "storage"],
        TokenRole::NumericLiteral => &["constant.numeric"],
        TokenRole::Operator => &["keyword.operator"],
        TokenRole::Function => &["entity.name.function", "support.function"],
        TokenRole::Type => &[
            "entity.name.type",
            "entity.name.class",
            "support.type",
            "support.class",
        ],
        TokenRole::Variable => &["variable.other", "variable"],
        TokenRole::Constant => &["constant.language", "constant.other", "constant"],
        TokenRole::Annotation => &[
            "meta.annotation",
            "storage.type.annotation",
            "meta.decorator",
            "entity.name.function.decorator",
        ],
    }
}

/// `selector` matches `prefix` when it equals it or continues it with a `.`.
///
/// Descendant selectors (`source.js comment.line`) are matched on their last
/// segment.
pub fn scope_matches(selector: &str, prefix: &str) -> bool {
    let target = selector.split_whitespace().last().unwrap_or(selector);
    target == prefix
        || target
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// A place where a JetBrains theme can declare a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JetBrainsKey {
    /// Flattened key of the `ui` section of a `.theme.json`.
    Ui(&'static str),
    /// Key of the `colors` palette of a `.theme.json`.
    Palette(&'static str),
    /// `<colors>` option of an ICLS scheme.
    SchemeColor(&'static str),
    /// Foreground of an ICLS text attribute.
    AttributeForeground(&'static str),
    /// Background of an ICLS text attribute.
    AttributeBackground(&'static str),
}

impl JetBrainsKey {
    /// Name the resolved color is registered under in the definitions map.
    pub fn source_key(self) -> String {
        match self {
            JetBrainsKey::Ui(key) | JetBrainsKey::Palette(key) | JetBrainsKey::SchemeColor(key) => {
                key.to_string()
            }
            JetBrainsKey::AttributeForeground(key) => format!("{key}.foreground"),
            JetBrainsKey::AttributeBackground(key) => format!("{key}.background"),
        }
    }
}

pub fn jetbrains_editor_keys(role: EditorRole) -> &'static [JetBrainsKey] {
    use JetBrainsKey::*;
    match role {
        EditorRole::Background => &[
            Ui("Editor.background"),
            Palette("BACKGROUND"),
            AttributeBackground("TEXT"),
            Ui("EditorPane.background"),
            Ui("*.background"),
        ],
        EditorRole::Foreground => &[
            Ui("Editor.foreground"),
            Palette("FOREGROUND"),
            AttributeForeground("TEXT"),
            Ui("EditorPane.foreground"),
            Ui("*.foreground"),
        ],
        EditorRole::GutterBackground => &[
            Ui("EditorGutter.background"),
            SchemeColor("GUTTER_BACKGROUND"),
        ],
        EditorRole::GutterForeground => &[SchemeColor("LINE_NUMBERS_COLOR")],
        EditorRole::CaretForeground => &[SchemeColor("CARET_COLOR")],
        EditorRole::SelectionBackground => &[
            SchemeColor("SELECTION_BACKGROUND"),
            Ui("EditorPane.selectionBackground"),
            Ui("*.selectionBackground"),
        ],
        EditorRole::LineHighlightBackground => &[SchemeColor("CARET_ROW_COLOR")],
        EditorRole::WhitespaceForeground => &[SchemeColor("WHITESPACES")],
    }
}

/// ICLS text attributes for a token role.
pub fn jetbrains_token_attributes(role: TokenRole) -> &'static [&'static str] {
    match role {
        TokenRole::Comment => &[
            "DEFAULT_LINE_COMMENT",
            "DEFAULT_BLOCK_COMMENT",
            "DEFAULT_DOC_COMMENT",
        ],
        TokenRole::String => &["DEFAULT_STRING"],
        TokenRole::Keyword => &["DEFAULT_KEYWORD"],
        TokenRole::NumericLiteral => &["DEFAULT_NUMBER"],
        TokenRole::Operator => &["DEFAULT_OPERATION_SIGN"],
        TokenRole::Function => &["DEFAULT_FUNCTION_DECLARATION", "DEFAULT_FUNCTION_CALL"],
        TokenRole::Type => &["DEFAULT_CLASS_NAME", "DEFAULT_CLASS_REFERENCE"],
        TokenRole::Variable => &["DEFAULT_LOCAL_VARIABLE", "DEFAULT_IDENTIFIER"],
        TokenRole::Constant => &["DEFAULT_CONSTANT", "DEFAULT_STATIC_FIELD"],
        TokenRole::Annotation => &["DEFAULT_METADATA"],
    }
}

/// Colors used when a role cannot be resolved from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultPalette {
    pub background: &'static str,
    pub foreground: &'static str,
    pub comment: &'static str,
    pub string: &'static str,
    pub keyword: &'static str,
    pub number: &'static str,
}

impl DefaultPalette {
    pub fn token(&self, role: TokenRole) -> Option<&'static str> {
        match role {
            TokenRole::Comment => Some(self.comment),
            TokenRole::String => Some(self.string),
            TokenRole::Keyword => Some(self.keyword),
            TokenRole::NumericLiteral => Some(self.number),
            _ => None,
        }
    }
}

pub const VSCODE_DARK: DefaultPalette = DefaultPalette {
    background: "#222222",
    foreground: "#DDDDDD",
    comment: "#808080",
    string: "#CE9178",
    keyword: "#569CD6",
    number: "#B5CEA8",
};

pub const VSCODE_LIGHT: DefaultPalette = DefaultPalette {
    background: "#FFFFFF",
    foreground: "#000000",
    comment: "#008000",
    string: "#A31515",
    keyword: "#0000FF",
    number: "#098658",
};

pub const DARCULA: DefaultPalette = DefaultPalette {
    background: "#2B2B2B",
    foreground: "#A9B7C6",
    comment: "#808080",
    string: "#6A8759",
    keyword: "#CC7832",
    number: "#6897BB",
};

pub const INTELLIJ_LIGHT: DefaultPalette = DefaultPalette {
    background: "#FFFFFF",
    foreground: "#080808",
    comment: "#8C8C8C",
    string: "#067D17",
    keyword: "#0033B3",
    number: "#1750EB",
};
