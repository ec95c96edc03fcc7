//! Maps parsed source records onto the canonical [`ThemeScheme`].
//!
//! Each editor role and token role is resolved from a fixed priority list of
//! source keys (see [`roles`]). The first present, well-formed color wins; a
//! malformed color is logged and the role left unset. Every accepted color is
//! stored once in the definitions map and referenced by key.

pub mod color;
pub mod roles;

use indexmap::IndexMap;

use crate::model::{
    ColorRef, EditorColors, EditorRole, GLOBAL_LANGUAGE, LanguageStyling, StyleEntry,
    ThemeScheme, TokenRole,
};
use crate::parsers::{IclsScheme, JetBrainsTheme, ParsedTheme, ThemeFormat, VsCodeTheme};
use crate::pipeline::ConversionError;
use color::{Definitions, Rgba, canonical_hex};
use roles::{DefaultPalette, JetBrainsKey};

/// Brightness factors used to derive missing editor colors from the background.
const DARK_LINE_HIGHLIGHT_FACTOR: f32 = 1.1;
const LIGHT_LINE_HIGHLIGHT_FACTOR: f32 = 0.9;
const DARK_GUTTER_FOREGROUND_FACTOR: f32 = 1.5;
const LIGHT_GUTTER_FOREGROUND_FACTOR: f32 = 0.7;
const SELECTION_ALPHA: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeOptions {
    /// Fill unresolved roles with per-format defaults and derived colors.
    pub fill_defaults: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            fill_defaults: true,
        }
    }
}

/// Information about where a parsed record came from.
#[derive(Debug, Clone, Default)]
pub struct ThemeContext {
    /// Name chosen by the user; falls back to the name inside the definition.
    pub display_name: String,
    /// File name of the definition, used for the darkness heuristic.
    pub file_name: Option<String>,
    /// Darkness declared outside the definition, e.g. by a VSIX manifest.
    pub declared_dark: Option<bool>,
}

/// Accumulates the canonical scheme while roles are resolved.
#[derive(Default)]
struct SchemeBuilder {
    definitions: Definitions,
    editor: EditorColors,
    styles: IndexMap<TokenRole, StyleEntry>,
}

impl SchemeBuilder {
    /// Validates `raw` and registers it under `source_key`.
    fn define(&mut self, source_key: &str, raw: &str) -> Option<ColorRef> {
        let Some(hex) = canonical_hex(raw) else {
            log::warn!("Discarding malformed color '{raw}' for '{source_key}'");
            return None;
        };
        let key = self.definitions.register(source_key, &hex);
        log::debug!("Resolved '{source_key}' = {hex} as @{key}");
        Some(ColorRef::Definition(key))
    }

    fn resolve_hex(&self, color: &ColorRef) -> Option<String> {
        match color {
            ColorRef::Literal(hex) => Some(hex.clone()),
            ColorRef::Definition(key) => self.definitions.get(key).map(str::to_string),
        }
    }

    fn has_content(&self) -> bool {
        !self.editor.is_empty() || !self.styles.is_empty() || !self.definitions.is_empty()
    }

    fn set_style(&mut self, role: TokenRole, style: StyleEntry) {
        if !style.is_empty() {
            self.styles.insert(role, style);
        }
    }

    fn fill_defaults(&mut self, palette: &DefaultPalette, is_dark: bool) {
        if self.editor.bg.is_none() {
            let bg = self.define(EditorRole::Background.key(), palette.background);
            self.editor.bg = bg;
        }
        if self.editor.fg.is_none() {
            let fg = self.define(EditorRole::Foreground.key(), palette.foreground);
            self.editor.fg = fg;
        }
        if self.editor.caret_fg.is_none() {
            self.editor.caret_fg = self.editor.fg.clone();
        }
        if self.editor.gutter_bg.is_none() {
            self.editor.gutter_bg = self.editor.bg.clone();
        }

        let background = self
            .editor
            .bg
            .as_ref()
            .and_then(|color| self.resolve_hex(color))
            .and_then(|hex| Rgba::parse(&hex));
        let foreground = self
            .editor
            .fg
            .as_ref()
            .and_then(|color| self.resolve_hex(color))
            .and_then(|hex| Rgba::parse(&hex));

        if let Some(background) = background {
            if self.editor.line_highlight_bg.is_none() {
                let factor = if is_dark {
                    DARK_LINE_HIGHLIGHT_FACTOR
                } else {
                    LIGHT_LINE_HIGHLIGHT_FACTOR
                };
                let derived = background.scale(factor).to_hex();
                self.editor.line_highlight_bg =
                    self.define(EditorRole::LineHighlightBackground.key(), &derived);
            }
            if self.editor.gutter_fg.is_none() {
                let factor = if is_dark {
                    DARK_GUTTER_FOREGROUND_FACTOR
                } else {
                    LIGHT_GUTTER_FOREGROUND_FACTOR
                };
                let derived = background.scale(factor).to_hex();
                self.editor.gutter_fg = self.define(EditorRole::GutterForeground.key(), &derived);
            }
        }
        if let Some(foreground) = foreground {
            if self.editor.selection_bg.is_none() {
                let derived = foreground.with_alpha(SELECTION_ALPHA).to_hex();
                self.editor.selection_bg =
                    self.define(EditorRole::SelectionBackground.key(), &derived);
            }
        }

        for role in TokenRole::MINIMUM {
            let has_foreground = self
                .styles
                .get(&role)
                .is_some_and(|style| style.fg.is_some());
            if has_foreground {
                continue;
            }
            let Some(default) = palette.token(role) else {
                continue;
            };
            let fg = self.define(role.style_name(), default);
            self.styles.entry(role).or_default().fg = fg;
        }
    }

    fn build(self, name: String, is_dark: bool) -> ThemeScheme {
        let mut styles = IndexMap::new();
        for role in TokenRole::ALL {
            if let Some(style) = self.styles.get(&role) {
                styles.insert(role.style_name().to_string(), style.clone());
            }
        }
        let languages = if styles.is_empty() {
            Vec::new()
        } else {
            vec![LanguageStyling {
                types: vec![GLOBAL_LANGUAGE.to_string()],
                styles,
            }]
        };
        ThemeScheme {
            name,
            is_dark,
            definitions: self.definitions.into_inner(),
            editor: self.editor,
            languages,
        }
    }
}

/// Darkness from explicit flags, then a `dark` in any name, else dark.
fn infer_darkness(explicit: Option<bool>, names: &[Option<&str>]) -> bool {
    if let Some(dark) = explicit {
        return dark;
    }
    if names
        .iter()
        .flatten()
        .any(|name| name.to_ascii_lowercase().contains("dark"))
    {
        return true;
    }
    // A "light" name is not a hint; unflagged themes stay dark.
    true
}

fn default_palette(format: ThemeFormat, is_dark: bool) -> &'static DefaultPalette {
    match (format, is_dark) {
        (ThemeFormat::VsCode, true) => &roles::VSCODE_DARK,
        (ThemeFormat::VsCode, false) => &roles::VSCODE_LIGHT,
        (_, true) => &roles::DARCULA,
        (_, false) => &roles::INTELLIJ_LIGHT,
    }
}

/// A `fontStyle` replaces every flag set by earlier rules; `""` and
/// `"normal"` clear them.
fn apply_font_style(style: &mut StyleEntry, font_style: &str) {
    style.bold = None;
    style.italic = None;
    style.strikethrough = None;
    for word in font_style.split_whitespace() {
        match word {
            "bold" => style.bold = Some(true),
            "italic" => style.italic = Some(true),
            "strikethrough" => style.strikethrough = Some(true),
            _ => {}
        }
    }
}

fn collect_vscode(builder: &mut SchemeBuilder, theme: &VsCodeTheme) {
    for role in EditorRole::ALL {
        let found = roles::vscode_editor_keys(role)
            .iter()
            .find_map(|key| theme.colors.get(*key).map(|value| (*key, value)));
        if let Some((key, value)) = found {
            if let Some(color) = builder.define(key, value) {
                builder.editor.set(role, color);
            }
        }
    }

    for role in TokenRole::ALL {
        for pattern in roles::vscode_token_scopes(role) {
            let matching: Vec<_> = theme
                .token_colors
                .iter()
                .filter(|rule| {
                    rule.scopes
                        .iter()
                        .any(|selector| roles::scope_matches(selector, pattern))
                })
                .collect();
            if matching.is_empty() {
                continue;
            }

            let mut style = StyleEntry::default();
            let mut foreground = None;
            let mut background = None;
            for rule in matching {
                if rule.settings.foreground.is_some() {
                    foreground = rule.settings.foreground.as_deref();
                }
                if rule.settings.background.is_some() {
                    background = rule.settings.background.as_deref();
                }
                if let Some(font_style) = rule.settings.font_style.as_deref() {
                    apply_font_style(&mut style, font_style);
                }
            }
            let name = role.style_name();
            style.fg = foreground.and_then(|value| builder.define(name, value));
            style.bg = background.and_then(|value| builder.define(&format!("{name}_bg"), value));
            if !style.is_empty() {
                builder.set_style(role, style);
                break;
            }
        }
    }
}

fn jetbrains_value<'a>(
    key: JetBrainsKey,
    theme: Option<&'a JetBrainsTheme>,
    scheme: Option<&'a IclsScheme>,
) -> Option<&'a str> {
    match key {
        JetBrainsKey::Ui(name) => theme?.ui_color(name),
        JetBrainsKey::Palette(name) => theme?.color(name),
        JetBrainsKey::SchemeColor(name) => scheme?.colors.get(name).map(String::as_str),
        JetBrainsKey::AttributeForeground(name) => {
            scheme?.resolved_attribute(name)?.foreground.as_deref()
        }
        JetBrainsKey::AttributeBackground(name) => {
            scheme?.resolved_attribute(name)?.background.as_deref()
        }
    }
}

fn collect_jetbrains(
    builder: &mut SchemeBuilder,
    theme: Option<&JetBrainsTheme>,
    scheme: Option<&IclsScheme>,
) {
    for role in EditorRole::ALL {
        let found = roles::jetbrains_editor_keys(role)
            .iter()
            .find_map(|key| jetbrains_value(*key, theme, scheme).map(|value| (*key, value)));
        if let Some((key, value)) = found {
            if let Some(color) = builder.define(&key.source_key(), value) {
                builder.editor.set(role, color);
            }
        }
    }

    let Some(scheme) = scheme else {
        return;
    };
    for role in TokenRole::ALL {
        for attribute_name in roles::jetbrains_token_attributes(role) {
            let Some(attribute) = scheme.resolved_attribute(attribute_name) else {
                continue;
            };
            let mut style = StyleEntry::default();
            if let Some(foreground) = attribute.foreground.as_deref() {
                style.fg = builder.define(&format!("{attribute_name}.foreground"), foreground);
            }
            if let Some(background) = attribute.background.as_deref() {
                style.bg = builder.define(&format!("{attribute_name}.background"), background);
            }
            if attribute.bold() {
                style.bold = Some(true);
            }
            if attribute.italic() {
                style.italic = Some(true);
            }
            if attribute.strikethrough() {
                style.strikethrough = Some(true);
            }
            if !style.is_empty() {
                builder.set_style(role, style);
                break;
            }
        }
    }
}

/// Normalizes a parsed record into the canonical model.
///
/// Fails with [`ConversionError::EmptyTheme`] when the record yields no editor
/// color, no token style and no definition; this is checked before defaults
/// are filled in.
pub fn normalize(
    parsed: &ParsedTheme,
    context: &ThemeContext,
    options: &NormalizeOptions,
) -> Result<ThemeScheme, ConversionError> {
    let mut builder = SchemeBuilder::default();

    let explicit_dark = match parsed {
        ParsedTheme::VsCode(theme) => {
            collect_vscode(&mut builder, theme);
            theme.declared_dark()
        }
        ParsedTheme::JetBrainsJson(theme) => {
            collect_jetbrains(&mut builder, Some(theme), theme.companion.as_ref());
            theme.dark.or_else(|| {
                theme
                    .companion
                    .as_ref()
                    .and_then(IclsScheme::declared_dark)
            })
        }
        ParsedTheme::JetBrainsIcls(scheme) => {
            collect_jetbrains(&mut builder, None, Some(scheme));
            scheme.declared_dark()
        }
    };

    let name = if context.display_name.trim().is_empty() {
        parsed.name().unwrap_or("Untitled").to_string()
    } else {
        context.display_name.trim().to_string()
    };

    if !builder.has_content() {
        return Err(ConversionError::EmptyTheme { name });
    }

    let is_dark = infer_darkness(
        explicit_dark.or(context.declared_dark),
        &[context.file_name.as_deref(), parsed.name(), Some(name.as_str())],
    );

    if options.fill_defaults {
        builder.fill_defaults(default_palette(parsed.format(), is_dark), is_dark);
    }

    log::info!(
        "Normalized '{name}' ({}, {}): {} editor colors, {} token styles",
        parsed.format(),
        if is_dark { "dark" } else { "light" },
        builder.editor.iter().count(),
        builder.styles.len()
    );
    Ok(builder.build(name, is_dark))
}
