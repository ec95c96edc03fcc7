//! Parsers for the supported theme-definition formats.
//!
//! Each parser turns text into a format-specific record without interpreting
//! colors. Syntax errors and structural violations become
//! [`ConversionError::MalformedDefinition`]; unknown fields are ignored.

use std::fmt;
use std::path::Path;

pub mod icls;
pub mod jetbrains;
pub mod vscode;

pub use icls::{IclsAttribute, IclsScheme};
pub use jetbrains::JetBrainsTheme;
pub use vscode::{VsCodeTheme, VsCodeTokenColor, VsCodeTokenSettings};

use crate::pipeline::ConversionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeFormat {
    VsCode,
    JetBrainsJson,
    JetBrainsIcls,
}

impl ThemeFormat {
    /// Format implied by a file name, if it is a theme definition at all.
    pub fn from_path(path: &Path) -> Option<ThemeFormat> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();
        if name.ends_with(".theme.json") {
            Some(ThemeFormat::JetBrainsJson)
        } else if name.ends_with(".icls") || name.ends_with(".xml") {
            Some(ThemeFormat::JetBrainsIcls)
        } else if name.ends_with(".json") || name.ends_with(".jsonc") {
            Some(ThemeFormat::VsCode)
        } else {
            None
        }
    }
}

impl fmt::Display for ThemeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThemeFormat::VsCode => "VS Code JSON",
            ThemeFormat::JetBrainsJson => "JetBrains JSON",
            ThemeFormat::JetBrainsIcls => "JetBrains ICLS",
        })
    }
}

/// A parsed definition file, one variant per source format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedTheme {
    VsCode(VsCodeTheme),
    JetBrainsJson(JetBrainsTheme),
    JetBrainsIcls(IclsScheme),
}

impl ParsedTheme {
    pub fn format(&self) -> ThemeFormat {
        match self {
            ParsedTheme::VsCode(_) => ThemeFormat::VsCode,
            ParsedTheme::JetBrainsJson(_) => ThemeFormat::JetBrainsJson,
            ParsedTheme::JetBrainsIcls(_) => ThemeFormat::JetBrainsIcls,
        }
    }

    /// Name declared inside the definition, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            ParsedTheme::VsCode(theme) => theme.name.as_deref(),
            ParsedTheme::JetBrainsJson(theme) => theme.name.as_deref(),
            ParsedTheme::JetBrainsIcls(scheme) => scheme.name.as_deref(),
        }
    }
}

pub(crate) fn strip_bom(text: &str) -> &str {
    text.strip_prefix('\u{feff}').unwrap_or(text)
}

pub fn parse(format: ThemeFormat, text: &str) -> Result<ParsedTheme, ConversionError> {
    match format {
        ThemeFormat::VsCode => vscode::parse(text).map(ParsedTheme::VsCode),
        ThemeFormat::JetBrainsJson => jetbrains::parse(text).map(ParsedTheme::JetBrainsJson),
        ThemeFormat::JetBrainsIcls => icls::parse(strip_bom(text)).map(ParsedTheme::JetBrainsIcls),
    }
}
