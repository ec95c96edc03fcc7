//! Finding the theme definition inside an extracted package.
//!
//! VS Code extensions declare their themes in `extension/package.json`
//! (`contributes.themes`). JetBrains plugins ship `*.theme.json` UI themes
//! and/or `*.icls` editor schemes, often nested inside `lib/*.jar`.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::parsers::ThemeFormat;
use crate::pipeline::ConversionError;

/// Store a package was obtained from. Decides where to look first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeStore {
    VsCode,
    JetBrains,
}

impl ThemeStore {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeStore::VsCode => "vscode",
            ThemeStore::JetBrains => "jetbrains",
        }
    }

    pub fn parse(value: &str) -> Option<ThemeStore> {
        match value.trim().to_ascii_lowercase().as_str() {
            "vscode" | "vs-code" | "microsoft" | "marketplace" => Some(ThemeStore::VsCode),
            "jetbrains" | "intellij" => Some(ThemeStore::JetBrains),
            _ => None,
        }
    }
}

impl fmt::Display for ThemeStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A located theme-definition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinitionFile {
    pub path: PathBuf,
    pub format: ThemeFormat,
    /// Label from the extension manifest.
    pub label: Option<String>,
    /// Darkness declared by the manifest's `uiTheme`.
    pub declared_dark: Option<bool>,
}

impl DefinitionFile {
    fn plain(path: PathBuf, format: ThemeFormat) -> Self {
        Self {
            path,
            format,
            label: None,
            declared_dark: None,
        }
    }

    pub fn file_name(&self) -> Option<String> {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

#[derive(Debug, Deserialize)]
struct ManifestTheme {
    #[serde(default)]
    label: Option<String>,
    #[serde(default, rename = "uiTheme")]
    ui_theme: Option<String>,
    path: String,
}

#[derive(Debug, Default, Deserialize)]
struct Contributes {
    #[serde(default)]
    themes: Vec<ManifestTheme>,
}

#[derive(Debug, Deserialize)]
struct ExtensionManifest {
    #[serde(default)]
    contributes: Option<Contributes>,
}

fn ui_theme_is_dark(ui_theme: &str) -> Option<bool> {
    match ui_theme {
        "vs-dark" | "hc-black" => Some(true),
        "vs" | "hc-light" => Some(false),
        _ => None,
    }
}

/// Every regular file below `root`, ordered by depth and then path.
///
/// Symlinks are not followed.
pub fn walk_files(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                files.push(entry.path());
            }
        }
    }
    files.sort_by(|a, b| {
        a.components()
            .count()
            .cmp(&b.components().count())
            .then_with(|| a.cmp(b))
    });
    Ok(files)
}

fn lower_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

pub(crate) fn is_inside(root: &Path, path: &Path) -> bool {
    match (root.canonicalize(), path.canonicalize()) {
        (Ok(root), Ok(path)) => path.starts_with(root),
        _ => false,
    }
}

fn from_manifest(root: &Path, files: &[PathBuf]) -> Option<DefinitionFile> {
    let manifests = files
        .iter()
        .filter(|path| lower_name(path) == "package.json");
    for manifest_path in manifests {
        let Ok(text) = fs::read_to_string(manifest_path) else {
            continue;
        };
        let manifest: ExtensionManifest = match serde_json_lenient::from_str_lenient(&text) {
            Ok(manifest) => manifest,
            Err(e) => {
                log::warn!("Skipping unreadable manifest {}: {e}", manifest_path.display());
                continue;
            }
        };
        let Some(base) = manifest_path.parent() else {
            continue;
        };
        let themes = manifest.contributes.unwrap_or_default().themes;
        for theme in themes {
            let candidate = base.join(theme.path.trim_start_matches("./"));
            if !candidate.is_file() || !is_inside(root, &candidate) {
                log::debug!("Manifest theme path '{}' not usable", theme.path);
                continue;
            }
            // Manifest themes are VS Code themes whatever their file name.
            return Some(DefinitionFile {
                format: ThemeFormat::VsCode,
                path: candidate,
                label: theme.label,
                declared_dark: theme.ui_theme.as_deref().and_then(ui_theme_is_dark),
            });
        }
    }
    None
}

fn locate_vscode(root: &Path, files: &[PathBuf]) -> Option<DefinitionFile> {
    if let Some(found) = from_manifest(root, files) {
        return Some(found);
    }
    let is_theme_json = |path: &&PathBuf| {
        ThemeFormat::from_path(path) == Some(ThemeFormat::VsCode)
            && !matches!(
                lower_name(path).as_str(),
                "package.json" | "package.nls.json" | "tsconfig.json"
            )
    };
    let in_themes_dir = |path: &&PathBuf| {
        path.parent()
            .and_then(Path::file_name)
            .is_some_and(|dir| dir.eq_ignore_ascii_case("themes"))
    };
    files
        .iter()
        .filter(is_theme_json)
        .find(in_themes_dir)
        .or_else(|| {
            files
                .iter()
                .filter(is_theme_json)
                .find(|path| lower_name(path).contains("theme"))
        })
        .or_else(|| files.iter().find(is_theme_json))
        .map(|path| DefinitionFile::plain(path.clone(), ThemeFormat::VsCode))
}

fn locate_jetbrains(files: &[PathBuf]) -> Option<DefinitionFile> {
    let by_format = |format: ThemeFormat| {
        files
            .iter()
            .find(|path| {
                ThemeFormat::from_path(path) == Some(format)
                    && (format != ThemeFormat::JetBrainsIcls || lower_name(path).ends_with(".icls"))
            })
            .map(|path| DefinitionFile::plain(path.clone(), format))
    };
    by_format(ThemeFormat::JetBrainsJson).or_else(|| by_format(ThemeFormat::JetBrainsIcls))
}

fn locate_single(files: &[PathBuf]) -> Option<DefinitionFile> {
    match files {
        [only] => ThemeFormat::from_path(only).map(|format| DefinitionFile::plain(only.clone(), format)),
        _ => None,
    }
}

/// Finds the theme definition in an extracted tree.
///
/// A theme declared by a VSIX manifest always wins. Otherwise the strategy for
/// `store` is tried first and the other store's second, so a package
/// mislabelled by the caller still converts.
pub fn locate(root: &Path, store: Option<ThemeStore>) -> Result<DefinitionFile, ConversionError> {
    let files = walk_files(root).map_err(|e| ConversionError::io("scanning", root, e))?;

    let found = locate_single(&files)
        .or_else(|| from_manifest(root, &files))
        .or_else(|| match store {
            Some(ThemeStore::VsCode) => {
                locate_vscode(root, &files).or_else(|| locate_jetbrains(&files))
            }
            Some(ThemeStore::JetBrains) | None => {
                locate_jetbrains(&files).or_else(|| locate_vscode(root, &files))
            }
        });

    match found {
        Some(definition) => {
            log::info!(
                "Located {} definition {}",
                definition.format,
                definition.path.display()
            );
            Ok(definition)
        }
        None => Err(ConversionError::DefinitionNotFound {
            searched: root.to_path_buf(),
        }),
    }
}

/// Nested plugin archives (`lib/*.jar`) that may carry the theme.
pub fn nested_archives(root: &Path) -> Result<Vec<PathBuf>, ConversionError> {
    let files = walk_files(root).map_err(|e| ConversionError::io("scanning", root, e))?;
    Ok(files
        .into_iter()
        .filter(|path| {
            let name = lower_name(path);
            name.ends_with(".jar") || name.ends_with(".zip")
        })
        .collect())
}

/// Resolves the `editorScheme` of a `.theme.json` to a file in the tree.
///
/// The value is relative to the plugin root, which is usually an ancestor of
/// the theme file. Falls back to a search by file name.
pub fn find_companion_scheme(root: &Path, theme_file: &Path, editor_scheme: &str) -> Option<PathBuf> {
    let relative = editor_scheme.replace('\\', "/");
    let relative = relative.trim_start_matches('/');
    if relative.is_empty() {
        return None;
    }

    let mut ancestor = theme_file.parent();
    while let Some(dir) = ancestor {
        let candidate = dir.join(relative);
        if candidate.is_file() && is_inside(root, &candidate) {
            return Some(candidate);
        }
        if dir == root {
            break;
        }
        ancestor = dir.parent();
    }

    let wanted = Path::new(relative)
        .file_name()?
        .to_string_lossy()
        .to_ascii_lowercase();
    walk_files(root)
        .ok()?
        .into_iter()
        .find(|path| lower_name(path) == wanted)
}
