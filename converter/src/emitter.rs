//! Writing the AndroidIDE bundle: `<base>/<id>/<id>.json` plus `scheme.prop`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::model::ThemeScheme;
use crate::pipeline::ConversionError;

pub const MAX_SCHEME_ID_LEN: usize = 50;
pub const PROPERTIES_FILE: &str = "scheme.prop";
pub const DEFAULT_SCHEME_VERSION: u32 = 1;

/// Files produced for one converted theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBundle {
    pub directory: PathBuf,
    pub scheme_file: PathBuf,
    pub properties_file: PathBuf,
}

fn clean_scheme_id(display_name: &str) -> String {
    let mut id = String::with_capacity(display_name.len());
    for c in display_name.to_lowercase().chars() {
        let mapped = if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-') {
            c
        } else {
            '_'
        };
        if mapped == '_' && id.ends_with('_') {
            continue;
        }
        id.push(mapped);
    }
    let trim = |value: &str| {
        value
            .trim_matches(|c| c == '_' || c == '.')
            .to_string()
    };
    let id = trim(&id);
    let truncated: String = id.chars().take(MAX_SCHEME_ID_LEN).collect();
    trim(&truncated)
}

/// Derives a filesystem-safe identifier from a display name.
///
/// The result is lowercase, uses only `[a-z0-9_.-]`, has no leading or
/// trailing `_` and at most [`MAX_SCHEME_ID_LEN`] characters. Names with
/// nothing usable fall back to `theme_<unix millis>`.
pub fn scheme_id(display_name: &str) -> String {
    let id = clean_scheme_id(display_name);
    if id.is_empty() {
        format!("theme_{}", chrono::Utc::now().timestamp_millis())
    } else {
        id
    }
}

/// Escapes text for a `.properties` value.
///
/// Follows `java.util.Properties.store`: separators and comment characters
/// are backslash escaped, anything outside printable ASCII becomes `\uXXXX`.
pub fn escape_property_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (index, c) in value.chars().enumerate() {
        match c {
            ' ' if index == 0 => escaped.push_str("\\ "),
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\u{c}' => escaped.push_str("\\f"),
            '=' | ':' | '#' | '!' => {
                escaped.push('\\');
                escaped.push(c);
            }
            ' '..='~' => escaped.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(escaped, "\\u{unit:04X}");
                }
            }
        }
    }
    escaped
}

/// Renders `scheme.prop`.
pub fn scheme_properties(display_name: &str, version: u32, is_dark: bool, scheme_file: &str) -> String {
    format!(
        "scheme.name={}\nscheme.version={version}\nscheme.isDark={is_dark}\nscheme.file={}\n",
        escape_property_value(display_name),
        escape_property_value(scheme_file),
    )
}

async fn write_bundle(
    directory: &Path,
    scheme_file: &Path,
    properties_file: &Path,
    json: &[u8],
    properties: &str,
) -> Result<(), ConversionError> {
    fs::create_dir_all(directory)
        .await
        .map_err(|e| ConversionError::io("creating", directory, e))?;
    fs::write(scheme_file, json)
        .await
        .map_err(|e| ConversionError::io("writing", scheme_file, e))?;
    fs::write(properties_file, properties)
        .await
        .map_err(|e| ConversionError::io("writing", properties_file, e))?;
    Ok(())
}

/// Writes `scheme` to `<base>/<scheme_id>/`, replacing any previous bundle.
///
/// Models with dangling definition references are rejected before the
/// target directory is touched. A failed write removes the partial bundle.
pub async fn emit(
    scheme: &ThemeScheme,
    scheme_id: &str,
    base: &Path,
    version: u32,
) -> Result<OutputBundle, ConversionError> {
    if let Some(key) = scheme.dangling_references().into_iter().next() {
        return Err(ConversionError::DanglingReference { key });
    }

    let directory = base.join(scheme_id);
    let file_name = format!("{scheme_id}.json");
    let scheme_file = directory.join(&file_name);
    let properties_file = directory.join(PROPERTIES_FILE);

    let json = serde_json::to_vec_pretty(scheme)
        .map_err(|e| ConversionError::io("serializing", &scheme_file, e.into()))?;
    let properties = scheme_properties(&scheme.name, version, scheme.is_dark, &file_name);

    if fs::try_exists(&directory).await.unwrap_or(false) {
        log::info!("Replacing existing bundle {}", directory.display());
        fs::remove_dir_all(&directory)
            .await
            .map_err(|e| ConversionError::io("removing", &directory, e))?;
    }

    if let Err(error) = write_bundle(
        &directory,
        &scheme_file,
        &properties_file,
        &json,
        &properties,
    )
    .await
    {
        if let Err(cleanup) = fs::remove_dir_all(&directory).await {
            log::warn!(
                "Failed to remove partial bundle {}: {cleanup}",
                directory.display()
            );
        }
        return Err(error);
    }

    log::info!("Wrote theme bundle {}", directory.display());
    Ok(OutputBundle {
        directory,
        scheme_file,
        properties_file,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ColorRef, EditorRole};
    use claims::*;

    fn scheme(name: &str) -> ThemeScheme {
        let mut scheme = ThemeScheme {
            name: name.to_string(),
            is_dark: true,
            ..Default::default()
        };
        scheme
            .definitions
            .insert("editor_bg".to_string(), "#112233".to_string());
        scheme
            .editor
            .set(EditorRole::Background, ColorRef::definition("editor_bg"));
        scheme
    }

    #[test]
    fn test_scheme_id_examples() {
        assert_eq!(scheme_id("My Cool Theme!"), "my_cool_theme");
        assert_eq!(scheme_id("  One   Dark Pro  "), "one_dark_pro");
        assert_eq!(scheme_id("Material-Theme.v2"), "material-theme.v2");
        assert_eq!(scheme_id("../../etc"), "etc");
        assert_eq!(scheme_id(&"a".repeat(80)).len(), MAX_SCHEME_ID_LEN);
    }

    #[test]
    fn test_scheme_id_fallback_for_unusable_names() {
        for name in ["", "!!!", "..", "日本語"] {
            let id = scheme_id(name);
            assert!(id.starts_with("theme_"), "{name} -> {id}");
        }
    }

    #[test]
    fn test_property_escaping() {
        assert_eq!(escape_property_value("Plain Name"), "Plain Name");
        assert_eq!(escape_property_value(" a=b:c"), "\\ a\\=b\\:c");
        assert_eq!(escape_property_value("Café"), "Caf\\u00E9");
        assert_eq!(escape_property_value("C:\\themes"), "C\\:\\\\themes");
        assert_eq!(escape_property_value("😀"), "\\uD83D\\uDE00");
    }

    #[test]
    fn test_properties_content() {
        let text = scheme_properties("Night Owl", 3, false, "night_owl.json");
        assert_eq!(
            text,
            "scheme.name=Night Owl\nscheme.version=3\nscheme.isDark=false\nscheme.file=night_owl.json\n"
        );
    }

    #[tokio::test]
    async fn test_emit_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = assert_ok!(emit(&scheme("Night Owl"), "night_owl", dir.path(), 1).await);

        assert_eq!(bundle.directory, dir.path().join("night_owl"));
        let json = std::fs::read_to_string(&bundle.scheme_file).unwrap();
        let parsed: ThemeScheme = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, scheme("Night Owl"));
        let properties = std::fs::read_to_string(&bundle.properties_file).unwrap();
        assert!(properties.contains("scheme.file=night_owl.json"));
        assert!(properties.contains("scheme.isDark=true"));
    }

    #[tokio::test]
    async fn test_emit_replaces_previous_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("night_owl").join("stale.txt");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, "old").unwrap();

        assert_ok!(emit(&scheme("Night Owl"), "night_owl", dir.path(), 1).await);

        assert!(!stale.exists());
        assert!(dir.path().join("night_owl").join("night_owl.json").exists());
    }

    #[tokio::test]
    async fn test_dangling_reference_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut broken = scheme("Broken");
        broken
            .editor
            .set(EditorRole::Foreground, ColorRef::definition("missing"));

        let error = assert_err!(emit(&broken, "broken", dir.path(), 1).await);

        assert_matches!(error, ConversionError::DanglingReference { .. });
        assert!(!dir.path().join("broken").exists());
    }
}
