use std::path::{Path, PathBuf};

use async_zip::base::write::ZipFileWriter;
use async_zip::{Compression, ZipEntryBuilder};
use claims::*;
use converter::model::{EditorRole, ThemeScheme, TokenRole};
use converter::pipeline::InFlightGuard;
use converter::{
    ConversionError, ConversionEvent, ConversionRequest, ConversionState, Converter,
    ConverterSettings, FailureStage, PackageSource, ThemeStore,
};
use tokio_util::sync::CancellationToken;

async fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipFileWriter::new(Vec::<u8>::new());
    for (name, data) in entries {
        let builder = ZipEntryBuilder::new(name.to_string().into(), Compression::Deflate);
        writer.write_entry_whole(builder, data).await.unwrap();
    }
    writer.close().await.unwrap()
}

struct Fixture {
    dir: tempfile::TempDir,
    converter: Converter,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = ConverterSettings {
            output_dir: dir.path().join("out"),
            work_dir: dir.path().join("work"),
            ..Default::default()
        };
        let converter = Converter::new(settings).unwrap();
        Self { dir, converter }
    }

    fn input(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.dir.path().join("input").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn output(&self, scheme_id: &str) -> PathBuf {
        self.dir.path().join("out").join(scheme_id)
    }

    fn work_dir_is_empty(&self) -> bool {
        match std::fs::read_dir(self.dir.path().join("work")) {
            Ok(mut entries) => entries.next().is_none(),
            Err(_) => true,
        }
    }

    async fn convert(
        &self,
        path: PathBuf,
        store: Option<ThemeStore>,
        name: &str,
    ) -> (Result<converter::ConversionOutcome, ConversionError>, Vec<ConversionEvent>) {
        let (sender, receiver) = flume::unbounded();
        let request = ConversionRequest {
            source: PackageSource::Local { path, store },
            display_name: name.to_string(),
        };
        let result = self
            .converter
            .convert(request, Some(sender), &CancellationToken::new())
            .await;
        (result, receiver.drain().collect())
    }
}

fn read_scheme(path: &Path) -> ThemeScheme {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn failed_stage(events: &[ConversionEvent]) -> Option<FailureStage> {
    events.iter().rev().find_map(|event| match event {
        ConversionEvent::StateChanged(ConversionState::Failed { stage, .. }) => Some(*stage),
        _ => None,
    })
}

const VSIX_MANIFEST: &[u8] = br#"{
  "name": "night-owl",
  "contributes": {
    "themes": [
      {"label": "Night Owl", "uiTheme": "vs-dark", "path": "./themes/Night Owl-color-theme.json"}
    ]
  }
}"#;

const NIGHT_OWL: &[u8] = br##"{
  // VS Code theme files are JSONC
  "name": "Night Owl",
  "colors": {
    "editor.background": "#011627",
    "editor.foreground": "#d6deeb",
    "editorCursor.foreground": "#80a4c2",
  },
  "tokenColors": [
    {"scope": "comment", "settings": {"foreground": "#637777", "fontStyle": "italic"}},
    {"scope": ["keyword", "storage.type"], "settings": {"foreground": "#c792ea"}},
    {"scope": "string", "settings": {"foreground": "#ecc48d"}},
  ]
}"##;

#[cfg(test)]
mod vscode_conversion_tests {
    use super::*;

    #[tokio::test]
    async fn test_vsix_package_converts() {
        let fixture = Fixture::new();
        let package = zip_bytes(&[
            ("extension/package.json", VSIX_MANIFEST),
            ("extension/themes/Night Owl-color-theme.json", NIGHT_OWL),
            ("extension/themes/unrelated.json", b"{}"),
        ])
        .await;
        let path = fixture.input("night-owl.vsix", &package);

        let (result, events) = fixture
            .convert(path.clone(), Some(ThemeStore::VsCode), "Night Owl VSIX")
            .await;
        let outcome = assert_ok!(result);

        assert_eq!(outcome.scheme_id, "night_owl_vsix");
        assert_eq!(outcome.state_history.last(), Some(&ConversionState::Done));
        assert_some!(events.last());
        let scheme = read_scheme(&outcome.bundle.scheme_file);
        assert_eq!(scheme.name, "Night Owl VSIX");
        assert!(scheme.is_dark);
        let background = assert_some!(scheme.editor.get(EditorRole::Background));
        assert_some!(background.definition_key());
        assert_eq!(scheme.resolve(background), Some("#011627"));
        let caret = assert_some!(scheme.editor.get(EditorRole::CaretForeground));
        assert_eq!(scheme.resolve(caret), Some("#80A4C2"));
        let comment = assert_some!(scheme.style(TokenRole::Comment));
        assert_eq!(comment.italic, Some(true));
        assert_some!(scheme.style(TokenRole::Keyword));
        assert!(scheme.dangling_references().is_empty());

        let properties = std::fs::read_to_string(&outcome.bundle.properties_file).unwrap();
        assert!(properties.contains("scheme.name=Night Owl VSIX"));
        assert!(properties.contains("scheme.isDark=true"));
        assert!(properties.contains("scheme.file=night_owl_vsix.json"));

        assert!(path.exists(), "the user's file must stay untouched");
        assert!(fixture.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_bare_definition_file_converts() {
        let fixture = Fixture::new();
        let path = fixture.input("night.json", NIGHT_OWL);

        let (result, _) = fixture.convert(path, None, "Night Owl Bare").await;
        let outcome = assert_ok!(result);

        let scheme = read_scheme(&outcome.bundle.scheme_file);
        let background = assert_some!(scheme.editor.get(EditorRole::Background));
        assert_eq!(scheme.resolve(background), Some("#011627"));
        // The name says nothing and there is no type, so dark is assumed.
        assert!(scheme.is_dark);
    }

    #[tokio::test]
    async fn test_empty_theme_produces_no_output() {
        let fixture = Fixture::new();
        let path = fixture.input("nothing.json", br#"{"name": "Nothing", "colors": {}}"#);

        let (result, events) = fixture.convert(path, None, "Empty Pipeline Theme").await;

        let error = assert_err!(result);
        assert_matches!(error, ConversionError::EmptyTheme { .. });
        assert_eq!(failed_stage(&events), Some(FailureStage::Normalize));
        assert!(!fixture.output("empty_pipeline_theme").exists());
        assert!(fixture.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_rerun_replaces_output_directory() {
        let fixture = Fixture::new();
        let path = fixture.input("night.json", NIGHT_OWL);

        let (first, _) = fixture.convert(path.clone(), None, "Rerun Night Owl").await;
        let first = assert_ok!(first);
        let stale = first.bundle.directory.join("stale.txt");
        std::fs::write(&stale, "left over").unwrap();

        let (second, _) = fixture.convert(path, None, "Rerun Night Owl").await;
        let second = assert_ok!(second);

        assert_eq!(first.bundle.directory, second.bundle.directory);
        assert!(!stale.exists());
        assert!(second.bundle.scheme_file.exists());
    }

    #[tokio::test]
    async fn test_in_flight_scheme_is_rejected() {
        let fixture = Fixture::new();
        let path = fixture.input("night.json", NIGHT_OWL);
        let _running = InFlightGuard::acquire("busy_night_owl").unwrap();

        let (result, events) = fixture.convert(path, None, "Busy Night Owl").await;

        let error = assert_err!(result);
        assert_matches!(error, ConversionError::AlreadyInProgress { .. });
        assert!(events.is_empty());
        assert!(!fixture.output("busy_night_owl").exists());
    }
}

#[cfg(test)]
mod jetbrains_conversion_tests {
    use super::*;

    const LIGHT_THEME: &[u8] = br##"{
      "name": "Solar Light",
      "dark": false,
      "author": "Someone",
      "editorScheme": "/themes/SolarLight.icls",
      "colors": {"paper": "#FDF6E3"},
      "ui": {"*": {"background": "paper"}}
    }"##;

    const LIGHT_SCHEME: &[u8] = br#"<scheme name="Solar Light" version="142" parent_scheme="Default">
  <colors>
    <option name="CARET_COLOR" value="586e75" />
    <option name="LINE_NUMBERS_COLOR" value="93a1a1" />
  </colors>
  <attributes>
    <option name="TEXT">
      <value>
        <option name="FOREGROUND" value="657b83" />
        <option name="BACKGROUND" value="fdf6e3" />
      </value>
    </option>
    <option name="DEFAULT_KEYWORD">
      <value>
        <option name="FOREGROUND" value="859900" />
        <option name="FONT_TYPE" value="1" />
      </value>
    </option>
  </attributes>
</scheme>"#;

    #[tokio::test]
    async fn test_plugin_with_nested_jar_converts() {
        let fixture = Fixture::new();
        let jar = zip_bytes(&[
            ("META-INF/plugin.xml", b"<idea-plugin/>"),
            ("themes/SolarLight.theme.json", LIGHT_THEME),
            ("themes/SolarLight.icls", LIGHT_SCHEME),
        ])
        .await;
        let plugin = zip_bytes(&[("SolarLight/lib/solar-light.jar", &jar)]).await;
        let path = fixture.input("SolarLight.zip", &plugin);

        let (result, _) = fixture
            .convert(path, Some(ThemeStore::JetBrains), "Solar Light Plugin")
            .await;
        let outcome = assert_ok!(result);

        let scheme = read_scheme(&outcome.bundle.scheme_file);
        assert!(!scheme.is_dark);
        let background = assert_some!(scheme.editor.get(EditorRole::Background));
        assert_eq!(scheme.resolve(background), Some("#FDF6E3"));
        let caret = assert_some!(scheme.editor.get(EditorRole::CaretForeground));
        assert_eq!(scheme.resolve(caret), Some("#586E75"));
        let keyword = assert_some!(scheme.style(TokenRole::Keyword));
        assert_eq!(keyword.bold, Some(true));
        assert!(fixture.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_dark_false_without_other_hints_is_light() {
        let fixture = Fixture::new();
        let path = fixture.input(
            "Plain.theme.json",
            br##"{"name": "Plain", "dark": false, "ui": {"Editor": {"background": "#202020"}}}"##,
        );

        let (result, _) = fixture.convert(path, None, "Plain JetBrains").await;
        let outcome = assert_ok!(result);

        assert!(!read_scheme(&outcome.bundle.scheme_file).is_dark);
    }

    #[tokio::test]
    async fn test_standalone_icls_converts() {
        let fixture = Fixture::new();
        let path = fixture.input("SolarLight.icls", LIGHT_SCHEME);

        let (result, _) = fixture.convert(path, None, "Solar Light Scheme").await;
        let outcome = assert_ok!(result);

        let scheme = read_scheme(&outcome.bundle.scheme_file);
        assert!(!scheme.is_dark);
        let foreground = assert_some!(scheme.editor.get(EditorRole::Foreground));
        assert_eq!(scheme.resolve(foreground), Some("#657B83"));
    }
}

#[cfg(test)]
mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_escaping_archive_fails_during_extraction() {
        let fixture = Fixture::new();
        let package = zip_bytes(&[("../../escape.json", b"{}")]).await;
        let path = fixture.input("evil.zip", &package);

        let (result, events) = fixture.convert(path, None, "Escaping Package").await;

        let error = assert_err!(result);
        assert_matches!(error, ConversionError::PathEscape { .. });
        assert_eq!(failed_stage(&events), Some(FailureStage::Extraction));
        assert!(fixture.work_dir_is_empty());
        assert!(!fixture.output("escaping_package").exists());
    }

    #[tokio::test]
    async fn test_package_without_definition_fails_locating() {
        let fixture = Fixture::new();
        let package = zip_bytes(&[("README.md", b"# nothing here"), ("LICENSE", b"MIT")]).await;
        let path = fixture.input("docs.zip", &package);

        let (result, events) = fixture.convert(path, None, "Docs Only").await;

        let error = assert_err!(result);
        assert_matches!(error, ConversionError::DefinitionNotFound { .. });
        assert_eq!(failed_stage(&events), Some(FailureStage::FileNotFound));
        assert!(fixture.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_missing_local_file_fails_in_download_stage() {
        let fixture = Fixture::new();
        let path = fixture.dir.path().join("does-not-exist.vsix");

        let (result, events) = fixture.convert(path, None, "Missing Package").await;

        assert_err!(result);
        assert_eq!(failed_stage(&events), Some(FailureStage::Download));
        assert!(fixture.work_dir_is_empty());
    }

    #[tokio::test]
    async fn test_malformed_definition_fails_parsing() {
        let fixture = Fixture::new();
        let path = fixture.input("broken.icls", b"<notascheme/>");

        let (result, events) = fixture.convert(path, None, "Broken Scheme").await;

        let error = assert_err!(result);
        assert_matches!(error, ConversionError::MalformedDefinition { .. });
        assert_eq!(failed_stage(&events), Some(FailureStage::Parse));
    }
    #[tokio::test]
    async fn test_cancel_after_download_stops_before_parsing() {
        let fixture = Fixture::new();
        let path = fixture.input("night-owl.json", NIGHT_OWL);
        let cancel = CancellationToken::new();
        // Rendezvous channel: the run cannot enter a state before the
        // watcher has seen the previous one.
        let (sender, receiver) = flume::bounded(0);
        let watcher = {
            let cancel = cancel.clone();
            std::thread::spawn(move || {
                let mut events = Vec::new();
                for event in receiver.iter() {
                    if event == ConversionEvent::StateChanged(ConversionState::Extracting) {
                        cancel.cancel();
                    }
                    events.push(event);
                }
                events
            })
        };
        let request = ConversionRequest {
            source: PackageSource::Local { path, store: None },
            display_name: "Cancelled Owl".to_string(),
        };

        let result = fixture.converter.convert(request, Some(sender), &cancel).await;
        let events = watcher.join().unwrap();

        let error = assert_err!(result);
        assert_matches!(error, ConversionError::Cancelled);
        assert_matches!(
            failed_stage(&events),
            Some(FailureStage::Extraction | FailureStage::FileNotFound)
        );
        assert!(
            !events.contains(&ConversionEvent::StateChanged(ConversionState::Parsing))
        );
        assert!(!fixture.output("cancelled_owl").exists());
        assert!(fixture.work_dir_is_empty());
        assert!(!InFlightGuard::is_running("cancelled_owl"));
    }
}
