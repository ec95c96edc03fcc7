//! The conversion orchestrator.
//!
//! A conversion walks `Downloading → Extracting → Locating → Parsing →
//! Normalizing → Emitting → Done`. The first error moves it to
//! [`ConversionState::Failed`] tagged with the stage it belongs to. Every run
//! gets its own working directory which is removed when the run ends, whether
//! it succeeded or not. Only the emitted bundle survives.

pub mod errors;
pub mod guard;

use std::fmt;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio_util::sync::CancellationToken;

pub use errors::{ConversionError, FailureStage};
pub use guard::{InFlightGuard, WorkDir};

use crate::archive;
use crate::common::HttpSettings;
use crate::download::{self, DownloadProgress, DownloadedPackage, Downloader, PackageKind};
use crate::emitter::{self, DEFAULT_SCHEME_VERSION, OutputBundle};
use crate::locator::{self, DefinitionFile, ThemeStore};
use crate::normalizer::{self, NormalizeOptions, ThemeContext};
use crate::parsers::{self, ParsedTheme, ThemeFormat, VsCodeTheme, icls, vscode};

/// Longest `include` chain followed for VS Code themes.
pub const MAX_INCLUDE_DEPTH: usize = 4;

const DOWNLOAD_DIR: &str = "download";
const EXTRACT_DIR: &str = "package";
const NESTED_ARCHIVE_SUFFIX: &str = ".d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionState {
    Downloading,
    Extracting,
    Locating,
    Parsing,
    Normalizing,
    Emitting,
    Done,
    Failed { stage: FailureStage, reason: String },
}

impl ConversionState {
    /// Stage a failure in this state is attributed to.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            ConversionState::Downloading => Some(FailureStage::Download),
            ConversionState::Extracting => Some(FailureStage::Extraction),
            ConversionState::Locating => Some(FailureStage::FileNotFound),
            ConversionState::Parsing => Some(FailureStage::Parse),
            ConversionState::Normalizing => Some(FailureStage::Normalize),
            ConversionState::Emitting => Some(FailureStage::Emit),
            ConversionState::Done | ConversionState::Failed { .. } => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ConversionState::Done | ConversionState::Failed { .. })
    }
}

impl fmt::Display for ConversionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionState::Downloading => f.write_str("downloading"),
            ConversionState::Extracting => f.write_str("extracting"),
            ConversionState::Locating => f.write_str("locating"),
            ConversionState::Parsing => f.write_str("parsing"),
            ConversionState::Normalizing => f.write_str("normalizing"),
            ConversionState::Emitting => f.write_str("emitting"),
            ConversionState::Done => f.write_str("done"),
            ConversionState::Failed { stage, reason } => write!(f, "failed ({stage}): {reason}"),
        }
    }
}

/// Sent to the caller while a conversion runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionEvent {
    StateChanged(ConversionState),
    DownloadProgress(DownloadProgress),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    Remote {
        url: String,
        store: Option<ThemeStore>,
    },
    /// A file on disk. It is copied first and never modified.
    Local {
        path: PathBuf,
        store: Option<ThemeStore>,
    },
}

impl PackageSource {
    pub fn store(&self) -> Option<ThemeStore> {
        match self {
            PackageSource::Remote { store, .. } | PackageSource::Local { store, .. } => *store,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub source: PackageSource,
    /// Name written to the scheme; also the source of the scheme id.
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOutcome {
    pub scheme_id: String,
    pub bundle: OutputBundle,
    /// Every state the run passed through, ending with `Done`.
    pub state_history: Vec<ConversionState>,
}

#[derive(Debug, Clone)]
pub struct ConverterSettings {
    /// Base directory receiving `<scheme_id>/` bundles.
    pub output_dir: PathBuf,
    /// Parent of the per-run working directories.
    pub work_dir: PathBuf,
    pub scheme_version: u32,
    pub fill_defaults: bool,
    pub http: HttpSettings,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("AndroidIDEThemes"),
            work_dir: std::env::temp_dir().join("theme-porter"),
            scheme_version: DEFAULT_SCHEME_VERSION,
            fill_defaults: true,
            http: HttpSettings::default(),
        }
    }
}

/// Records state transitions and forwards them to the event channel.
struct Tracker {
    events: Option<flume::Sender<ConversionEvent>>,
    history: Vec<ConversionState>,
}

impl Tracker {
    fn new(events: Option<flume::Sender<ConversionEvent>>) -> Self {
        Self {
            events,
            history: Vec::new(),
        }
    }

    fn enter(&mut self, state: ConversionState) {
        log::info!("Conversion state: {state}");
        self.send(ConversionEvent::StateChanged(state.clone()));
        self.history.push(state);
    }

    /// Enters `state`, then gives up if the caller cancelled meanwhile.
    fn advance(
        &mut self,
        state: ConversionState,
        cancel: &CancellationToken,
    ) -> Result<(), ConversionError> {
        self.enter(state);
        if cancel.is_cancelled() {
            return Err(ConversionError::Cancelled);
        }
        Ok(())
    }

    fn progress(&self, progress: DownloadProgress) {
        self.send(ConversionEvent::DownloadProgress(progress));
    }

    fn send(&self, event: ConversionEvent) {
        if let Some(events) = &self.events {
            // A caller that stopped listening does not stop the conversion.
            let _ = events.send(event);
        }
    }

    fn active_stage(&self) -> Option<FailureStage> {
        self.history.last().and_then(ConversionState::stage)
    }
}

pub struct Converter {
    settings: ConverterSettings,
    downloader: Downloader,
}

impl Converter {
    pub fn new(settings: ConverterSettings) -> Result<Self, ConversionError> {
        let downloader = Downloader::new(settings.http.clone())?;
        Ok(Self {
            settings,
            downloader,
        })
    }

    pub fn settings(&self) -> &ConverterSettings {
        &self.settings
    }

    /// Runs one conversion to completion.
    ///
    /// Fails with [`ConversionError::AlreadyInProgress`] before any state is
    /// entered when a conversion for the same scheme id is running.
    pub async fn convert(
        &self,
        request: ConversionRequest,
        events: Option<flume::Sender<ConversionEvent>>,
        cancel: &CancellationToken,
    ) -> Result<ConversionOutcome, ConversionError> {
        let scheme_id = emitter::scheme_id(&request.display_name);
        let _in_flight = InFlightGuard::acquire(&scheme_id)?;
        let mut tracker = Tracker::new(events);

        match self.run(&request, &scheme_id, &mut tracker, cancel).await {
            Ok(bundle) => {
                tracker.enter(ConversionState::Done);
                Ok(ConversionOutcome {
                    scheme_id,
                    bundle,
                    state_history: tracker.history,
                })
            }
            Err(error) => {
                let stage = error
                    .stage()
                    .or_else(|| tracker.active_stage())
                    .unwrap_or(FailureStage::Download);
                log::error!("Conversion of '{}' failed during {stage}: {error}", request.display_name);
                tracker.enter(ConversionState::Failed {
                    stage,
                    reason: error.to_string(),
                });
                Err(error)
            }
        }
    }

    async fn run(
        &self,
        request: &ConversionRequest,
        scheme_id: &str,
        tracker: &mut Tracker,
        cancel: &CancellationToken,
    ) -> Result<OutputBundle, ConversionError> {
        let store = request.source.store();

        tracker.advance(ConversionState::Downloading, cancel)?;
        let work_dir = WorkDir::create(&self.settings.work_dir, scheme_id).await?;
        let package = self
            .fetch(&request.source, &request.display_name, work_dir.path(), tracker, cancel)
            .await?;

        tracker.advance(ConversionState::Extracting, cancel)?;
        let root = work_dir.path().join(EXTRACT_DIR);
        unpack(&package, &root).await?;
        remove_package(&package.path).await;

        tracker.advance(ConversionState::Locating, cancel)?;
        let definition = locate_definition(&root, store).await?;

        tracker.advance(ConversionState::Parsing, cancel)?;
        let parsed = parse_definition(&definition, &root).await?;

        tracker.advance(ConversionState::Normalizing, cancel)?;
        let display_name = match request.display_name.trim() {
            "" => definition.label.clone().unwrap_or_default(),
            name => name.to_string(),
        };
        let context = ThemeContext {
            display_name,
            file_name: definition.file_name(),
            declared_dark: definition.declared_dark,
        };
        let options = NormalizeOptions {
            fill_defaults: self.settings.fill_defaults,
        };
        let scheme = normalizer::normalize(&parsed, &context, &options)?;

        tracker.advance(ConversionState::Emitting, cancel)?;
        emitter::emit(
            &scheme,
            scheme_id,
            &self.settings.output_dir,
            self.settings.scheme_version,
        )
        .await
    }

    async fn fetch(
        &self,
        source: &PackageSource,
        display_name: &str,
        work_dir: &Path,
        tracker: &Tracker,
        cancel: &CancellationToken,
    ) -> Result<DownloadedPackage, ConversionError> {
        let directory = work_dir.join(DOWNLOAD_DIR);
        match source {
            PackageSource::Remote { url, store } => {
                self.downloader
                    .download(url, &directory, display_name, *store, cancel, |progress| {
                        tracker.progress(progress)
                    })
                    .await
            }
            PackageSource::Local { path, store } => copy_local(path, &directory, *store).await,
        }
    }
}

async fn copy_local(
    source: &Path,
    directory: &Path,
    store: Option<ThemeStore>,
) -> Result<DownloadedPackage, ConversionError> {
    fs::create_dir_all(directory)
        .await
        .map_err(|e| ConversionError::io("creating", directory, e))?;
    let name = source
        .file_name()
        .and_then(|name| download::sanitize_file_name(&name.to_string_lossy()))
        .unwrap_or_else(|| "package".to_string());
    let target = directory.join(name);
    fs::copy(source, &target)
        .await
        .map_err(|e| ConversionError::io("copying", source, e))?;
    let kind = download::infer_kind(&target, store).await?;
    log::info!("Copied {} into the working directory", source.display());
    Ok(DownloadedPackage { path: target, kind })
}

async fn unpack(package: &DownloadedPackage, root: &Path) -> Result<(), ConversionError> {
    match package.kind {
        PackageKind::Archive => {
            let summary = archive::extract_file(&package.path, root).await?;
            log::info!("Extracted {} files from {}", summary.files, package.path.display());
        }
        PackageKind::DefinitionFile => {
            fs::create_dir_all(root)
                .await
                .map_err(|e| ConversionError::io("creating", root, e))?;
            let name = definition_file_name(&package.path).await?;
            let target = root.join(name);
            fs::copy(&package.path, &target)
                .await
                .map_err(|e| ConversionError::io("copying", &package.path, e))?;
        }
    }
    Ok(())
}

/// Name for a bare definition file, adding an extension when the stored name
/// does not reveal the format.
async fn definition_file_name(path: &Path) -> Result<String, ConversionError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "theme".to_string());
    if ThemeFormat::from_path(Path::new(&name)).is_some() {
        return Ok(name);
    }
    let bytes = fs::read(path)
        .await
        .map_err(|e| ConversionError::io("reading", path, e))?;
    let text = String::from_utf8_lossy(&bytes);
    let extension = if parsers::strip_bom(&text).trim_start().starts_with('<') {
        "icls"
    } else {
        "json"
    };
    Ok(format!("{name}.{extension}"))
}

async fn remove_package(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        log::warn!("Failed to remove downloaded package {}: {e}", path.display());
    }
}

fn nested_target(archive: &Path) -> PathBuf {
    let mut name = archive.as_os_str().to_os_string();
    name.push(NESTED_ARCHIVE_SUFFIX);
    PathBuf::from(name)
}

/// Locates the definition, unpacking nested plugin archives when the
/// extracted tree alone does not contain one.
async fn locate_definition(
    root: &Path,
    store: Option<ThemeStore>,
) -> Result<DefinitionFile, ConversionError> {
    let not_found = match locator::locate(root, store) {
        Err(error @ ConversionError::DefinitionNotFound { .. }) => error,
        other => return other,
    };

    let nested = locator::nested_archives(root)?;
    if nested.is_empty() {
        return Err(not_found);
    }
    for archive in &nested {
        let target = nested_target(archive);
        match archive::extract_file(archive, &target).await {
            Ok(summary) => log::debug!(
                "Extracted nested archive {} ({} files)",
                archive.display(),
                summary.files
            ),
            Err(error @ ConversionError::PathEscape { .. }) => return Err(error),
            Err(error) => log::warn!("Skipping nested archive {}: {error}", archive.display()),
        }
    }
    locator::locate(root, store)
}

async fn read_definition(path: &Path, format: ThemeFormat) -> Result<String, ConversionError> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| ConversionError::io("reading", path, e))?;
    String::from_utf8(bytes).map_err(|e| ConversionError::malformed(format, e))
}

async fn parse_definition(
    definition: &DefinitionFile,
    root: &Path,
) -> Result<ParsedTheme, ConversionError> {
    let text = read_definition(&definition.path, definition.format).await?;
    match parsers::parse(definition.format, &text)? {
        ParsedTheme::VsCode(theme) => Ok(ParsedTheme::VsCode(
            resolve_includes(theme, &definition.path, root).await,
        )),
        ParsedTheme::JetBrainsJson(mut theme) => {
            if let Some(editor_scheme) = theme.editor_scheme.clone() {
                theme.companion = load_companion(root, &definition.path, &editor_scheme).await;
            }
            Ok(ParsedTheme::JetBrainsJson(theme))
        }
        scheme @ ParsedTheme::JetBrainsIcls(_) => Ok(scheme),
    }
}

/// Merges `include` bases underneath `theme`.
///
/// A base that is missing, outside the package or malformed is skipped with a
/// warning; the child alone is still a usable theme.
async fn resolve_includes(mut theme: VsCodeTheme, path: &Path, root: &Path) -> VsCodeTheme {
    let mut current = path.to_path_buf();
    for _ in 0..MAX_INCLUDE_DEPTH {
        let Some(include) = theme.include.take() else {
            return theme;
        };
        let base_path = current
            .parent()
            .unwrap_or(root)
            .join(include.replace('\\', "/"));
        if !locator::is_inside(root, &base_path) {
            log::warn!("Included theme {include} not found in package");
            return theme;
        }
        let base = match read_definition(&base_path, ThemeFormat::VsCode).await {
            Ok(text) => vscode::parse(&text),
            Err(error) => Err(error),
        };
        match base {
            Ok(base) => {
                log::debug!("Merged base theme {}", base_path.display());
                theme = theme.merge_base(base);
                current = base_path;
            }
            Err(error) => {
                log::warn!("Ignoring included theme {include}: {error}");
                return theme;
            }
        }
    }
    if theme.include.take().is_some() {
        log::warn!("Include chain of {} is deeper than {MAX_INCLUDE_DEPTH}", path.display());
    }
    theme
}

async fn load_companion(
    root: &Path,
    theme_file: &Path,
    editor_scheme: &str,
) -> Option<icls::IclsScheme> {
    let Some(path) = locator::find_companion_scheme(root, theme_file, editor_scheme) else {
        log::warn!("Editor scheme {editor_scheme} not found in package");
        return None;
    };
    let parsed = match read_definition(&path, ThemeFormat::JetBrainsIcls).await {
        Ok(text) => icls::parse(parsers::strip_bom(&text)),
        Err(error) => Err(error),
    };
    match parsed {
        Ok(scheme) => {
            log::debug!("Attached editor scheme {}", path.display());
            Some(scheme)
        }
        Err(error) => {
            log::warn!("Ignoring editor scheme {}: {error}", path.display());
            None
        }
    }
}
