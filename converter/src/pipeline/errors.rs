use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::common::errors::HttpError;
use crate::parsers::ThemeFormat;

/// Everything that can stop a conversion.
///
/// Errors are never swallowed inside the pipeline: each one ends the run in
/// [`ConversionState::Failed`](super::ConversionState::Failed) tagged with the
/// [`FailureStage`] that was active, and the working directory is removed.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// Download failed: connection error, timeout or a non-2xx response.
    #[error(transparent)]
    Network(#[from] HttpError),

    /// An archive entry would have been written outside the extraction root.
    #[error("Archive entry escapes the extraction directory: {entry}")]
    PathEscape { entry: String },

    /// The archive could not be read.
    #[error("Failed to extract archive: {0}")]
    Extraction(String),

    /// No theme-definition file was found in the extracted package.
    #[error("No theme definition found in {}", searched.display())]
    DefinitionNotFound { searched: PathBuf },

    /// The definition file is not valid for its format.
    #[error("Malformed {format} definition: {reason}")]
    MalformedDefinition { format: ThemeFormat, reason: String },

    /// Parsing succeeded but not a single usable color was found.
    #[error("Theme '{name}' contains no usable colors or token styles")]
    EmptyTheme { name: String },

    /// A color references a definition key that does not exist.
    #[error("Color references undefined definition '@{key}'")]
    DanglingReference { key: String },

    #[error("I/O error while {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Conversion was cancelled")]
    Cancelled,

    #[error("A conversion for '{scheme_id}' is already running")]
    AlreadyInProgress { scheme_id: String },
}

impl ConversionError {
    pub fn io(operation: &str, path: &Path, source: std::io::Error) -> Self {
        ConversionError::Io {
            operation: format!("{operation} {}", path.display()),
            source,
        }
    }

    pub fn malformed(format: ThemeFormat, reason: impl fmt::Display) -> Self {
        ConversionError::MalformedDefinition {
            format,
            reason: reason.to_string(),
        }
    }

    /// Stage this error belongs to regardless of where it surfaced.
    ///
    /// `None` for errors that can happen in any stage; the orchestrator then
    /// uses the stage that was active.
    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            ConversionError::Network(_) => Some(FailureStage::Download),
            ConversionError::PathEscape { .. } | ConversionError::Extraction(_) => {
                Some(FailureStage::Extraction)
            }
            ConversionError::DefinitionNotFound { .. } => Some(FailureStage::FileNotFound),
            ConversionError::MalformedDefinition { .. } => Some(FailureStage::Parse),
            ConversionError::EmptyTheme { .. } => Some(FailureStage::Normalize),
            ConversionError::DanglingReference { .. } => Some(FailureStage::Emit),
            ConversionError::Io { .. }
            | ConversionError::Cancelled
            | ConversionError::AlreadyInProgress { .. } => None,
        }
    }

    /// Human readable explanation shown by front ends.
    pub fn user_message(&self) -> String {
        match self {
            ConversionError::Network(HttpError::Status { status, .. }) => format!(
                "The theme store answered with HTTP {status}.\n\
                The package may have been removed or the URL is wrong."
            ),
            ConversionError::Network(HttpError::Timeout { seconds, .. }) => format!(
                "The download timed out after {seconds} seconds.\n\
                Check your connection or raise http.timeout_secs."
            ),
            ConversionError::Network(other) => {
                format!("The theme package could not be downloaded.\n\n{other}")
            }
            ConversionError::PathEscape { entry } => format!(
                "The archive was rejected because entry '{entry}' points outside of it.\n\
                The package may be corrupted or malicious."
            ),
            ConversionError::Extraction(reason) => {
                format!("The downloaded package is not a readable archive.\n\n{reason}")
            }
            ConversionError::DefinitionNotFound { .. } => {
                "The package does not contain a supported theme file \
                (*.theme.json, *.icls or a VS Code theme JSON)."
                    .to_string()
            }
            ConversionError::MalformedDefinition { format, reason } => {
                format!("The {format} theme file could not be parsed.\n\n{reason}")
            }
            ConversionError::EmptyTheme { name } => format!(
                "Theme '{name}' was parsed but contains no colors that could be converted."
            ),
            ConversionError::DanglingReference { key } => {
                format!("Internal conversion error: color '@{key}' is not defined.")
            }
            ConversionError::Io { .. } => format!("A file operation failed.\n\n{self}"),
            ConversionError::Cancelled => "The conversion was cancelled.".to_string(),
            ConversionError::AlreadyInProgress { scheme_id } => {
                format!("Theme '{scheme_id}' is already being converted. Wait for it to finish.")
            }
        }
    }
}

/// Pipeline stage a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureStage {
    Download,
    Extraction,
    FileNotFound,
    Parse,
    Normalize,
    Emit,
}

impl FailureStage {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureStage::Download => "download",
            FailureStage::Extraction => "extraction",
            FailureStage::FileNotFound => "file-not-found",
            FailureStage::Parse => "parse",
            FailureStage::Normalize => "normalize",
            FailureStage::Emit => "emit",
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
