//! Zip extraction for theme packages (`.zip`, `.jar`, `.vsix`).
//!
//! Every entry is resolved against the canonical extraction root before
//! anything is written for it. Entries that would land outside the root fail
//! the whole extraction with [`ConversionError::PathEscape`].

use std::path::{Component, Path, PathBuf};

use async_zip::base::read::stream::ZipFileReader;
use futures::io::{AsyncRead, BufReader};
use tokio::fs;
use tokio::io::AsyncReadExt;
use tokio_util::compat::{TokioAsyncReadCompatExt, TokioAsyncWriteCompatExt};

use crate::pipeline::ConversionError;

const ZIP_SIGNATURE: [u8; 4] = [b'P', b'K', 0x03, 0x04];

/// What an extraction produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub files: usize,
    pub directories: usize,
}

fn extraction_error(error: impl std::fmt::Display) -> ConversionError {
    ConversionError::Extraction(error.to_string())
}

fn escape(entry: &str) -> ConversionError {
    ConversionError::PathEscape {
        entry: entry.to_string(),
    }
}

/// Resolves an entry name to a path relative to the extraction root.
///
/// Backslashes count as separators. Absolute names, drive prefixes and `..`
/// climbing above the root are rejected.
pub fn entry_relative_path(entry: &str) -> Result<PathBuf, ConversionError> {
    let normalized = entry.replace('\\', "/");
    let mut chars = normalized.chars();
    let has_drive = matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(':')) if letter.is_ascii_alphabetic()
    );
    if normalized.starts_with('/') || has_drive {
        return Err(escape(entry));
    }

    let mut parts: Vec<&str> = Vec::new();
    for part in normalized.split('/') {
        match part {
            "" | "." => continue,
            ".." => {
                if parts.pop().is_none() {
                    return Err(escape(entry));
                }
            }
            other => parts.push(other),
        }
    }

    let relative: PathBuf = parts.iter().collect();
    // Anything that still is not a plain component is platform specific trickery.
    if relative
        .components()
        .any(|component| !matches!(component, Component::Normal(_)))
    {
        return Err(escape(entry));
    }
    Ok(relative)
}

/// Fails unless `path`, after resolving symlinks, lies inside `root`.
async fn ensure_contained(root: &Path, path: &Path, entry: &str) -> Result<(), ConversionError> {
    let resolved = fs::canonicalize(path)
        .await
        .map_err(|e| ConversionError::io("resolving", path, e))?;
    if resolved.starts_with(root) {
        Ok(())
    } else {
        Err(escape(entry))
    }
}

/// Extracts a zip stream into `destination`, creating it when missing.
pub async fn extract_zip<R>(
    reader: R,
    destination: &Path,
) -> Result<ExtractionSummary, ConversionError>
where
    R: AsyncRead + Unpin,
{
    fs::create_dir_all(destination)
        .await
        .map_err(|e| ConversionError::io("creating", destination, e))?;
    let root = fs::canonicalize(destination)
        .await
        .map_err(|e| ConversionError::io("resolving", destination, e))?;

    let mut summary = ExtractionSummary::default();
    let mut zip = ZipFileReader::new(BufReader::new(reader));
    while let Some(mut item) = zip.next_with_entry().await.map_err(extraction_error)? {
        let entry_reader = item.reader_mut();
        let entry = entry_reader.entry();
        let name = entry
            .filename()
            .as_str()
            .map_err(extraction_error)?
            .to_string();
        let is_dir = entry.dir().map_err(extraction_error)?;

        let relative = entry_relative_path(&name)?;
        let target = root.join(&relative);

        if is_dir {
            fs::create_dir_all(&target)
                .await
                .map_err(|e| ConversionError::io("creating", &target, e))?;
            ensure_contained(&root, &target, &name).await?;
            summary.directories += 1;
        } else {
            if relative.as_os_str().is_empty() {
                return Err(ConversionError::Extraction(format!(
                    "entry '{name}' has no file name"
                )));
            }
            let parent = target.parent().unwrap_or(&root);
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ConversionError::io("creating", parent, e))?;
            ensure_contained(&root, parent, &name).await?;

            let file = fs::File::create(&target)
                .await
                .map_err(|e| ConversionError::io("creating", &target, e))?;
            let mut writer = file.compat_write();
            futures::io::copy(entry_reader, &mut writer)
                .await
                .map_err(|e| ConversionError::io("writing", &target, e))?;
            summary.files += 1;
        }

        zip = item.skip().await.map_err(extraction_error)?;
    }

    log::debug!(
        "Extracted {} files and {} directories into {}",
        summary.files,
        summary.directories,
        root.display()
    );
    Ok(summary)
}

/// Extracts the archive stored at `archive` into `destination`.
pub async fn extract_file(
    archive: &Path,
    destination: &Path,
) -> Result<ExtractionSummary, ConversionError> {
    let file = fs::File::open(archive)
        .await
        .map_err(|e| ConversionError::io("opening", archive, e))?;
    extract_zip(file.compat(), destination).await
}

/// True when the file starts with a local zip header.
pub async fn has_zip_signature(path: &Path) -> Result<bool, ConversionError> {
    let mut file = fs::File::open(path)
        .await
        .map_err(|e| ConversionError::io("opening", path, e))?;
    let mut header = [0u8; 4];
    let mut filled = 0;
    while filled < header.len() {
        let read = file
            .read(&mut header[filled..])
            .await
            .map_err(|e| ConversionError::io("reading", path, e))?;
        if read == 0 {
            return Ok(false);
        }
        filled += read;
    }
    Ok(header == ZIP_SIGNATURE)
}
