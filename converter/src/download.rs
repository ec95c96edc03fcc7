//! Fetching theme packages over HTTP.
//!
//! The body is streamed to disk chunk by chunk. Cancellation is checked
//! between chunks; on cancellation or any error the partial file is removed.

use std::path::{Path, PathBuf};

use reqwest::Url;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::archive;
use crate::common::{HttpError, HttpSettings, build_client};
use crate::locator::ThemeStore;
use crate::pipeline::ConversionError;

const MAX_FILE_NAME_LEN: usize = 100;

/// How a package must be processed before locating the definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageKind {
    /// `.zip`, `.jar` or `.vsix`; extracted first.
    Archive,
    /// A bare `.json`, `.icls` or `.xml` definition.
    DefinitionFile,
}

/// A package stored in the working directory of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedPackage {
    pub path: PathBuf,
    pub kind: PackageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub received: u64,
    /// From `Content-Length`, when the server sent one.
    pub total: Option<u64>,
}

impl DownloadProgress {
    pub fn percent(&self) -> Option<u8> {
        let total = self.total.filter(|total| *total > 0)?;
        Some((self.received.min(total) * 100 / total) as u8)
    }
}

/// Extracts the file name from a `Content-Disposition` header.
///
/// `filename*` (RFC 5987) wins over `filename`.
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for parameter in header.split(';').map(str::trim) {
        let Some((key, value)) = parameter.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let encoded = value.split_once("''").map_or(value, |(_, name)| name);
                extended = urlencoding::decode(encoded).ok().map(|name| name.into_owned());
            }
            "filename" => plain = Some(value.to_string()),
            _ => {}
        }
    }
    extended
        .or(plain)
        .filter(|name| !name.trim().is_empty())
}

/// Last path segment of `url`, percent-decoded.
pub fn filename_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.rev().find(|segment| !segment.is_empty())?;
    let decoded = urlencoding::decode(segment).ok()?;
    Some(decoded.into_owned())
}

/// Reduces a server-provided name to `[A-Za-z0-9._-]`, never a hidden file.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();
    if cleaned.trim_matches('_').is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn fallback_extension(store: Option<ThemeStore>) -> &'static str {
    match store {
        Some(ThemeStore::VsCode) => "vsix",
        Some(ThemeStore::JetBrains) => "zip",
        None => "bin",
    }
}

/// Decides whether a stored package needs extraction.
///
/// The extension decides when it is known; otherwise a zip signature, then
/// the store (both stores ship archives).
pub async fn infer_kind(
    path: &Path,
    store: Option<ThemeStore>,
) -> Result<PackageKind, ConversionError> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "zip" | "jar" | "vsix" => return Ok(PackageKind::Archive),
        "json" | "jsonc" | "icls" | "xml" => return Ok(PackageKind::DefinitionFile),
        _ => {}
    }
    if archive::has_zip_signature(path).await? || store.is_some() {
        Ok(PackageKind::Archive)
    } else {
        Ok(PackageKind::DefinitionFile)
    }
}

pub struct Downloader {
    client: reqwest::Client,
    settings: HttpSettings,
}

impl Downloader {
    pub fn new(settings: HttpSettings) -> Result<Self, HttpError> {
        let client = build_client(&settings)?;
        Ok(Self { client, settings })
    }

    /// Downloads `url` into `directory`.
    ///
    /// The file is named after `Content-Disposition`, then the URL, then
    /// `fallback_name` with a store specific extension. `on_progress` is
    /// called after every chunk.
    pub async fn download<F>(
        &self,
        url: &str,
        directory: &Path,
        fallback_name: &str,
        store: Option<ThemeStore>,
        cancel: &CancellationToken,
        mut on_progress: F,
    ) -> Result<DownloadedPackage, ConversionError>
    where
        F: FnMut(DownloadProgress),
    {
        let timeout = self.settings.timeout_secs;
        log::info!("Downloading {url}");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ConversionError::Cancelled),
            response = self.client.get(url).send() => {
                response.map_err(|e| HttpError::from_reqwest(url, timeout, e))?
            }
        };

        let status = response.status();
        if !status.is_success() {
            return Err(HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .or_else(|| filename_from_url(response.url().as_str()))
            .and_then(|name| sanitize_file_name(&name))
            .unwrap_or_else(|| {
                let base = sanitize_file_name(fallback_name).unwrap_or_else(|| "theme".to_string());
                format!("{base}.{}", fallback_extension(store))
            });

        fs::create_dir_all(directory)
            .await
            .map_err(|e| ConversionError::io("creating", directory, e))?;
        let path = directory.join(&file_name);
        let mut file = fs::File::create(&path)
            .await
            .map_err(|e| ConversionError::io("creating", &path, e))?;

        let total = response.content_length();
        let mut response = response;
        let mut received: u64 = 0;
        let transfer = async {
            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ConversionError::Cancelled),
                    chunk = response.chunk() => {
                        chunk.map_err(|e| HttpError::from_reqwest(url, timeout, e))?
                    }
                };
                let Some(chunk) = chunk else {
                    break;
                };
                file.write_all(&chunk)
                    .await
                    .map_err(|e| ConversionError::io("writing", &path, e))?;
                received += chunk.len() as u64;
                on_progress(DownloadProgress { received, total });
            }
            file.flush()
                .await
                .map_err(|e| ConversionError::io("flushing", &path, e))?;
            Ok::<(), ConversionError>(())
        }
        .await;

        if let Err(error) = transfer {
            drop(file);
            if let Err(cleanup) = fs::remove_file(&path).await {
                log::warn!("Failed to remove partial download {}: {cleanup}", path.display());
            }
            log::warn!("Download of {url} aborted: {error}");
            return Err(error);
        }

        let kind = infer_kind(&path, store).await?;
        log::info!("Downloaded {received} bytes to {} ({kind:?})", path.display());
        Ok(DownloadedPackage { path, kind })
    }
}
