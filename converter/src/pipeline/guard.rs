//! RAII guards owned by a running conversion.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tokio::fs;
use uuid::Uuid;

use super::errors::ConversionError;

/// Scheme ids with a conversion currently running in this process.
static IN_FLIGHT: Mutex<BTreeSet<String>> = Mutex::new(BTreeSet::new());

/// Registration of a scheme id in the in-flight registry.
///
/// Released when dropped, whichever way the conversion ended.
#[derive(Debug)]
pub struct InFlightGuard {
    scheme_id: String,
}

impl InFlightGuard {
    pub fn acquire(scheme_id: &str) -> Result<Self, ConversionError> {
        let mut running = IN_FLIGHT.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(scheme_id.to_string()) {
            return Err(ConversionError::AlreadyInProgress {
                scheme_id: scheme_id.to_string(),
            });
        }
        Ok(Self {
            scheme_id: scheme_id.to_string(),
        })
    }

    pub fn is_running(scheme_id: &str) -> bool {
        IN_FLIGHT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(scheme_id)
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        IN_FLIGHT
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.scheme_id);
    }
}

/// Private working directory `<root>/<scheme_id>-<uuid>` of one conversion.
///
/// Removed with everything in it when dropped.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    pub async fn create(root: &Path, scheme_id: &str) -> Result<Self, ConversionError> {
        let path = root.join(format!("{scheme_id}-{}", Uuid::new_v4()));
        fs::create_dir_all(&path)
            .await
            .map_err(|e| ConversionError::io("creating", &path, e))?;
        log::debug!("Created working directory {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => log::debug!("Removed working directory {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!(
                "Failed to remove working directory {}: {e}",
                self.path.display()
            ),
        }
    }
}
