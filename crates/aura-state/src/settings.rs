//! Durable storage for [`Settings`].

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use aura_core::Settings;

use crate::error::StateError;

pub trait SettingsStore: Send + Sync {
    /// Returns `None` when nothing has been saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] when stored settings exist but cannot be read.
    fn load(&self) -> Result<Option<Settings>, StateError>;

    /// # Errors
    ///
    /// Returns [`StateError`] when the settings cannot be written.
    fn save(&self, settings: &Settings) -> Result<(), StateError>;
}

/// Settings kept as one JSON object, `{ "theme": ..., "notifications": ... }`.
#[derive(Debug, Clone)]
pub struct JsonFileSettings {
    path: PathBuf,
}

impl JsonFileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::SettingsIo {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SettingsStore for JsonFileSettings {
    fn load(&self) -> Result<Option<Settings>, StateError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StateError::SettingsParse {
                path: self.path.display().to_string(),
                source,
            })
    }

    fn save(&self, settings: &Settings) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_string_pretty(settings).map_err(|source| {
            StateError::SettingsParse {
                path: self.path.display().to_string(),
                source,
            }
        })?;
        // Readers see either the old file or the new one, never a partial write.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, body).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))
    }
}

/// Process-lifetime settings, for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemorySettings {
    saved: Mutex<Option<Settings>>,
}

impl MemorySettings {
    #[must_use]
    pub fn with(settings: Settings) -> Self {
        Self {
            saved: Mutex::new(Some(settings)),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn load(&self) -> Result<Option<Settings>, StateError> {
        Ok(*self.saved.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn save(&self, settings: &Settings) -> Result<(), StateError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(*settings);
        Ok(())
    }
}
