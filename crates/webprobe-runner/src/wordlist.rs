//! Payload wordlists, cached by path for the lifetime of an engine

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

/// Path-keyed wordlist cache. `load` reads once; `unload` evicts.
#[derive(Debug, Default)]
pub struct WordlistCache {
    lists: Mutex<HashMap<PathBuf, Arc<[String]>>>,
}

impl WordlistCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines of `path`, trimmed, blank lines dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or holds no payloads.
    pub fn load(&self, path: &Path) -> Result<Arc<[String]>, WordlistError> {
        if let Some(words) = self.guard().get(path) {
            return Ok(Arc::clone(words));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| WordlistError::Io(path.to_path_buf(), e.to_string()))?;
        let words: Arc<[String]> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        if words.is_empty() {
            return Err(WordlistError::Empty(path.to_path_buf()));
        }

        tracing::debug!("loaded {} payloads from {}", words.len(), path.display());
        self.guard()
            .insert(path.to_path_buf(), Arc::clone(&words));
        Ok(words)
    }

    /// Evict `path`. Returns whether it was cached.
    pub fn unload(&self, path: &Path) -> bool {
        self.guard().remove(path).is_some()
    }

    #[must_use]
    pub fn is_loaded(&self, path: &Path) -> bool {
        self.guard().contains_key(path)
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<[String]>>> {
        self.lists.lock()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WordlistError {
    #[error("Cannot read wordlist {0}: {1}")]
    Io(PathBuf, String),
    #[error("Wordlist {0} has no payloads")]
    Empty(PathBuf),
}
