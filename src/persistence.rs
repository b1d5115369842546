//! Read-only source of a document's initial state.
//!
//! A freshly reset document asks its [`InitialStateSource`] for stored state
//! once, and only while it is still empty. Writing state back is the job of an
//! external persistence service.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use tracing::debug;

use crate::error::PersistenceError;
use crate::replication::StateSnapshot;

/// Fetches stored state for a document.
pub trait InitialStateSource: Send + Sync {
    /// Returns the stored state, or `None` when nothing is stored.
    fn fetch_initial_state(
        &self,
        document_id: &str,
    ) -> Result<Option<StateSnapshot>, PersistenceError>;
}

/// A source with nothing stored.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoInitialState;

impl InitialStateSource for NoInitialState {
    fn fetch_initial_state(
        &self,
        _document_id: &str,
    ) -> Result<Option<StateSnapshot>, PersistenceError> {
        Ok(None)
    }
}

/// Reads `<dir>/<document_id>.json` snapshots.
#[derive(Debug, Clone)]
pub struct JsonDirectorySource {
    dir: PathBuf,
}

impl JsonDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonDirectorySource { dir: dir.into() }
    }

    fn path_for(&self, document_id: &str) -> PathBuf {
        self.dir.join(format!("{document_id}.json"))
    }
}

impl InitialStateSource for JsonDirectorySource {
    fn fetch_initial_state(
        &self,
        document_id: &str,
    ) -> Result<Option<StateSnapshot>, PersistenceError> {
        let path = self.path_for(document_id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored state");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let snapshot = StateSnapshot::decode(&bytes)?;
        Ok(Some(snapshot))
    }
}
