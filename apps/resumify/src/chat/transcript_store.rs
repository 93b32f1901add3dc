use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::models::chat::ChatMessage;

/// On-disk chat transcripts, one JSON file per resume id so conversations
/// about one resume never leak into another.
#[derive(Debug, Clone)]
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: data_dir.as_ref().join("chat"),
        }
    }

    /// Percent-encodes the id so distinct ids never share a file.
    pub fn path_for(&self, resume_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", urlencoding::encode(resume_id)))
    }

    /// Missing files load as an empty transcript; unreadable ones are logged
    /// and treated the same way.
    pub fn load(&self, resume_id: &str) -> Vec<ChatMessage> {
        let path = self.path_for(resume_id);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read transcript {}: {e}", path.display());
                return Vec::new();
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(messages) => messages,
            Err(e) => {
                warn!("Discarding corrupt transcript {}: {e}", path.display());
                Vec::new()
            }
        }
    }

    /// Writes through a temp file in the same directory so a crash never
    /// leaves a half-written transcript behind.
    pub fn save(&self, resume_id: &str, messages: &[ChatMessage]) -> Result<(), ClientError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(resume_id);
        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(&serde_json::to_vec(messages)?)?;
        file.persist(&path).map_err(|e| ClientError::Io(e.error))?;
        debug!("Saved {} chat messages to {}", messages.len(), path.display());
        Ok(())
    }

    pub fn clear(&self, resume_id: &str) -> Result<(), ClientError> {
        match fs::remove_file(self.path_for(resume_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
