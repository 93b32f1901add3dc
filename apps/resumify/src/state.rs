use std::sync::Arc;
use std::time::Duration;

use crate::api_client::{HttpResumeApi, ResumeApi};
use crate::autosave::PersistLocks;
use crate::chat::transcript_store::TranscriptStore;
use crate::config::Config;
use crate::errors::ClientError;

/// Shared client state injected into sessions, the dashboard and the voice
/// toolbar. Cheap to clone.
#[derive(Clone)]
pub struct ClientState {
    pub api: Arc<dyn ResumeApi>,
    /// Serializes saves per resume across every open session.
    pub persist_locks: PersistLocks,
    /// Chat transcripts; `None` keeps chat history in memory only.
    pub transcripts: Option<TranscriptStore>,
    pub autosave_quiet: Duration,
}

impl ClientState {
    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        let api = HttpResumeApi::new(config.api_url.clone(), config.http_timeout)?;
        Ok(Self {
            api: Arc::new(api),
            persist_locks: PersistLocks::default(),
            transcripts: Some(TranscriptStore::new(&config.data_dir)),
            autosave_quiet: config.autosave_quiet,
        })
    }

    /// State around an arbitrary backend, with no transcript persistence.
    pub fn with_api(api: Arc<dyn ResumeApi>, autosave_quiet: Duration) -> Self {
        Self {
            api,
            persist_locks: PersistLocks::default(),
            transcripts: None,
            autosave_quiet,
        }
    }
}
