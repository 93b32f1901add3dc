use std::path::Path;

use bytes::Bytes;
use tracing::{debug, info};

use crate::errors::ClientError;
use crate::state::ClientState;

/// Text-to-speech and speech-to-text bindings. Audio devices are out of
/// scope; audio moves through files.
pub struct VoiceToolbar {
    state: ClientState,
}

impl VoiceToolbar {
    pub fn new(state: ClientState) -> Self {
        Self { state }
    }

    /// Synthesizes speech for `text`. Blank text is not sent.
    pub async fn speak(&self, text: &str) -> Result<Option<Bytes>, ClientError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        let audio = self.state.api.speech(text).await?;
        debug!("Received {} bytes of speech audio", audio.len());
        Ok(Some(audio))
    }

    /// Like `speak`, writing the audio to `dest`. Returns false for blank text.
    pub async fn speak_to_file(&self, text: &str, dest: &Path) -> Result<bool, ClientError> {
        let Some(audio) = self.speak(text).await? else {
            return Ok(false);
        };
        tokio::fs::write(dest, &audio).await?;
        info!("Wrote speech audio to {}", dest.display());
        Ok(true)
    }

    /// Uploads a WAV recording and returns its transcription.
    pub async fn transcribe_file(&self, path: &Path) -> Result<String, ClientError> {
        let audio = tokio::fs::read(path).await?;
        if audio.is_empty() {
            return Err(ClientError::UnexpectedResponse(format!(
                "{} is empty",
                path.display()
            )));
        }
        self.state.api.transcribe(Bytes::from(audio)).await
    }
}
