//! Resume Service client: the single point of entry for every backend call.
//!
//! No other module talks HTTP. Sessions, the dashboard and the voice toolbar
//! all hold an `Arc<dyn ResumeApi>` so tests can swap in a fake.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::ClientError;
use crate::models::chat::{ChatRequest, ChatResponse, WireMessage};
use crate::models::gallery::{
    CreatedResume, ExampleSummary, PreviewImages, ResumeScore, ScoreRequest, SpeechRequest,
    Transcription,
};
use crate::models::resume::{ResumeDocument, ResumeForm};

pub const DEFAULT_BASE_URL: &str = "https://resumify-backend.onrender.com";
const RECORDING_FILE_NAME: &str = "recording.wav";

/// Everything the client needs from the Resume Service.
#[async_trait]
pub trait ResumeApi: Send + Sync {
    async fn list_resumes(&self) -> Result<Vec<ResumeDocument>, ClientError>;
    async fn create_resume(&self) -> Result<CreatedResume, ClientError>;
    /// Sends the full snapshot; the returned document is authoritative.
    async fn update_resume(&self, id: &str, form: &ResumeForm)
        -> Result<ResumeDocument, ClientError>;
    async fn delete_resume(&self, id: &str) -> Result<(), ClientError>;
    async fn duplicate_resume(&self, id: &str) -> Result<CreatedResume, ClientError>;
    async fn preview_resume(&self, id: &str) -> Result<PreviewImages, ClientError>;
    async fn download_resume(&self, id: &str) -> Result<Bytes, ClientError>;
    async fn score_resume(&self, id: &str) -> Result<ResumeScore, ClientError>;
    /// Returns the reply transcript; its last entry is the assistant's answer.
    async fn chat(
        &self,
        messages: Vec<WireMessage>,
        fields: &ResumeForm,
    ) -> Result<Vec<WireMessage>, ClientError>;
    async fn speech(&self, text: &str) -> Result<Bytes, ClientError>;
    async fn transcribe(&self, audio: Bytes) -> Result<String, ClientError>;
    async fn list_examples(&self) -> Result<Vec<ExampleSummary>, ClientError>;
    async fn preview_example(&self, id: &str) -> Result<PreviewImages, ClientError>;
    async fn use_example(&self, id: &str) -> Result<CreatedResume, ClientError>;
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorDetail {
    Text(String),
    Object { message: String },
}

/// reqwest-backed implementation against the real service.
#[derive(Clone)]
pub struct HttpResumeApi {
    client: Client,
    base_url: String,
}

impl HttpResumeApi {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Maps non-2xx responses to `ClientError::Api`, pulling the backend's
    /// message out of the body when it sent one.
    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!("Resume API returned {}: {}", status, body);
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|e| match (e.error, e.message) {
                (Some(ErrorDetail::Text(m)), _) | (Some(ErrorDetail::Object { message: m }), _) => {
                    Some(m)
                }
                (None, Some(m)) => Some(m),
                (None, None) => None,
            })
            .unwrap_or(body);
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn bytes(response: Response) -> Result<Bytes, ClientError> {
        let response = Self::check(response).await?;
        Ok(response.bytes().await?)
    }
}

#[async_trait]
impl ResumeApi for HttpResumeApi {
    async fn list_resumes(&self) -> Result<Vec<ResumeDocument>, ClientError> {
        debug!("GET /api/resumes");
        let response = self
            .client
            .get(self.url("/api/resumes"))
            .header("accept", "application/json")
            .send()
            .await?;
        Self::json(response).await
    }

    async fn create_resume(&self) -> Result<CreatedResume, ClientError> {
        debug!("POST /api/resume");
        let response = self
            .client
            .post(self.url("/api/resume"))
            .header("content-type", "application/json")
            .send()
            .await?;
        Self::json(response).await
    }

    async fn update_resume(
        &self,
        id: &str,
        form: &ResumeForm,
    ) -> Result<ResumeDocument, ClientError> {
        debug!("PUT /api/resume/{id}");
        let response = self
            .client
            .put(self.url(&format!("/api/resume/{id}")))
            .json(form)
            .send()
            .await?;
        Self::json(response).await
    }

    async fn delete_resume(&self, id: &str) -> Result<(), ClientError> {
        debug!("DELETE /api/resume/{id}");
        let response = self
            .client
            .delete(self.url(&format!("/api/resume/{id}")))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn duplicate_resume(&self, id: &str) -> Result<CreatedResume, ClientError> {
        debug!("POST /api/resume/duplicate/{id}");
        let response = self
            .client
            .post(self.url(&format!("/api/resume/duplicate/{id}")))
            .header("content-type", "application/json")
            .send()
            .await?;
        Self::json(response).await
    }

    async fn preview_resume(&self, id: &str) -> Result<PreviewImages, ClientError> {
        debug!("GET /api/resume/preview/{id}");
        let response = self
            .client
            .get(self.url(&format!("/api/resume/preview/{id}")))
            .send()
            .await?;
        Self::json(response).await
    }

    async fn download_resume(&self, id: &str) -> Result<Bytes, ClientError> {
        debug!("GET /api/resume/download/{id}");
        let response = self
            .client
            .get(self.url(&format!("/api/resume/download/{id}")))
            .send()
            .await?;
        Self::bytes(response).await
    }

    async fn score_resume(&self, id: &str) -> Result<ResumeScore, ClientError> {
        debug!("POST /api/score for {id}");
        let response = self
            .client
            .post(self.url("/api/score"))
            .json(&ScoreRequest { resume_id: id })
            .send()
            .await?;
        Self::json(response).await
    }

    async fn chat(
        &self,
        messages: Vec<WireMessage>,
        fields: &ResumeForm,
    ) -> Result<Vec<WireMessage>, ClientError> {
        debug!("POST /api/chat with {} messages", messages.len());
        let response = self
            .client
            .post(self.url("/api/chat"))
            .json(&ChatRequest { messages, fields })
            .send()
            .await?;
        let reply: ChatResponse = Self::json(response).await?;
        Ok(reply.messages)
    }

    async fn speech(&self, text: &str) -> Result<Bytes, ClientError> {
        debug!("POST /api/speech ({} chars)", text.len());
        let response = self
            .client
            .post(self.url("/api/speech"))
            .json(&SpeechRequest { text })
            .send()
            .await?;
        Self::bytes(response).await
    }

    async fn transcribe(&self, audio: Bytes) -> Result<String, ClientError> {
        debug!("POST /api/transcribe ({} bytes)", audio.len());
        let part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(RECORDING_FILE_NAME)
            .mime_str("audio/wav")?;
        let form = reqwest::multipart::Form::new().part("file", part);
        let response = self
            .client
            .post(self.url("/api/transcribe"))
            .multipart(form)
            .send()
            .await?;
        let body: Transcription = Self::json(response).await?;
        Ok(body.transcription)
    }

    async fn list_examples(&self) -> Result<Vec<ExampleSummary>, ClientError> {
        debug!("GET /api/examples");
        let response = self.client.get(self.url("/api/examples")).send().await?;
        Self::json(response).await
    }

    async fn preview_example(&self, id: &str) -> Result<PreviewImages, ClientError> {
        debug!("GET /api/example/preview/{id}");
        let response = self
            .client
            .get(self.url(&format!("/api/example/preview/{id}")))
            .send()
            .await?;
        Self::json(response).await
    }

    async fn use_example(&self, id: &str) -> Result<CreatedResume, ClientError> {
        debug!("POST /api/example/use/{id}");
        let response = self
            .client
            .post(self.url(&format!("/api/example/use/{id}")))
            .send()
            .await?;
        Self::json(response).await
    }
}
