//! In-memory `ResumeApi` for unit tests: records every call and lets tests
//! script replies, failures and slow responses.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::api_client::ResumeApi;
use crate::errors::ClientError;
use crate::models::chat::WireMessage;
use crate::models::gallery::{CreatedResume, ExampleSummary, PreviewImages, ResumeScore};
use crate::models::resume::{ResumeDocument, ResumeForm};

pub struct FakeApi {
    resumes: Mutex<HashMap<String, ResumeDocument>>,
    updates: Mutex<Vec<(String, ResumeForm)>>,
    chat_requests: Mutex<Vec<(Vec<WireMessage>, ResumeForm)>>,
    reply: Mutex<String>,
    update_delay: Mutex<Option<Duration>>,
    fail_updates: AtomicBool,
    fail_chat: AtomicBool,
    chat_held: AtomicBool,
    chat_release: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_id: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            resumes: Mutex::new(HashMap::new()),
            updates: Mutex::new(Vec::new()),
            chat_requests: Mutex::new(Vec::new()),
            reply: Mutex::new("Happy to help.".to_string()),
            update_delay: Mutex::new(None),
            fail_updates: AtomicBool::new(false),
            fail_chat: AtomicBool::new(false),
            chat_held: AtomicBool::new(false),
            chat_release: Notify::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            next_id: AtomicUsize::new(1),
        }
    }
}

impl FakeApi {
    pub fn with_resume(id: &str, form: ResumeForm) -> Self {
        let api = Self::default();
        api.resumes.lock().insert(
            id.to_string(),
            ResumeDocument {
                id: id.to_string(),
                form,
                ..Default::default()
            },
        );
        api
    }

    pub fn updates(&self) -> Vec<(String, ResumeForm)> {
        self.updates.lock().clone()
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().len()
    }

    pub fn chat_calls(&self) -> usize {
        self.chat_requests.lock().len()
    }

    pub fn last_chat_request(&self) -> Option<(Vec<WireMessage>, ResumeForm)> {
        self.chat_requests.lock().last().cloned()
    }

    pub fn reply_with(&self, text: &str) {
        *self.reply.lock() = text.to_string();
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn fail_chat(&self, fail: bool) {
        self.fail_chat.store(fail, Ordering::SeqCst);
    }

    pub fn delay_updates(&self, delay: Duration) {
        *self.update_delay.lock() = Some(delay);
    }

    pub fn max_concurrent_updates(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Chat calls block until `release_chat`.
    pub fn hold_chat(&self) {
        self.chat_held.store(true, Ordering::SeqCst);
    }

    pub fn release_chat(&self) {
        self.chat_held.store(false, Ordering::SeqCst);
        self.chat_release.notify_waiters();
        self.chat_release.notify_one();
    }

    fn server_error() -> ClientError {
        ClientError::Api {
            status: 500,
            message: "internal error".to_string(),
        }
    }

    fn fresh_id(&self) -> String {
        format!("r{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

#[async_trait]
impl ResumeApi for FakeApi {
    async fn list_resumes(&self) -> Result<Vec<ResumeDocument>, ClientError> {
        Ok(self.resumes.lock().values().cloned().collect())
    }

    async fn create_resume(&self) -> Result<CreatedResume, ClientError> {
        let id = self.fresh_id();
        self.resumes.lock().insert(
            id.clone(),
            ResumeDocument {
                id: id.clone(),
                ..Default::default()
            },
        );
        Ok(CreatedResume { id })
    }

    async fn update_resume(
        &self,
        id: &str,
        form: &ResumeForm,
    ) -> Result<ResumeDocument, ClientError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let delay = *self.update_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.updates.lock().push((id.to_string(), form.clone()));
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(Self::server_error());
        }
        let doc = ResumeDocument {
            id: id.to_string(),
            form: form.clone(),
            images: vec!["cGFnZQ==".to_string()],
            ..Default::default()
        };
        self.resumes.lock().insert(id.to_string(), doc.clone());
        Ok(doc)
    }

    async fn delete_resume(&self, id: &str) -> Result<(), ClientError> {
        self.resumes
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ClientError::Api {
                status: 404,
                message: "Resume not found".to_string(),
            })
    }

    async fn duplicate_resume(&self, id: &str) -> Result<CreatedResume, ClientError> {
        let original = self.resumes.lock().get(id).cloned();
        let mut copy = original.ok_or_else(|| ClientError::Api {
            status: 404,
            message: "Resume not found".to_string(),
        })?;
        copy.id = self.fresh_id();
        let id = copy.id.clone();
        self.resumes.lock().insert(id.clone(), copy);
        Ok(CreatedResume { id })
    }

    async fn preview_resume(&self, id: &str) -> Result<PreviewImages, ClientError> {
        if id == "no-preview" {
            return Err(Self::server_error());
        }
        Ok(PreviewImages {
            images: vec!["cGFnZSAx".to_string(), "cGFnZSAy".to_string()],
        })
    }

    async fn download_resume(&self, _id: &str) -> Result<Bytes, ClientError> {
        Ok(Bytes::from_static(b"%PDF-1.4 fake"))
    }

    async fn score_resume(&self, id: &str) -> Result<ResumeScore, ClientError> {
        if id == "unscored" {
            return Err(Self::server_error());
        }
        Ok(ResumeScore { score: 72.5 })
    }

    async fn chat(
        &self,
        messages: Vec<WireMessage>,
        fields: &ResumeForm,
    ) -> Result<Vec<WireMessage>, ClientError> {
        self.chat_requests
            .lock()
            .push((messages.clone(), fields.clone()));
        if self.chat_held.load(Ordering::SeqCst) {
            self.chat_release.notified().await;
        }
        if self.fail_chat.load(Ordering::SeqCst) {
            return Err(Self::server_error());
        }
        let mut reply = messages;
        reply.push(WireMessage {
            role: "assistant".to_string(),
            content: self.reply.lock().clone(),
        });
        Ok(reply)
    }

    async fn speech(&self, text: &str) -> Result<Bytes, ClientError> {
        Ok(Bytes::from(format!("audio:{text}")))
    }

    async fn transcribe(&self, audio: Bytes) -> Result<String, ClientError> {
        Ok(format!("{} bytes of speech", audio.len()))
    }

    async fn list_examples(&self) -> Result<Vec<ExampleSummary>, ClientError> {
        Ok(vec![ExampleSummary {
            id: "ex1".to_string(),
            title: "Data Scientist".to_string(),
        }])
    }

    async fn preview_example(&self, _id: &str) -> Result<PreviewImages, ClientError> {
        Ok(PreviewImages::default())
    }

    async fn use_example(&self, _id: &str) -> Result<CreatedResume, ClientError> {
        self.create_resume().await
    }
}
