use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::resume::ResumeForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Assistant,
}

impl Sender {
    /// Role name used by the chat endpoint.
    pub fn role(&self) -> &'static str {
        match self {
            Sender::User => "user",
            Sender::Assistant => "assistant",
        }
    }
}

/// One transcript entry. `id` is the creation time in epoch milliseconds and
/// doubles as the sort key and display timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub text: String,
    pub sender: Sender,
}

impl ChatMessage {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: String,
    pub content: String,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.sender.role().to_string(),
            content: message.text.clone(),
        }
    }
}

/// Body of `POST /api/chat`: the whole transcript plus the live form.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: Vec<WireMessage>,
    pub fields: &'a ResumeForm,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub messages: Vec<WireMessage>,
}
