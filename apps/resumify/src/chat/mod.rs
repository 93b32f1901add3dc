// Assistant chat panel: transcript, typing state, and the `<update>` block
// handling that lets a reply patch the resume form.

pub mod sanitize;
pub mod transcript_store;
pub mod update_block;

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api_client::ResumeApi;
use crate::errors::ClientError;
use crate::form::FormStore;
use crate::models::chat::{ChatMessage, Sender, WireMessage};
use sanitize::sanitize_display;
use transcript_store::TranscriptStore;
use update_block::{UpdateBlock, UPDATE_NOTICE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    Idle,
    /// A message was sent and the reply has not arrived; render a typing indicator.
    AwaitingReply,
}

/// Outcome of one exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub message: ChatMessage,
    /// Field paths written by the reply's update block.
    pub applied: Vec<String>,
    /// Why an update block was present but not applied.
    pub patch_error: Option<String>,
}

#[derive(Debug)]
struct Transcript {
    resume_id: Option<String>,
    messages: Vec<ChatMessage>,
    state: ChatState,
}

impl Transcript {
    fn push(&mut self, text: String, sender: Sender) -> ChatMessage {
        let now = Utc::now().timestamp_millis();
        let id = match self.messages.last() {
            Some(last) if last.id >= now => last.id + 1,
            _ => now,
        };
        let message = ChatMessage { id, text, sender };
        self.messages.push(message.clone());
        message
    }
}

pub struct ChatPanel {
    store: Option<TranscriptStore>,
    transcript: Mutex<Transcript>,
}

impl ChatPanel {
    /// Opens the panel for a resume, restoring its saved transcript.
    pub fn new(resume_id: Option<String>, store: Option<TranscriptStore>) -> Self {
        let messages = match (&store, &resume_id) {
            (Some(store), Some(id)) => store.load(id),
            _ => Vec::new(),
        };
        Self {
            store,
            transcript: Mutex::new(Transcript {
                resume_id,
                messages,
                state: ChatState::Idle,
            }),
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.lock().messages.clone()
    }

    pub fn state(&self) -> ChatState {
        self.transcript.lock().state
    }

    pub fn is_typing(&self) -> bool {
        self.state() == ChatState::AwaitingReply
    }

    /// Binds a draft panel to a freshly created resume and saves what it has.
    pub fn attach(&self, resume_id: &str) {
        self.transcript.lock().resume_id = Some(resume_id.to_string());
        self.persist();
    }

    /// Sends one user message and waits for the assistant.
    ///
    /// Blank input is ignored (`Ok(None)`, nothing sent). A reply carrying an
    /// update block is validated and applied to `form` before it is shown.
    pub async fn send_message(
        &self,
        text: &str,
        api: &dyn ResumeApi,
        form: &Mutex<FormStore>,
        cancel: &CancellationToken,
    ) -> Result<Option<ChatReply>, ClientError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let wire: Vec<WireMessage> = {
            let mut transcript = self.transcript.lock();
            if transcript.state == ChatState::AwaitingReply {
                return Err(ClientError::ChatBusy);
            }
            transcript.push(text.to_string(), Sender::User);
            transcript.state = ChatState::AwaitingReply;
            transcript.messages.iter().map(WireMessage::from).collect()
        };
        let fields = form.lock().snapshot();

        let result = tokio::select! {
            _ = cancel.cancelled() => Err(ClientError::Cancelled),
            result = api.chat(wire, &fields) => result,
        };

        let reply = match result {
            Ok(mut messages) => messages.pop(),
            Err(e) => {
                self.transcript.lock().state = ChatState::Idle;
                warn!("Chat request failed: {e}");
                return Err(e);
            }
        };
        let Some(reply) = reply else {
            self.transcript.lock().state = ChatState::Idle;
            return Err(ClientError::UnexpectedResponse(
                "chat reply contained no messages".to_string(),
            ));
        };
        debug!("Assistant replied with {} chars", reply.content.len());

        let (display, applied, patch_error) = process_reply(&reply.content, form);
        let message = {
            let mut transcript = self.transcript.lock();
            transcript.state = ChatState::Idle;
            transcript.push(display, Sender::Assistant)
        };
        self.persist();

        Ok(Some(ChatReply {
            message,
            applied,
            patch_error,
        }))
    }

    pub fn clear(&self) -> Result<(), ClientError> {
        let resume_id = {
            let mut transcript = self.transcript.lock();
            transcript.messages.clear();
            transcript.resume_id.clone()
        };
        if let (Some(store), Some(id)) = (&self.store, resume_id) {
            store.clear(&id)?;
        }
        Ok(())
    }

    /// Saves the transcript if the panel is bound to a resume. Failures are
    /// logged; losing chat history never blocks editing.
    pub fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let (resume_id, messages) = {
            let transcript = self.transcript.lock();
            (transcript.resume_id.clone(), transcript.messages.clone())
        };
        if let Some(id) = resume_id {
            if let Err(e) = store.save(&id, &messages) {
                warn!("Failed to save chat transcript for {id}: {e}");
            }
        }
    }
}

/// Turns raw assistant text into display text, applying any update block.
fn process_reply(text: &str, form: &Mutex<FormStore>) -> (String, Vec<String>, Option<String>) {
    let Some(block) = UpdateBlock::find(text) else {
        return (sanitize_display(text), Vec::new(), None);
    };

    let outcome = block
        .parse()
        .map_err(|e| e.to_string())
        .and_then(|patch| form.lock().apply_patch(&patch).map_err(|e| e.to_string()));

    match outcome {
        Ok(applied) => {
            info!("Assistant updated {} field(s): {}", applied.len(), applied.join(", "));
            (
                sanitize_display(&block.replace_with(UPDATE_NOTICE)),
                applied,
                None,
            )
        }
        Err(reason) => {
            warn!("Rejected assistant update: {reason}");
            let notice = format!("[Update could not be applied: {reason}]");
            (
                sanitize_display(&block.replace_with(&notice)),
                Vec::new(),
                Some(reason),
            )
        }
    }
}
