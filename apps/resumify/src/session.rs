// One open resume: the form, its autosave and its chat panel, with an explicit
// lifetime. Created on entering the editor, closed on leaving it.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::info;

use crate::autosave::{AutosaveController, SaveStatus};
use crate::chat::{ChatPanel, ChatReply};
use crate::errors::ClientError;
use crate::form::{Collection, FormStore};
use crate::models::resume::ResumeForm;
use crate::state::ClientState;

pub struct ResumeSession {
    state: ClientState,
    resume_id: Option<String>,
    form: Arc<Mutex<FormStore>>,
    autosave: AutosaveController,
    chat: ChatPanel,
    cancel: CancellationToken,
    // Cancels background work if the session is dropped without `close`.
    _cancel_on_drop: DropGuard,
}

impl ResumeSession {
    /// Loads the resume's current snapshot and starts editing it.
    pub async fn open(state: &ClientState, resume_id: &str) -> Result<Self, ClientError> {
        let document = state
            .api
            .list_resumes()
            .await?
            .into_iter()
            .find(|doc| doc.id == resume_id)
            .ok_or_else(|| ClientError::NotFound(format!("Resume {resume_id} not found")))?;
        info!("Opened resume {resume_id}");
        Ok(Self::start(state, Some(resume_id.to_string()), document.form))
    }

    /// Creates a resume on the backend and opens it.
    pub async fn create(state: &ClientState) -> Result<Self, ClientError> {
        let created = state.api.create_resume().await?;
        info!("Created resume {}", created.id);
        Self::open(state, &created.id).await
    }

    /// A session with no backing resume yet. Edits are held until `attach`.
    pub fn draft(state: &ClientState) -> Self {
        Self::start(state, None, ResumeForm::default())
    }

    fn start(state: &ClientState, resume_id: Option<String>, form: ResumeForm) -> Self {
        let form = Arc::new(Mutex::new(FormStore::new(form)));
        let cancel = CancellationToken::new();
        let autosave = AutosaveController::spawn(
            state.api.clone(),
            state.persist_locks.clone(),
            form.clone(),
            resume_id.clone(),
            state.autosave_quiet,
            cancel.child_token(),
        );
        let chat = ChatPanel::new(resume_id.clone(), state.transcripts.clone());
        Self {
            state: state.clone(),
            resume_id,
            form,
            autosave,
            chat,
            _cancel_on_drop: cancel.clone().drop_guard(),
            cancel,
        }
    }

    pub fn resume_id(&self) -> Option<&str> {
        self.resume_id.as_deref()
    }

    pub fn snapshot(&self) -> ResumeForm {
        self.form.lock().snapshot()
    }

    /// Read access to the store (expansion state, revision).
    pub fn with_form<R>(&self, f: impl FnOnce(&FormStore) -> R) -> R {
        f(&self.form.lock())
    }

    pub fn get(&self, path: &str) -> Result<Value, ClientError> {
        Ok(self.form.lock().get(path)?)
    }

    pub fn set(&self, path: &str, value: Value) -> Result<(), ClientError> {
        self.form.lock().set(path, value)?;
        self.autosave.touch();
        Ok(())
    }

    pub fn append(&self, collection: Collection) -> String {
        let id = self.form.lock().append(collection);
        self.autosave.touch();
        id
    }

    pub fn remove(&self, collection: Collection, index: usize) -> Result<String, ClientError> {
        let id = self.form.lock().remove(collection, index)?;
        self.autosave.touch();
        Ok(id)
    }

    /// UI-only state; never triggers a save.
    pub fn toggle_expanded(&self, id: &str) -> bool {
        self.form.lock().toggle_expanded(id)
    }

    /// Keypress or pointer-down anywhere in the editor.
    pub fn notify_activity(&self) {
        self.autosave.notify_activity();
    }

    /// Sends a chat message. Field writes carried by the reply count as edits
    /// and go through autosave like manual ones.
    pub async fn send_chat(&self, text: &str) -> Result<Option<ChatReply>, ClientError> {
        self.autosave.notify_activity();
        let reply = self
            .chat
            .send_message(text, self.state.api.as_ref(), &self.form, &self.cancel)
            .await?;
        if reply.as_ref().is_some_and(|r| !r.applied.is_empty()) {
            self.autosave.touch();
        }
        Ok(reply)
    }

    pub fn chat(&self) -> &ChatPanel {
        &self.chat
    }

    pub fn save_status(&self) -> SaveStatus {
        self.autosave.status()
    }

    pub fn subscribe_save_status(&self) -> watch::Receiver<SaveStatus> {
        self.autosave.subscribe()
    }

    /// Saves now instead of waiting for the quiet period.
    pub async fn save(&self) -> Result<(), ClientError> {
        self.autosave.flush().await
    }

    pub fn retry_save(&self) {
        self.autosave.retry();
    }

    pub fn preview_images(&self) -> Vec<String> {
        self.autosave.preview_images()
    }

    /// Binds a draft to a resume created after editing started.
    pub fn attach(&mut self, resume_id: &str) {
        self.resume_id = Some(resume_id.to_string());
        self.autosave.attach(resume_id);
        self.chat.attach(resume_id);
    }

    /// Flushes unsaved edits, stores the transcript and stops background work.
    /// Returns the result of the final save.
    pub async fn close(self) -> Result<(), ClientError> {
        let ResumeSession {
            resume_id,
            autosave,
            chat,
            cancel,
            _cancel_on_drop,
            ..
        } = self;

        let flushed = match resume_id {
            Some(_) => autosave.flush().await,
            None => Ok(()),
        };
        chat.persist();
        cancel.cancel();
        autosave.shutdown().await;
        if let Some(id) = &resume_id {
            info!("Closed resume {id}");
        }
        flushed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeApi;
    use serde_json::json;
    use std::time::Duration;

    fn state_for(api: Arc<FakeApi>) -> ClientState {
        ClientState::with_api(api, Duration::from_millis(1000))
    }

    fn seeded() -> (Arc<FakeApi>, ClientState) {
        let api = Arc::new(FakeApi::with_resume(
            "r1",
            ResumeForm {
                first_name: "Ada".to_string(),
                ..Default::default()
            },
        ));
        let state = state_for(api.clone());
        (api, state)
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_loads_snapshot() {
        let (_, state) = seeded();
        let session = ResumeSession::open(&state, "r1").await.unwrap();
        assert_eq!(session.snapshot().first_name, "Ada");
        assert_eq!(session.resume_id(), Some("r1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_unknown_resume() {
        let (_, state) = seeded();
        assert!(matches!(
            ResumeSession::open(&state, "missing").await,
            Err(ClientError::NotFound(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reload_without_edits_is_identical() {
        let (api, state) = seeded();
        let first = ResumeSession::open(&state, "r1").await.unwrap();
        let before = first.snapshot();
        tokio::time::sleep(Duration::from_secs(5)).await;
        first.close().await.unwrap();

        let second = ResumeSession::open(&state, "r1").await.unwrap();
        assert_eq!(second.snapshot(), before);
        assert_eq!(api.update_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edits_are_autosaved() {
        let (api, state) = seeded();
        let session = ResumeSession::open(&state, "r1").await.unwrap();
        session.set("lastName", json!("Lovelace")).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.full_name(), "Ada Lovelace");
        assert!(matches!(session.save_status(), SaveStatus::Saved { .. }));
        assert!(!session.preview_images().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_flushes_pending_edit() {
        let (api, state) = seeded();
        let session = ResumeSession::open(&state, "r1").await.unwrap();
        session.set("city", json!("London")).unwrap();
        session.close().await.unwrap();
        assert_eq!(api.updates()[0].1.city, "London");
    }

    #[tokio::test(start_paused = true)]
    async fn test_chat_update_is_autosaved() {
        let (api, state) = seeded();
        api.reply_with("Updated. <update>{\"wantedJobTitle\":\"Staff Engineer\"}</update>");
        let session = ResumeSession::open(&state, "r1").await.unwrap();

        let reply = session.send_chat("Make me staff").await.unwrap().unwrap();
        assert_eq!(reply.applied, vec!["wantedJobTitle"]);
        tokio::time::sleep(Duration::from_millis(1500)).await;

        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].1.wanted_job_title, "Staff Engineer");
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_discards_expansion() {
        let (_, state) = seeded();
        let session = ResumeSession::open(&state, "r1").await.unwrap();
        let id = session.append(Collection::Education);
        assert!(session.with_form(|f| f.is_expanded(&id)));
        let removed = session.remove(Collection::Education, 0).unwrap();
        assert_eq!(removed, id);
        assert!(!session.with_form(|f| f.is_expanded(&id)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_draft_saves_after_attach() {
        let api = Arc::new(FakeApi::default());
        let state = state_for(api.clone());
        let mut session = ResumeSession::draft(&state);
        session.set("firstName", json!("Grace")).unwrap();
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(api.update_count(), 0);

        let created = state.api.create_resume().await.unwrap();
        session.attach(&created.id);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let updates = api.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, created.id);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_session_cancels_autosave() {
        let (api, state) = seeded();
        let session = ResumeSession::open(&state, "r1").await.unwrap();
        session.set("city", json!("Paris")).unwrap();
        drop(session);
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(api.update_count(), 0);
    }
}
