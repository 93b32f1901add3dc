// Debounced autosave.
// A background task owns the timer. Form changes push the deadline out by the
// quiet period; once a save fires the controller stays "submitted" and ignores
// further changes until the next user interaction re-arms it. A timer save
// sends the form as of the last change it was told about, so an edit landing
// on the deadline gets a save of its own.

pub mod locks;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::api_client::ResumeApi;
use crate::errors::ClientError;
use crate::form::validation::{validate, ValidationErrors};
use crate::form::FormStore;
use crate::models::resume::ResumeForm;
pub use locks::PersistLocks;

pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(1000);

/// What the save indicator shows. `Failed` and `Invalid` stick until a save
/// succeeds so unsaved work is never hidden.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    Idle,
    Pending,
    Saving,
    Saved { revision: u64, at: DateTime<Utc> },
    Invalid(ValidationErrors),
    Failed { message: String, attempts: u32 },
}

impl SaveStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, SaveStatus::Invalid(_) | SaveStatus::Failed { .. })
    }

    pub fn label(&self) -> String {
        match self {
            SaveStatus::Idle => "up to date".to_string(),
            SaveStatus::Pending => "unsaved changes".to_string(),
            SaveStatus::Saving => "saving".to_string(),
            SaveStatus::Saved { at, .. } => format!("saved at {}", at.format("%H:%M:%S")),
            SaveStatus::Invalid(errors) => format!("not saved, fix: {errors}"),
            SaveStatus::Failed { message, attempts } => {
                format!("save failed ({attempts}x): {message}")
            }
        }
    }
}

enum Command {
    Change { snapshot: ResumeForm, revision: u64 },
    Activity,
    Flush(oneshot::Sender<Result<(), ClientError>>),
    Retry,
    Attach(String),
}

/// Handle to the autosave task for one form.
pub struct AutosaveController {
    tx: mpsc::UnboundedSender<Command>,
    form: Arc<Mutex<FormStore>>,
    status: watch::Receiver<SaveStatus>,
    preview: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl AutosaveController {
    /// Starts the task. The current form revision counts as already saved.
    pub fn spawn(
        api: Arc<dyn ResumeApi>,
        locks: PersistLocks,
        form: Arc<Mutex<FormStore>>,
        resume_id: Option<String>,
        quiet: Duration,
        cancel: CancellationToken,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(SaveStatus::Idle);
        let preview = Arc::new(Mutex::new(Vec::new()));
        let saved_revision = Some(form.lock().revision());

        let worker = Worker {
            api,
            locks,
            form: form.clone(),
            resume_id,
            quiet,
            submitted: false,
            notified: None,
            deadline: None,
            saved_revision,
            attempts: 0,
            status: status_tx,
            preview: preview.clone(),
            cancel,
        };
        let task = tokio::spawn(worker.run(rx));

        Self {
            tx,
            form,
            status,
            preview,
            task,
        }
    }

    /// A form value changed.
    pub fn notify_change(&self) {
        let (snapshot, revision) = {
            let store = self.form.lock();
            (store.snapshot(), store.revision())
        };
        self.send(Command::Change { snapshot, revision });
    }

    /// The user pressed a key or a pointer button.
    pub fn notify_activity(&self) {
        self.send(Command::Activity);
    }

    /// A user-driven edit: interaction followed by a change.
    pub fn touch(&self) {
        self.notify_activity();
        self.notify_change();
    }

    /// Saves now, skipping the quiet period.
    pub async fn flush(&self) -> Result<(), ClientError> {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Command::Flush(reply)).is_err() {
            return Err(ClientError::Cancelled);
        }
        done.await.unwrap_or(Err(ClientError::Cancelled))
    }

    /// Explicit retry after a failed save.
    pub fn retry(&self) {
        self.send(Command::Retry);
    }

    /// Assigns the resume id to a draft; pending changes are saved after the
    /// quiet period.
    pub fn attach(&self, resume_id: &str) {
        self.send(Command::Attach(resume_id.to_string()));
    }

    pub fn status(&self) -> SaveStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status.clone()
    }

    /// Page previews returned by the most recent successful save.
    pub fn preview_images(&self) -> Vec<String> {
        self.preview.lock().clone()
    }

    /// Stops the task and waits for it to exit. Pending changes are dropped;
    /// call `flush` first to keep them.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            warn!("Autosave task ended abnormally: {e}");
        }
    }

    fn send(&self, command: Command) {
        if self.tx.send(command).is_err() {
            debug!("Autosave task already stopped; dropping command");
        }
    }
}

/// Which form state a save sends.
#[derive(Clone, Copy)]
enum Source {
    /// The last state seen in a change notification (timer saves).
    Notified,
    /// Whatever the form holds now (flush, retry).
    Latest,
}

struct Worker {
    api: Arc<dyn ResumeApi>,
    locks: PersistLocks,
    form: Arc<Mutex<FormStore>>,
    resume_id: Option<String>,
    quiet: Duration,
    submitted: bool,
    /// Form state carried by the most recent change notification.
    notified: Option<(ResumeForm, u64)>,
    deadline: Option<Instant>,
    saved_revision: Option<u64>,
    attempts: u32,
    status: watch::Sender<SaveStatus>,
    preview: Arc<Mutex<Vec<String>>>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        loop {
            let deadline = self.deadline;
            let timer = async move {
                match deadline {
                    Some(at) => tokio::time::sleep_until(at).await,
                    None => std::future::pending::<()>().await,
                }
            };

            // Timer before commands: an edit arriving on the deadline must not
            // push out a save that is already due.
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Autosave cancelled");
                    break;
                }
                _ = timer => {
                    self.deadline = None;
                    // Errors already landed in the status channel.
                    let _ = self.save(Source::Notified).await;
                }
                command = rx.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => break,
                },
            }
        }
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Change { snapshot, revision } => {
                self.notified = Some((snapshot, revision));
                if !self.submitted {
                    self.schedule();
                }
            }
            Command::Activity => {
                if self.submitted {
                    self.submitted = false;
                    self.schedule();
                }
            }
            Command::Flush(reply) => {
                self.deadline = None;
                let result = self.save(Source::Latest).await;
                let _ = reply.send(result);
            }
            Command::Retry => {
                self.deadline = None;
                let _ = self.save(Source::Latest).await;
            }
            Command::Attach(id) => {
                info!("Autosave attached to resume {id}");
                self.resume_id = Some(id);
                self.submitted = false;
                if self.is_dirty() {
                    self.schedule();
                }
            }
        }
    }

    fn schedule(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
        if self.is_dirty() {
            self.progress(SaveStatus::Pending);
        }
    }

    fn is_dirty(&self) -> bool {
        self.saved_revision != Some(self.form.lock().revision())
    }

    /// Publishes a progress state without hiding a sticky error.
    fn progress(&self, status: SaveStatus) {
        self.status.send_if_modified(|current| {
            if current.is_error() || *current == status {
                return false;
            }
            *current = status;
            true
        });
    }

    async fn save(&mut self, source: Source) -> Result<(), ClientError> {
        let Some(id) = self.resume_id.clone() else {
            warn!("Autosave skipped: no active resume yet");
            self.progress(SaveStatus::Pending);
            return Err(ClientError::NoActiveResume);
        };
        self.submitted = true;

        let notified = self.notified.take();
        let (snapshot, revision) = match (source, notified) {
            (Source::Notified, Some(state)) => state,
            _ => {
                let store = self.form.lock();
                (store.snapshot(), store.revision())
            }
        };
        if self.saved_revision == Some(revision) && !self.status.borrow().is_error() {
            debug!("Autosave: revision {revision} already saved");
            return Ok(());
        }
        if let Err(errors) = validate(&snapshot) {
            info!("Autosave held back, form is invalid: {errors}");
            self.status.send_replace(SaveStatus::Invalid(errors.clone()));
            return Err(errors.into());
        }

        self.progress(SaveStatus::Saving);
        let lock = self.locks.for_resume(&id);
        let result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ClientError::Cancelled),
            result = async {
                let _guard = lock.lock().await;
                self.api.update_resume(&id, &snapshot).await
            } => result,
        };

        match result {
            Ok(doc) => {
                self.attempts = 0;
                {
                    let mut store = self.form.lock();
                    self.saved_revision = if store.apply_saved(doc.form, revision) {
                        Some(store.revision())
                    } else {
                        Some(revision)
                    };
                }
                if !doc.images.is_empty() {
                    *self.preview.lock() = doc.images;
                }
                info!("Saved resume {id} at revision {revision}");
                self.status.send_replace(SaveStatus::Saved {
                    revision,
                    at: Utc::now(),
                });
                Ok(())
            }
            Err(ClientError::Cancelled) => Err(ClientError::Cancelled),
            Err(e) => {
                self.attempts += 1;
                error!("Autosave of resume {id} failed (attempt {}): {e}", self.attempts);
                self.status.send_replace(SaveStatus::Failed {
                    message: e.to_string(),
                    attempts: self.attempts,
                });
                Err(e)
            }
        }
    }
}
