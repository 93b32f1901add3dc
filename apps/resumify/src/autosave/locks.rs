use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;

/// One async mutex per resume id, shared by every session of a client, so
/// saves to the same resume go out one at a time.
#[derive(Clone, Default)]
pub struct PersistLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl PersistLocks {
    pub fn for_resume(&self, resume_id: &str) -> Arc<AsyncMutex<()>> {
        self.inner
            .lock()
            .entry(resume_id.to_string())
            .or_default()
            .clone()
    }

    /// Forgets the lock for a deleted resume.
    pub fn release(&self, resume_id: &str) {
        self.inner.lock().remove(resume_id);
    }
}
