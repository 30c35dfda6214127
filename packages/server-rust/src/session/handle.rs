//! Shared handle to a request's live session, plus change notification.
//!
//! Handlers receive the handle through the request context and may log the
//! user in or out with it. Anything that wants to follow the signed-in user
//! subscribes to the handle it was given instead of reading a global.

use std::sync::Arc;

use landing_core::{CookieOptions, IdentityRecord, IdentitySnapshot, Session};
use parking_lot::Mutex;
use tokio::sync::watch;

/// Cloneable handle to one request's [`Session`].
///
/// All clones share the same session. The lock is held only for the
/// duration of each method call, never across an `.await`.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
    changes: Arc<watch::Sender<Option<IdentitySnapshot>>>,
}

impl SessionHandle {
    #[must_use]
    pub fn new(session: Session) -> Self {
        let current = IdentitySnapshot::capture_optional(session.record());
        let (tx, _rx) = watch::channel(current);
        Self {
            inner: Arc::new(Mutex::new(session)),
            changes: Arc::new(tx),
        }
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.inner.lock().is_valid()
    }

    #[must_use]
    pub fn token(&self) -> String {
        self.inner.lock().token().to_string()
    }

    /// Deep copy of the live record.
    #[must_use]
    pub fn record(&self) -> Option<IdentityRecord> {
        self.inner.lock().record().cloned()
    }

    /// Immutable snapshot of the live record as it is right now.
    #[must_use]
    pub fn snapshot(&self) -> Option<IdentitySnapshot> {
        IdentitySnapshot::capture_optional(self.inner.lock().record())
    }

    /// Stores a new token and record and notifies subscribers.
    pub fn save(&self, token: impl Into<String>, record: Option<IdentityRecord>) {
        self.inner.lock().save(token, record);
        self.notify();
    }

    /// Signs the user out and notifies subscribers.
    pub fn clear(&self) {
        self.inner.lock().clear();
        self.notify();
    }

    /// Mutates the live record in place. Returns `None` without calling `f`
    /// when the session has no record.
    pub fn with_record_mut<R>(&self, f: impl FnOnce(&mut IdentityRecord) -> R) -> Option<R> {
        let result = self.inner.lock().record_mut().map(f);
        if result.is_some() {
            self.notify();
        }
        result
    }

    #[must_use]
    pub fn export_to_cookie(&self, options: &CookieOptions, name: &str) -> String {
        self.inner.lock().export_to_cookie(options, name)
    }

    /// Follows the signed-in user of this session.
    #[must_use]
    pub fn subscribe(&self) -> CurrentUser {
        CurrentUser {
            rx: self.changes.subscribe(),
        }
    }

    fn notify(&self) {
        let current = self.snapshot();
        self.changes.send_replace(current);
    }
}

/// Observer of the user signed in to a [`SessionHandle`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    rx: watch::Receiver<Option<IdentitySnapshot>>,
}

impl CurrentUser {
    /// The most recently published user, marking it as seen.
    #[must_use]
    pub fn get(&mut self) -> Option<IdentitySnapshot> {
        self.rx.borrow_and_update().clone()
    }

    /// Waits for the next save or clear. Returns `false` once every handle
    /// to the session has been dropped.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }
}
