//! Session descriptor and the observable store that owns it.
//!
//! DESIGN
//! ======
//! `SessionStore` is built once at the application root and cloned into every
//! consumer (navigation menu, auth gateway, reservation form). Clones share
//! the same state. Durable storage is the source of truth at construction
//! time; afterwards the store keeps the in-memory copy and writes through on
//! every `set`.
//!
//! Observers receive the current value as soon as they subscribe and then
//! every update, in subscription order. Identical consecutive values are
//! still delivered. A `set` holds the emit lock for its whole
//! write-then-notify sequence, so two `set` calls never interleave.
//!
//! Observers must not call `set` or `subscribe` on the same store from inside
//! their callback; the emit lock is not re-entrant.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};

use crate::storage::{self, DurableStore, SESSION_KEY};

// =============================================================================
// SESSION
// =============================================================================

/// The authenticated user's descriptor as persisted under `sesion`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub logged_in: bool,
    /// Role tag as returned by the backend. Compare through [`Session::role_key`].
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub area: Option<String>,
    #[serde(default)]
    pub token: String,
}

impl Session {
    /// Lower-cased role used for every authorization comparison.
    #[must_use]
    pub fn role_key(&self) -> String {
        self.role.trim().to_lowercase()
    }

    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role_key() == role.trim().to_lowercase()
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role("admin")
    }

    /// The acting user's id, if the session carries a non-blank one.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        Some(self.user_id.as_str()).filter(|id| !id.trim().is_empty())
    }

    #[must_use]
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        if full.is_empty() { self.user_name.clone() } else { full.to_owned() }
    }
}

/// A missing session and a session with `logged_in == false` are the same thing.
#[must_use]
pub fn is_logged_in(session: Option<&Session>) -> bool {
    session.is_some_and(|s| s.logged_in)
}

// =============================================================================
// STORE
// =============================================================================

type Observer = Arc<dyn Fn(Option<&Session>) + Send + Sync>;

struct Inner {
    storage: Arc<dyn DurableStore>,
    current: Mutex<Option<Session>>,
    observers: Mutex<Vec<(u64, Observer)>>,
    next_id: AtomicU64,
    emit_lock: Mutex<()>,
}

impl Inner {
    fn current(&self) -> MutexGuard<'_, Option<Session>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn observers(&self) -> MutexGuard<'_, Vec<(u64, Observer)>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit_lock(&self) -> MutexGuard<'_, ()> {
        self.emit_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide session holder shared by handle.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &*self.inner.current())
            .field("observers", &self.inner.observers().len())
            .finish_non_exhaustive()
    }
}

impl SessionStore {
    /// Read the persisted session once and make it the initial value.
    ///
    /// A missing, unreadable, malformed or logged-out stored value all start
    /// the store empty.
    pub fn initialize(storage: Arc<dyn DurableStore>) -> Self {
        let restored = storage::load_json::<Session>(storage.as_ref(), SESSION_KEY).filter(|s| s.logged_in);
        match &restored {
            Some(s) => tracing::info!(user_id = %s.user_id, role = %s.role_key(), "session restored"),
            None => tracing::debug!("no persisted session"),
        }
        Self {
            inner: Arc::new(Inner {
                storage,
                current: Mutex::new(restored),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                emit_lock: Mutex::new(()),
            }),
        }
    }

    /// Latest session value.
    #[must_use]
    pub fn current(&self) -> Option<Session> {
        self.inner.current().clone()
    }

    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        is_logged_in(self.inner.current().as_ref())
    }

    /// Durable store this session writes through to.
    #[must_use]
    pub fn storage(&self) -> Arc<dyn DurableStore> {
        Arc::clone(&self.inner.storage)
    }

    /// Register `observer`; it is called right away with the current value and
    /// again on every `set` until the returned handle is dropped.
    pub fn subscribe<F>(&self, observer: F) -> Subscription
    where
        F: Fn(Option<&Session>) + Send + Sync + 'static,
    {
        let _emit = self.inner.emit_lock();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let observer: Observer = Arc::new(observer);
        self.inner.observers().push((id, Arc::clone(&observer)));

        let snapshot = self.current();
        observer(snapshot.as_ref());

        Subscription { id, store: Arc::downgrade(&self.inner) }
    }

    /// Write `session` through to durable storage, then notify every observer.
    ///
    /// `None`, and any session with `logged_in == false`, deletes the stored
    /// key and emits `None`. Storage failures are logged; the in-memory value
    /// and observers are still updated.
    pub fn set(&self, session: Option<Session>) {
        let session = session.filter(|s| s.logged_in);
        let _emit = self.inner.emit_lock();

        let written = match &session {
            Some(s) => storage::save_json(self.inner.storage.as_ref(), SESSION_KEY, s),
            None => self.inner.storage.remove(SESSION_KEY),
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to persist session");
        }

        *self.inner.current() = session.clone();

        let observers: Vec<Observer> = self
            .inner
            .observers()
            .iter()
            .map(|(_, o)| Arc::clone(o))
            .collect();
        for observer in observers {
            observer(session.as_ref());
        }
    }

    /// Shorthand for `set(None)`.
    pub fn clear(&self) {
        self.set(None);
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.observers().len()
    }
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// Handle returned by [`SessionStore::subscribe`]. Dropping it cancels delivery.
#[must_use = "dropping a Subscription immediately cancels it"]
pub struct Subscription {
    id: u64,
    store: Weak<Inner>,
}

impl Subscription {
    /// Explicitly cancel delivery.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.store.upgrade() {
            inner.observers().retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
