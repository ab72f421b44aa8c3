use std::sync::atomic::AtomicUsize;

use super::*;
use crate::storage::{MemoryStore, StorageError};

// =============================================================================
// Helpers
// =============================================================================

/// Memory store that counts value writes.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl DurableStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

fn session(role: &str) -> Session {
    Session {
        logged_in: true,
        role: role.into(),
        user_id: "u-1".into(),
        user_name: "jperez".into(),
        first_name: "Juana".into(),
        last_name: "Perez".into(),
        email: "juana@lab.cl".into(),
        area: Some("Hematologia".into()),
        token: "tok".into(),
    }
}

fn recorder(store: &SessionStore) -> (Arc<Mutex<Vec<Option<Session>>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let sub = store.subscribe(move |s| sink.lock().unwrap().push(s.cloned()));
    (seen, sub)
}

// =============================================================================
// Session
// =============================================================================

#[test]
fn role_key_is_lower_cased() {
    assert_eq!(session(" ADMIN ").role_key(), "admin");
    assert!(session("Medico").has_role("MEDICO"));
    assert!(session("Admin").is_admin());
}

#[test]
fn user_id_blank_is_none() {
    let mut s = session("admin");
    s.user_id = "  ".into();
    assert_eq!(s.user_id(), None);
}

#[test]
fn display_name_falls_back_to_user_name() {
    let mut s = session("admin");
    assert_eq!(s.display_name(), "Juana Perez");
    s.first_name.clear();
    s.last_name.clear();
    assert_eq!(s.display_name(), "jperez");
}

#[test]
fn logged_out_session_counts_as_absent() {
    let mut s = session("admin");
    assert!(is_logged_in(Some(&s)));
    s.logged_in = false;
    assert!(!is_logged_in(Some(&s)));
    assert!(!is_logged_in(None));
}

#[test]
fn session_serializes_camel_case() {
    let json = serde_json::to_value(session("admin")).unwrap();
    assert_eq!(json["loggedIn"], true);
    assert_eq!(json["userId"], "u-1");
    assert_eq!(json["firstName"], "Juana");
}

// =============================================================================
// initialize
// =============================================================================

#[test]
fn initialize_restores_persisted_session() {
    let storage = Arc::new(MemoryStore::new());
    storage::save_json(storage.as_ref(), SESSION_KEY, &session("medico")).unwrap();

    let store = SessionStore::initialize(storage);
    assert_eq!(store.current(), Some(session("medico")));
    assert!(store.is_logged_in());
}

#[test]
fn initialize_malformed_value_is_none() {
    let storage = Arc::new(MemoryStore::new());
    storage.set(SESSION_KEY, "{\"loggedIn\": tru").unwrap();

    let store = SessionStore::initialize(storage);
    assert_eq!(store.current(), None);
}

#[test]
fn initialize_legacy_shape_is_none() {
    let storage = Arc::new(MemoryStore::new());
    storage
        .set(SESSION_KEY, r#"{"logueado":true,"tipo":"admin","email":"a@b.cl"}"#)
        .unwrap();

    let store = SessionStore::initialize(storage);
    assert_eq!(store.current(), None);
}

#[test]
fn initialize_logged_out_value_is_none() {
    let storage = Arc::new(MemoryStore::new());
    let mut s = session("admin");
    s.logged_in = false;
    storage::save_json(storage.as_ref(), SESSION_KEY, &s).unwrap();

    let store = SessionStore::initialize(storage);
    assert_eq!(store.current(), None);
}

// =============================================================================
// subscribe / set
// =============================================================================

#[test]
fn subscribe_delivers_current_value_immediately() {
    let store = SessionStore::initialize(Arc::new(MemoryStore::new()));
    let (seen, _sub) = recorder(&store);
    assert_eq!(*seen.lock().unwrap(), vec![None]);
}

#[test]
fn set_writes_through_then_emits() {
    let storage = Arc::new(MemoryStore::new());
    let store = SessionStore::initialize(storage.clone());
    let (seen, _sub) = recorder(&store);

    store.set(Some(session("admin")));

    assert_eq!(storage::load_json::<Session>(storage.as_ref(), SESSION_KEY), Some(session("admin")));
    assert_eq!(*seen.lock().unwrap(), vec![None, Some(session("admin"))]);
    assert_eq!(store.current(), Some(session("admin")));
}

#[test]
fn observers_notified_in_subscription_order() {
    let store = SessionStore::initialize(Arc::new(MemoryStore::new()));
    let order = Arc::new(Mutex::new(Vec::new()));

    let first = Arc::clone(&order);
    let _a = store.subscribe(move |_| first.lock().unwrap().push("a"));
    let second = Arc::clone(&order);
    let _b = store.subscribe(move |_| second.lock().unwrap().push("b"));
    order.lock().unwrap().clear();

    store.set(Some(session("admin")));
    assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
}

#[test]
fn identical_values_are_not_deduplicated() {
    let store = SessionStore::initialize(Arc::new(MemoryStore::new()));
    let (seen, _sub) = recorder(&store);

    store.set(Some(session("admin")));
    store.set(Some(session("admin")));

    assert_eq!(seen.lock().unwrap().len(), 3);
}

#[test]
fn set_none_when_already_none_emits_without_writing() {
    let storage = Arc::new(CountingStore::default());
    let store = SessionStore::initialize(storage.clone());
    let (seen, _sub) = recorder(&store);

    store.set(None);

    assert_eq!(*seen.lock().unwrap(), vec![None, None]);
    assert_eq!(storage.writes.load(Ordering::SeqCst), 0);
    assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn set_logged_out_session_removes_key() {
    let storage = Arc::new(MemoryStore::new());
    let store = SessionStore::initialize(storage.clone());
    store.set(Some(session("admin")));

    let mut logged_out = session("admin");
    logged_out.logged_in = false;
    store.set(Some(logged_out));

    assert_eq!(store.current(), None);
    assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn clear_removes_session() {
    let storage = Arc::new(MemoryStore::new());
    let store = SessionStore::initialize(storage.clone());
    store.set(Some(session("admin")));

    store.clear();

    assert!(!store.is_logged_in());
    assert_eq!(storage.get(SESSION_KEY).unwrap(), None);
}

#[test]
fn clones_share_state() {
    let store = SessionStore::initialize(Arc::new(MemoryStore::new()));
    let other = store.clone();
    let (seen, _sub) = recorder(&other);

    store.set(Some(session("laboratorio")));

    assert_eq!(other.current(), Some(session("laboratorio")));
    assert_eq!(seen.lock().unwrap().len(), 2);
}

// =============================================================================
// Subscription
// =============================================================================

#[test]
fn dropping_subscription_stops_delivery() {
    let store = SessionStore::initialize(Arc::new(MemoryStore::new()));
    let (seen, sub) = recorder(&store);
    assert_eq!(store.subscriber_count(), 1);

    drop(sub);
    store.set(Some(session("admin")));

    assert_eq!(store.subscriber_count(), 0);
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn unsubscribe_only_cancels_its_own_observer() {
    let store = SessionStore::initialize(Arc::new(MemoryStore::new()));
    let (kept, _keep) = recorder(&store);
    let (_gone, cancel) = recorder(&store);

    cancel.unsubscribe();
    store.set(Some(session("admin")));

    assert_eq!(store.subscriber_count(), 1);
    assert_eq!(kept.lock().unwrap().len(), 2);
}

#[test]
fn subscription_outliving_store_drops_cleanly() {
    let store = SessionStore::initialize(Arc::new(MemoryStore::new()));
    let (_seen, sub) = recorder(&store);
    drop(store);
    drop(sub);
}
