use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// The Store maps string keys to string values for the lifetime of the server. It is shared
/// between every connection and cloned cheaply via reference counting; all clones see the same
/// data.
///
/// Writes take the exclusive lock and reads the shared one, so readers run in parallel with each
/// other but never observe a value while it is being written.
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl Store {
    pub fn new() -> Store {
        Store::default()
    }

    /// Inserts `value` under `key`, replacing any previous value.
    pub fn set(&self, key: String, value: String) {
        self.inner.write().insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.read().get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
