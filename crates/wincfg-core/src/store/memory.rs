//! In-memory [`PersistedStore`] implementation.
//!
//! Allows tests and embedders to exercise the full settings lifecycle without
//! a settings file.  Besides the trait operations it can:
//!
//! - simulate edits made by another process (`external_set`,
//!   `external_remove`), which fire the change subscriber like a real file
//!   watcher would;
//! - count `save` calls and inject save failures, to cover the persist path.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use tracing::debug;

use super::{ChangeCallback, PersistedStore, StoreError};
use crate::SettingValue;

/// A [`PersistedStore`] that keeps everything in a map.
pub struct MemoryStore {
    values: RefCell<BTreeMap<String, SettingValue>>,
    subscriber: RefCell<Option<Rc<dyn Fn()>>>,
    save_count: Cell<u32>,
    fail_saves: Cell<bool>,
    /// Snapshot taken by the last successful `save`.
    persisted: RefCell<BTreeMap<String, SettingValue>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            values: RefCell::new(BTreeMap::new()),
            subscriber: RefCell::new(None),
            save_count: Cell::new(0),
            fail_saves: Cell::new(false),
            persisted: RefCell::new(BTreeMap::new()),
        }
    }

    /// Creates a store pre-populated with `entries` (keys stored verbatim).
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, SettingValue)>,
        K: Into<String>,
    {
        let store = Self::new();
        {
            let mut values = store.values.borrow_mut();
            for (key, value) in entries {
                values.insert(key.into(), value);
            }
        }
        store
    }

    /// Changes a key as if another process edited the resource.
    pub fn external_set(&self, key: &str, value: SettingValue) {
        self.values.borrow_mut().insert(key.to_string(), value);
        self.notify();
    }

    /// Removes a key as if another process edited the resource.
    pub fn external_remove(&self, key: &str) {
        let removed = self.values.borrow_mut().remove(key).is_some();
        if removed {
            self.notify();
        }
    }

    /// Makes every following `save` fail with [`StoreError::Rejected`].
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.set(fail);
    }

    /// Number of successful `save` calls so far.
    pub fn save_count(&self) -> u32 {
        self.save_count.get()
    }

    /// Returns `true` if a change subscriber is installed.
    pub fn has_subscriber(&self) -> bool {
        self.subscriber.borrow().is_some()
    }

    /// Value of `key` as of the last successful `save`.
    pub fn persisted(&self, key: &str) -> Option<SettingValue> {
        self.persisted.borrow().get(key).cloned()
    }

    fn notify(&self) {
        // Clone the callback out so it can re-enter the store.
        let callback = self.subscriber.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersistedStore for MemoryStore {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: SettingValue) {
        self.values.borrow_mut().insert(key.to_string(), value);
        self.notify();
    }

    fn save(&self) -> Result<(), StoreError> {
        if self.fail_saves.get() {
            return Err(StoreError::Rejected("memory store is failing saves".to_string()));
        }
        *self.persisted.borrow_mut() = self.values.borrow().clone();
        self.save_count.set(self.save_count.get() + 1);
        debug!("memory store saved ({} keys)", self.persisted.borrow().len());
        Ok(())
    }

    fn subscribe(&self, on_change: ChangeCallback) {
        *self.subscriber.borrow_mut() = Some(Rc::from(on_change));
    }
}
