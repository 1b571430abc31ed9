//! SettingsRegistry: one settings instance per open window.
//!
//! The registry is the plugin's in-memory identity map from a window id to
//! the [`ConfigSettings`] instance for that window.
//!
//! # Window lifecycle (for beginners)
//!
//! ```text
//!   (no entry) ── get(id) ──►  registered  ── close(id) ──►  (no entry)
//!                               │      ▲
//!                               └──────┘  get(id) returns the same instance
//! ```
//!
//! - The first `get` for a window creates its instance.
//! - Every later `get` returns the same `Rc` until the window closes.
//! - After `close`, a `get` with the same numeric id (hosts do reuse ids)
//!   builds a fresh instance; old state is never resurrected.
//!
//! Detached instances (no active window) are created on demand and are never
//! registered, so `close` cannot reach them and reload broadcasts skip them.
//!
//! # Change propagation
//!
//! [`SettingsRegistry::new`] subscribes to the store.  When the store reports
//! a change, every registered instance is reloaded.  The subscription only
//! holds a `Weak` reference to the map, so dropping the registry silences it.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, info};

use super::settings::ConfigSettings;
use crate::store::PersistedStore;

/// Host-assigned window identifier.
pub type WindowId = u64;

/// Shared handle to a settings instance.  Identity is `Rc::ptr_eq`.
pub type SettingsHandle = Rc<ConfigSettings>;

type WindowMap = RefCell<HashMap<WindowId, SettingsHandle>>;

/// Identity map from window id to settings instance.
///
/// # HashMap choice
///
/// Lookups are by id only; iteration order is irrelevant (reload broadcasts
/// touch every entry).
pub struct SettingsRegistry {
    store: Rc<dyn PersistedStore>,
    windows: Rc<WindowMap>,
}

impl SettingsRegistry {
    /// Creates an empty registry and installs the store's change subscriber.
    ///
    /// The store keeps a single subscriber; any previous one is replaced.
    pub fn new(store: Rc<dyn PersistedStore>) -> Self {
        let windows: Rc<WindowMap> = Rc::new(RefCell::new(HashMap::new()));
        let weak: Weak<WindowMap> = Rc::downgrade(&windows);
        store.subscribe(Box::new(move || {
            if let Some(windows) = weak.upgrade() {
                debug!("settings resource changed; reloading all windows");
                reload_registered(&windows);
            }
        }));
        Self { store, windows }
    }

    /// Returns the instance for `id`, creating and registering it if needed.
    pub fn get(&self, id: WindowId) -> SettingsHandle {
        let mut windows = self.windows.borrow_mut();
        let handle = windows.entry(id).or_insert_with(|| {
            info!("window {id}: settings created");
            Rc::new(ConfigSettings::new(Rc::clone(&self.store)))
        });
        Rc::clone(handle)
    }

    /// Returns a new instance that belongs to no window.
    pub fn get_detached(&self) -> SettingsHandle {
        debug!("detached settings created");
        Rc::new(ConfigSettings::new(Rc::clone(&self.store)))
    }

    /// Resolves settings for an optional window, falling back to a detached
    /// instance when there is no window.
    pub fn settings_for(&self, window: Option<WindowId>) -> SettingsHandle {
        match window {
            Some(id) => self.get(id),
            None => self.get_detached(),
        }
    }

    /// Discards the entry for `id`.  Returns `true` if one existed.
    pub fn close(&self, id: WindowId) -> bool {
        // Bind first so the map borrow ends before the instance is dropped.
        let removed = self.windows.borrow_mut().remove(&id);
        match removed {
            Some(_) => {
                info!("window {id}: settings discarded");
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `id` has a registered instance.
    pub fn is_open(&self, id: WindowId) -> bool {
        self.windows.borrow().contains_key(&id)
    }

    /// Ids of all registered windows, ascending.
    pub fn window_ids(&self) -> Vec<WindowId> {
        let mut ids: Vec<WindowId> = self.windows.borrow().keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.windows.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.borrow().is_empty()
    }

    /// Reloads every registered instance, as a store change would.
    pub fn reload_all(&self) {
        reload_registered(&self.windows);
    }

    /// The store shared by every instance this registry creates.
    pub fn store(&self) -> Rc<dyn PersistedStore> {
        Rc::clone(&self.store)
    }
}

/// Snapshots the live handles, then reloads them with no map borrow held.
fn reload_registered(windows: &WindowMap) {
    let handles: Vec<SettingsHandle> = windows.borrow().values().cloned().collect();
    for handle in handles {
        handle.reload();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::settings::SettingsMap;
    use crate::store::memory::MemoryStore;
    use crate::SettingValue;

    fn int(v: i64) -> SettingValue {
        SettingValue::Integer(v)
    }

    fn registry_with(store: &Rc<MemoryStore>) -> SettingsRegistry {
        SettingsRegistry::new(Rc::clone(store) as Rc<dyn PersistedStore>)
    }

    #[test]
    fn test_registry_starts_empty() {
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);
        assert!(registry.is_empty());
        assert!(store.has_subscriber());
    }

    #[test]
    fn test_get_same_window_returns_same_instance() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);

        // Act
        let first = registry.get(5);
        let second = registry.get(5);

        // Assert
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_different_windows_get_different_instances() {
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);

        let a = registry.get(1);
        let b = registry.get(2);

        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(registry.window_ids(), vec![1, 2]);
    }

    #[test]
    fn test_close_then_get_builds_fresh_instance() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);
        let before = registry.get(5);
        before.set_user_specified("x", int(1));

        // Act
        assert!(registry.close(5));
        let after = registry.get(5);

        // Assert
        assert!(!Rc::ptr_eq(&before, &after));
        assert!(!after.has_user_specified(), "state must not be resurrected");
    }

    #[test]
    fn test_close_unknown_window_is_noop() {
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);
        registry.get(1);

        assert!(!registry.close(99));
        assert!(registry.is_open(1));
    }

    #[test]
    fn test_detached_instances_are_not_registered() {
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);

        let a = registry.get_detached();
        let b = registry.get_detached();

        assert!(!Rc::ptr_eq(&a, &b));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_settings_for_none_is_detached() {
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);

        let detached = registry.settings_for(None);
        let windowed = registry.settings_for(Some(3));

        assert!(!Rc::ptr_eq(&detached, &windowed));
        assert!(Rc::ptr_eq(&windowed, &registry.get(3)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_store_change_reloads_every_registered_window() {
        // Arrange
        let store = Rc::new(MemoryStore::with_entries([("default_y", int(2))]));
        let registry = registry_with(&store);
        let one = registry.get(1);
        let two = registry.get(2);
        one.set_user_specified("x", int(1));
        one.get("y").unwrap();
        two.get("y").unwrap();

        // Act: an external edit fires the store's change callback.
        store.external_set("default_y", int(20));

        // Assert
        assert_eq!(one.entries(), vec![("x".to_string(), int(1))]);
        assert!(two.is_empty());
        assert_eq!(one.get("y").unwrap(), int(20));
        assert_eq!(two.get("y").unwrap(), int(20));
    }

    #[test]
    fn test_store_change_skips_detached_instances() {
        let store = Rc::new(MemoryStore::with_entries([("default_y", int(2))]));
        let registry = registry_with(&store);
        let detached = registry.get_detached();
        detached.get("y").unwrap();

        store.external_set("default_y", int(20));

        assert_eq!(detached.get("y").unwrap(), int(2), "detached cache untouched");
    }

    #[test]
    fn test_closed_window_is_not_reloaded() {
        let store = Rc::new(MemoryStore::with_entries([("default_y", int(2))]));
        let registry = registry_with(&store);
        let orphan = registry.get(4);
        orphan.get("y").unwrap();
        registry.close(4);

        store.external_set("default_y", int(20));

        assert_eq!(orphan.get("y").unwrap(), int(2));
    }

    #[test]
    fn test_save_in_one_window_is_visible_in_another_after_notification() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);
        let editor = registry.get(1);
        let other = registry.get(2);
        editor.set_user_specified("tabSize", int(4));

        // Act
        editor.save().unwrap();

        // Assert
        assert!(!editor.has_user_specified());
        assert_eq!(other.get("tabSize").unwrap(), int(4));
    }

    #[test]
    fn test_dropped_registry_silences_subscription() {
        let store = Rc::new(MemoryStore::new());
        let handle = {
            let registry = registry_with(&store);
            let handle = registry.get(1);
            handle.set("adhoc", int(1));
            handle
        };

        store.external_set("default_z", int(0));

        assert!(handle.contains("adhoc"), "no reload after the registry is gone");
    }

    #[test]
    fn test_reload_all_is_reentrant_with_get() {
        // A reload broadcast must not hold the map borrow while reloading.
        let store = Rc::new(MemoryStore::new());
        let registry = registry_with(&store);
        registry.get(1).set("adhoc", int(1));

        registry.reload_all();
        let again = registry.get(1);

        assert!(again.is_empty());
    }
}
