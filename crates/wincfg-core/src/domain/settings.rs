//! Layered settings mapping for one editor window.
//!
//! [`ConfigSettings`] unifies three layers of state into a single view:
//!
//! ```text
//!   user_specified   (session overrides, survive reloads)
//!        │ copy on reload
//!        ▼
//!   resolved         (read-through cache)  ◄── pulled lazily from the store
//!                                              under `default_<name>`
//! ```
//!
//! # Read-through cache (for beginners)
//!
//! `resolved` starts as a copy of `user_specified`.  The first time a name that
//! is not cached is read, the persisted default is fetched from the store and
//! kept in `resolved`.  Later reads are served from the cache, even if the
//! store's value changes without a change notification.
//!
//! [`ConfigSettings::reload`] is the only eviction path: it resets `resolved`
//! to a copy of `user_specified`.  The store's change subscription calls it on
//! every registered instance (see [`crate::SettingsRegistry`]).
//!
//! # States
//!
//! - `Clean`: no user-specified overrides (`has_user_specified() == false`).
//! - `Dirty`: at least one override.
//!
//! `set_user_specified` moves to `Dirty`; `clear`, a successful `save`, or
//! unsetting the last override moves back to `Clean`.
//!
//! # "Unset" in the store
//!
//! A default exists iff its key is present in the store.  Falsy values (`0`,
//! `""`, `false`, empty arrays) are returned like any other value.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;
use tracing::debug;

use crate::store::{default_key, PersistedStore, StoreError};
use crate::SettingValue;

/// Error type for settings operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The name is neither cached, user-specified, nor a persisted default.
    #[error("setting not found: {0}")]
    KeyNotFound(String),

    /// Persisting user-specified values failed; nothing was cleared.
    #[error("failed to persist window settings: {0}")]
    Store(#[from] StoreError),
}

/// Associative-container view of a settings object.
///
/// `ConfigSettings` is the only implementation; the trait keeps commands and
/// hosts written against the mapping protocol rather than the concrete type.
pub trait SettingsMap {
    /// Returns `true` if `name` is cached, user-specified, or available as a
    /// persisted default.
    ///
    /// Never changes the cache.
    fn contains(&self, name: &str) -> bool;

    /// Resolves `name`, pulling and caching the persisted default if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::KeyNotFound`] if no layer has a value.
    fn get(&self, name: &str) -> Result<SettingValue, SettingsError>;

    /// Writes `value` into the resolved view only (not user-specified).
    fn set(&self, name: &str, value: SettingValue);

    /// Removes `name` from the resolved view and returns the removed value.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::KeyNotFound`] if `name` is not cached.
    fn delete(&self, name: &str) -> Result<SettingValue, SettingsError>;

    /// Names currently in the resolved view, in sorted order.
    fn keys(&self) -> Vec<String>;

    /// Snapshot of the resolved view, in sorted order.
    fn entries(&self) -> Vec<(String, SettingValue)>;

    /// Number of names in the resolved view.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies [`set`](SettingsMap::set) for every entry.
    fn update<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (String, SettingValue)>,
        Self: Sized,
    {
        for (name, value) in entries {
            self.set(&name, value);
        }
    }
}

/// Settings for one window (or a detached context).
///
/// Borrows of the two maps are never held across a call into the store, so a
/// change notification fired synchronously by the store may re-enter
/// [`reload`](ConfigSettings::reload) at any point.
pub struct ConfigSettings {
    store: Rc<dyn PersistedStore>,
    user_specified: RefCell<BTreeMap<String, SettingValue>>,
    resolved: RefCell<BTreeMap<String, SettingValue>>,
}

impl ConfigSettings {
    /// Creates an empty (`Clean`) instance backed by `store`.
    pub fn new(store: Rc<dyn PersistedStore>) -> Self {
        Self {
            store,
            user_specified: RefCell::new(BTreeMap::new()),
            resolved: RefCell::new(BTreeMap::new()),
        }
    }

    /// Creates an instance whose resolved view starts with `entries`.
    ///
    /// The entries are ad-hoc values (as with [`SettingsMap::set`]); they are
    /// not user-specified and are dropped by the next reload.
    pub fn with_entries<I>(store: Rc<dyn PersistedStore>, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, SettingValue)>,
    {
        let settings = Self::new(store);
        settings.update(entries);
        settings
    }

    /// Records an override and makes it visible immediately.
    ///
    /// The value survives reloads until it is unset, cleared, or saved.
    pub fn set_user_specified(&self, name: &str, value: SettingValue) {
        self.user_specified
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        self.resolved.borrow_mut().insert(name.to_string(), value);
        debug!("user-specified setting '{name}' recorded");
    }

    /// Removes an override (if any) and reloads.
    ///
    /// Unsetting a name that was never set is a no-op apart from the reload.
    pub fn unset_user_specified(&self, name: &str) {
        let removed = self.user_specified.borrow_mut().remove(name).is_some();
        if removed {
            debug!("user-specified setting '{name}' removed");
        }
        self.reload();
    }

    /// Returns `true` if at least one override is recorded (`Dirty`).
    pub fn has_user_specified(&self) -> bool {
        !self.user_specified.borrow().is_empty()
    }

    /// Value of the override for `name`, if one is recorded.
    pub fn user_specified(&self, name: &str) -> Option<SettingValue> {
        self.user_specified.borrow().get(name).cloned()
    }

    /// Persists every override as a default, then clears the overrides.
    ///
    /// Order: write all `default_<name>` keys, persist the store, and only on
    /// success clear the overrides (which reloads).  With no overrides this
    /// does nothing, not even a persist.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Store`] if persisting fails.  The overrides are
    /// left intact in that case.
    pub fn save(&self) -> Result<(), SettingsError> {
        // Snapshot first: `set` may notify and re-enter `reload`.
        let pending: Vec<(String, SettingValue)> = self
            .user_specified
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        if pending.is_empty() {
            return Ok(());
        }

        for (name, value) in &pending {
            self.store.set(&default_key(name), value.clone());
        }
        self.store.save()?;
        debug!("saved {} user-specified setting(s) to defaults", pending.len());

        self.clear();
        Ok(())
    }

    /// Discards all overrides and every cached default.
    ///
    /// Persisted defaults are untouched and will be pulled again on demand.
    pub fn clear(&self) {
        self.user_specified.borrow_mut().clear();
        self.reload();
    }

    /// Rebuilds the resolved view as a copy of the overrides.
    ///
    /// This is the only way pulled defaults leave the cache.
    pub fn reload(&self) {
        let fresh = self.user_specified.borrow().clone();
        *self.resolved.borrow_mut() = fresh;
    }

    fn pull_default(&self, name: &str) -> Option<SettingValue> {
        let value = self.store.get(&default_key(name))?;
        debug!("pulled persisted default for '{name}'");
        self.resolved
            .borrow_mut()
            .insert(name.to_string(), value.clone());
        Some(value)
    }
}

impl SettingsMap for ConfigSettings {
    fn contains(&self, name: &str) -> bool {
        // An override still counts after `delete` dropped it from the view.
        if self.resolved.borrow().contains_key(name)
            || self.user_specified.borrow().contains_key(name)
        {
            return true;
        }
        self.store.get(&default_key(name)).is_some()
    }

    fn get(&self, name: &str) -> Result<SettingValue, SettingsError> {
        let cached = self.resolved.borrow().get(name).cloned();
        match cached {
            Some(value) => Ok(value),
            None => self
                .pull_default(name)
                .ok_or_else(|| SettingsError::KeyNotFound(name.to_string())),
        }
    }

    fn set(&self, name: &str, value: SettingValue) {
        self.resolved.borrow_mut().insert(name.to_string(), value);
    }

    fn delete(&self, name: &str) -> Result<SettingValue, SettingsError> {
        self.resolved
            .borrow_mut()
            .remove(name)
            .ok_or_else(|| SettingsError::KeyNotFound(name.to_string()))
    }

    fn keys(&self) -> Vec<String> {
        self.resolved.borrow().keys().cloned().collect()
    }

    fn entries(&self) -> Vec<(String, SettingValue)> {
        self.resolved
            .borrow()
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    fn len(&self) -> usize {
        self.resolved.borrow().len()
    }
}

impl fmt::Debug for ConfigSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSettings")
            .field("user_specified", &self.user_specified.borrow())
            .field("resolved", &self.resolved.borrow())
            .finish_non_exhaustive()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::MockPersistedStore;

    fn int(v: i64) -> SettingValue {
        SettingValue::Integer(v)
    }

    fn text(v: &str) -> SettingValue {
        SettingValue::String(v.to_string())
    }

    fn settings_with(store: &Rc<MemoryStore>) -> ConfigSettings {
        ConfigSettings::new(Rc::clone(store) as Rc<dyn PersistedStore>)
    }

    // ── user-specified overrides ──────────────────────────────────────────────

    #[test]
    fn test_set_user_specified_is_visible_through_get() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);

        // Act
        settings.set_user_specified("tabSize", int(4));

        // Assert
        assert_eq!(settings.get("tabSize").unwrap(), int(4));
        assert!(settings.has_user_specified());
    }

    #[test]
    fn test_user_specified_overrides_persisted_default() {
        let store = Rc::new(MemoryStore::with_entries([("default_tabSize", int(8))]));
        let settings = settings_with(&store);

        settings.set_user_specified("tabSize", int(2));

        assert_eq!(settings.get("tabSize").unwrap(), int(2));
    }

    #[test]
    fn test_user_specified_survives_reload() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set_user_specified("x", int(1));

        settings.reload();

        assert_eq!(settings.get("x").unwrap(), int(1));
    }

    #[test]
    fn test_unset_never_set_key_is_noop() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);

        // Act
        settings.unset_user_specified("missingKey");

        // Assert
        assert!(!settings.has_user_specified());
        assert!(settings.is_empty());
    }

    #[test]
    fn test_unset_reverts_to_persisted_default() {
        // Arrange
        let store = Rc::new(MemoryStore::with_entries([("default_tabSize", int(8))]));
        let settings = settings_with(&store);
        settings.set_user_specified("tabSize", int(2));

        // Act
        settings.unset_user_specified("tabSize");

        // Assert
        assert!(!settings.has_user_specified());
        assert_eq!(settings.get("tabSize").unwrap(), int(8));
    }

    #[test]
    fn test_unset_without_default_makes_name_absent() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set_user_specified("x", int(1));

        settings.unset_user_specified("x");

        assert!(!settings.contains("x"));
        assert!(matches!(settings.get("x"), Err(SettingsError::KeyNotFound(_))));
    }

    #[test]
    fn test_unset_last_override_returns_to_clean() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set_user_specified("a", int(1));
        settings.set_user_specified("b", int(2));

        settings.unset_user_specified("a");
        assert!(settings.has_user_specified());
        settings.unset_user_specified("b");

        assert!(!settings.has_user_specified());
    }

    // ── read-through resolution ───────────────────────────────────────────────

    #[test]
    fn test_get_missing_everywhere_is_key_not_found() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);

        assert!(!settings.contains("nope"));
        match settings.get("nope") {
            Err(SettingsError::KeyNotFound(name)) => assert_eq!(name, "nope"),
            other => panic!("expected KeyNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_get_pulls_default_into_resolved() {
        // Arrange
        let store = Rc::new(MemoryStore::with_entries([("default_font", text("mono"))]));
        let settings = settings_with(&store);
        assert!(settings.is_empty(), "unpulled defaults are invisible to len");

        // Act
        let value = settings.get("font").unwrap();

        // Assert
        assert_eq!(value, text("mono"));
        assert_eq!(settings.keys(), vec!["font".to_string()]);
    }

    #[test]
    fn test_cached_default_is_served_until_reload() {
        // Arrange: pull, then change the store behind the cache's back.
        let store = Rc::new(MemoryStore::with_entries([("default_y", int(2))]));
        let settings = settings_with(&store);
        assert_eq!(settings.get("y").unwrap(), int(2));
        // Nobody is subscribed, so this change arrives without a reload.
        store.external_set("default_y", int(3));

        // Act / Assert: still the cached value
        assert_eq!(settings.get("y").unwrap(), int(2));

        // After a reload the new value is pulled.
        settings.reload();
        assert_eq!(settings.get("y").unwrap(), int(3));
    }

    #[test]
    fn test_falsy_defaults_are_present() {
        // Arrange
        let store = Rc::new(MemoryStore::with_entries([
            ("default_zero", int(0)),
            ("default_empty", text("")),
            ("default_off", SettingValue::Boolean(false)),
        ]));
        let settings = settings_with(&store);

        // Assert
        for name in ["zero", "empty", "off"] {
            assert!(settings.contains(name), "{name} must be present");
            assert!(settings.get(name).is_ok(), "{name} must resolve");
        }
        assert_eq!(settings.get("off").unwrap(), SettingValue::Boolean(false));
    }

    #[test]
    fn test_contains_does_not_populate_cache() {
        let store = Rc::new(MemoryStore::with_entries([("default_d", int(5))]));
        let settings = settings_with(&store);

        assert!(settings.contains("d"));

        assert!(settings.is_empty());
    }

    #[test]
    fn test_get_pulls_from_store_only_once() {
        // Arrange
        let mut mock = MockPersistedStore::new();
        mock.expect_get()
            .withf(|key| key == "default_wrap")
            .times(1)
            .returning(|_| Some(SettingValue::Boolean(true)));
        let settings = ConfigSettings::new(Rc::new(mock));

        // Act
        let first = settings.get("wrap").unwrap();
        let second = settings.get("wrap").unwrap();

        // Assert
        assert_eq!(first, second);
    }

    // ── raw mapping protocol ──────────────────────────────────────────────────

    #[test]
    fn test_set_is_not_user_specified() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);

        settings.set("adhoc", int(1));

        assert!(!settings.has_user_specified());
        assert_eq!(settings.get("adhoc").unwrap(), int(1));
    }

    #[test]
    fn test_set_value_is_dropped_by_reload() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set("adhoc", int(1));

        settings.reload();

        assert!(!settings.contains("adhoc"));
    }

    #[test]
    fn test_update_sets_every_entry() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);

        settings.update([("a".to_string(), int(1)), ("b".to_string(), int(2))]);

        assert_eq!(settings.len(), 2);
        assert_eq!(
            settings.entries(),
            vec![("a".to_string(), int(1)), ("b".to_string(), int(2))]
        );
    }

    #[test]
    fn test_with_entries_seeds_resolved_view() {
        let store = Rc::new(MemoryStore::new());
        let settings = ConfigSettings::with_entries(
            Rc::clone(&store) as Rc<dyn PersistedStore>,
            [("seed".to_string(), int(7))],
        );

        assert_eq!(settings.get("seed").unwrap(), int(7));
        assert!(!settings.has_user_specified());
    }

    #[test]
    fn test_delete_removes_from_resolved_only() {
        // Arrange
        let store = Rc::new(MemoryStore::with_entries([("default_d", int(5))]));
        let settings = settings_with(&store);
        settings.get("d").unwrap();

        // Act
        let removed = settings.delete("d").unwrap();

        // Assert: gone from the cache but still derivable from the store.
        assert_eq!(removed, int(5));
        assert!(settings.is_empty());
        assert!(settings.contains("d"));
    }

    #[test]
    fn test_contains_sees_override_after_delete() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set_user_specified("x", int(1));

        // Act
        settings.delete("x").unwrap();

        // Assert: the override is still recorded and comes back on reload.
        assert!(settings.has_user_specified());
        assert!(settings.contains("x"));
        settings.reload();
        assert_eq!(settings.get("x").unwrap(), int(1));
    }

    #[test]
    fn test_delete_missing_is_key_not_found() {
        let store = Rc::new(MemoryStore::with_entries([("default_d", int(5))]));
        let settings = settings_with(&store);

        // Not yet pulled, so not in the resolved view.
        assert!(matches!(settings.delete("d"), Err(SettingsError::KeyNotFound(_))));
    }

    // ── reload / clear ────────────────────────────────────────────────────────

    #[test]
    fn test_reload_twice_equals_reload_once() {
        let store = Rc::new(MemoryStore::with_entries([("default_y", int(2))]));
        let settings = settings_with(&store);
        settings.set_user_specified("x", int(1));
        settings.get("y").unwrap();

        settings.reload();
        let once = settings.entries();
        settings.reload();

        assert_eq!(settings.entries(), once);
    }

    #[test]
    fn test_reload_drops_stale_pulled_default() {
        // Arrange
        let store = Rc::new(MemoryStore::with_entries([("default_y", int(2))]));
        let settings = settings_with(&store);
        settings.set_user_specified("x", int(1));
        settings.get("y").unwrap();

        // Act
        settings.reload();

        // Assert
        assert_eq!(settings.entries(), vec![("x".to_string(), int(1))]);
        assert_eq!(settings.get("y").unwrap(), int(2), "re-pulled from the store");
    }

    #[test]
    fn test_clear_discards_only_session_state() {
        // Arrange
        let store = Rc::new(MemoryStore::with_entries([("default_d", int(5))]));
        let settings = settings_with(&store);
        settings.get("d").unwrap();
        settings.set_user_specified("o", int(1));

        // Act
        settings.clear();

        // Assert
        assert!(!settings.has_user_specified());
        assert!(settings.is_empty());
        assert!(settings.contains("d"));
        assert!(!settings.contains("o"));
        assert_eq!(store.get("default_d"), Some(int(5)));
    }

    // ── save ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_save_writes_defaults_and_clears_overrides() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set_user_specified("tabSize", int(4));

        // Act
        settings.save().expect("save should succeed");

        // Assert
        assert!(!settings.has_user_specified());
        assert_eq!(store.get("default_tabSize"), Some(int(4)));
        assert_eq!(store.persisted("default_tabSize"), Some(int(4)));
        assert_eq!(store.save_count(), 1);
        assert_eq!(settings.get("tabSize").unwrap(), int(4), "visible via read-through");
    }

    #[test]
    fn test_saved_false_survives_reload() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set_user_specified("wrap", SettingValue::Boolean(false));

        settings.save().unwrap();
        settings.reload();

        assert_eq!(settings.get("wrap").unwrap(), SettingValue::Boolean(false));
    }

    #[test]
    fn test_save_with_no_overrides_does_not_touch_store() {
        // Arrange: any store call would fail the test.
        let mut mock = MockPersistedStore::new();
        mock.expect_set().never();
        mock.expect_save().never();
        let settings = ConfigSettings::new(Rc::new(mock));

        // Act / Assert
        settings.save().expect("empty save is a no-op");
    }

    #[test]
    fn test_save_writes_each_override_then_persists_once() {
        let mut mock = MockPersistedStore::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_set()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_, _| ());
        mock.expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));
        let settings = ConfigSettings::new(Rc::new(mock));
        settings.set_user_specified("a", int(1));
        settings.set_user_specified("b", int(2));

        settings.save().unwrap();

        assert!(!settings.has_user_specified());
    }

    #[test]
    fn test_failed_save_keeps_overrides() {
        // Arrange
        let store = Rc::new(MemoryStore::new());
        store.fail_saves(true);
        let settings = settings_with(&store);
        settings.set_user_specified("tabSize", int(4));

        // Act
        let result = settings.save();

        // Assert
        assert!(matches!(result, Err(SettingsError::Store(StoreError::Rejected(_)))));
        assert!(settings.has_user_specified());
        assert_eq!(settings.user_specified("tabSize"), Some(int(4)));
        assert_eq!(settings.get("tabSize").unwrap(), int(4));
    }

    #[test]
    fn test_save_survives_reentrant_reload_from_store_notification() {
        // Arrange: the store notifies on every `set`, and the subscriber
        // reloads this very instance while `save` is running.
        let store = Rc::new(MemoryStore::new());
        let settings = Rc::new(settings_with(&store));
        let weak = Rc::downgrade(&settings);
        store.subscribe(Box::new(move || {
            if let Some(settings) = weak.upgrade() {
                settings.reload();
            }
        }));
        settings.set_user_specified("x", int(1));

        // Act
        settings.save().unwrap();

        // Assert
        assert!(!settings.has_user_specified());
        assert_eq!(settings.get("x").unwrap(), int(1));
    }

    #[test]
    fn test_debug_output_names_both_layers() {
        let store = Rc::new(MemoryStore::new());
        let settings = settings_with(&store);
        settings.set_user_specified("x", int(1));

        let rendered = format!("{settings:?}");

        assert!(rendered.contains("user_specified"));
        assert!(rendered.contains("resolved"));
    }
}
