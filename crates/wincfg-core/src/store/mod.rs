//! Persisted defaults: the store collaborator.
//!
//! The plugin's defaults live in a named key/value resource owned by the host
//! (a settings file).  The core only needs four things from it, captured by
//! [`PersistedStore`]:
//!
//! - `get` / `set` of individual keys,
//! - `save` to flush the resource to durable storage,
//! - one process-wide change subscription that fires whenever the resource's
//!   content changes, including edits made outside this process.
//!
//! Keys written by the core are namespaced with [`DEFAULT_KEY_PREFIX`] so they
//! cannot collide with other plugin settings stored in the same resource.
//!
//! # Testability
//!
//! [`memory::MemoryStore`] is a complete in-memory implementation used by the
//! unit tests, benchmarks, and any embedder that does not need a file.

use thiserror::Error;

use crate::SettingValue;

pub mod memory;

/// Prefix applied to every setting name when it is stored as a default.
pub const DEFAULT_KEY_PREFIX: &str = "default_";

/// Callback invoked when the store's backing content changes.
pub type ChangeCallback = Box<dyn Fn()>;

/// Builds the store key for a setting name (`tabSize` → `default_tabSize`).
pub fn default_key(name: &str) -> String {
    format!("{DEFAULT_KEY_PREFIX}{name}")
}

/// Error type for store persistence.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing resource could not be read or written.
    #[error("I/O error accessing settings resource {resource}: {source}")]
    Io {
        resource: String,
        #[source]
        source: std::io::Error,
    },

    /// The backing resource does not contain valid TOML.
    #[error("failed to parse settings resource: {0}")]
    Parse(#[from] toml::de::Error),

    /// The in-memory content could not be serialized.
    #[error("failed to serialize settings resource: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The store refused the operation (read-only resource, injected failure).
    #[error("settings resource rejected the write: {0}")]
    Rejected(String),
}

/// A named key/value settings resource.
///
/// Implementations use interior mutability: a single store is shared (via
/// `Rc`) by every settings instance in the process.
///
/// Implementations must not hold internal borrows while invoking the change
/// callback; the callback reloads settings instances, which may call back
/// into `get`.
#[cfg_attr(test, mockall::automock)]
pub trait PersistedStore {
    /// Returns the value stored under `key`, or `None` if the key is absent.
    fn get(&self, key: &str) -> Option<SettingValue>;

    /// Stores `value` under `key` in memory.  Not durable until [`save`].
    ///
    /// [`save`]: PersistedStore::save
    fn set(&self, key: &str, value: SettingValue);

    /// Flushes the in-memory content to the backing resource.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the resource cannot be written.
    fn save(&self) -> Result<(), StoreError>;

    /// Installs the change subscriber, replacing any previous one.
    fn subscribe(&self, on_change: ChangeCallback);
}
