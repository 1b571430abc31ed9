//! # wincfg-core
//!
//! Per-window configuration overrides for an editor plugin.
//!
//! A user can set, unset, save, or clear settings scoped to the active editor
//! window.  Reads fall back to plugin-wide defaults kept in a persisted store
//! whenever the window has no override of its own.
//!
//! # Architecture overview (for beginners)
//!
//! Three layers of state are folded into one read/write view:
//!
//! - **User-specified overrides** – values the user set for this window during
//!   the current session.
//! - **Persisted defaults** – values stored under `default_<name>` in the
//!   plugin's settings resource.
//! - **The live defaults file** – the resource can change underneath the
//!   process (another window saved, the user edited the file by hand).  The
//!   store reports such changes through a single change callback.
//!
//! The crate is split into:
//!
//! - **`domain`** – [`ConfigSettings`] (the layered mapping) and
//!   [`SettingsRegistry`] (exactly one settings instance per open window).
//! - **`store`** – the [`PersistedStore`] collaborator trait plus an in-memory
//!   implementation.  File-backed stores live with the host integration.
//!
//! Everything here is single-threaded by construction (`Rc`/`RefCell`), which
//! matches the editor's cooperative command-dispatch loop.

pub mod domain;
pub mod store;

pub use domain::registry::{SettingsHandle, SettingsRegistry, WindowId};
pub use domain::settings::{ConfigSettings, SettingsError, SettingsMap};
pub use store::memory::MemoryStore;
pub use store::{ChangeCallback, PersistedStore, StoreError, DEFAULT_KEY_PREFIX};

/// Opaque setting value.
///
/// The persisted format is TOML, so a value is anything TOML can represent.
pub type SettingValue = toml::Value;
