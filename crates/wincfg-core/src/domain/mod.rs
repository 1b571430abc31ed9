//! Domain entities for per-window settings.
//!
//! Nothing in here touches the file system or the host editor.  The only
//! outward dependency is the [`crate::store::PersistedStore`] trait, which is
//! injected, so every type can be tested with an in-memory store.

/// One settings instance per open window, plus detached instances.
pub mod registry;

/// The layered settings mapping.
pub mod settings;
