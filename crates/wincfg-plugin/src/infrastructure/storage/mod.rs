//! Storage infrastructure: file persistence.
//!
//! - `config` reads and writes the plugin's own `config.toml` from the
//!   platform-appropriate directory, with defaults on first run.
//! - `toml_store` is the [`wincfg_core::PersistedStore`] backed by the
//!   persisted-defaults TOML file.

pub mod config;
pub mod toml_store;

pub use toml_store::TomlFileStore;
