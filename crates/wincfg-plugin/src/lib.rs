//! wincfg-plugin library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the plugin layer do? (for beginners)
//!
//! The core crate (`wincfg-core`) knows how to resolve one window's settings.
//! This crate is the glue around it:
//!
//! 1. **Commands** translate user actions (update, clear, save, set one,
//!    unset one) into calls on the window's settings, prompting for missing
//!    arguments and reporting every outcome as a short status message.
//! 2. **Storage** reads the plugin configuration and keeps the persisted
//!    defaults in a TOML file, noticing when someone edits that file.
//! 3. **Host** adapters stand in for the editor: active-window tracking, the
//!    input panel, the status bar, and a line-based console driving it all.

/// Application layer: commands, prompt continuations, and dispatch.
pub mod application;

/// Infrastructure layer: configuration, TOML-backed store, console host.
pub mod infrastructure;
