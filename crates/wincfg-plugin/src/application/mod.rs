//! Application layer: the window configuration commands.
//!
//! Code in this layer orchestrates the core's [`wincfg_core::ConfigSettings`]
//! to fulfil a user action.  It depends on abstractions only: the editor's
//! window model, input panel, and status bar are traits defined in
//! [`dispatch`] and implemented in the infrastructure layer.
//!
//! # Sub-modules
//!
//! - **`prompt`**   – The two-arm prompt continuation (`Confirmed` /
//!   `Cancelled`) that replaces input-panel callbacks.
//! - **`commands`** – The five user-facing commands.  Each one either
//!   finishes with a status message or asks for input and waits.
//! - **`dispatch`** – Resolves the active window's settings, checks that a
//!   command is enabled, and parks a command while its prompt is open.

pub mod commands;
pub mod dispatch;
pub mod prompt;
