//! Infrastructure layer for the plugin.
//!
//! Contains the adapters that touch the outside world: the TOML settings
//! file, the plugin's own configuration file, and the console host that
//! stands in for an editor.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `wincfg_core`, but MUST NOT be imported by the `application` layer
//! (tests excepted, which borrow the recording mocks).

pub mod host;
pub mod storage;
