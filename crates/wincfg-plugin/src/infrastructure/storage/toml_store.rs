//! [`PersistedStore`] backed by a TOML file on disk.
//!
//! The whole file is one flat TOML table.  Keys written by the settings core
//! carry the `default_` prefix; other keys in the same file are preserved
//! untouched.
//!
//! ```toml
//! default_tabSize = 4
//! default_wordWrap = false
//! ```
//!
//! # External edits
//!
//! The file may be changed by another process (or by hand).  The host calls
//! [`TomlFileStore::poll_external_change`] periodically; when the file text
//! differs from what this store last read or wrote, the table is replaced and
//! the change subscriber fires, which makes every open window reload.

use std::cell::RefCell;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};
use wincfg_core::{ChangeCallback, PersistedStore, SettingValue, StoreError};

/// TOML file store with one change subscriber.
pub struct TomlFileStore {
    path: PathBuf,
    table: RefCell<toml::Table>,
    /// File text as last read or written; `None` when the file did not exist.
    last_text: RefCell<Option<String>>,
    subscriber: RefCell<Option<Rc<dyn Fn()>>>,
}

impl TomlFileStore {
    /// Opens the store at `path`.  A missing file is an empty store; the
    /// file is created on the first [`save`](PersistedStore::save).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read, and
    /// [`StoreError::Parse`] if it is not valid TOML.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let text = read_optional(&path)?;
        let table = parse_table(text.as_deref())?;
        info!(
            "opened settings resource {} ({} keys)",
            path.display(),
            table.len()
        );
        Ok(Self {
            path,
            table: RefCell::new(table),
            last_text: RefCell::new(text),
            subscriber: RefCell::new(None),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of keys currently held in memory.
    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.borrow().is_empty()
    }

    /// Re-reads the file and adopts its content if it changed externally.
    ///
    /// Returns `true` when the content changed and the subscriber was
    /// notified.  A file that was deleted counts as an empty table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be read and
    /// [`StoreError::Parse`] if the new text is not valid TOML.  In both cases
    /// the in-memory table is left as it was.
    pub fn poll_external_change(&self) -> Result<bool, StoreError> {
        let text = read_optional(&self.path)?;
        if *self.last_text.borrow() == text {
            return Ok(false);
        }

        let table = parse_table(text.as_deref())?;
        debug!(
            "settings resource {} changed externally ({} keys)",
            self.path.display(),
            table.len()
        );
        *self.table.borrow_mut() = table;
        *self.last_text.borrow_mut() = text;
        self.notify();
        Ok(true)
    }

    fn notify(&self) {
        // Clone out so the callback may call back into this store.
        let callback = self.subscriber.borrow().clone();
        if let Some(callback) = callback {
            callback();
        }
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            resource: self.path.display().to_string(),
            source,
        }
    }
}

impl PersistedStore for TomlFileStore {
    fn get(&self, key: &str) -> Option<SettingValue> {
        self.table.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: SettingValue) {
        self.table.borrow_mut().insert(key.to_string(), value);
        self.notify();
    }

    /// Writes the table to a sibling temp file, then renames it over the
    /// target so readers never observe a half-written file.  The temp file is
    /// removed again if the rename fails.
    fn save(&self) -> Result<(), StoreError> {
        let text = toml::to_string(&*self.table.borrow())?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;
        }
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);
        std::fs::write(&tmp_path, &text).map_err(|e| self.io_error(e))?;
        if let Err(e) = std::fs::rename(&tmp_path, &self.path) {
            std::fs::remove_file(&tmp_path).ok();
            return Err(self.io_error(e));
        }

        info!("saved settings resource {}", self.path.display());
        *self.last_text.borrow_mut() = Some(text);
        Ok(())
    }

    fn subscribe(&self, on_change: ChangeCallback) {
        *self.subscriber.borrow_mut() = Some(Rc::from(on_change));
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            resource: path.display().to_string(),
            source,
        }),
    }
}

fn parse_table(text: Option<&str>) -> Result<toml::Table, StoreError> {
    match text {
        Some(text) => Ok(toml::from_str(text)?),
        None => Ok(toml::Table::new()),
    }
}
