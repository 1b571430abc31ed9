//! Recording host adapters for tests.
//!
//! Each mock stores what the dispatcher asked of it so tests can assert on
//! the exact prompts and status lines a flow produced.

use std::cell::{Cell, RefCell};

use wincfg_core::WindowId;

use crate::application::commands::StatusMessage;
use crate::application::dispatch::{InputPanel, StatusSink, WindowSource};
use crate::application::prompt::PromptRequest;

/// Status sink that records every message.
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    messages: RefCell<Vec<String>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.messages.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.messages.borrow_mut().clear();
    }
}

impl StatusSink for RecordingStatusSink {
    fn set_status(&self, message: &StatusMessage) {
        self.messages.borrow_mut().push(message.to_string());
    }
}

/// Input panel that records every prompt it was asked to show.
#[derive(Debug, Default)]
pub struct RecordingInputPanel {
    requests: RefCell<Vec<PromptRequest>>,
}

impl RecordingInputPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> Vec<PromptRequest> {
        self.requests.borrow().clone()
    }

    /// Captions of every prompt shown, in order.
    pub fn messages(&self) -> Vec<String> {
        self.requests
            .borrow()
            .iter()
            .map(|request| request.message.clone())
            .collect()
    }
}

impl InputPanel for RecordingInputPanel {
    fn show_input_panel(&self, request: &PromptRequest) {
        self.requests.borrow_mut().push(request.clone());
    }
}

/// Window source whose active window is set by the test.
#[derive(Debug, Default)]
pub struct FixedWindowSource {
    active: Cell<Option<WindowId>>,
}

impl FixedWindowSource {
    pub fn new(active: Option<WindowId>) -> Self {
        Self {
            active: Cell::new(active),
        }
    }

    pub fn set_active(&self, active: Option<WindowId>) {
        self.active.set(active);
    }
}

impl WindowSource for FixedWindowSource {
    fn active_window(&self) -> Option<WindowId> {
        self.active.get()
    }
}
