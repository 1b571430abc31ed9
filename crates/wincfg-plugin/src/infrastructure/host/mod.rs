//! Headless console host.
//!
//! Stands in for the editor: it tracks which windows are open and active,
//! turns console lines into dispatcher calls, and prints prompts and status
//! lines.
//!
//! # Event flow
//!
//! ```text
//!   stdin line ──► ConsoleHost::handle_line
//!                    │ prompt open?  ──► CommandDispatcher::complete_prompt
//!                    │ otherwise     ──► HostEvent::parse
//!                    ▼
//!      open/focus/close ──► ActiveWindowTracker (+ registry.close)
//!      run              ──► CommandDispatcher::run_command
//!      get/has/del/list ──► the active window's SettingsMap
//! ```

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use tracing::{info, warn};
use wincfg_core::{SettingsMap, SettingsRegistry, WindowId};

use crate::application::commands::StatusMessage;
use crate::application::dispatch::{CommandDispatcher, InputPanel, StatusSink, WindowSource};

pub mod console;
pub mod mock;

pub use console::{prompt_outcome, HostEvent, ParseError};

// ── Console adapters ──────────────────────────────────────────────────────────

/// Prints status messages, one per line.
pub struct ConsoleStatusSink<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> ConsoleStatusSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl ConsoleStatusSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> StatusSink for ConsoleStatusSink<W> {
    fn set_status(&self, message: &StatusMessage) {
        let mut out = self.out.borrow_mut();
        if let Err(e) = writeln!(out, "{message}").and_then(|()| out.flush()) {
            warn!("failed to write status line: {e}");
        }
    }
}

/// Prints a prompt caption followed by `> ` and any pre-filled text.
pub struct ConsoleInputPanel<W: Write> {
    out: RefCell<W>,
}

impl<W: Write> ConsoleInputPanel<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: RefCell::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }
}

impl ConsoleInputPanel<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> InputPanel for ConsoleInputPanel<W> {
    fn show_input_panel(&self, request: &crate::application::prompt::PromptRequest) {
        let mut out = self.out.borrow_mut();
        let written = writeln!(out, "{}", request.message)
            .and_then(|()| write!(out, "> {}", request.initial_text))
            .and_then(|()| out.flush());
        if let Err(e) = written {
            warn!("failed to write prompt: {e}");
        }
    }
}

// ── Window tracking ───────────────────────────────────────────────────────────

/// Open windows in activation order; the last one is active.
#[derive(Debug, Default)]
pub struct ActiveWindowTracker {
    stack: RefCell<Vec<WindowId>>,
}

impl ActiveWindowTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a newly opened window and activates it.
    pub fn open(&self, id: WindowId) {
        let mut stack = self.stack.borrow_mut();
        stack.retain(|&w| w != id);
        stack.push(id);
    }

    /// Activates an open window.  Returns `false` if `id` is not open.
    pub fn focus(&self, id: WindowId) -> bool {
        let mut stack = self.stack.borrow_mut();
        match stack.iter().position(|&w| w == id) {
            Some(index) => {
                stack.remove(index);
                stack.push(id);
                true
            }
            None => false,
        }
    }

    /// Forgets a window; the previously active one becomes active again.
    pub fn close(&self, id: WindowId) -> bool {
        let mut stack = self.stack.borrow_mut();
        let before = stack.len();
        stack.retain(|&w| w != id);
        stack.len() != before
    }

    pub fn open_windows(&self) -> Vec<WindowId> {
        self.stack.borrow().clone()
    }
}

impl WindowSource for ActiveWindowTracker {
    fn active_window(&self) -> Option<WindowId> {
        self.stack.borrow().last().copied()
    }
}

// ── Host ──────────────────────────────────────────────────────────────────────

/// Whether the host loop should keep reading lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostControl {
    Continue,
    Quit,
}

/// Console editor host.
pub struct ConsoleHost {
    registry: Rc<SettingsRegistry>,
    windows: Rc<ActiveWindowTracker>,
    status: Rc<dyn StatusSink>,
    dispatcher: CommandDispatcher,
}

impl ConsoleHost {
    pub fn new(
        registry: Rc<SettingsRegistry>,
        panel: Rc<dyn InputPanel>,
        status: Rc<dyn StatusSink>,
    ) -> Self {
        let windows = Rc::new(ActiveWindowTracker::new());
        let dispatcher = CommandDispatcher::new(
            Rc::clone(&registry),
            Rc::clone(&windows) as Rc<dyn WindowSource>,
            panel,
            Rc::clone(&status),
        );
        Self {
            registry,
            windows,
            status,
            dispatcher,
        }
    }

    pub fn windows(&self) -> &ActiveWindowTracker {
        &self.windows
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    /// Handles one console line.
    pub fn handle_line(&mut self, line: &str) -> HostControl {
        if self.dispatcher.has_pending_prompt() {
            if let Err(e) = self.dispatcher.complete_prompt(prompt_outcome(line)) {
                self.report(e.to_string());
            }
            return HostControl::Continue;
        }

        match HostEvent::parse(line) {
            Ok(event) => self.handle_event(event),
            Err(ParseError::Empty) => HostControl::Continue,
            Err(e) => {
                self.report(e.to_string());
                HostControl::Continue
            }
        }
    }

    /// Handles end of input: an open prompt is dismissed.
    pub fn shutdown(&mut self) {
        self.dispatcher.cancel_pending();
        info!("host shutting down with {} open windows", self.registry.len());
    }

    fn handle_event(&mut self, event: HostEvent) -> HostControl {
        match event {
            HostEvent::Open(id) => {
                self.windows.open(id);
                info!("window {id} opened");
            }
            HostEvent::Focus(id) => {
                if !self.windows.focus(id) {
                    self.report(format!("Window {id} is not open."));
                }
            }
            HostEvent::Close(id) => {
                self.windows.close(id);
                self.dispatcher.window_closed(id);
                info!("window {id} closed");
            }
            HostEvent::Run { command, args } => {
                if let Err(e) = self.dispatcher.run_command(&command, None, args) {
                    self.report(e.to_string());
                }
            }
            HostEvent::Get(name) => {
                let settings = self.dispatcher.settings_for(None);
                match settings.get(&name) {
                    Ok(value) => self.report(format!("{name} = {value}")),
                    Err(e) => self.report(e.to_string()),
                }
            }
            HostEvent::Has(name) => {
                let present = self.dispatcher.settings_for(None).contains(&name);
                self.report(format!("{name}: {present}"));
            }
            HostEvent::Del(name) => {
                let settings = self.dispatcher.settings_for(None);
                match settings.delete(&name) {
                    Ok(_) => self.report(format!("Deleted '{name}'.")),
                    Err(e) => self.report(e.to_string()),
                }
            }
            HostEvent::List => self.list(),
            HostEvent::Reload => {
                self.registry.reload_all();
                self.report(format!("Reloaded {} windows.", self.registry.len()));
            }
            HostEvent::Quit => return HostControl::Quit,
        }
        HostControl::Continue
    }

    /// Reports the resolved view; user-specified entries are marked with `*`.
    fn list(&self) {
        let settings = self.dispatcher.settings_for(None);
        let entries = settings.entries();
        if entries.is_empty() {
            self.report("No window settings resolved.".to_string());
            return;
        }
        for (name, value) in entries {
            let marker = if settings.user_specified(&name).is_some() {
                "*"
            } else {
                " "
            };
            self.report(format!("{marker} {name} = {value}"));
        }
    }

    fn report(&self, text: String) {
        self.status.set_status(&StatusMessage::new(text));
    }
}
