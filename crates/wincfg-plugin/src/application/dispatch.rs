//! CommandDispatcher: routes user actions to the active window's settings.
//!
//! The dispatcher is the only place that knows how a command finds its
//! settings:
//!
//! 1. the window of the view the command came from, if any;
//! 2. otherwise the host's active window;
//! 3. otherwise a detached settings instance.
//!
//! # Prompt continuations (for beginners)
//!
//! A command that needs input returns a prompt instead of finishing.  The
//! dispatcher shows the prompt through the [`InputPanel`] and parks the
//! command together with the settings handle it started on.  The user's
//! answer arrives later as a separate event through
//! [`CommandDispatcher::complete_prompt`].
//!
//! At most one prompt is open at a time.  Starting another command while one
//! is open dismisses the open prompt first, exactly as if the user had
//! cancelled it.

use std::rc::Rc;

use thiserror::Error;
use tracing::{debug, info};
use wincfg_core::{SettingsHandle, SettingsRegistry, WindowId};

use super::commands::{command_by_name, CommandArgs, CommandStep, StatusMessage, WindowCommand};
use super::prompt::{PromptOutcome, PromptRequest};

/// Source of the host's active window.
pub trait WindowSource {
    /// The focused window, or `None` when no window is active.
    fn active_window(&self) -> Option<WindowId>;
}

/// Host input panel.
pub trait InputPanel {
    /// Shows `request`; the answer comes back through
    /// [`CommandDispatcher::complete_prompt`].
    fn show_input_panel(&self, request: &PromptRequest);
}

/// Host status bar.
pub trait StatusSink {
    fn set_status(&self, message: &StatusMessage);
}

/// Error type for dispatch operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("no prompt is waiting for input")]
    NoPendingPrompt,
}

/// Result of running or resuming a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The command finished; the message was sent to the status sink.
    Completed(StatusMessage),
    /// The command is parked until the prompt is answered.
    AwaitingInput(PromptRequest),
}

struct PendingPrompt {
    command: Box<dyn WindowCommand>,
    settings: SettingsHandle,
    request: PromptRequest,
}

/// Routes commands, prompt answers, and window-close events.
pub struct CommandDispatcher {
    registry: Rc<SettingsRegistry>,
    windows: Rc<dyn WindowSource>,
    panel: Rc<dyn InputPanel>,
    status: Rc<dyn StatusSink>,
    pending: Option<PendingPrompt>,
}

impl CommandDispatcher {
    pub fn new(
        registry: Rc<SettingsRegistry>,
        windows: Rc<dyn WindowSource>,
        panel: Rc<dyn InputPanel>,
        status: Rc<dyn StatusSink>,
    ) -> Self {
        Self {
            registry,
            windows,
            panel,
            status,
            pending: None,
        }
    }

    /// Runs `name` for the window of `view_window` (or the active window).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownCommand`] if `name` is not registered.
    /// An open prompt is left untouched in that case.
    pub fn run_command(
        &mut self,
        name: &str,
        view_window: Option<WindowId>,
        args: CommandArgs,
    ) -> Result<DispatchOutcome, DispatchError> {
        let mut command =
            command_by_name(name).ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))?;
        self.cancel_pending();

        let settings = self.settings_for(view_window);
        if !command.is_enabled(&settings) {
            debug!("command '{name}' is disabled for this window");
            let message = StatusMessage::new(format!("'{name}' is not available for this window."));
            self.status.set_status(&message);
            return Ok(DispatchOutcome::Completed(message));
        }

        info!("running command '{name}'");
        let step = command.run(&settings, args);
        Ok(self.advance(command, settings, step))
    }

    /// Delivers the answer to the open prompt.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::NoPendingPrompt`] if no prompt is open.
    pub fn complete_prompt(
        &mut self,
        outcome: PromptOutcome,
    ) -> Result<DispatchOutcome, DispatchError> {
        let PendingPrompt {
            mut command,
            settings,
            ..
        } = self.pending.take().ok_or(DispatchError::NoPendingPrompt)?;
        let step = command.resume(&settings, outcome);
        Ok(self.advance(command, settings, step))
    }

    /// Dismisses the open prompt, if any, and returns its cancellation status.
    pub fn cancel_pending(&mut self) -> Option<StatusMessage> {
        if self.pending.is_none() {
            return None;
        }
        match self.complete_prompt(PromptOutcome::Cancelled) {
            Ok(DispatchOutcome::Completed(message)) => Some(message),
            _ => None,
        }
    }

    /// The prompt currently waiting for an answer.
    pub fn pending_prompt(&self) -> Option<&PromptRequest> {
        self.pending.as_ref().map(|pending| &pending.request)
    }

    pub fn has_pending_prompt(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether `name` would run (rather than report "not available") now.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownCommand`] if `name` is not registered.
    pub fn is_enabled(
        &self,
        name: &str,
        view_window: Option<WindowId>,
    ) -> Result<bool, DispatchError> {
        let command =
            command_by_name(name).ok_or_else(|| DispatchError::UnknownCommand(name.to_string()))?;
        Ok(command.is_enabled(&self.settings_for(view_window)))
    }

    /// Host notification that a window closed.
    pub fn window_closed(&mut self, id: WindowId) -> bool {
        self.registry.close(id)
    }

    /// Settings of the view's window, else the active window, else detached.
    pub fn settings_for(&self, view_window: Option<WindowId>) -> SettingsHandle {
        let window = view_window.or_else(|| self.windows.active_window());
        self.registry.settings_for(window)
    }

    pub fn registry(&self) -> &SettingsRegistry {
        &self.registry
    }

    fn advance(
        &mut self,
        command: Box<dyn WindowCommand>,
        settings: SettingsHandle,
        step: CommandStep,
    ) -> DispatchOutcome {
        match step {
            CommandStep::Prompt(request) => {
                debug!("command '{}' waiting for input", command.name());
                self.panel.show_input_panel(&request);
                self.pending = Some(PendingPrompt {
                    command,
                    settings,
                    request: request.clone(),
                });
                DispatchOutcome::AwaitingInput(request)
            }
            CommandStep::Done(message) => {
                self.status.set_status(&message);
                DispatchOutcome::Completed(message)
            }
        }
    }
}
