//! The window configuration commands.
//!
//! Every command runs against the settings of one window and ends in one of
//! two ways:
//!
//! - [`CommandStep::Done`] with a status message for the status bar, or
//! - [`CommandStep::Prompt`] when an argument is missing.  The dispatcher
//!   shows the prompt and later calls [`WindowCommand::resume`] with the
//!   user's answer.
//!
//! | Command                  | Enabled when           | Prompts for   |
//! |--------------------------|------------------------|---------------|
//! | `update_window_settings` | always                 | –             |
//! | `clear_window_settings`  | window has overrides   | –             |
//! | `save_window_settings`   | window has overrides   | –             |
//! | `set_window_setting`     | always                 | name, value   |
//! | `unset_window_setting`   | always                 | name          |

use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, warn};
use wincfg_core::{ConfigSettings, SettingValue, SettingsMap};

use super::prompt::{PromptOutcome, PromptRequest};

/// Named arguments passed to a command (`{"name": ..., "value": ...}`).
pub type CommandArgs = BTreeMap<String, SettingValue>;

pub const UPDATE_WINDOW_SETTINGS: &str = "update_window_settings";
pub const CLEAR_WINDOW_SETTINGS: &str = "clear_window_settings";
pub const SAVE_WINDOW_SETTINGS: &str = "save_window_settings";
pub const SET_WINDOW_SETTING: &str = "set_window_setting";
pub const UNSET_WINDOW_SETTING: &str = "unset_window_setting";

/// Every command name, in menu order.
pub const COMMAND_NAMES: [&str; 5] = [
    UPDATE_WINDOW_SETTINGS,
    CLEAR_WINDOW_SETTINGS,
    SAVE_WINDOW_SETTINGS,
    SET_WINDOW_SETTING,
    UNSET_WINDOW_SETTING,
];

const NAME_PROMPT: &str = "Enter window configuration variable name:";
const EMPTY_NAME: &str = "Window configuration variable name must not be empty.";

/// A short, user-visible outcome message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a command wants next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStep {
    /// Show this prompt, then resume the command with the outcome.
    Prompt(PromptRequest),
    /// The command finished.
    Done(StatusMessage),
}

/// A user-facing action on the active window's settings.
pub trait WindowCommand {
    /// Registered command name.
    fn name(&self) -> &'static str;

    /// One-line description for menus and help.
    fn description(&self) -> &'static str;

    /// Whether the command applies to `settings` right now.
    fn is_enabled(&self, _settings: &ConfigSettings) -> bool {
        true
    }

    /// Starts the command with the arguments it was invoked with.
    fn run(&mut self, settings: &ConfigSettings, args: CommandArgs) -> CommandStep;

    /// Continues after a prompt returned by `run` or a previous `resume`.
    fn resume(&mut self, _settings: &ConfigSettings, _outcome: PromptOutcome) -> CommandStep {
        CommandStep::Done(StatusMessage::new(format!(
            "'{}' is not waiting for input.",
            self.name()
        )))
    }
}

/// Builds a fresh command instance for a registered name.
pub fn command_by_name(name: &str) -> Option<Box<dyn WindowCommand>> {
    let command: Box<dyn WindowCommand> = match name {
        UPDATE_WINDOW_SETTINGS => Box::new(UpdateWindowSettings),
        CLEAR_WINDOW_SETTINGS => Box::new(ClearWindowSettings),
        SAVE_WINDOW_SETTINGS => Box::new(SaveWindowSettings),
        SET_WINDOW_SETTING => Box::new(SetWindowSetting::default()),
        UNSET_WINDOW_SETTING => Box::new(UnsetWindowSetting::default()),
        _ => return None,
    };
    Some(command)
}

/// Interprets typed text as a TOML literal, falling back to a plain string.
///
/// `4` becomes an integer, `true` a boolean, `[1, 2]` an array and `"x"` the
/// string `x`.  Anything that does not parse, and any text spanning several
/// lines, is kept verbatim as a string.
pub fn parse_value(text: &str) -> SettingValue {
    if text.contains(['\n', '\r']) {
        return SettingValue::String(text.to_string());
    }
    toml::from_str::<toml::Table>(&format!("value = {text}"))
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| SettingValue::String(text.to_string()))
}

// ── update / clear / save ─────────────────────────────────────────────────────

/// Merges the invocation arguments into the window's resolved view.
///
/// The values are session-only ad-hoc values, not user-specified overrides.
pub struct UpdateWindowSettings;

impl WindowCommand for UpdateWindowSettings {
    fn name(&self) -> &'static str {
        UPDATE_WINDOW_SETTINGS
    }

    fn description(&self) -> &'static str {
        "Updates the current window's settings based on the inputs."
    }

    fn run(&mut self, settings: &ConfigSettings, args: CommandArgs) -> CommandStep {
        debug!("updating {} window setting(s)", args.len());
        settings.update(args);
        CommandStep::Done(StatusMessage::new("Window configuration updated."))
    }
}

pub struct ClearWindowSettings;

impl WindowCommand for ClearWindowSettings {
    fn name(&self) -> &'static str {
        CLEAR_WINDOW_SETTINGS
    }

    fn description(&self) -> &'static str {
        "Clears any non-default values from the window settings."
    }

    fn is_enabled(&self, settings: &ConfigSettings) -> bool {
        settings.has_user_specified()
    }

    fn run(&mut self, settings: &ConfigSettings, _args: CommandArgs) -> CommandStep {
        settings.clear();
        CommandStep::Done(StatusMessage::new(
            "Window configuration cleared to defaults.",
        ))
    }
}

pub struct SaveWindowSettings;

impl WindowCommand for SaveWindowSettings {
    fn name(&self) -> &'static str {
        SAVE_WINDOW_SETTINGS
    }

    fn description(&self) -> &'static str {
        "Saves the current window settings to the defaults."
    }

    fn is_enabled(&self, settings: &ConfigSettings) -> bool {
        settings.has_user_specified()
    }

    fn run(&mut self, settings: &ConfigSettings, _args: CommandArgs) -> CommandStep {
        match settings.save() {
            Ok(()) => CommandStep::Done(StatusMessage::new(
                "Window configuration saved to defaults.",
            )),
            Err(e) => {
                warn!("saving window configuration failed: {e}");
                CommandStep::Done(StatusMessage::new(format!(
                    "Failed to save window configuration: {e}"
                )))
            }
        }
    }
}

// ── set one / unset one ───────────────────────────────────────────────────────

/// Which answer a prompting command is waiting for.
#[derive(Debug, Default)]
enum SetStage {
    #[default]
    Idle,
    /// Waiting for the name; the value may already be known from arguments.
    AwaitingName { value: Option<SettingValue> },
    AwaitingValue { name: String },
}

/// Sets one user-specified override, prompting for a missing name or value.
#[derive(Debug, Default)]
pub struct SetWindowSetting {
    stage: SetStage,
}

impl SetWindowSetting {
    fn cancelled() -> CommandStep {
        CommandStep::Done(StatusMessage::new(
            "Window configuration variable setting cancelled.",
        ))
    }

    fn accept_name(
        &mut self,
        settings: &ConfigSettings,
        name: &str,
        value: Option<SettingValue>,
    ) -> CommandStep {
        let name = name.trim();
        if name.is_empty() {
            return CommandStep::Done(StatusMessage::new(EMPTY_NAME));
        }
        match value {
            Some(value) => Self::apply(settings, name, value),
            None => {
                self.stage = SetStage::AwaitingValue {
                    name: name.to_string(),
                };
                CommandStep::Prompt(PromptRequest::new(format!("Enter {name}:")))
            }
        }
    }

    fn apply(settings: &ConfigSettings, name: &str, value: SettingValue) -> CommandStep {
        settings.set_user_specified(name, value);
        CommandStep::Done(StatusMessage::new(format!(
            "Window configuration variable '{name}' set."
        )))
    }
}

impl WindowCommand for SetWindowSetting {
    fn name(&self) -> &'static str {
        SET_WINDOW_SETTING
    }

    fn description(&self) -> &'static str {
        "Uses {\"name\": name, \"value\": value} to set the window setting. \
         It prompts if either argument is missing."
    }

    fn run(&mut self, settings: &ConfigSettings, mut args: CommandArgs) -> CommandStep {
        let value = args.remove("value");
        match args.remove("name") {
            Some(SettingValue::String(name)) => self.accept_name(settings, &name, value),
            Some(_) => CommandStep::Done(StatusMessage::new(EMPTY_NAME)),
            None => {
                self.stage = SetStage::AwaitingName { value };
                CommandStep::Prompt(PromptRequest::new(NAME_PROMPT))
            }
        }
    }

    fn resume(&mut self, settings: &ConfigSettings, outcome: PromptOutcome) -> CommandStep {
        let stage = std::mem::take(&mut self.stage);
        let text = match outcome {
            PromptOutcome::Cancelled => return Self::cancelled(),
            PromptOutcome::Confirmed(text) => text,
        };
        match stage {
            SetStage::AwaitingName { value } => self.accept_name(settings, &text, value),
            SetStage::AwaitingValue { name } => Self::apply(settings, &name, parse_value(&text)),
            SetStage::Idle => Self::cancelled(),
        }
    }
}

/// Removes one user-specified override, prompting for a missing name.
#[derive(Debug, Default)]
pub struct UnsetWindowSetting {
    awaiting_name: bool,
}

impl UnsetWindowSetting {
    fn apply(settings: &ConfigSettings, name: &str) -> CommandStep {
        let name = name.trim();
        if name.is_empty() {
            return CommandStep::Done(StatusMessage::new(EMPTY_NAME));
        }
        settings.unset_user_specified(name);
        CommandStep::Done(StatusMessage::new(format!(
            "Window configuration variable '{name}' unset."
        )))
    }

    fn cancelled() -> CommandStep {
        CommandStep::Done(StatusMessage::new(
            "Window configuration variable unsetting cancelled.",
        ))
    }
}

impl WindowCommand for UnsetWindowSetting {
    fn name(&self) -> &'static str {
        UNSET_WINDOW_SETTING
    }

    fn description(&self) -> &'static str {
        "Uses {\"name\": name} to unset the window setting. It prompts if the argument is missing."
    }

    fn run(&mut self, settings: &ConfigSettings, mut args: CommandArgs) -> CommandStep {
        match args.remove("name") {
            Some(SettingValue::String(name)) => Self::apply(settings, &name),
            Some(_) => CommandStep::Done(StatusMessage::new(EMPTY_NAME)),
            None => {
                self.awaiting_name = true;
                CommandStep::Prompt(PromptRequest::new(NAME_PROMPT))
            }
        }
    }

    fn resume(&mut self, settings: &ConfigSettings, outcome: PromptOutcome) -> CommandStep {
        let was_waiting = std::mem::replace(&mut self.awaiting_name, false);
        match outcome {
            PromptOutcome::Confirmed(name) if was_waiting => Self::apply(settings, &name),
            _ => Self::cancelled(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
