//! Line grammar of the console host.
//!
//! ```text
//! open <id>              a window opened and became active
//! focus <id>             an open window became active
//! close <id>             a window closed
//! run <command> [k=v ..] run a command for the active window
//! get <name>             read a setting of the active window
//! has <name>             test whether a setting resolves
//! del <name>             drop a setting from the resolved view
//! list                   show the resolved view
//! reload                 reload every open window
//! quit                   exit
//! ```
//!
//! While a prompt is open, a line is an answer instead (see [`prompt_outcome`]).

use thiserror::Error;
use wincfg_core::WindowId;

use crate::application::commands::{parse_value, CommandArgs};
use crate::application::prompt::PromptOutcome;

/// Line that dismisses an open prompt.
pub const CANCEL_LINE: &str = ":cancel";

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Open(WindowId),
    Focus(WindowId),
    Close(WindowId),
    Run { command: String, args: CommandArgs },
    Get(String),
    Has(String),
    Del(String),
    List,
    Reload,
    Quit,
}

/// Error type for console line parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// The line was blank.
    #[error("empty line")]
    Empty,

    #[error("unknown event '{0}'")]
    UnknownVerb(String),

    #[error("'{verb}' expects {expected}")]
    MissingArgument {
        verb: &'static str,
        expected: &'static str,
    },

    #[error("'{0}' is not a window id")]
    InvalidWindowId(String),

    #[error("expected key=value, got '{0}'")]
    InvalidArgument(String),
}

impl HostEvent {
    /// Parses one console line.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the line does not match the grammar.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut words = line.split_whitespace();
        let verb = words.next().ok_or(ParseError::Empty)?;

        match verb {
            "open" => Ok(Self::Open(window_id(words.next(), "open")?)),
            "focus" => Ok(Self::Focus(window_id(words.next(), "focus")?)),
            "close" => Ok(Self::Close(window_id(words.next(), "close")?)),
            "run" => {
                // Arguments may hold spaces inside quotes or brackets, so they
                // are split from the raw text rather than from `words`.
                let after_verb = line.trim_start()[verb.len()..].trim_start();
                let (command, rest) = split_first_word(after_verb);
                if command.is_empty() {
                    return Err(ParseError::MissingArgument {
                        verb: "run",
                        expected: "a command name",
                    });
                }
                let args = split_arguments(rest)
                    .into_iter()
                    .map(argument)
                    .collect::<Result<CommandArgs, _>>()?;
                Ok(Self::Run {
                    command: command.to_string(),
                    args,
                })
            }
            "get" => Ok(Self::Get(setting_name(words.next(), "get")?)),
            "has" => Ok(Self::Has(setting_name(words.next(), "has")?)),
            "del" => Ok(Self::Del(setting_name(words.next(), "del")?)),
            "list" => Ok(Self::List),
            "reload" => Ok(Self::Reload),
            "quit" | "exit" => Ok(Self::Quit),
            other => Err(ParseError::UnknownVerb(other.to_string())),
        }
    }
}

/// Interprets a line typed while a prompt is open.
pub fn prompt_outcome(line: &str) -> PromptOutcome {
    let answer = line.trim_end_matches(['\n', '\r']);
    if answer.trim() == CANCEL_LINE {
        PromptOutcome::Cancelled
    } else {
        PromptOutcome::Confirmed(answer.to_string())
    }
}

fn window_id(word: Option<&str>, verb: &'static str) -> Result<WindowId, ParseError> {
    let word = word.ok_or(ParseError::MissingArgument {
        verb,
        expected: "a window id",
    })?;
    word.parse()
        .map_err(|_| ParseError::InvalidWindowId(word.to_string()))
}

fn setting_name(word: Option<&str>, verb: &'static str) -> Result<String, ParseError> {
    word.map(str::to_string).ok_or(ParseError::MissingArgument {
        verb,
        expected: "a setting name",
    })
}

fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(end) => (&text[..end], text[end..].trim_start()),
        None => (text, ""),
    }
}

/// Splits `key=value` arguments on whitespace outside quotes and brackets.
///
/// An unterminated quote or bracket runs to the end of the line.
fn split_arguments(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' && q == '"' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => {
                quote = Some(c);
                start.get_or_insert(i);
            }
            '[' | '{' => {
                depth += 1;
                start.get_or_insert(i);
            }
            ']' | '}' => {
                depth = depth.saturating_sub(1);
                start.get_or_insert(i);
            }
            c if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    tokens.push(&text[s..i]);
                }
            }
            _ => {
                start.get_or_insert(i);
            }
        }
    }
    if let Some(s) = start {
        tokens.push(&text[s..]);
    }
    tokens
}

fn argument(word: &str) -> Result<(String, wincfg_core::SettingValue), ParseError> {
    match word.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), parse_value(value))),
        _ => Err(ParseError::InvalidArgument(word.to_string())),
    }
}
