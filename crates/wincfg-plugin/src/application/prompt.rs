//! Prompt continuations.
//!
//! Collecting input is a two-step affair in the editor: a command opens an
//! input panel and returns immediately; the user's answer (or dismissal)
//! arrives later as a separate event.  Instead of a pair of callbacks, a
//! command returns a [`PromptRequest`] and is later resumed with exactly one
//! [`PromptOutcome`].

/// An input panel the host should show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    /// Caption shown next to the input field.
    pub message: String,
    /// Text pre-filled in the input field.
    pub initial_text: String,
}

impl PromptRequest {
    /// Creates a request with an empty input field.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            initial_text: String::new(),
        }
    }
}

/// How the user answered a prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user confirmed the panel with this text.
    Confirmed(String),
    /// The user dismissed the panel.
    Cancelled,
}
