//! The prompting seam between the session and a terminal.
use super::history::FieldHistory;
use std::io;

/// Why a prompt returned without an answer.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    /// Ctrl-C at the prompt.
    #[error("interrupted")]
    Interrupted,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl PromptError {
    pub fn from_io(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::Interrupted {
            PromptError::Interrupted
        } else {
            PromptError::Io(err)
        }
    }
}

/// Styling of an informational line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

/// Everything the session needs from a terminal.
pub trait Prompter {
    fn section(&mut self, title: &str);

    fn note(&mut self, tone: Tone, message: &str);

    /// Free text. An empty answer yields `default`, or the empty string when
    /// there is none.
    fn input(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        history: &mut FieldHistory,
    ) -> Result<String, PromptError>;

    /// Hidden input for secrets.
    fn secret(&mut self, prompt: &str) -> Result<String, PromptError>;

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError>;

    /// Index of the chosen item.
    fn select(&mut self, prompt: &str, items: &[&str], default: usize)
        -> Result<usize, PromptError>;
}
