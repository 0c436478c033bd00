//! Prompter that replays canned answers.
use super::history::FieldHistory;
use super::prompt::{PromptError, Prompter, Tone};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub(crate) enum Answer {
    Text(String),
    /// Accept the offered default.
    Default,
    Yes,
    No,
    Choose(usize),
    Interrupt,
}

pub(crate) fn text(value: &str) -> Answer {
    Answer::Text(value.to_string())
}

#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompter {
    answers: VecDeque<Answer>,
    /// Prompts, section titles and notes in the order they were shown.
    pub(crate) transcript: Vec<String>,
    /// History offered at each text prompt.
    pub(crate) offered_history: Vec<(String, Vec<String>)>,
}

impl ScriptedPrompter {
    pub(crate) fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            ..Self::default()
        }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.answers.len()
    }

    pub(crate) fn saw(&self, needle: &str) -> bool {
        self.transcript.iter().any(|line| line.contains(needle))
    }

    fn next(&mut self, prompt: &str) -> Answer {
        self.transcript.push(format!("? {prompt}"));
        self.answers
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer left for {prompt:?}"))
    }
}

impl Prompter for ScriptedPrompter {
    fn section(&mut self, title: &str) {
        self.transcript.push(format!("## {title}"));
    }

    fn note(&mut self, tone: Tone, message: &str) {
        self.transcript.push(format!("{tone:?}: {message}"));
    }

    fn input(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        history: &mut FieldHistory,
    ) -> Result<String, PromptError> {
        self.offered_history
            .push((prompt.to_string(), history.iter().map(str::to_string).collect()));
        match self.next(prompt) {
            Answer::Text(value) if value.trim().is_empty() => Ok(default.unwrap_or("").to_string()),
            Answer::Text(value) => Ok(value.trim().to_string()),
            Answer::Default => Ok(default.unwrap_or("").to_string()),
            Answer::Interrupt => Err(PromptError::Interrupted),
            other => panic!("{prompt:?} expects text, script has {other:?}"),
        }
    }

    fn secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        match self.next(prompt) {
            Answer::Text(value) => Ok(value),
            Answer::Interrupt => Err(PromptError::Interrupted),
            other => panic!("{prompt:?} expects a secret, script has {other:?}"),
        }
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        match self.next(prompt) {
            Answer::Yes => Ok(true),
            Answer::No => Ok(false),
            Answer::Default => Ok(default),
            Answer::Interrupt => Err(PromptError::Interrupted),
            other => panic!("{prompt:?} expects yes/no, script has {other:?}"),
        }
    }

    fn select(
        &mut self,
        prompt: &str,
        items: &[&str],
        default: usize,
    ) -> Result<usize, PromptError> {
        match self.next(prompt) {
            Answer::Choose(index) if index < items.len() => Ok(index),
            Answer::Default => Ok(default),
            Answer::Interrupt => Err(PromptError::Interrupted),
            other => panic!("{prompt:?} expects one of {items:?}, script has {other:?}"),
        }
    }
}
