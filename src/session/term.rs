//! Terminal prompter backed by `dialoguer`.
use super::history::FieldHistory;
use super::prompt::{PromptError, Prompter, Tone};
use crate::ui;
use console::Term;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password, Select};

pub struct TermPrompter {
    theme: ColorfulTheme,
}

impl Default for TermPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl TermPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

fn map_err(err: dialoguer::Error) -> PromptError {
    let dialoguer::Error::IO(err) = err;
    if err.kind() == std::io::ErrorKind::Interrupted {
        // dialoguer hides the cursor while a prompt is active.
        let _ = Term::stdout().show_cursor();
    }
    PromptError::from_io(err)
}

impl Prompter for TermPrompter {
    fn section(&mut self, title: &str) {
        ui::section(title);
    }

    fn note(&mut self, tone: Tone, message: &str) {
        match tone {
            Tone::Info => ui::info(message),
            Tone::Success => ui::success(message),
            Tone::Warning => ui::warning(message),
            Tone::Error => ui::error(message),
        }
    }

    fn input(
        &mut self,
        prompt: &str,
        default: Option<&str>,
        history: &mut FieldHistory,
    ) -> Result<String, PromptError> {
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = default.filter(|value| !value.is_empty()) {
            input = input.default(default.to_string());
        }
        let answer = input
            .history_with(history)
            .interact_text()
            .map_err(map_err)?;
        let answer = answer.trim();
        if answer.is_empty() {
            Ok(default.unwrap_or("").to_string())
        } else {
            Ok(answer.to_string())
        }
    }

    fn secret(&mut self, prompt: &str) -> Result<String, PromptError> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(map_err)
    }

    fn confirm(&mut self, prompt: &str, default: bool) -> Result<bool, PromptError> {
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(map_err)
    }

    fn select(
        &mut self,
        prompt: &str,
        items: &[&str],
        default: usize,
    ) -> Result<usize, PromptError> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()
            .map_err(map_err)
    }
}
