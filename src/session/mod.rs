//! Interactive session controller.
//!
//! The session is an explicit state machine over the configuration sections:
//!
//! ```text
//! Welcome -> SectionPrompt(0) -> Validating(0) -> SectionPrompt(1) -> ... -> Confirmed
//!                  |                   |
//!             interrupt           field error
//!                  v                   v
//!               Retry(i) -----------> SectionPrompt(i)        (declined retry -> Aborted)
//! ```
//!
//! All state is carried in [`Session`]; prompts go through a [`Prompter`] so
//! the machine runs the same against a terminal or a script.
use crate::cluster::ClusterHints;
use crate::error::{Error, Result};
use crate::values::{
    CloudProvider, Configuration, FieldError, LayeredConfig, LoadedDocument, ValidationOptions,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

mod history;
mod prompt;
mod sections;
mod term;

#[cfg(test)]
pub(crate) mod scripted;

pub use history::{AnswerHistory, FieldHistory};
pub use prompt::{PromptError, Prompter, Tone};
pub use sections::Section;
pub use term::TermPrompter;

/// Why a section is asked again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    Interrupted,
    Invalid(Vec<FieldError>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Welcome,
    /// Asking the section at this index of the plan.
    SectionPrompt(usize),
    Validating(usize),
    Retry { index: usize, reason: RetryReason },
    Confirmed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Confirmed | SessionState::Aborted)
    }
}

/// A validated configuration ready for provisioning and apply.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub config: Configuration,
    pub layers: LayeredConfig,
    /// The user asked the installer to create cloud resources.
    pub provision: bool,
    /// Sections that were asked.
    pub asked: Vec<Section>,
}

pub struct Session<'a, P: Prompter + ?Sized> {
    prompter: &'a mut P,
    hints: &'a ClusterHints,
    layers: LayeredConfig,
    history: AnswerHistory,
    plan: Vec<Section>,
    update: bool,
    provision: bool,
    /// Answers that could not be stored because they did not parse.
    input_errors: Vec<FieldError>,
    /// Stable generated bucket name across retries.
    generated_bucket: Option<String>,
    state: SessionState,
}

impl<'a, P: Prompter + ?Sized> Session<'a, P> {
    /// Fresh install: every section, in order. A previous document only
    /// supplies the defaults shown at each prompt.
    pub fn fresh(
        prompter: &'a mut P,
        hints: &'a ClusterHints,
        previous: Option<&LoadedDocument>,
    ) -> Self {
        let layers = previous
            .map(|doc| doc.layers.clone())
            .unwrap_or_default();
        Self::with_plan(prompter, hints, layers, Section::ALL.to_vec(), false)
    }

    /// Update run: only the requested sections, plus any section owning a
    /// field the loaded document fails on.
    pub fn update(
        prompter: &'a mut P,
        hints: &'a ClusterHints,
        loaded: &LoadedDocument,
        reconfigure: &[Section],
    ) -> Self {
        let mut wanted: BTreeSet<Section> = reconfigure.iter().copied().collect();
        if let Err(errors) = loaded.config.validate() {
            for error in &errors {
                debug!(field = %error.path, "loaded document needs attention");
            }
            wanted.extend(errors.iter().map(|error| Section::for_path(&error.path)));
        }
        let plan = wanted.into_iter().collect();
        Self::with_plan(prompter, hints, loaded.layers.clone(), plan, true)
    }

    fn with_plan(
        prompter: &'a mut P,
        hints: &'a ClusterHints,
        layers: LayeredConfig,
        plan: Vec<Section>,
        update: bool,
    ) -> Self {
        Self {
            prompter,
            hints,
            layers,
            history: AnswerHistory::default(),
            plan,
            update,
            provision: false,
            input_errors: Vec::new(),
            generated_bucket: None,
            state: SessionState::Welcome,
        }
    }

    /// Drive the machine to a terminal state.
    pub fn run(mut self) -> Result<SessionOutcome> {
        while !self.state.is_terminal() {
            let next = self.step()?;
            debug!(from = ?self.state, to = ?next, "session transition");
            self.state = next;
        }
        match self.state {
            SessionState::Confirmed => self.outcome(),
            _ => Err(Error::Aborted),
        }
    }

    /// Perform the current state's work and return the next state.
    pub fn step(&mut self) -> std::result::Result<SessionState, PromptError> {
        let next = match self.state.clone() {
            SessionState::Welcome => {
                self.welcome();
                if self.plan.is_empty() {
                    SessionState::Confirmed
                } else {
                    SessionState::SectionPrompt(0)
                }
            }
            SessionState::SectionPrompt(index) => {
                self.input_errors.clear();
                let section = self.plan[index];
                match self.ask(section) {
                    Ok(()) => SessionState::Validating(index),
                    Err(PromptError::Interrupted) => SessionState::Retry {
                        index,
                        reason: RetryReason::Interrupted,
                    },
                    Err(err) => return Err(err),
                }
            }
            SessionState::Validating(index) => self.validate_through(index),
            SessionState::Retry { index, reason } => {
                let section = self.plan[index];
                match reason {
                    RetryReason::Invalid(errors) => {
                        for error in &errors {
                            self.prompter.note(Tone::Error, &error.to_string());
                        }
                        SessionState::SectionPrompt(index)
                    }
                    RetryReason::Interrupted => {
                        self.prompter.note(Tone::Warning, "Section interrupted");
                        let question = format!("Retry {}? (n to exit)", section.title());
                        match self.prompter.confirm(&question, true) {
                            Ok(true) => SessionState::SectionPrompt(index),
                            Ok(false) | Err(PromptError::Interrupted) => SessionState::Aborted,
                            Err(err) => return Err(err),
                        }
                    }
                }
            }
            terminal @ (SessionState::Confirmed | SessionState::Aborted) => terminal,
        };
        Ok(next)
    }

    fn welcome(&mut self) {
        if self.update {
            if self.plan.is_empty() {
                self.prompter
                    .note(Tone::Info, "No sections to reconfigure; reusing saved values.");
            } else {
                let names: Vec<&str> = self.plan.iter().map(|s| s.title()).collect();
                self.prompter
                    .note(Tone::Info, &format!("Reconfiguring: {}", names.join(", ")));
            }
            return;
        }
        self.prompter.note(
            Tone::Info,
            "TIP: Use Ctrl-C at any prompt to retry that section or exit",
        );
        self.prompter
            .note(Tone::Info, "TIP: Use arrow keys to navigate input history");
    }

    fn validation_options(&self) -> ValidationOptions {
        let s3 = self.layers.get_bool("clickhouse.s3.enabled");
        let keys_from_provisioning = self.provision
            && s3
            && self.layers.provider() == CloudProvider::Gcp
            && !self.layers.get_bool("clickhouse.s3.useEnvironmentCredentials");
        ValidationOptions {
            credentials_pending: keys_from_provisioning,
        }
    }

    /// Field errors of the current document, including unparsable answers.
    fn field_errors(&self) -> Vec<FieldError> {
        let mut errors = self.input_errors.clone();
        let failing: BTreeSet<String> = errors.iter().map(|e| e.path.clone()).collect();
        match self.layers.effective() {
            Ok(config) => {
                if let Err(found) = config.validate_with(self.validation_options()) {
                    errors.extend(
                        found
                            .into_iter()
                            .filter(|error| !failing.contains(&error.path)),
                    );
                }
            }
            Err(err) => errors.push(FieldError::new("", err.to_string())),
        }
        errors
    }

    /// Check every section asked so far (and any section outside the plan).
    fn validate_through(&mut self, index: usize) -> SessionState {
        let current = self.plan[index];
        let relevant: Vec<FieldError> = self
            .field_errors()
            .into_iter()
            .filter(|error| {
                let owner = Section::for_path(&error.path);
                owner <= current || !self.plan.contains(&owner)
            })
            .collect();

        let Some(target) = relevant
            .iter()
            .map(|error| Section::for_path(&error.path))
            .min()
        else {
            return if index + 1 < self.plan.len() {
                SessionState::SectionPrompt(index + 1)
            } else {
                SessionState::Confirmed
            };
        };

        if !self.plan.contains(&target) {
            self.plan.push(target);
            self.plan.sort();
            info!(section = target.title(), "adding section with invalid fields");
        }
        let errors = relevant
            .into_iter()
            .filter(|error| Section::for_path(&error.path) == target)
            .collect();
        let target_index = self
            .plan
            .iter()
            .position(|section| *section == target)
            .unwrap_or(index);
        SessionState::Retry {
            index: target_index,
            reason: RetryReason::Invalid(errors),
        }
    }

    fn outcome(self) -> Result<SessionOutcome> {
        let config = self
            .layers
            .effective()
            .map_err(|err| Error::Invalid(err.to_string()))?;
        if let Err(errors) = config.validate_with(self.validation_options()) {
            let joined: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(Error::Invalid(joined.join("; ")));
        }
        Ok(SessionOutcome {
            config,
            layers: self.layers,
            provision: self.provision,
            asked: self.plan,
        })
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
