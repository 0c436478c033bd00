//! Per-field answer history.
//!
//! Each field keeps its own list so the up arrow at the "Region" prompt only
//! recalls regions. Histories live for the whole run and survive retries.
use dialoguer::History;
use std::collections::{BTreeMap, VecDeque};

const MAX_ENTRIES: usize = 32;

/// Previous answers to one prompt, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldHistory {
    entries: VecDeque<String>,
}

impl FieldHistory {
    pub fn push(&mut self, answer: &str) {
        if answer.is_empty() {
            return;
        }
        self.entries.retain(|entry| entry != answer);
        self.entries.push_front(answer.to_string());
        self.entries.truncate(MAX_ENTRIES);
    }

    /// Most recent answer first.
    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

impl History<String> for FieldHistory {
    fn read(&self, pos: usize) -> Option<String> {
        self.entries.get(pos).cloned()
    }

    fn write(&mut self, val: &String) {
        self.push(val);
    }
}

/// Histories for every field asked during a run, keyed by document path.
#[derive(Debug, Clone, Default)]
pub struct AnswerHistory {
    fields: BTreeMap<String, FieldHistory>,
}

impl AnswerHistory {
    pub fn field(&mut self, path: &str) -> &mut FieldHistory {
        self.fields.entry(path.to_string()).or_default()
    }
}
