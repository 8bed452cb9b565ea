//! Autonomous mode selection
//!
//! Holds the options offered to the operator and the one currently picked.
//! Stored macros are offered as `"Macro N"` with tag `"macroN"`; every other
//! tag names a built-in mode.

use serde::Serialize;

const MACRO_PREFIX: &str = "macro";

pub fn macro_tag(number: u32) -> String {
    format!("{}{}", MACRO_PREFIX, number)
}

/// `Some(n)` only for tags of the form `macro<digits>`
pub fn parse_macro_tag(tag: &str) -> Option<u32> {
    let digits = tag.strip_prefix(MACRO_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AutoOption {
    pub label: String,
    pub tag: String,
}

#[derive(Debug, Clone, Default)]
pub struct AutoChooser {
    options: Vec<AutoOption>,
    selected: Option<String>,
}

impl AutoChooser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an option; re-adding a tag replaces its label
    pub fn add(&mut self, label: impl Into<String>, tag: impl Into<String>) {
        let (label, tag) = (label.into(), tag.into());
        match self.options.iter_mut().find(|o| o.tag == tag) {
            Some(existing) => existing.label = label,
            None => self.options.push(AutoOption { label, tag }),
        }
    }

    pub fn add_macro(&mut self, number: u32) {
        self.add(format!("Macro {}", number), macro_tag(number));
    }

    /// Built-in mode whose label is its tag
    pub fn add_mode(&mut self, name: impl Into<String>) {
        let name = name.into();
        self.add(name.clone(), name);
    }

    pub fn remove(&mut self, tag: &str) {
        self.options.retain(|o| o.tag != tag);
        if self.selected.as_deref() == Some(tag) {
            self.selected = None;
        }
    }

    /// Select by tag; unknown tags are refused
    pub fn select(&mut self, tag: &str) -> bool {
        if self.options.iter().any(|o| o.tag == tag) {
            self.selected = Some(tag.to_string());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn options(&self) -> &[AutoOption] {
        &self.options
    }
}
