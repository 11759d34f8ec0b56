use std::io;

use console::style;
use dialoguer::{theme::ColorfulTheme, FuzzySelect};

use crate::error::{ConnectError, Result};

/// One entry offered to a [`Picker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub label: String,
    pub preview: Option<String>,
}

impl Choice {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            preview: None,
        }
    }

    pub fn with_preview(mut self, preview: impl Into<String>) -> Self {
        self.preview = Some(preview.into());
        self
    }
}

/// Interactive selection over a list of choices.
///
/// Implementations return the index of the chosen entry, or
/// [`ConnectError::SelectionCancelled`] when the user backs out.
pub trait Picker {
    fn select(&mut self, prompt: &str, choices: &[Choice]) -> Result<usize>;
}

pub fn choices<T>(
    items: &[T],
    label: impl Fn(&T) -> String,
    preview: Option<&dyn Fn(&T) -> String>,
) -> Vec<Choice> {
    items
        .iter()
        .map(|item| Choice {
            label: label(item),
            preview: preview.map(|preview| preview(item)),
        })
        .collect()
}

/// Narrow `items` down to exactly one.
///
/// An empty list fails with `empty`, a single item is returned without
/// prompting, anything else goes through `picker`.
pub fn pick_one<T>(
    picker: &mut dyn Picker,
    prompt: &str,
    mut items: Vec<T>,
    label: impl Fn(&T) -> String,
    preview: Option<&dyn Fn(&T) -> String>,
    empty: impl FnOnce() -> ConnectError,
) -> Result<T> {
    match items.len() {
        0 => Err(empty()),
        1 => Ok(items.remove(0)),
        len => {
            let idx = picker.select(prompt, &choices(&items, label, preview))?;
            if idx >= len {
                return Err(ConnectError::SelectionCancelled);
            }
            Ok(items.swap_remove(idx))
        }
    }
}

/// Fuzzy finder on the controlling terminal.
pub struct FuzzyPicker {
    theme: ColorfulTheme,
}

impl Default for FuzzyPicker {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

// FuzzySelect has no side pane, so previews are folded, dimmed, onto the item
// line. The fuzzy match runs over the whole line, preview included.
fn render(choice: &Choice) -> String {
    match &choice.preview {
        Some(preview) => {
            let details = preview
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}  {}", choice.label, style(format!("({details})")).dim())
        }
        None => choice.label.clone(),
    }
}

impl Picker for FuzzyPicker {
    fn select(&mut self, prompt: &str, choices: &[Choice]) -> Result<usize> {
        let items = choices.iter().map(render).collect::<Vec<_>>();

        let selection = FuzzySelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(&items[..])
            .default(0)
            .interact_opt()
            .map_err(|err| ConnectError::io("Running selection prompt", io::Error::other(err)))?;

        selection.ok_or(ConnectError::SelectionCancelled)
    }
}
