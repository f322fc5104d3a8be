use crate::console::Console;
use crate::env::Environment;
use crate::matcher::{Candidate, PrefixMatch};
use crate::token::EditLine;
use anyhow::Result;
use std::io::Write;

/// A single completion candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    value: String,
    is_terminal: bool,
}

impl CompletionItem {
    /// `is_terminal` tells the line editor that the candidate is a complete
    /// word, so a separator may follow it (a directory name, for example, is
    /// not terminal).
    pub fn new(value: impl Into<String>, is_terminal: bool) -> Self {
        Self {
            value: value.into(),
            is_terminal,
        }
    }

    pub fn terminal(value: impl Into<String>) -> Self {
        Self::new(value, true)
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_terminal(&self) -> bool {
        self.is_terminal
    }
}

impl Candidate for CompletionItem {
    fn candidate_name(&self) -> &str {
        &self.value
    }
}

/// Answer to a completion request.
///
/// No candidates at all is a valid answer, distinct from a single candidate
/// that equals what was already typed (one candidate, empty suffix).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    pub candidates: Vec<CompletionItem>,
    /// Text to insert at the cursor.
    pub suffix: String,
}

impl Completion {
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a completion from a prefix match, deciding per candidate
    /// whether it is terminal.
    pub fn from_match<T, F>(found: PrefixMatch<T>, is_terminal: F) -> Self
    where
        T: Candidate,
        F: Fn(&T) -> bool,
    {
        let candidates = found
            .matches
            .iter()
            .map(|c| CompletionItem::new(c.candidate_name(), is_terminal(c)))
            .collect();
        Self {
            candidates,
            suffix: found.completion,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn values(&self) -> Vec<&str> {
        self.candidates.iter().map(CompletionItem::value).collect()
    }
}

/// Object-safe trait for every node of a console tree.
///
/// Leaf commands implement [`Command::run`] and, when their arguments can be
/// completed, [`Command::auto_complete`]. Consoles implement it too, see
/// [`Console`].
pub trait Command {
    /// Key of the command inside its table.
    fn name(&self) -> &str;

    /// One-line help text, e.g. `"next [N]: show next N lines"`.
    fn usage(&self) -> Option<&str> {
        None
    }

    /// The line shown for this command by `help`: its usage, or its name.
    fn help_line(&self) -> &str {
        self.usage().unwrap_or(self.name())
    }

    /// Executes the command with its arguments (the command name excluded).
    ///
    /// User-facing messages go to `out`.
    fn run(&mut self, env: &mut Environment, out: &mut dyn Write, args: &[String]) -> Result<()>;

    /// Completes the arguments of this command.
    ///
    /// `line` covers the text after the command name, but its offsets and
    /// cursor still refer to the whole edit buffer.
    fn auto_complete(&self, _env: &Environment, _line: &EditLine<'_>) -> Completion {
        Completion::none()
    }

    fn as_console(&self) -> Option<&Console> {
        None
    }

    fn as_console_mut(&mut self) -> Option<&mut Console> {
        None
    }
}

impl Candidate for dyn Command {
    fn candidate_name(&self) -> &str {
        self.name()
    }
}
