//! Interactive front end: a rustyline editor driving a [`Shell`].

use crate::command::Completion;
use crate::config::EditMode;
use crate::shell::{Shell, ShellError};
use crate::token;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::{ValidationContext, ValidationResult, Validator};
use rustyline::{CompletionType, Config, Context, Editor, Helper};
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Line editor helper answering completion requests from the active
/// console of the shell.
pub struct ConsoleHelper {
    shell: Rc<RefCell<Shell>>,
}

impl ConsoleHelper {
    pub fn new(shell: Rc<RefCell<Shell>>) -> Self {
        Self { shell }
    }
}

impl Helper for ConsoleHelper {}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _: &Context<'_>,
    ) -> Result<(usize, Vec<Pair>), ReadlineError> {
        let completion = self.shell.borrow().complete(line, pos);
        log::trace!("completion at {} of {:?}: {:?}", pos, line, completion);
        Ok((pos, to_pairs(&completion)))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, _: &str, _: usize, _: &Context<'_>) -> Option<Self::Hint> {
        None
    }
}

impl Highlighter for ConsoleHelper {}

impl Validator for ConsoleHelper {
    fn validate(&self, ctx: &mut ValidationContext<'_>) -> Result<ValidationResult, ReadlineError> {
        if token::tokenize(ctx.input()).is_complete() {
            Ok(ValidationResult::Valid(None))
        } else {
            Ok(ValidationResult::Incomplete)
        }
    }
}

/// Converts a completion into editor candidates inserted at the cursor.
///
/// A single candidate inserts the rest of its name, followed by a space when
/// it is terminal. Several candidates all insert the common suffix, so the
/// editor extends the word by it and lists the names when there is nothing
/// left to extend.
pub fn to_pairs(completion: &Completion) -> Vec<Pair> {
    match completion.candidates.as_slice() {
        [] => Vec::new(),
        [single] => {
            let mut replacement = completion.suffix.clone();
            if single.is_terminal() {
                replacement.push(' ');
            }
            vec![Pair {
                display: single.value().to_string(),
                replacement,
            }]
        }
        several => several
            .iter()
            .map(|item| Pair {
                display: item.value().to_string(),
                replacement: completion.suffix.clone(),
            })
            .collect(),
    }
}

/// Interactive session: reads lines with history and completion until every
/// console has been left.
pub struct Application {
    shell: Rc<RefCell<Shell>>,
    editor: Editor<ConsoleHelper, DefaultHistory>,
}

impl Application {
    pub fn new(shell: Shell) -> Result<Self, ShellError> {
        let edit_mode = match shell.config().edit_mode {
            EditMode::Emacs => rustyline::EditMode::Emacs,
            EditMode::Vi => rustyline::EditMode::Vi,
        };
        let config = Config::builder()
            .completion_type(CompletionType::List)
            .edit_mode(edit_mode)
            .max_history_size(shell.config().history_size)?
            .history_ignore_dups(true)?
            .auto_add_history(false)
            .build();

        let shell = Rc::new(RefCell::new(shell));
        let mut editor = Editor::with_config(config)?;
        editor.set_helper(Some(ConsoleHelper::new(shell.clone())));
        Ok(Self { shell, editor })
    }

    pub fn shell(&self) -> Rc<RefCell<Shell>> {
        self.shell.clone()
    }

    /// Runs the read-eval loop on standard output.
    pub fn run(&mut self) -> Result<(), ShellError> {
        let mut stdout = io::stdout();
        self.shell.borrow_mut().start(&mut stdout)?;

        while self.shell.borrow().is_running() {
            let prompt = self.shell.borrow().prompt();
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    if !line.trim().is_empty() {
                        self.editor.add_history_entry(line.as_str())?;
                    }
                    self.shell.borrow_mut().run_line(&line, &mut stdout)?;
                }
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => {
                    writeln!(stdout)?;
                    self.shell.borrow_mut().leave_console(&mut stdout)?;
                }
                Err(err) => return Err(err.into()),
            }
            stdout.flush()?;
        }
        Ok(())
    }
}
