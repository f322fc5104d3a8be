//! Consoles: commands that own a table of sub-commands and can become the
//! active context of a shell.

use crate::command::{Command, Completion};
use crate::env::Environment;
use crate::table::{CommandTable, RegistrationError};
use crate::token::{self, EditLine};
use anyhow::Result;
use std::fmt;
use std::io::{self, Write};

/// Console-specific behaviour.
///
/// Every hook has a default, so a console with plain sub-commands can use
/// [`DefaultHandler`]. Override [`ConsoleHandler::custom_run`] to accept free
/// text that does not name a sub-command (a value-entry console, say), and
/// [`ConsoleHandler::custom_complete`] to complete it.
pub trait ConsoleHandler {
    /// Called with the full argument vector when `args[0]` is not a
    /// sub-command.
    fn custom_run(
        &mut self,
        _env: &mut Environment,
        out: &mut dyn Write,
        args: &[String],
    ) -> Result<()> {
        log::warn!("unknown command: {:?}", args);
        writeln!(out, "Unknown command: \"{}\"", args.join(" "))?;
        Ok(())
    }

    /// Called when no sub-command can complete the line.
    fn custom_complete(&self, _env: &Environment, _line: &EditLine<'_>) -> Completion {
        Completion::none()
    }

    /// Called right after the console became the active one.
    fn on_enter(
        &mut self,
        commands: &CommandTable,
        _env: &mut Environment,
        out: &mut dyn Write,
    ) -> Result<()> {
        write_help(commands, out)?;
        Ok(())
    }

    /// Called right before the console stops being the active one.
    fn on_leave(&mut self, _env: &mut Environment, _out: &mut dyn Write) -> Result<()> {
        Ok(())
    }

    /// This console's part of the prompt.
    fn prompt(&self, name: &str, _env: &Environment) -> String {
        name.to_string()
    }
}

/// Handler that keeps every default hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl ConsoleHandler for DefaultHandler {}

/// A command that dispatches to sub-commands.
///
/// Running a console with no arguments enters it: it becomes the active
/// console, so the following lines are resolved against its own commands.
/// Running it with no arguments while it is already active repeats the last
/// arguments it was given (unless disabled with
/// [`Console::set_repeat_on_empty`]).
pub struct Console {
    name: String,
    usage: Option<String>,
    commands: CommandTable,
    last_arguments: Vec<String>,
    repeat_on_empty: bool,
    handler: Box<dyn ConsoleHandler>,
}

impl Console {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_handler(name, DefaultHandler)
    }

    pub fn with_handler(
        name: impl Into<String>,
        handler: impl ConsoleHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            usage: None,
            commands: CommandTable::new(),
            last_arguments: Vec::new(),
            repeat_on_empty: true,
            handler: Box::new(handler),
        }
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.set_usage(usage);
        self
    }

    pub fn set_usage(&mut self, usage: impl Into<String>) {
        self.usage = Some(usage.into());
    }

    /// Register a sub-command (or sub-console).
    pub fn add_command(
        &mut self,
        command: impl Command + 'static,
    ) -> Result<(), RegistrationError> {
        self.commands.add(Box::new(command))
    }

    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    pub fn commands_mut(&mut self) -> &mut CommandTable {
        &mut self.commands
    }

    /// Whether empty input repeats the last command while this console is
    /// active. Enabled by default.
    pub fn set_repeat_on_empty(&mut self, enabled: bool) {
        self.repeat_on_empty = enabled;
    }

    pub fn repeat_on_empty(&self) -> bool {
        self.repeat_on_empty
    }

    /// Arguments of the last non-empty line run in this console.
    pub fn last_arguments(&self) -> &[String] {
        &self.last_arguments
    }

    pub fn show_help(&self, out: &mut dyn Write) -> io::Result<()> {
        write_help(&self.commands, out)
    }

    /// Help of a single sub-command. Returns `false` if there is no such
    /// command.
    pub fn show_command_help(&self, name: &str, out: &mut dyn Write) -> io::Result<bool> {
        match self.commands.find(name) {
            Some(command) => {
                writeln!(out, "  {}", command.help_line())?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn prompt(&self, env: &Environment) -> String {
        self.handler.prompt(&self.name, env)
    }

    /// Runs the on-enter hook.
    pub fn enter(&mut self, env: &mut Environment, out: &mut dyn Write) -> Result<()> {
        self.handler.on_enter(&self.commands, env, out)
    }

    /// Runs the on-leave hook.
    pub fn leave(&mut self, env: &mut Environment, out: &mut dyn Write) -> Result<()> {
        self.handler.on_leave(env, out)
    }

    /// The console found by following `path` from this one.
    pub fn find_console(&self, path: &[String]) -> Option<&Console> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self.commands.find(head)?.as_console()?.find_console(rest),
        }
    }

    pub fn find_console_mut(&mut self, path: &[String]) -> Option<&mut Console> {
        match path.split_first() {
            None => Some(self),
            Some((head, rest)) => self
                .commands
                .find_mut(head)?
                .as_console_mut()?
                .find_console_mut(rest),
        }
    }

    fn dispatch(
        &mut self,
        env: &mut Environment,
        out: &mut dyn Write,
        args: &[String],
    ) -> Result<()> {
        let Some((head, tail)) = args.split_first() else {
            return Ok(());
        };
        match self.commands.find_mut(head) {
            Some(command) => {
                log::debug!("'{}' dispatches {:?} to '{}'", self.name, tail, head);
                env.descend(head, |env| command.run(env, out, tail))
            }
            None => self.handler.custom_run(env, out, args),
        }
    }
}

impl Command for Console {
    fn name(&self) -> &str {
        &self.name
    }

    fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    fn run(&mut self, env: &mut Environment, out: &mut dyn Write, args: &[String]) -> Result<()> {
        if args.is_empty() {
            if !env.is_active_location() {
                let path = env.location().to_vec();
                env.enter_console(path);
                return self.enter(env, out);
            }
            if self.repeat_on_empty && !self.last_arguments.is_empty() {
                let snapshot = self.last_arguments.clone();
                log::debug!("'{}' repeats {:?}", self.name, snapshot);
                return self.dispatch(env, out, &snapshot);
            }
            return Ok(());
        }

        if self.repeat_on_empty {
            self.last_arguments = args.to_vec();
        }
        self.dispatch(env, out, args)
    }

    fn auto_complete(&self, env: &Environment, line: &EditLine<'_>) -> Completion {
        let parsed = token::parse(line);
        let cursor = parsed.cursor_info();

        if cursor.token_index == 0 {
            let found = self.commands.match_by_prefix(&cursor.prefix);
            if found.matches.is_empty() {
                return self.handler.custom_complete(env, line);
            }
            return Completion::from_match(found, |_| true);
        }

        if let Some(first) = parsed.tokens().first() {
            if let Some(command) = self.commands.find(first.value()) {
                log::trace!("'{}' delegates completion to '{}'", self.name, command.name());
                return command.auto_complete(env, &line.after(first.span().end));
            }
        }
        self.handler.custom_complete(env, line)
    }

    fn as_console(&self) -> Option<&Console> {
        Some(self)
    }

    fn as_console_mut(&mut self) -> Option<&mut Console> {
        Some(self)
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .field("commands", &self.commands)
            .field("last_arguments", &self.last_arguments)
            .field("repeat_on_empty", &self.repeat_on_empty)
            .finish_non_exhaustive()
    }
}

/// Writes the help listing of `commands`: one line per command, in
/// registration order.
pub fn write_help(commands: &CommandTable, out: &mut dyn Write) -> io::Result<()> {
    if !commands.is_empty() {
        writeln!(out, "Commands:")?;
        for command in commands.iter() {
            writeln!(out, "  {}", command.help_line())?;
        }
    }
    writeln!(out, "  <Ctrl-D>: quit")
}
