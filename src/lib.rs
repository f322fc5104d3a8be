//! Nested interactive consoles.
//!
//! A console is a command that owns a table of sub-commands. Running it
//! without arguments makes it the active console: the prompt shows it and
//! the following lines are resolved against its own commands. Consoles nest
//! to any depth, and tab completion descends the tree the same way a line
//! is dispatched.
//!
//! The building blocks are [`Command`] (anything that can be run and
//! completed), [`Console`] and its [`ConsoleHandler`] hooks, and [`Shell`],
//! which owns the root console and the [`Environment`] of a session. The
//! [`Application`] puts a `rustyline` editor in front of a shell.
//!
//! Lines are split by [`token::tokenize`] with shell-like quoting, and
//! completion candidates are selected with [`matcher::match_by_prefix`].

pub mod builtin;
pub mod command;
pub mod config;
pub mod console;
pub mod editor;
pub mod env;
pub mod file_name;
pub mod matcher;
pub mod shell;
pub mod table;
pub mod token;

pub use command::{Command, Completion, CompletionItem};
pub use config::{EditMode, ShellConfig};
pub use console::{Console, ConsoleHandler, DefaultHandler};
pub use editor::Application;
pub use env::{Deferred, Environment};
pub use shell::{Shell, ShellError};
pub use table::{CommandTable, RegistrationError};
