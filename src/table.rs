use crate::command::Command;
use crate::matcher::{self, PrefixMatch};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors raised while building a console tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("a command named '{0}' is already registered")]
    DuplicateName(String),
}

/// Registry of commands, keyed by name, enumerated in insertion order.
///
/// The table owns its commands; dropping it drops them.
#[derive(Default)]
pub struct CommandTable {
    commands: Vec<Box<dyn Command>>,
    index: BTreeMap<String, usize>,
}

impl CommandTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command.
    ///
    /// Fails without touching the table if the name is already taken.
    pub fn add(&mut self, command: Box<dyn Command>) -> Result<(), RegistrationError> {
        let name = command.name().to_string();
        if self.index.contains_key(&name) {
            log::warn!("refusing to register '{}' twice", name);
            return Err(RegistrationError::DuplicateName(name));
        }
        self.index.insert(name, self.commands.len());
        self.commands.push(command);
        Ok(())
    }

    /// The command registered under exactly `name`.
    pub fn find(&self, name: &str) -> Option<&dyn Command> {
        self.index.get(name).map(|&i| self.commands[i].as_ref())
    }

    /// Mutable lookup by exact name, used to run a command.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut (dyn Command + 'static)> {
        let i = *self.index.get(name)?;
        Some(self.commands[i].as_mut())
    }

    /// Commands in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &(dyn Command + 'static)> {
        self.commands.iter().map(Box::as_ref)
    }

    /// Names of the commands in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|c| c.name()).collect()
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands whose name starts with `prefix`, in registration order.
    pub fn match_by_prefix(&self, prefix: &str) -> PrefixMatch<&(dyn Command + 'static)> {
        matcher::match_by_prefix(self.iter(), prefix)
    }
}

impl fmt::Debug for CommandTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter().map(|c| c.name())).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::Environment;
    use std::io::Write;

    struct Named(&'static str);

    impl Command for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn run(
            &mut self,
            _env: &mut Environment,
            out: &mut dyn Write,
            _args: &[String],
        ) -> anyhow::Result<()> {
            writeln!(out, "{}", self.0)?;
            Ok(())
        }
    }

    fn table(names: &[&'static str]) -> CommandTable {
        let mut table = CommandTable::new();
        for &name in names {
            table.add(Box::new(Named(name))).unwrap();
        }
        table
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let table = table(&["zeta", "alpha", "mid"]);
        assert_eq!(table.names(), vec!["zeta", "alpha", "mid"]);
        assert_eq!(table.len(), 3);
    }

    #[test]
    fn test_duplicate_name_is_rejected() {
        let mut table = table(&["open", "close"]);
        let err = table.add(Box::new(Named("open"))).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateName("open".to_string()));
        assert_eq!(table.names(), vec!["open", "close"]);
    }

    #[test]
    fn test_find_by_name() {
        let mut table = table(&["open", "close"]);
        assert_eq!(table.find("close").map(|c| c.name()), Some("close"));
        assert!(table.find("clo").is_none());

        let mut out = Vec::new();
        let mut env = Environment::new();
        table
            .find_mut("open")
            .unwrap()
            .run(&mut env, &mut out, &[])
            .unwrap();
        assert_eq!(out, b"open\n");
    }

    #[test]
    fn test_prefix_match_uses_insertion_order() {
        let table = table(&["open", "close", "clone"]);
        let found = table.match_by_prefix("c");
        let names: Vec<&str> = found.matches.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["close", "clone"]);
        assert_eq!(found.completion, "lo");
    }
}
