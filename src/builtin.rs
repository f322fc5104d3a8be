use crate::command::{Command, Completion};
use crate::env::{Deferred, Environment};
use crate::token::EditLine;
use anyhow::Result;
use argh::{EarlyExit, FromArgs};
use std::io::Write;
use std::marker::PhantomData;

/// Leaf commands with declarative arguments.
///
/// Arguments are parsed using the [`argh`] crate (`FromArgs`); register the
/// command through [`Builtin`].
pub trait ArgsCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "help" or "next".
    fn name() -> &'static str;

    fn usage() -> Option<&'static str> {
        None
    }

    /// Executes the parsed command. User-facing messages go to `out`.
    fn execute(self, env: &mut Environment, out: &mut dyn Write) -> Result<()>;

    /// Completes the arguments of the command.
    fn complete(_env: &Environment, _line: &EditLine<'_>) -> Completion {
        Completion::none()
    }
}

/// Adapter registering an [`ArgsCommand`] type as a [`Command`].
///
/// Every run parses a fresh `T` from the arguments. When parsing stops early
/// (bad arguments, `--help`) argh's message is written to the output instead.
pub struct Builtin<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Builtin<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Builtin<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ArgsCommand> Command for Builtin<T> {
    fn name(&self) -> &str {
        T::name()
    }

    fn usage(&self) -> Option<&str> {
        T::usage()
    }

    fn run(&mut self, env: &mut Environment, out: &mut dyn Write, args: &[String]) -> Result<()> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        match T::from_args(&[T::name()], &args) {
            Ok(cmd) => cmd.execute(env, out),
            Err(EarlyExit { output, status }) => {
                if status.is_err() {
                    log::debug!("{}: invalid arguments {:?}", T::name(), args);
                }
                out.write_all(output.as_bytes())?;
                if !output.ends_with('\n') {
                    writeln!(out)?;
                }
                Ok(())
            }
        }
    }

    fn auto_complete(&self, env: &Environment, line: &EditLine<'_>) -> Completion {
        T::complete(env, line)
    }
}

type Completer = Box<dyn Fn(&Environment, &EditLine<'_>) -> Completion>;

/// Leaf command backed by a closure that receives the raw arguments.
pub struct FnCommand<F> {
    name: String,
    usage: Option<String>,
    body: F,
    completer: Option<Completer>,
}

impl<F> FnCommand<F>
where
    F: FnMut(&mut Environment, &mut dyn Write, &[String]) -> Result<()>,
{
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            usage: None,
            body,
            completer: None,
        }
    }

    pub fn with_usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = Some(usage.into());
        self
    }

    pub fn with_completer(
        mut self,
        completer: impl Fn(&Environment, &EditLine<'_>) -> Completion + 'static,
    ) -> Self {
        self.completer = Some(Box::new(completer));
        self
    }
}

impl<F> Command for FnCommand<F>
where
    F: FnMut(&mut Environment, &mut dyn Write, &[String]) -> Result<()>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn usage(&self) -> Option<&str> {
        self.usage.as_deref()
    }

    fn run(&mut self, env: &mut Environment, out: &mut dyn Write, args: &[String]) -> Result<()> {
        (self.body)(env, out, args)
    }

    fn auto_complete(&self, env: &Environment, line: &EditLine<'_>) -> Completion {
        match &self.completer {
            Some(complete) => complete(env, line),
            None => Completion::none(),
        }
    }
}

#[derive(FromArgs, Debug, PartialEq)]
/// show the commands of the current console.
pub struct Help {
    #[argh(positional)]
    /// show the help line of this command only.
    pub command: Option<String>,
}

impl ArgsCommand for Help {
    fn name() -> &'static str {
        "help"
    }

    fn usage() -> Option<&'static str> {
        Some("help [command]: show help message")
    }

    fn execute(self, env: &mut Environment, _out: &mut dyn Write) -> Result<()> {
        env.defer(Deferred::ShowHelp(self.command));
        Ok(())
    }
}

#[derive(FromArgs, Debug, PartialEq)]
/// leave the current console.
pub struct Back {}

impl ArgsCommand for Back {
    fn name() -> &'static str {
        "back"
    }

    fn usage() -> Option<&'static str> {
        Some("back: leave the current console")
    }

    fn execute(self, env: &mut Environment, _out: &mut dyn Write) -> Result<()> {
        // only the console `back` belongs to can be left, and only while active
        let owner = env.location().split_last().map_or(&[][..], |(_, parent)| parent);
        if env.current_console() != Some(owner) {
            log::debug!("back: console {:?} is not active", owner);
            return Ok(());
        }
        env.defer(Deferred::LeaveConsole);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CompletionItem;

    fn args(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[derive(FromArgs)]
    /// repeat a word.
    struct Say {
        #[argh(option, short = 'n', default = "1")]
        /// how many times to say it.
        times: usize,

        #[argh(positional)]
        /// the word to say.
        word: String,
    }

    impl ArgsCommand for Say {
        fn name() -> &'static str {
            "say"
        }

        fn execute(self, _env: &mut Environment, out: &mut dyn Write) -> Result<()> {
            let words = vec![self.word.as_str(); self.times];
            writeln!(out, "{}", words.join(" "))?;
            Ok(())
        }

        fn complete(_env: &Environment, _line: &EditLine<'_>) -> Completion {
            Completion {
                candidates: vec![CompletionItem::terminal("hello")],
                suffix: String::new(),
            }
        }
    }

    fn run<C: Command>(cmd: &mut C, env: &mut Environment, words: &[&str]) -> String {
        let mut out = Vec::new();
        cmd.run(env, &mut out, &args(words)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_builtin_parses_arguments() {
        let mut say = Builtin::<Say>::new();
        let mut env = Environment::new();
        assert_eq!(say.name(), "say");
        assert_eq!(say.help_line(), "say");
        assert_eq!(run(&mut say, &mut env, &["-n", "3", "hi"]), "hi hi hi\n");
        assert_eq!(run(&mut say, &mut env, &["hi"]), "hi\n");
    }

    #[test]
    fn test_builtin_reports_bad_arguments() {
        let mut say = Builtin::<Say>::new();
        let mut env = Environment::new();
        let output = run(&mut say, &mut env, &[]);
        assert!(output.contains("word"), "{output}");
        assert!(output.ends_with('\n'));

        let output = run(&mut say, &mut env, &["-n", "many", "hi"]);
        assert!(!output.contains("hi hi"), "{output}");
    }

    #[test]
    fn test_builtin_help_flag() {
        let mut say = Builtin::<Say>::new();
        let mut env = Environment::new();
        let output = run(&mut say, &mut env, &["--help"]);
        assert!(output.contains("Usage: say"), "{output}");
        assert!(output.contains("repeat a word"), "{output}");
    }

    #[test]
    fn test_builtin_completion_is_forwarded() {
        let say = Builtin::<Say>::new();
        let completion = say.auto_complete(&Environment::new(), &EditLine::new("", 0));
        assert_eq!(completion.values(), vec!["hello"]);
    }

    #[test]
    fn test_help_defers_to_shell() {
        let mut help = Builtin::<Help>::new();
        let mut env = Environment::new();
        assert_eq!(help.help_line(), "help [command]: show help message");

        assert_eq!(run(&mut help, &mut env, &[]), "");
        assert_eq!(run(&mut help, &mut env, &["next"]), "");
        assert_eq!(
            env.take_deferred(),
            vec![
                Deferred::ShowHelp(None),
                Deferred::ShowHelp(Some("next".to_string()))
            ]
        );
    }

    #[test]
    fn test_back_defers_leave() {
        let mut back = Builtin::<Back>::new();
        let mut env = Environment::new();
        assert_eq!(run(&mut back, &mut env, &[]), "");
        assert_eq!(env.take_deferred(), vec![Deferred::LeaveConsole]);

        // arguments are rejected, nothing is deferred
        assert_ne!(run(&mut back, &mut env, &["now"]), "");
        assert!(env.take_deferred().is_empty());
    }

    #[test]
    fn test_back_from_inactive_console_does_nothing() {
        let mut back = Builtin::<Back>::new();
        let mut env = Environment::new();

        let output = env.descend("net", |env| env.descend("back", |env| run(&mut back, env, &[])));
        assert_eq!(output, "");
        assert!(env.take_deferred().is_empty());

        env.enter_console(vec!["net".to_string()]);
        env.descend("net", |env| env.descend("back", |env| run(&mut back, env, &[])));
        assert_eq!(env.take_deferred(), vec![Deferred::LeaveConsole]);
    }

    #[test]
    fn test_fn_command() {
        let mut count = 0;
        let body = move |_env: &mut Environment, out: &mut dyn Write, args: &[String]| {
            count += 1;
            writeln!(out, "{count}: {}", args.join(" "))?;
            Ok(())
        };
        let mut echo = FnCommand::new("echo", body).with_usage("echo WORDS: print words");
        let mut env = Environment::new();

        assert_eq!(echo.help_line(), "echo WORDS: print words");
        assert_eq!(run(&mut echo, &mut env, &["a", "b"]), "1: a b\n");
        assert_eq!(run(&mut echo, &mut env, &[]), "2: \n");
        assert!(echo.auto_complete(&env, &EditLine::new("", 0)).is_empty());
    }

    #[test]
    fn test_fn_command_completer() {
        let noop = |_: &mut Environment, _: &mut dyn Write, _: &[String]| Ok(());
        let cmd = FnCommand::new("pick", noop)
            .with_completer(|_env, _line| Completion {
                candidates: vec![CompletionItem::new("dir/", false)],
                suffix: "dir/".to_string(),
            });
        let completion = cmd.auto_complete(&Environment::new(), &EditLine::new("", 0));
        assert_eq!(completion.values(), vec!["dir/"]);
        assert!(!completion.candidates[0].is_terminal());
    }
}
