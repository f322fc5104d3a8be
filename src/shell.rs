use crate::command::{Command, Completion};
use crate::config::ShellConfig;
use crate::console::Console;
use crate::env::{ConsolePath, Deferred, Environment};
use crate::table::RegistrationError;
use crate::token::{self, EditLine};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShellError {
    #[error("line editor failed: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
    #[error("cannot write output: {0}")]
    Io(#[from] io::Error),
    #[error("cannot read command file {}: {source}", path.display())]
    BatchFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A console tree together with the state of a session navigating it.
///
/// The shell owns the root console (named `""`) and the [`Environment`].
/// Lines are run against the active console; completion requests are
/// answered by it too.
///
/// Example
/// ```
/// use shell_consoles::{Console, Shell, ShellConfig};
/// let mut shell = Shell::new(ShellConfig::default());
/// shell.add_command(Console::new("net")).unwrap();
/// let mut out = Vec::new();
/// shell.run_line("net", &mut out).unwrap();
/// assert_eq!(shell.prompt(), "net> ");
/// ```
pub struct Shell {
    root: Console,
    env: Environment,
    config: ShellConfig,
}

impl Shell {
    pub fn new(config: ShellConfig) -> Self {
        let mut root = Console::new("");
        root.set_repeat_on_empty(config.repeat_on_empty);
        let mut env = Environment::new();
        env.set_default_prompt(config.prompt.clone());
        Self { root, env, config }
    }

    /// Registers a command (or console) in the root console.
    pub fn add_command(
        &mut self,
        command: impl Command + 'static,
    ) -> Result<(), RegistrationError> {
        self.root.add_command(command)
    }

    pub fn root(&self) -> &Console {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Console {
        &mut self.root
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// The active console, `None` once every console has been left.
    pub fn current_console(&self) -> Option<&Console> {
        self.root.find_console(self.env.current_console()?)
    }

    /// Whether the shell should keep reading lines.
    pub fn is_running(&self) -> bool {
        !self.env.should_exit() && self.env.current_console().is_some()
    }

    /// Enters the root console, which by default shows its help.
    pub fn start(&mut self, out: &mut dyn Write) -> Result<(), ShellError> {
        if let Err(e) = self.root.enter(&mut self.env, out) {
            report(out, &e)?;
        }
        Ok(())
    }

    /// Executes one line in the active console.
    ///
    /// An empty line is passed on as well: the active console repeats its
    /// last command. Failing commands are reported to `out`; only failures
    /// to write `out` itself are returned.
    pub fn run_line(&mut self, line: &str, out: &mut dyn Write) -> Result<(), ShellError> {
        let parsed = token::tokenize(line);
        if !parsed.is_complete() {
            writeln!(out, "error: unterminated quote or escape: {}", line)?;
            return Ok(());
        }
        let Some(path) = self.current_path() else {
            return Ok(());
        };
        let Some(console) = self.root.find_console_mut(&path) else {
            log::warn!("active console {:?} is not in the tree", path);
            self.env.leave_console();
            return Ok(());
        };

        self.env.set_location(path);
        let result = console.run(&mut self.env, out, &parsed.values());
        self.env.set_location(ConsolePath::new());
        if let Err(e) = result {
            report(out, &e)?;
        }
        self.process_deferred(out)
    }

    /// Runs lines in order, stopping early once the shell is no longer
    /// running.
    pub fn run_commands<I>(&mut self, lines: I, out: &mut dyn Write) -> Result<(), ShellError>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            if !self.is_running() {
                break;
            }
            let line = line.as_ref();
            log::debug!("batch: {}", line);
            self.run_line(line, out)?;
        }
        Ok(())
    }

    /// Performs the actions commands queued while a line was dispatched.
    pub fn process_deferred(&mut self, out: &mut dyn Write) -> Result<(), ShellError> {
        for action in self.env.take_deferred() {
            match action {
                Deferred::ShowHelp(name) => {
                    let Some(console) = self.current_console() else {
                        continue;
                    };
                    match name {
                        None => console.show_help(out)?,
                        Some(name) => {
                            if !console.show_command_help(&name, out)? {
                                writeln!(out, "Unknown command: \"{}\"", name)?;
                            }
                        }
                    }
                }
                Deferred::LeaveConsole => {
                    self.leave_console(out)?;
                }
            }
        }
        Ok(())
    }

    /// Leaves the active console and re-enters the one below it.
    ///
    /// Returns whether any console is still active.
    pub fn leave_console(&mut self, out: &mut dyn Write) -> Result<bool, ShellError> {
        if let Some(path) = self.current_path() {
            if let Some(console) = self.root.find_console_mut(&path) {
                if let Err(e) = console.leave(&mut self.env, out) {
                    report(out, &e)?;
                }
            }
            self.env.leave_console();
        }

        let Some(path) = self.current_path() else {
            return Ok(false);
        };
        if let Some(console) = self.root.find_console_mut(&path) {
            if let Err(e) = console.enter(&mut self.env, out) {
                report(out, &e)?;
            }
        }
        Ok(true)
    }

    /// Completes `buffer` (cursor at byte offset `cursor`) in the active
    /// console.
    pub fn complete(&self, buffer: &str, cursor: usize) -> Completion {
        match self.current_console() {
            Some(console) => console.auto_complete(&self.env, &EditLine::new(buffer, cursor)),
            None => Completion::none(),
        }
    }

    /// The prompt: the parts of every console on the stack joined with `/`,
    /// followed by `"> "`. The root console shows the default prompt.
    pub fn prompt(&self) -> String {
        let mut prompt = String::new();
        for path in self.env.stack() {
            let part = if path.is_empty() {
                self.env.default_prompt().to_string()
            } else {
                match self.root.find_console(path) {
                    Some(console) => console.prompt(&self.env),
                    None => continue,
                }
            };
            if !prompt.is_empty() {
                prompt.push('/');
            }
            prompt.push_str(&part);
        }
        prompt.push_str("> ");
        prompt
    }

    fn current_path(&self) -> Option<ConsolePath> {
        self.env.current_console().map(<[String]>::to_vec)
    }
}

fn report(out: &mut dyn Write, err: &anyhow::Error) -> io::Result<()> {
    log::error!("{:#}", err);
    writeln!(out, "error: {:#}", err)
}

/// Reads a command file: one line per command, blank lines and lines
/// starting with `#` skipped.
pub fn load_commands(path: &Path) -> Result<Vec<String>, ShellError> {
    let text = fs::read_to_string(path).map_err(|source| ShellError::BatchFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text
        .lines()
        .filter(|line| {
            let line = line.trim_start();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(str::to_string)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{Back, Builtin, FnCommand, Help};
    use crate::console::ConsoleHandler;
    use crate::table::CommandTable;
    use anyhow::bail;
    use std::time::{SystemTime, UNIX_EPOCH};

    type Body = fn(&mut Environment, &mut dyn Write, &[String]) -> anyhow::Result<()>;

    fn counter(
        name: &'static str,
    ) -> FnCommand<impl FnMut(&mut Environment, &mut dyn Write, &[String]) -> anyhow::Result<()>> {
        let mut calls = 0;
        FnCommand::new(name, move |_: &mut Environment, out: &mut dyn Write, args: &[String]| {
            calls += 1;
            writeln!(out, "{name} #{calls} {}", args.join(","))?;
            Ok(())
        })
    }

    struct Quiet(&'static str);

    impl ConsoleHandler for Quiet {
        fn on_enter(
            &mut self,
            _commands: &CommandTable,
            _env: &mut Environment,
            out: &mut dyn Write,
        ) -> anyhow::Result<()> {
            writeln!(out, "enter {}", self.0)?;
            Ok(())
        }

        fn on_leave(&mut self, _env: &mut Environment, out: &mut dyn Write) -> anyhow::Result<()> {
            writeln!(out, "leave {}", self.0)?;
            Ok(())
        }

        fn prompt(&self, name: &str, _env: &Environment) -> String {
            format!("[{name}]")
        }
    }

    /// root: help, back, fail, net { ping, back, help, if { up } }
    fn shell() -> Shell {
        let mut iface = Console::with_handler("if", Quiet("if"));
        iface.add_command(counter("up")).unwrap();

        let mut net = Console::new("net").with_usage("net: network settings");
        net.add_command(counter("ping")).unwrap();
        net.add_command(Builtin::<Back>::new()).unwrap();
        net.add_command(Builtin::<Help>::new()).unwrap();
        net.add_command(iface).unwrap();

        let mut shell = Shell::new(ShellConfig::default());
        shell.add_command(Builtin::<Help>::new()).unwrap();
        shell.add_command(Builtin::<Back>::new()).unwrap();
        let fail: Body = |_, _, _| bail!("disk on fire");
        shell.add_command(FnCommand::new("fail", fail)).unwrap();
        shell.add_command(net).unwrap();
        shell
    }

    fn run(shell: &mut Shell, line: &str) -> String {
        let mut out = Vec::new();
        shell.run_line(line, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_start_shows_root_help() {
        let mut shell = shell();
        let mut out = Vec::new();
        shell.start(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Commands:\n  \
             help [command]: show help message\n  \
             back: leave the current console\n  \
             fail\n  \
             net: network settings\n  \
             <Ctrl-D>: quit\n"
        );
    }

    #[test]
    fn test_entering_console_changes_prompt_and_context() {
        let mut shell = shell();
        assert_eq!(shell.prompt(), "> ");

        let output = run(&mut shell, "net");
        assert!(output.starts_with("Commands:\n  ping\n"), "{output}");
        assert_eq!(shell.prompt(), "net> ");
        assert_eq!(shell.current_console().map(|c| c.name()), Some("net"));

        assert_eq!(run(&mut shell, "ping a b"), "ping #1 a,b\n");
        assert_eq!(run(&mut shell, ""), "ping #2 a,b\n");

        assert_eq!(run(&mut shell, "if"), "enter if\n");
        assert_eq!(shell.prompt(), "net/[if]> ");
        assert_eq!(run(&mut shell, "up"), "up #1 \n");
    }

    #[test]
    fn test_default_prompt_prefixes_stack() {
        let mut shell = Shell::new(ShellConfig {
            prompt: "demo".to_string(),
            ..ShellConfig::default()
        });
        shell.add_command(Console::new("net")).unwrap();
        assert_eq!(shell.prompt(), "demo> ");
        run(&mut shell, "net");
        assert_eq!(shell.prompt(), "demo/net> ");
    }

    #[test]
    fn test_run_sub_command_without_entering() {
        let mut shell = shell();
        assert_eq!(run(&mut shell, "net ping x"), "ping #1 x\n");
        assert_eq!(shell.prompt(), "> ");
        // the root repeats the whole line
        assert_eq!(run(&mut shell, ""), "ping #2 x\n");
    }

    #[test]
    fn test_repeat_disabled_by_config() {
        let mut shell = Shell::new(ShellConfig {
            repeat_on_empty: false,
            ..ShellConfig::default()
        });
        shell.add_command(counter("tick")).unwrap();
        assert_eq!(run(&mut shell, "tick"), "tick #1 \n");
        assert_eq!(run(&mut shell, ""), "");
    }

    #[test]
    fn test_unterminated_quote_is_rejected() {
        let mut shell = shell();
        assert_eq!(
            run(&mut shell, "net ping \"a b"),
            "error: unterminated quote or escape: net ping \"a b\n"
        );
        // nothing was recorded for repetition
        assert_eq!(run(&mut shell, ""), "");
    }

    #[test]
    fn test_failing_command_is_reported() {
        let mut shell = shell();
        assert_eq!(run(&mut shell, "fail"), "error: disk on fire\n");
        assert!(shell.is_running());
    }

    #[test]
    fn test_unknown_command() {
        let mut shell = shell();
        assert_eq!(run(&mut shell, "nope 1"), "Unknown command: \"nope 1\"\n");
    }

    #[test]
    fn test_help_shows_active_console() {
        let mut shell = shell();
        run(&mut shell, "net");
        assert_eq!(
            run(&mut shell, "help"),
            "Commands:\n  ping\n  \
             back: leave the current console\n  \
             help [command]: show help message\n  \
             if\n  <Ctrl-D>: quit\n"
        );
        assert_eq!(run(&mut shell, "help back"), "  back: leave the current console\n");
        assert_eq!(run(&mut shell, "help nope"), "Unknown command: \"nope\"\n");
    }

    #[test]
    fn test_leaving_consoles() {
        let mut shell = shell();
        run(&mut shell, "net");
        run(&mut shell, "if");

        let mut out = Vec::new();
        assert!(shell.leave_console(&mut out).unwrap());
        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with("leave if\nCommands:\n  ping\n"), "{output}");
        assert_eq!(shell.prompt(), "net> ");

        let output = run(&mut shell, "back");
        assert!(output.starts_with("Commands:\n  help"), "{output}");
        assert_eq!(shell.prompt(), "> ");

        assert!(!shell.leave_console(&mut Vec::new()).unwrap());
        assert!(!shell.is_running());
        assert!(shell.current_console().is_none());
        assert_eq!(run(&mut shell, "net"), "");
    }

    #[test]
    fn test_back_through_inactive_console_keeps_session() {
        let mut shell = shell();
        assert_eq!(run(&mut shell, "net back"), "");
        assert!(shell.is_running());
        assert_eq!(shell.prompt(), "> ");
        assert_eq!(shell.env().stack().len(), 1);
    }

    #[test]
    fn test_completion_follows_active_console() {
        let mut shell = shell();
        let completion = shell.complete("n", 1);
        assert_eq!(completion.values(), vec!["net"]);
        assert_eq!(completion.suffix, "et");

        let completion = shell.complete("net i", 5);
        assert_eq!(completion.values(), vec!["if"]);

        run(&mut shell, "net");
        let completion = shell.complete("p", 1);
        assert_eq!(completion.values(), vec!["ping"]);
        assert!(shell.complete("n", 1).is_empty());
    }

    #[test]
    fn test_run_commands_stops_after_last_console() {
        let mut shell = shell();
        let mut out = Vec::new();
        shell
            .run_commands(["net ping 1", "back", "net ping 2"], &mut out)
            .unwrap();
        let output = String::from_utf8(out).unwrap();
        assert!(output.starts_with("ping #1 1\n"), "{output}");
        assert!(!output.contains("ping #2"), "{output}");
    }

    #[test]
    fn test_request_exit_stops_batch() {
        let mut shell = shell();
        let quit: Body = |env, _, _| {
            env.request_exit();
            Ok(())
        };
        shell.add_command(FnCommand::new("quit", quit)).unwrap();
        let mut out = Vec::new();
        shell.run_commands(["quit", "net ping"], &mut out).unwrap();
        assert!(out.is_empty());
        assert!(!shell.is_running());
    }

    fn unique_temp_file(tag: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        path.push(format!("consoles_{}_{}_{}.txt", tag, std::process::id(), nanos));
        path
    }

    #[test]
    fn test_load_commands_keeps_line_whitespace() {
        let path = unique_temp_file("escaped_space");
        fs::write(&path, "  net ping a\\ \n").unwrap();

        let lines = load_commands(&path).unwrap();
        assert_eq!(lines, vec!["  net ping a\\ "]);

        let mut shell = shell();
        let mut out = Vec::new();
        shell.run_commands(&lines, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ping #1 a \n");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_load_commands_skips_comments() {
        let path = unique_temp_file("batch");
        fs::write(&path, "# setup\nnet ping 1\n\n   \n  # indented comment\nback\n").unwrap();

        let lines = load_commands(&path).unwrap();
        assert_eq!(lines, vec!["net ping 1", "back"]);

        let _ = fs::remove_file(&path);
        let err = load_commands(&path).unwrap_err();
        assert!(matches!(err, ShellError::BatchFile { .. }));
        assert!(err.to_string().starts_with("cannot read command file"));
    }
}
