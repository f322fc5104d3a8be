use anyhow::{Context, Result, bail};
use argh::FromArgs;
use regex::Regex;
use shell_consoles::builtin::{ArgsCommand, Back, Builtin, FnCommand, Help};
use shell_consoles::file_name::{self, FileTypes};
use shell_consoles::shell::load_commands;
use shell_consoles::table::CommandTable;
use shell_consoles::token::EditLine;
use shell_consoles::{
    Application, Completion, Console, ConsoleHandler, Environment, Shell, ShellConfig,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const LINE_LENGTH: usize = 16;
const DEFAULT_ROWS: usize = 10;

#[derive(FromArgs)]
/// browse files as hex dumps in nested consoles.
struct Args {
    #[argh(switch, short = 'b')]
    /// exit after running the batch commands instead of going interactive.
    batch: bool,

    #[argh(option, short = 'x')]
    /// run this command first; may be repeated.
    exec: Vec<String>,

    #[argh(option, short = 'f')]
    /// run the commands of this file; may be repeated.
    file: Vec<PathBuf>,
}

/// The file shared by the `file`, `find` and `hex` commands.
#[derive(Default)]
struct FileView {
    path: PathBuf,
    file: Option<File>,
    length: u64,
}

impl FileView {
    /// Selects `path`. The previous file is dropped even when opening fails.
    fn open(&mut self, path: &Path) -> io::Result<u64> {
        self.file = None;
        self.path = PathBuf::new();
        self.length = 0;
        let file = File::open(path)?;
        self.length = file.metadata()?.len();
        self.path = path.to_path_buf();
        self.file = Some(file);
        Ok(self.length)
    }

    fn file(&mut self) -> Result<&mut File> {
        self.file.as_mut().context("no file selected, use 'file PATH' first")
    }
}

fn file_view(env: &mut Environment) -> Result<&mut FileView> {
    env.state_mut::<FileView>().context("file view is not set up")
}

#[derive(FromArgs)]
/// select the file to browse.
struct OpenFile {
    #[argh(positional)]
    /// path of the file.
    path: PathBuf,
}

impl ArgsCommand for OpenFile {
    fn name() -> &'static str {
        "file"
    }

    fn usage() -> Option<&'static str> {
        Some("file PATH: open a file")
    }

    fn execute(self, env: &mut Environment, out: &mut dyn Write) -> Result<()> {
        let length = file_view(env)?
            .open(&self.path)
            .with_context(|| format!("cannot open file {}", self.path.display()))?;
        writeln!(out, "file selected: {}, size: {}", self.path.display(), length)?;

        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        env.set_default_prompt(format!("[{}]", name));
        Ok(())
    }

    fn complete(_env: &Environment, line: &EditLine<'_>) -> Completion {
        file_name::complete_path_argument(line, FileTypes::ALL)
    }
}

#[derive(FromArgs)]
/// show the next rows of the hex dump.
struct Next {
    #[argh(positional, default = "DEFAULT_ROWS")]
    /// number of rows, 16 bytes each.
    rows: usize,
}

impl ArgsCommand for Next {
    fn name() -> &'static str {
        "next"
    }

    fn usage() -> Option<&'static str> {
        Some("next [N]: show next N lines of hex data")
    }

    fn execute(self, env: &mut Environment, out: &mut dyn Write) -> Result<()> {
        if self.rows == 0 {
            bail!("invalid line number: '0'");
        }
        let view = file_view(env)?;
        let length = view.length;
        let file = view.file()?;

        for _ in 0..self.rows {
            let offset = file.stream_position()?;
            let mut buf = Vec::with_capacity(LINE_LENGTH);
            Read::by_ref(file).take(LINE_LENGTH as u64).read_to_end(&mut buf)?;
            if buf.is_empty() {
                break;
            }
            writeln!(out, "{}", hex_line(offset, &buf))?;
            if buf.len() < LINE_LENGTH {
                break;
            }
        }

        let offset = file.stream_position()?;
        let percent = (offset * 100).checked_div(length).unwrap_or(100);
        if offset < length {
            writeln!(out, "-------- {}% -------- press ENTER to continue --------", percent)?;
        } else {
            writeln!(out, "-------- {}% -------- finished --------", percent)?;
        }
        Ok(())
    }
}

/// `[offset]  hex bytes in groups of four  -  printable text`
fn hex_line(offset: u64, data: &[u8]) -> String {
    let mut line = format!("[{:08x}]", offset);
    for i in 0..LINE_LENGTH {
        if i % 4 == 0 {
            line.push(' ');
        }
        match data.get(i) {
            Some(byte) => line.push_str(&format!(" {:02x}", byte)),
            None => line.push_str("   "),
        }
    }
    line.push_str("  -  ");
    line.extend(data.iter().map(|&b| {
        if b.is_ascii_graphic() || b == b' ' {
            b as char
        } else {
            '.'
        }
    }));
    line
}

/// Rewinds the file every time the hex view is entered.
struct HexView;

impl ConsoleHandler for HexView {
    fn on_enter(
        &mut self,
        commands: &CommandTable,
        env: &mut Environment,
        out: &mut dyn Write,
    ) -> Result<()> {
        if let Some(file) = env.state_mut::<FileView>().and_then(|v| v.file.as_mut()) {
            file.seek(SeekFrom::Start(0))?;
        }
        shell_consoles::console::write_help(commands, out)?;
        Ok(())
    }
}

#[derive(FromArgs)]
/// print the lines of the file matching a regular expression.
struct Find {
    #[argh(positional)]
    /// the pattern to search for.
    pattern: String,
}

impl ArgsCommand for Find {
    fn name() -> &'static str {
        "find"
    }

    fn usage() -> Option<&'static str> {
        Some("find PATTERN: print matching lines of the file")
    }

    fn execute(self, env: &mut Environment, out: &mut dyn Write) -> Result<()> {
        let re = Regex::new(&self.pattern)
            .with_context(|| format!("invalid regex pattern: {}", self.pattern))?;
        let view = file_view(env)?;
        view.file()?;
        let path = view.path.clone();
        // a separate handle keeps the hex view position
        let reader = BufReader::new(
            File::open(&path).with_context(|| format!("cannot open file {}", path.display()))?,
        );
        for (number, line) in reader.lines().enumerate() {
            let line = line?;
            if re.is_match(&line) {
                writeln!(out, "{}: {}", number + 1, line)?;
            }
        }
        Ok(())
    }
}

fn constant(
    name: &'static str,
    description: &'static str,
    value: &'static str,
) -> impl shell_consoles::Command {
    FnCommand::new(name, move |_env: &mut Environment, out: &mut dyn Write, _args: &[String]| {
        writeln!(out, "{}", value)?;
        Ok(())
    })
    .with_usage(format!("{}: {}", name, description))
}

fn build_shell(config: ShellConfig) -> Result<Shell> {
    let mut hex = Console::with_handler("hex", HexView).with_usage("hex: view hex data");
    hex.add_command(Builtin::<Next>::new())?;
    hex.add_command(Builtin::<Help>::new())?;
    hex.add_command(Builtin::<Back>::new())?;

    let mut constants = Console::new("const").with_usage("const: show mathematical constants");
    constants.add_command(constant(
        "pi",
        "Archimedes' constant π",
        "3.14159 26535 89793 23846 26433 83279 50288",
    ))?;
    constants.add_command(constant(
        "e",
        "Euler's number e",
        "2.71828 18284 59045 23536 02874 71352 66249",
    ))?;
    constants.add_command(constant(
        "sqrt2",
        "square root of 2",
        "1.41421 35623 73095 04880 16887 24209 69807",
    ))?;
    constants.add_command(Builtin::<Back>::new())?;

    let mut shell = Shell::new(config);
    shell.env_mut().set_state(FileView::default());
    shell.add_command(Builtin::<OpenFile>::new())?;
    shell.add_command(Builtin::<Find>::new())?;
    shell.add_command(hex)?;
    shell.add_command(constants)?;
    shell.add_command(Builtin::<Help>::new())?;
    Ok(shell)
}

fn run(args: Args) -> Result<()> {
    let mut shell = build_shell(ShellConfig::from_process_env())?;

    let mut lines = args.exec;
    for path in &args.file {
        lines.extend(load_commands(path)?);
    }
    let mut stdout = io::stdout();
    shell.env_mut().set_batch_mode(args.batch);
    shell.run_commands(&lines, &mut stdout)?;
    if args.batch {
        return Ok(());
    }

    Application::new(shell)?.run()?;
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Args = argh::from_env();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
