use std::any::Any;

/// Path of a console from the root of the tree: the names of the consoles
/// to descend through. The root console is the empty path.
pub type ConsolePath = Vec<String>;

/// Actions a command asks the shell to perform once the current line has
/// been dispatched.
///
/// Commands run while the console tree is borrowed for dispatch, so anything
/// that needs the tree itself (showing help of the active console, leaving
/// it) is queued here instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deferred {
    /// Show the help of the active console, or of one of its commands.
    ShowHelp(Option<String>),
    /// Leave the active console.
    LeaveConsole,
}

/// Caller-side state shared by every command of a shell.
///
/// The environment contains:
/// - the navigation stack of active consoles (the last one is current);
/// - the location of the console currently dispatching a line;
/// - the default prompt shown for the root console;
/// - batch-mode and exit flags;
/// - deferred actions and an optional piece of user state.
#[derive(Debug)]
pub struct Environment {
    stack: Vec<ConsolePath>,
    location: ConsolePath,
    default_prompt: String,
    batch_mode: bool,
    should_exit: bool,
    deferred: Vec<Deferred>,
    state: Option<Box<dyn Any>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// A fresh environment where the root console is active.
    pub fn new() -> Self {
        Self {
            stack: vec![ConsolePath::new()],
            location: ConsolePath::new(),
            default_prompt: String::new(),
            batch_mode: false,
            should_exit: false,
            deferred: Vec::new(),
            state: None,
        }
    }

    /// Path of the active console, `None` once every console has been left.
    pub fn current_console(&self) -> Option<&[String]> {
        self.stack.last().map(Vec::as_slice)
    }

    /// Every console on the navigation stack, outermost first.
    pub fn stack(&self) -> &[ConsolePath] {
        &self.stack
    }

    /// Makes the console at `path` the active one.
    pub fn enter_console(&mut self, path: ConsolePath) {
        log::debug!("entering console {:?}", path);
        self.stack.push(path);
    }

    /// Pops the active console, returning its path.
    pub fn leave_console(&mut self) -> Option<ConsolePath> {
        let left = self.stack.pop();
        log::debug!("left console {:?}", left);
        left
    }

    /// Path of the console that is dispatching right now.
    pub fn location(&self) -> &[String] {
        &self.location
    }

    /// Whether the console at [`Environment::location`] is the active one.
    pub fn is_active_location(&self) -> bool {
        self.current_console() == Some(self.location())
    }

    pub(crate) fn set_location(&mut self, path: ConsolePath) {
        self.location = path;
    }

    /// Runs `f` with the location extended by `name`, restoring it after.
    pub(crate) fn descend<R>(&mut self, name: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.location.push(name.to_string());
        let result = f(self);
        self.location.pop();
        result
    }

    /// Prompt shown for the root console.
    pub fn default_prompt(&self) -> &str {
        &self.default_prompt
    }

    /// Changes the root console's prompt, e.g. to show the selected object.
    pub fn set_default_prompt(&mut self, prompt: impl Into<String>) {
        self.default_prompt = prompt.into();
    }

    /// Whether lines come from `-x`/`-f` arguments rather than a terminal.
    pub fn is_batch_mode(&self) -> bool {
        self.batch_mode
    }

    /// Marks the session as non-interactive.
    pub fn set_batch_mode(&mut self, enabled: bool) {
        self.batch_mode = enabled;
    }

    /// Asks the shell to stop reading lines.
    pub fn request_exit(&mut self) {
        self.should_exit = true;
    }

    /// Whether a command asked the shell to stop.
    pub fn should_exit(&self) -> bool {
        self.should_exit
    }

    /// Queues `action` until the current line has been dispatched.
    pub fn defer(&mut self, action: Deferred) {
        self.deferred.push(action);
    }

    pub(crate) fn take_deferred(&mut self) -> Vec<Deferred> {
        std::mem::take(&mut self.deferred)
    }

    /// Install the user state shared by commands, replacing any previous one.
    pub fn set_state<T: Any>(&mut self, state: T) {
        self.state = Some(Box::new(state));
    }

    /// The user state, if one of type `T` is installed.
    pub fn state<T: Any>(&self) -> Option<&T> {
        self.state.as_ref()?.downcast_ref()
    }

    /// Mutable access to the user state of type `T`.
    pub fn state_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.state.as_mut()?.downcast_mut()
    }
}
