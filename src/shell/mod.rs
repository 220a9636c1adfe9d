//! The kernel shell: a command registry, a dispatcher that wraps every
//! command in the `PreExecuteCommand`/`PostExecuteCommand` events, and a
//! line-based REPL.

mod builtins;
mod params;
mod taskman;

use std::collections::BTreeMap;
use std::io::{BufRead, Write};

use serde_json::json;
use tracing::{debug, warn};

use crate::events::EventKind;
use crate::kernel::KernelContext;
use crate::theme;

pub use params::CommandParameters;
pub use taskman::TaskManager;

/// Exit code for a command name nothing is registered under.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code for a command invoked with too few arguments.
pub const EXIT_USAGE: i32 = 2;

/// What a command gets to work with.
pub struct CommandContext<'a> {
    pub kernel: &'a KernelContext,
    pub shell: &'a Shell,
    pub out: &'a mut dyn Write,
    /// Set by `exit` to end the REPL
    pub exit_requested: bool,
}

/// A shell command. Returns its exit code; 0 is success.
pub trait ShellCommand: Send + Sync {
    fn name(&self) -> &'static str;

    /// One-line description for `help`.
    fn help(&self) -> &'static str;

    /// Argument synopsis, e.g. `<thread> [-regen]`.
    fn usage(&self) -> &'static str {
        ""
    }

    /// Positional arguments required before `execute` is called.
    fn min_args(&self) -> usize {
        0
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32>;
}

/// Result of dispatching one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellOutcome {
    pub code: i32,
    pub exit: bool,
}

#[derive(Default)]
pub struct Shell {
    commands: BTreeMap<&'static str, Box<dyn ShellCommand>>,
}

impl Shell {
    pub fn new() -> Self {
        Self::default()
    }

    /// A shell with every builtin registered.
    pub fn with_builtins() -> Self {
        let mut shell = Self::new();
        for command in builtins::all() {
            shell.register(command);
        }
        shell
    }

    /// Add a command, replacing any with the same name.
    pub fn register(&mut self, command: Box<dyn ShellCommand>) {
        self.commands.insert(command.name(), command);
    }

    pub fn command(&self, name: &str) -> Option<&dyn ShellCommand> {
        self.commands.get(name).map(|c| c.as_ref())
    }

    /// Registered commands in name order.
    pub fn commands(&self) -> impl Iterator<Item = &dyn ShellCommand> {
        self.commands.values().map(|c| c.as_ref())
    }

    /// Parse and run one line, writing command output to `out`.
    pub fn execute(&self, kernel: &KernelContext, line: &str, out: &mut dyn Write) -> ShellOutcome {
        let Some(params) = CommandParameters::parse(line) else {
            return ShellOutcome { code: 0, exit: false };
        };
        let events = kernel.events();
        events.fire(EventKind::PreExecuteCommand, vec![json!(params.raw)]);

        let mut ctx = CommandContext {
            kernel,
            shell: self,
            out,
            exit_requested: false,
        };
        let code = self.dispatch(&mut ctx, &params);
        let exit = ctx.exit_requested;

        if code != 0 {
            events.fire(
                EventKind::CommandError,
                vec![json!(params.command), json!(code)],
            );
        }
        events.fire(
            EventKind::PostExecuteCommand,
            vec![json!(params.raw), json!(code)],
        );
        debug!(command = %params.command, code, "Command finished");
        ShellOutcome { code, exit }
    }

    fn dispatch(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> i32 {
        let Some(command) = self.command(&params.command) else {
            let _ = writeln!(
                ctx.out,
                "{}",
                theme::icon_fail(&format!(
                    "Command '{}' not found. Type 'help' for a list.",
                    params.command
                ))
            );
            return EXIT_NOT_FOUND;
        };

        if params.args.len() < command.min_args() {
            let _ = writeln!(
                ctx.out,
                "{} {} {}",
                theme::warn("Usage:"),
                command.name(),
                command.usage()
            );
            return EXIT_USAGE;
        }

        match command.execute(ctx, params) {
            Ok(code) => code,
            Err(e) => {
                warn!(command = %params.command, error = %format!("{e:#}"), "Command failed");
                let _ = writeln!(ctx.out, "{}", theme::icon_fail(&format!("{e:#}")));
                1
            }
        }
    }

    /// Read-eval-print loop until `exit` or end of input. Returns the last
    /// command's exit code.
    pub fn run_repl(
        &self,
        kernel: &KernelContext,
        input: &mut dyn BufRead,
        out: &mut dyn Write,
    ) -> anyhow::Result<i32> {
        kernel.events().fire(EventKind::ShellInitialized, Vec::new());
        let mut last = 0;
        let mut line = String::new();
        loop {
            write!(out, "{}", theme::accent_bright(&kernel.config().shell.prompt))?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }
            let outcome = self.execute(kernel, &line, out);
            last = outcome.code;
            if outcome.exit {
                break;
            }
        }
        Ok(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    struct Fails;

    impl ShellCommand for Fails {
        fn name(&self) -> &'static str {
            "fails"
        }

        fn help(&self) -> &'static str {
            "always fails"
        }

        fn execute(&self, _ctx: &mut CommandContext<'_>, _params: &CommandParameters) -> anyhow::Result<i32> {
            anyhow::bail!("broken on purpose")
        }
    }

    #[test]
    fn test_unknown_command_fires_command_error() {
        let kernel = KernelContext::new(Config::default());
        let shell = Shell::new();
        let mut out = Vec::new();

        let outcome = shell.execute(&kernel, "nope", &mut out);
        assert_eq!(outcome.code, EXIT_NOT_FOUND);
        assert_eq!(
            kernel.events().list_fired("CommandError"),
            vec![("CommandError".to_string(), vec![json!("nope"), json!(EXIT_NOT_FOUND)])]
        );
        assert_eq!(kernel.events().list_fired("ExecuteCommand").len(), 2);
    }

    #[test]
    fn test_command_error_becomes_exit_code_one() {
        let kernel = KernelContext::new(Config::default());
        let mut shell = Shell::new();
        shell.register(Box::new(Fails));
        let mut out = Vec::new();

        assert_eq!(shell.execute(&kernel, "fails", &mut out).code, 1);
        assert!(String::from_utf8(out).unwrap().contains("broken on purpose"));
    }

    #[test]
    fn test_blank_line_fires_nothing() {
        let kernel = KernelContext::new(Config::default());
        let shell = Shell::with_builtins();
        let mut out = Vec::new();

        assert_eq!(shell.execute(&kernel, "  ", &mut out).code, 0);
        assert_eq!(kernel.events().fired_count(), 0);
    }

    #[test]
    fn test_repl_stops_at_exit() {
        let kernel = KernelContext::new(Config::default());
        let shell = Shell::with_builtins();
        let mut input = std::io::Cursor::new("help\nnope\nexit\nhelp\n");
        let mut out = Vec::new();

        let code = shell.run_repl(&kernel, &mut input, &mut out).unwrap();
        assert_eq!(code, 0);
        assert_eq!(kernel.events().list_fired("PostExecuteCommand").len(), 3);
        assert_eq!(kernel.events().list_fired("ShellInitialized").len(), 1);
    }
}
