use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use strum::IntoEnumIterator;

use nitrocid::args::CommonArgs;
use nitrocid::events::EventKind;
use nitrocid::kernel::KernelContext;
use nitrocid::logging::{self, LogConfig};
use nitrocid::shell::Shell;
use nitrocid::theme as t;

// ── CLI ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "nitrocid",
    version,
    about = "Nitrocid KS kernel shell: kernel threads, kernel events and the task manager"
)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Interactive kernel shell (default when no subcommand is given)
    Shell,
    /// Run one shell command line and exit with its code
    Run {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        line: Vec<String>,
    },
    /// Print the event catalog
    Events {
        /// Only kinds whose name contains this text
        #[arg(long, short)]
        search: Option<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Start a thread with two children, let them tick, then stop them
    Demo {
        /// How long the group runs before it is stopped
        #[arg(long, value_name = "MS", default_value_t = 1000)]
        run_ms: u64,
    },
    /// Browse kernel threads interactively
    Taskman,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    t::init_color(cli.common.no_color);

    let command = cli.command.unwrap_or(Commands::Shell);
    let kernel = KernelContext::from_args(&cli.common)?;

    let mut log = if cli.common.verbose {
        LogConfig::debug()
    } else {
        LogConfig::from_env()
    };
    if matches!(command, Commands::Taskman) {
        log = log.to_file(kernel.config().log_path());
    }
    logging::init(log)?;

    kernel
        .events()
        .fire(EventKind::KernelStarted, vec![serde_json::json!(env!("CARGO_PKG_VERSION"))]);
    let shell = Shell::with_builtins();

    let code = match command {
        Commands::Shell => {
            if io::stdin().is_terminal() {
                t::print_header(&format!("Nitrocid KS {}", env!("CARGO_PKG_VERSION")));
                println!("  {}", t::muted("Type 'help' for a list of commands."));
            }
            let mut input = io::stdin().lock();
            let mut out = io::stdout();
            shell.run_repl(&kernel, &mut input, &mut out)?
        }
        Commands::Run { line } => {
            let line = line
                .iter()
                .map(|word| {
                    if word.contains(char::is_whitespace) {
                        format!("\"{word}\"")
                    } else {
                        word.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" ");
            shell.execute(&kernel, &line, &mut io::stdout()).code
        }
        Commands::Events { search, json } => {
            print_catalog(search.as_deref().unwrap_or(""), json)?;
            0
        }
        Commands::Demo { run_ms } => demo(&kernel, &shell, Duration::from_millis(run_ms)),
        Commands::Taskman => shell.execute(&kernel, "taskman", &mut io::stdout()).code,
    };

    kernel.shutdown();
    Ok(ExitCode::from(code.clamp(0, 255) as u8))
}

fn print_catalog(search: &str, json: bool) -> Result<()> {
    let kinds: Vec<EventKind> = EventKind::iter()
        .filter(|k| k.label().contains(search))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&kinds)?);
        return Ok(());
    }
    for kind in kinds {
        println!("{} {}", t::muted(&format!("{:>3}", kind.number())), t::accent(kind.label()));
    }
    Ok(())
}

fn demo(kernel: &KernelContext, shell: &Shell, run_for: Duration) -> i32 {
    let mut out = io::stdout();
    let started = shell.execute(kernel, "demo -tick=100", &mut out);
    if started.code != 0 {
        return started.code;
    }

    std::thread::sleep(run_for);
    let stopped = shell.execute(kernel, "stopthread Demo", &mut out);
    shell.execute(kernel, "threads", &mut out);
    shell.execute(kernel, "events -search=Thread", &mut out);
    stopped.code
}
