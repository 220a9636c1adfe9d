//! Builtin shell commands.

use std::time::Duration;

use anyhow::{anyhow, Context as _};
use serde_json::Value;
use unicode_width::UnicodeWidthStr;

use super::{CommandContext, CommandParameters, ShellCommand};
use crate::kernel::KernelContext;
use crate::theme;
use crate::threads::{KernelThreadId, ThreadInfo, ThreadStatus};

pub(super) fn all() -> Vec<Box<dyn ShellCommand>> {
    vec![
        Box::new(Help),
        Box::new(Threads),
        Box::new(StartThread),
        Box::new(StopThread),
        Box::new(Events),
        Box::new(Fire),
        Box::new(ClearEvents),
        Box::new(TaskMan),
        Box::new(Demo),
        Box::new(SaveConfig),
        Box::new(ReloadConfig),
        Box::new(Exit),
    ]
}

/// Resolve `#3`, `3` or a thread name.
pub(crate) fn find_thread(kernel: &KernelContext, key: &str) -> anyhow::Result<KernelThreadId> {
    let numeric = key.strip_prefix('#').unwrap_or(key);
    if let Ok(n) = numeric.parse::<u64>() {
        let id = KernelThreadId(n);
        if kernel.threads().info(id).is_some() {
            return Ok(id);
        }
    }
    kernel
        .threads()
        .find_by_name(key)
        .ok_or_else(|| anyhow!("no kernel thread matches '{key}'"))
}

/// Pad `text` with spaces to `width` display columns.
fn pad(text: &str, width: usize) -> String {
    let used = text.width();
    format!("{text}{}", " ".repeat(width.saturating_sub(used)))
}

pub(crate) fn thread_row(info: &ThreadInfo, indent: usize) -> String {
    let status = match info.status {
        ThreadStatus::Running => theme::success(info.status.display()),
        ThreadStatus::Ready => theme::info(info.status.display()),
        ThreadStatus::Finished => theme::muted(info.status.display()),
    };
    let mut flags = Vec::new();
    if info.background {
        flags.push("background");
    }
    if info.critical {
        flags.push("critical");
    }
    format!(
        "{}{} {} {}  {}  {}",
        "  ".repeat(indent),
        info.status.icon(),
        pad(&info.id.to_string(), 5),
        pad(&info.name, 28usize.saturating_sub(indent * 2)),
        status,
        theme::muted(&flags.join(", "))
    )
}

// ── help ────────────────────────────────────────────────────────────────────

struct Help;

impl ShellCommand for Help {
    fn name(&self) -> &'static str {
        "help"
    }

    fn help(&self) -> &'static str {
        "List commands, or describe one"
    }

    fn usage(&self) -> &'static str {
        "[command]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        if let Some(name) = params.arg(0) {
            let command = ctx
                .shell
                .command(name)
                .ok_or_else(|| anyhow!("no help for '{name}'"))?;
            writeln!(ctx.out, "{} {}", theme::accent_bright(command.name()), command.usage())?;
            writeln!(ctx.out, "  {}", command.help())?;
            return Ok(0);
        }

        writeln!(ctx.out, "{}", theme::heading("Available commands:"))?;
        for command in ctx.shell.commands() {
            writeln!(
                ctx.out,
                "  {} {}",
                theme::accent_bright(&pad(command.name(), 14)),
                command.help()
            )?;
        }
        Ok(0)
    }
}

// ── threads ─────────────────────────────────────────────────────────────────

struct Threads;

impl ShellCommand for Threads {
    fn name(&self) -> &'static str {
        "threads"
    }

    fn help(&self) -> &'static str {
        "List kernel threads and their children"
    }

    fn usage(&self) -> &'static str {
        "[-errors]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        let kernel = ctx.kernel;
        let threads = kernel.threads();
        let roots = threads.threads();
        if roots.is_empty() {
            writeln!(ctx.out, "{}", theme::muted("No kernel threads."))?;
        }
        for root in &roots {
            writeln!(ctx.out, "{}", thread_row(root, 0))?;
            write_children(ctx, root.id, 1)?;
        }

        if params.has_switch("errors") {
            for fatal in threads.fatal_errors() {
                writeln!(ctx.out, "{}", theme::icon_fail(&fatal.to_string()))?;
            }
        }
        Ok(0)
    }
}

fn write_children(ctx: &mut CommandContext<'_>, id: KernelThreadId, depth: usize) -> anyhow::Result<()> {
    let kernel = ctx.kernel;
    for child in kernel.threads().children(id) {
        writeln!(ctx.out, "{}", thread_row(&child, depth))?;
        write_children(ctx, child.id, depth + 1)?;
    }
    Ok(())
}

// ── startthread / stopthread ────────────────────────────────────────────────

struct StartThread;

impl ShellCommand for StartThread {
    fn name(&self) -> &'static str {
        "startthread"
    }

    fn help(&self) -> &'static str {
        "Start a ready kernel thread with its children"
    }

    fn usage(&self) -> &'static str {
        "<thread>"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        let id = find_thread(ctx.kernel, params.arg(0).unwrap_or_default())?;
        ctx.kernel.threads().start(id)?;
        writeln!(ctx.out, "{}", theme::icon_ok(&format!("Started {id}")))?;
        Ok(0)
    }
}

struct StopThread;

impl ShellCommand for StopThread {
    fn name(&self) -> &'static str {
        "stopthread"
    }

    fn help(&self) -> &'static str {
        "Stop a kernel thread and its children, leaving them ready to start again"
    }

    fn usage(&self) -> &'static str {
        "<thread>"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        let kernel = ctx.kernel;
        let id = find_thread(kernel, params.arg(0).unwrap_or_default())?;
        let threads = kernel.threads();

        let pb = theme::spinner(&format!("Stopping {id}…"));
        let report = match threads.stop_by_user(id) {
            Ok(report) => report,
            Err(e) => {
                pb.finish_and_clear();
                return Err(e.into());
            }
        };
        if report.is_complete() {
            theme::spinner_ok(&pb, &format!("Stopped {id}"));
            return Ok(0);
        }

        let stuck = report
            .timed_out
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        theme::spinner_warn(&pb, &format!("{id} did not stop in time"));
        writeln!(ctx.out, "{}", theme::icon_warn(&format!("Still running: {stuck}")))?;
        Ok(0)
    }
}

// ── events / fire / clearevents ─────────────────────────────────────────────

struct Events;

impl ShellCommand for Events {
    fn name(&self) -> &'static str {
        "events"
    }

    fn help(&self) -> &'static str {
        "List fired events, optionally filtered by name"
    }

    fn usage(&self) -> &'static str {
        "[-search=term]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        let search = params
            .switch_value("search")
            .or_else(|| params.arg(0))
            .unwrap_or("");
        let fired = ctx.kernel.events().list_fired(search);
        if fired.is_empty() {
            writeln!(ctx.out, "{}", theme::muted("No fired events."))?;
        }
        for (label, args) in fired {
            let args = args.iter().map(Value::to_string).collect::<Vec<_>>().join(", ");
            writeln!(ctx.out, "{} {}", theme::accent(&pad(&label, 24)), theme::muted(&args))?;
        }
        Ok(0)
    }
}

struct Fire;

impl ShellCommand for Fire {
    fn name(&self) -> &'static str {
        "fire"
    }

    fn help(&self) -> &'static str {
        "Fire an event by name or number; arguments are JSON or plain strings"
    }

    fn usage(&self) -> &'static str {
        "<event> [args...]"
    }

    fn min_args(&self) -> usize {
        1
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        let event = &params.args[0];
        let args: Vec<Value> = params.args[1..]
            .iter()
            .map(|a| serde_json::from_str(a).unwrap_or_else(|_| Value::String(a.clone())))
            .collect();

        let events = ctx.kernel.events();
        match event.parse::<u32>() {
            Ok(number) => events.fire_by_number(number, args)?,
            Err(_) => events.fire_by_name(event, args)?,
        }
        writeln!(ctx.out, "{}", theme::icon_ok(&format!("Fired {event}")))?;
        Ok(0)
    }
}

struct ClearEvents;

impl ShellCommand for ClearEvents {
    fn name(&self) -> &'static str {
        "clearevents"
    }

    fn help(&self) -> &'static str {
        "Forget the fired-event history"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _params: &CommandParameters) -> anyhow::Result<i32> {
        let count = ctx.kernel.events().fired_count();
        ctx.kernel.events().clear_fired();
        writeln!(ctx.out, "{}", theme::icon_ok(&format!("Cleared {count} events")))?;
        Ok(0)
    }
}

// ── taskman ─────────────────────────────────────────────────────────────────

struct TaskMan;

impl ShellCommand for TaskMan {
    fn name(&self) -> &'static str {
        "taskman"
    }

    fn help(&self) -> &'static str {
        "Browse kernel threads interactively"
    }

    #[cfg(feature = "tui")]
    fn execute(&self, ctx: &mut CommandContext<'_>, _params: &CommandParameters) -> anyhow::Result<i32> {
        let header_rows = ctx.kernel.config().tui.header_rows;
        crate::tui::terminal::run_interactive(super::TaskManager::new(ctx.kernel), header_rows)?;
        Ok(0)
    }

    #[cfg(not(feature = "tui"))]
    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        writeln!(ctx.out, "{}", theme::icon_warn("Built without the tui feature; listing threads instead."))?;
        Threads.execute(ctx, params)
    }
}

// ── demo ────────────────────────────────────────────────────────────────────

struct Demo;

/// Body of the demo threads: tick until stopped.
fn tick(ctx: crate::threads::ThreadContext) -> anyhow::Result<()> {
    let period = ctx
        .parameter::<Duration>()
        .copied()
        .unwrap_or(Duration::from_millis(250));
    loop {
        ctx.stop.sleep(period)?;
    }
}

impl ShellCommand for Demo {
    fn name(&self) -> &'static str {
        "demo"
    }

    fn help(&self) -> &'static str {
        "Start a demo thread with two children"
    }

    fn usage(&self) -> &'static str {
        "[-tick=ms]"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        let tick_ms: u64 = params
            .switch_value("tick")
            .map(str::parse::<u64>)
            .transpose()
            .context("-tick expects milliseconds")?
            .unwrap_or(250);

        let kernel = ctx.kernel;
        let threads = kernel.threads();
        let parent = threads.create("Demo", true, tick);
        threads.add_child(parent, "Demo child 1", true, tick)?;
        threads.add_child(parent, "Demo child 2", true, tick)?;
        threads.start_with(parent, Duration::from_millis(tick_ms))?;

        writeln!(ctx.out, "{}", theme::icon_ok(&format!("Started demo group {parent}")))?;
        if let Some(info) = threads.info(parent) {
            writeln!(ctx.out, "{}", thread_row(&info, 0))?;
            write_children(ctx, parent, 1)?;
        }
        Ok(0)
    }
}

// ── config ──────────────────────────────────────────────────────────────────

struct SaveConfig;

impl ShellCommand for SaveConfig {
    fn name(&self) -> &'static str {
        "saveconfig"
    }

    fn help(&self) -> &'static str {
        "Write the current configuration to disk"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _params: &CommandParameters) -> anyhow::Result<i32> {
        let path = ctx.kernel.save_config()?;
        writeln!(ctx.out, "{}", theme::icon_ok(&format!("Saved {}", path.display())))?;
        Ok(0)
    }
}

struct ReloadConfig;

impl ShellCommand for ReloadConfig {
    fn name(&self) -> &'static str {
        "reloadconfig"
    }

    fn help(&self) -> &'static str {
        "Re-read the configuration file"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _params: &CommandParameters) -> anyhow::Result<i32> {
        ctx.kernel.reload_config()?;
        writeln!(ctx.out, "{}", theme::icon_ok("Configuration reloaded"))?;
        Ok(0)
    }
}

// ── exit ────────────────────────────────────────────────────────────────────

struct Exit;

impl ShellCommand for Exit {
    fn name(&self) -> &'static str {
        "exit"
    }

    fn help(&self) -> &'static str {
        "Leave the shell"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, _params: &CommandParameters) -> anyhow::Result<i32> {
        ctx.exit_requested = true;
        Ok(0)
    }
}
