//! Shell integration tests: command dispatch, events and exit codes.

use std::io::Cursor;

use nitrocid::config::Config;
use nitrocid::kernel::KernelContext;
use nitrocid::shell::{CommandContext, CommandParameters, Shell, ShellCommand, EXIT_NOT_FOUND};
use serde_json::json;

fn kernel() -> KernelContext {
    let mut config = Config::default();
    config.threads.stop_timeout_secs = 5;
    KernelContext::new(config)
}

fn run(shell: &Shell, kernel: &KernelContext, line: &str) -> (i32, String) {
    let mut out = Vec::new();
    let code = shell.execute(kernel, line, &mut out).code;
    (code, String::from_utf8_lossy(&out).into_owned())
}

struct Echo;

impl ShellCommand for Echo {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn help(&self) -> &'static str {
        "Print the arguments; -code=N sets the exit code"
    }

    fn execute(&self, ctx: &mut CommandContext<'_>, params: &CommandParameters) -> anyhow::Result<i32> {
        writeln!(ctx.out, "{}", params.args.join(" "))?;
        Ok(params
            .switch_value("code")
            .and_then(|c| c.parse().ok())
            .unwrap_or(0))
    }
}

mod dispatch {
    use super::*;

    #[test]
    fn test_custom_command_with_switches() {
        let kernel = kernel();
        let mut shell = Shell::with_builtins();
        shell.register(Box::new(Echo));

        let (code, out) = run(&shell, &kernel, r#"echo "hello world" -code=4"#);
        assert_eq!(code, 4);
        assert_eq!(out.trim_end(), "hello world");
        assert_eq!(
            kernel.events().list_fired("CommandError"),
            vec![("CommandError".to_string(), vec![json!("echo"), json!(4)])]
        );
    }

    #[test]
    fn test_every_command_is_bracketed_by_events() {
        let kernel = kernel();
        let shell = Shell::with_builtins();
        run(&shell, &kernel, "help");
        run(&shell, &kernel, "missing");

        let labels: Vec<String> = kernel.events().list_fired("").into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec![
                "PreExecuteCommand",
                "PostExecuteCommand",
                "PreExecuteCommand",
                "CommandError",
                "PostExecuteCommand",
            ]
        );
    }

    #[test]
    fn test_unknown_command_code() {
        let kernel = kernel();
        let shell = Shell::with_builtins();
        let (code, out) = run(&shell, &kernel, "format C:");
        assert_eq!(code, EXIT_NOT_FOUND);
        assert!(out.contains("format"));
    }

    #[test]
    fn test_help_lists_builtins() {
        let kernel = kernel();
        let shell = Shell::with_builtins();
        let (_, out) = run(&shell, &kernel, "help");
        for name in ["threads", "stopthread", "events", "fire", "clearevents", "taskman", "exit"] {
            assert!(out.contains(name), "help is missing {name}");
        }
    }
}

mod session {
    use super::*;

    #[test]
    fn test_fire_list_and_clear_through_repl() {
        let kernel = kernel();
        let shell = Shell::with_builtins();
        let mut input = Cursor::new("fire PostLogin alice\nevents PostLogin\nclearevents\nexit\n");
        let mut out = Vec::new();

        let code = shell.run_repl(&kernel, &mut input, &mut out).unwrap();
        let out = String::from_utf8_lossy(&out);
        assert_eq!(code, 0);
        assert!(out.contains("\"alice\""));
        // Only the bracketing events of the last command survive the clear.
        let labels: Vec<String> = kernel.events().list_fired("").into_iter().map(|(l, _)| l).collect();
        assert_eq!(
            labels,
            vec!["PostExecuteCommand", "PreExecuteCommand", "PostExecuteCommand"]
        );
    }

    #[test]
    fn test_demo_group_is_visible_and_stoppable() {
        let kernel = kernel();
        let shell = Shell::with_builtins();

        assert_eq!(run(&shell, &kernel, "demo -tick=5").0, 0);
        let (_, listing) = run(&shell, &kernel, "threads");
        assert!(listing.contains("Demo child 1"));
        assert!(listing.contains("Running"));

        assert_eq!(run(&shell, &kernel, "stopthread Demo").0, 0);
        assert_eq!(kernel.events().list_fired("ThreadStopped").len(), 3);
        assert_eq!(kernel.events().list_fired("ThreadStarted").len(), 3);
    }

    #[test]
    fn test_stopthread_warns_when_thread_ignores_stop() {
        let mut config = Config::default();
        config.threads.stop_timeout_secs = 1;
        let kernel = KernelContext::new(config);
        let shell = Shell::with_builtins();
        let id = kernel.threads().create("Deaf", false, |_| {
            std::thread::sleep(std::time::Duration::from_secs(3));
            Ok(())
        });
        kernel.threads().start(id).unwrap();

        let (code, out) = run(&shell, &kernel, &format!("stopthread {id}"));
        assert_eq!(code, 0);
        assert!(out.contains("Still running"));
        assert!(out.contains(&id.to_string()));
        assert!(kernel.threads().is_alive(id));
        assert!(kernel.events().list_fired("ThreadStopped").is_empty());

        kernel.threads().wait(id).unwrap();
    }
}
