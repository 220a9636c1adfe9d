//! Task manager: kernel threads in the left pane, the highlighted thread's
//! children in the right pane.

use std::time::Duration;

use anyhow::Result;

use crate::kernel::KernelContext;
use crate::threads::ThreadInfo;
use crate::tui::{Binding, BindingOutcome, InteractiveDataSource, PaneId};

pub struct TaskManager<'a> {
    kernel: &'a KernelContext,
    refresh: Duration,
}

impl<'a> TaskManager<'a> {
    pub fn new(kernel: &'a KernelContext) -> Self {
        Self {
            kernel,
            refresh: kernel.config().refresh_interval(),
        }
    }

    fn stop(&self, info: &ThreadInfo) -> BindingOutcome {
        match self.kernel.threads().stop_by_user(info.id) {
            Ok(report) if report.is_complete() => {
                BindingOutcome::Status(format!("Stopped {} ({})", info.name, info.id))
            }
            Ok(_) => BindingOutcome::Status(format!("{} ({}) did not stop in time", info.name, info.id)),
            Err(e) => BindingOutcome::Status(e.to_string()),
        }
    }

    fn start(&self, info: &ThreadInfo) -> BindingOutcome {
        match self.kernel.threads().start(info.id) {
            Ok(()) => BindingOutcome::Status(format!("Started {} ({})", info.name, info.id)),
            Err(e) => BindingOutcome::Status(e.to_string()),
        }
    }
}

impl InteractiveDataSource for TaskManager<'_> {
    type Item = ThreadInfo;

    fn title(&self) -> String {
        let threads = self.kernel.threads().all_threads();
        let running = threads.iter().filter(|t| t.alive).count();
        format!("Task manager · {} threads, {} running", threads.len(), running)
    }

    fn primary_items(&self) -> Vec<ThreadInfo> {
        self.kernel.threads().threads()
    }

    fn secondary_items(&self, selected: Option<&ThreadInfo>) -> Vec<ThreadInfo> {
        selected
            .map(|t| self.kernel.threads().children(t.id))
            .unwrap_or_default()
    }

    fn second_pane_enabled(&self) -> bool {
        true
    }

    fn accepts_empty_data(&self) -> bool {
        true
    }

    fn render_item(&self, item: &ThreadInfo) -> String {
        format!("{} {} {}", item.status.icon(), item.id, item.name)
    }

    fn status(&self, _pane: PaneId, item: Option<&ThreadInfo>) -> String {
        let Some(t) = item else {
            return "No threads".to_string();
        };
        let mut status = format!("{}: {}", t.name, t.status.display());
        if t.critical {
            status.push_str(", critical");
        }
        if t.background {
            status.push_str(", background");
        }
        if let Some(started) = t.started_at {
            status.push_str(&format!(", started {}", started.format("%H:%M:%S")));
        }
        status
    }

    fn bindings(&self) -> Vec<Binding> {
        vec![Binding::new('s', "Stop"), Binding::new('r', "Start")]
    }

    fn on_binding(
        &mut self,
        key: char,
        _pane: PaneId,
        item: Option<&ThreadInfo>,
    ) -> Result<BindingOutcome> {
        let Some(info) = item else {
            return Ok(BindingOutcome::Continue);
        };
        Ok(match key {
            's' => self.stop(info),
            'r' => self.start(info),
            _ => BindingOutcome::Continue,
        })
    }

    fn refresh_interval(&self) -> Option<Duration> {
        Some(self.refresh)
    }
}
