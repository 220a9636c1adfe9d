//! Nitrocid KS kernel core: kernel threads, the kernel event bus, the
//! interactive pane framework and a small shell on top of them.

pub mod args;
pub mod config;
pub mod error;
pub mod events;
pub mod kernel;
pub mod logging;
pub mod shell;
pub mod theme;
pub mod threads;
pub mod tui;

pub use error::{Error, Result};
pub use events::{EventKind, EventsManager};
pub use kernel::KernelContext;
pub use threads::{KernelThreadId, ThreadManager};
