//! Kernel event bus
//!
//! Cross-cutting notifications (login, shell commands, config saves, network
//! sessions, thread lifecycle) go through one bounded catalog of
//! [`EventKind`]s instead of ad-hoc callbacks between modules.

mod kind;
mod manager;

pub use kind::*;
pub use manager::*;
