//! Kernel thread layer
//!
//! Every piece of long-running kernel work is a kernel thread:
//! - A native OS thread per run, named after the kernel thread
//! - Optional children that start, stop and wait together with their parent
//! - Regeneration, so a stopped thread can be started again
//! - Cooperative stopping through a [`StopToken`]
//! - Failures escaping a thread body reported through the fatal path

mod model;
mod manager;
mod stop;

pub use model::*;
pub use manager::*;
pub use stop::*;
