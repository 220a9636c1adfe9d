//! Text UI framework: the selection prompt and the interactive pane browser.
//!
//! The state machines in [`selection`] and [`interactive`] are driven by
//! [`Action`]s and never touch the terminal. The `tui` feature adds the
//! crossterm driver and the ratatui renderer on top.

mod action;
pub mod interactive;
pub mod selection;

#[cfg(feature = "tui")]
pub mod render;
#[cfg(feature = "tui")]
pub mod terminal;

pub use action::Action;
pub use interactive::{
    Binding, BindingOutcome, InteractiveDataSource, InteractiveState, InteractiveTui, PaneId,
    PaneList, TuiFlow,
};
pub use selection::{SelectionChoice, SelectionEntry, SelectionOutcome, SelectionState};
