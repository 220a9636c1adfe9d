use serde::{Deserialize, Serialize};
use strum::Display;

/// Backend-independent input actions consumed by the pane state machines.
///
/// The terminal driver maps key events onto these, so the selection and
/// interactive states can be driven (and tested) without a terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, Deserialize)]
pub enum Action {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    /// Confirm the highlighted entry (Enter)
    Submit,
    /// Abort (Escape)
    Cancel,
    /// Switch the active pane (Tab)
    FocusNext,
    /// Terminal was resized to (width, height)
    Resize(u16, u16),
    /// A key that may be bound to a data-source action
    Binding(char),
    /// Reload items from the data source
    Refresh,
    Noop,
}
