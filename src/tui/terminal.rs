//! Crossterm terminal driver for the pane state machines.

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::debug;

use super::render::{chrome_rows, draw_interactive, draw_selection};
use super::{
    Action, InteractiveDataSource, InteractiveTui, SelectionChoice, SelectionOutcome,
    SelectionState, TuiFlow,
};

pub type Tui = Terminal<CrosstermBackend<Stdout>>;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Enter raw mode and the alternate screen.
pub fn init() -> io::Result<Tui> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Terminal::new(CrosstermBackend::new(stdout))
}

/// Leave the alternate screen and restore the cursor.
pub fn restore(terminal: &mut Tui) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()
}

/// Run `body` on a freshly initialised terminal, restoring it afterwards
/// even when `body` fails.
fn with_terminal<T>(body: impl FnOnce(&mut Tui) -> Result<T>) -> Result<T> {
    let mut terminal = init()?;
    let res = body(&mut terminal);
    restore(&mut terminal)?;
    res
}

/// Translate a key press into an [`Action`].
pub fn map_key(key: KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Action::Cancel;
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::PageUp => Action::PageUp,
        KeyCode::PageDown => Action::PageDown,
        KeyCode::Home => Action::Home,
        KeyCode::End => Action::End,
        KeyCode::Enter => Action::Submit,
        KeyCode::Esc | KeyCode::Char('q') => Action::Cancel,
        KeyCode::Tab | KeyCode::BackTab => Action::FocusNext,
        KeyCode::F(5) => Action::Refresh,
        KeyCode::Char(c) => Action::Binding(c),
        _ => Action::Noop,
    }
}

/// Translate a terminal event; `None` for events the panes ignore.
pub fn map_event(event: Event) -> Option<Action> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(map_key(key)),
        Event::Resize(width, height) => Some(Action::Resize(width, height)),
        _ => None,
    }
}

fn next_action(timeout: Duration) -> Result<Option<Action>> {
    if event::poll(timeout)? {
        Ok(map_event(event::read()?))
    } else {
        Ok(None)
    }
}

// ── Interactive browser ─────────────────────────────────────────────────────

/// Browse `source` until the user exits. Returns the source so callers can
/// inspect what the bound actions changed.
pub fn run_interactive<S: InteractiveDataSource>(source: S, header_rows: u16) -> Result<S> {
    with_terminal(|terminal| {
        let height = terminal.size()?.height;
        let mut tui = InteractiveTui::new(source, height, chrome_rows(header_rows))?;
        let refresh_every = tui.source().refresh_interval();
        let mut last_refresh = Instant::now();

        loop {
            terminal.draw(|f| draw_interactive(f, &tui, header_rows))?;

            let action = next_action(POLL_INTERVAL)?;
            if let Some(Action::Resize(..)) = action {
                terminal.clear()?;
            }
            let action = match action {
                Some(action) => action,
                None => match refresh_every {
                    Some(every) if last_refresh.elapsed() >= every => Action::Refresh,
                    _ => continue,
                },
            };
            if action == Action::Refresh {
                last_refresh = Instant::now();
            }
            if tui.handle(action)? == TuiFlow::Exit {
                debug!("Interactive browser closed");
                break;
            }
        }
        Ok(tui.into_source())
    })
}

// ── Selection prompt ────────────────────────────────────────────────────────

/// Ask the user to pick one of `choices`. `default` is 1-based.
pub fn run_selection(
    title: &str,
    choices: Vec<SelectionChoice>,
    default: usize,
    header_rows: u16,
) -> Result<SelectionOutcome> {
    with_terminal(|terminal| {
        let height = terminal.size()?.height;
        let mut state =
            SelectionState::new(choices, height, chrome_rows(header_rows)).with_default(default);

        loop {
            terminal.draw(|f| draw_selection(f, title, &state, header_rows))?;

            let Some(action) = next_action(POLL_INTERVAL)? else {
                continue;
            };
            if let Action::Resize(..) = action {
                terminal.clear()?;
            }
            if let Some(outcome) = state.handle(action) {
                debug!(code = outcome.code(), "Selection finished");
                return Ok(outcome);
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(map_key(press(KeyCode::Up)), Action::Up);
        assert_eq!(map_key(press(KeyCode::Char('j'))), Action::Down);
        assert_eq!(map_key(press(KeyCode::Tab)), Action::FocusNext);
        assert_eq!(map_key(press(KeyCode::Esc)), Action::Cancel);
        assert_eq!(map_key(press(KeyCode::Enter)), Action::Submit);
    }

    #[test]
    fn test_other_chars_are_bindings() {
        assert_eq!(map_key(press(KeyCode::Char('s'))), Action::Binding('s'));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(ctrl_c), Action::Cancel);
    }

    #[test]
    fn test_release_events_are_ignored() {
        let release = KeyEvent {
            code: KeyCode::Up,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(map_event(Event::Key(release)), None);
        assert_eq!(map_event(Event::Resize(80, 24)), Some(Action::Resize(80, 24)));
    }
}
