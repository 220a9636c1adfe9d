//! Ratatui rendering for the selection prompt and the pane browser.
//!
//! Screen layout, top to bottom: `header_rows` of title text, the bordered
//! list pane(s), and a one-line footer with status and key hints.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::{InteractiveDataSource, InteractiveTui, PaneId, SelectionEntry, SelectionState};
use crate::theme::tui_palette;

/// Rows taken by everything except the list contents.
pub fn chrome_rows(header_rows: u16) -> u16 {
    // Pane borders (2) and the footer (1).
    header_rows.saturating_add(3)
}

fn split(area: Rect, header_rows: u16) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Length(header_rows),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area)
}

/// Cut `text` to `width` display columns, marking the cut with `…`.
pub fn fit(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

fn header(f: &mut Frame, title: &str, area: Rect) {
    let line = Line::from(Span::styled(
        fit(title, usize::from(area.width)),
        tui_palette::header(),
    ));
    f.render_widget(Paragraph::new(line), area);
}

fn hints(pairs: &[(String, String)]) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for (key, name) in pairs {
        spans.push(Span::styled(format!(" [{key}] "), tui_palette::hint()));
        spans.push(Span::styled(name.clone(), tui_palette::hint()));
    }
    spans
}

// ── Interactive browser ─────────────────────────────────────────────────────

pub fn draw_interactive<S: InteractiveDataSource>(
    f: &mut Frame,
    tui: &InteractiveTui<S>,
    header_rows: u16,
) {
    let [top, body, footer] = split(f.area(), header_rows);
    header(f, &tui.source().title(), top);

    if tui.state().is_two_pane() {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(body);
        draw_pane(f, tui, PaneId::Primary, left);
        draw_pane(f, tui, PaneId::Secondary, right);
    } else {
        draw_pane(f, tui, PaneId::Primary, body);
    }

    let mut keys = vec![
        ("↑↓".to_string(), "Move".to_string()),
        ("PgUp/PgDn".to_string(), "Page".to_string()),
    ];
    if tui.state().is_two_pane() {
        keys.push(("Tab".into(), "Switch".into()));
    }
    keys.extend(
        tui.source()
            .bindings()
            .into_iter()
            .map(|b| (b.key.to_string(), b.name)),
    );
    keys.push(("Esc".into(), "Exit".into()));

    let mut spans = vec![Span::styled(tui.status(), tui_palette::status())];
    spans.extend(hints(&keys));
    f.render_widget(Paragraph::new(Line::from(spans)), footer);
}

fn draw_pane<S: InteractiveDataSource>(
    f: &mut Frame,
    tui: &InteractiveTui<S>,
    pane: PaneId,
    area: Rect,
) {
    let state = tui.state();
    let focused = state.active() == pane;
    let width = usize::from(area.width.saturating_sub(2));

    let items: Vec<ListItem> = tui
        .rows(pane)
        .into_iter()
        .map(|(text, highlighted)| {
            let style = if highlighted && focused {
                tui_palette::selected()
            } else {
                tui_palette::item()
            };
            ListItem::new(Line::from(Span::styled(fit(&text, width), style)))
        })
        .collect();

    let list = state.pane(pane);
    let pages = list.len().div_ceil(state.page_size()).max(1);
    let title = format!(
        " {}/{} · page {}/{} ",
        list.selection(),
        list.len(),
        state.page(pane) + 1,
        pages
    );
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(if focused {
            tui_palette::focused_border()
        } else {
            tui_palette::unfocused_border()
        })
        .title(Span::styled(
            title,
            if focused {
                tui_palette::title_focused()
            } else {
                tui_palette::title_unfocused()
            },
        ));
    f.render_widget(List::new(items).block(block), area);
}

// ── Selection prompt ────────────────────────────────────────────────────────

pub fn draw_selection(f: &mut Frame, title: &str, state: &SelectionState, header_rows: u16) {
    let [top, body, footer] = split(f.area(), header_rows);
    header(f, title, top);
    let width = usize::from(body.width.saturating_sub(2));

    let items: Vec<ListItem> = state
        .visible()
        .into_iter()
        .map(|entry| match entry {
            SelectionEntry::Choice {
                index,
                choice,
                highlighted,
            } => {
                let text = format!("{index}) {}", choice.title);
                let style = if highlighted {
                    tui_palette::selected()
                } else {
                    tui_palette::item()
                };
                ListItem::new(Line::from(Span::styled(fit(&text, width), style)))
            }
            SelectionEntry::NextPage { highlighted } => {
                let style = if highlighted {
                    tui_palette::selected()
                } else {
                    tui_palette::next_page()
                };
                ListItem::new(Line::from(Span::styled("→ Next page", style)))
            }
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(tui_palette::focused_border())
        .title(Span::styled(
            format!(" page {}/{} ", state.current_page() + 1, state.page_count()),
            tui_palette::title_focused(),
        ));
    f.render_widget(List::new(items).block(block), body);

    let keys = [
        ("↑↓".to_string(), "Move".to_string()),
        ("Enter".to_string(), "Select".to_string()),
        ("Esc".to_string(), "Cancel".to_string()),
    ];
    f.render_widget(Paragraph::new(Line::from(hints(&keys))), footer);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_rows_saturates() {
        assert_eq!(chrome_rows(1), 4);
        assert_eq!(chrome_rows(u16::MAX - 1), u16::MAX);
    }

    #[test]
    fn test_fit_keeps_short_text() {
        assert_eq!(fit("abc", 5), "abc");
    }

    #[test]
    fn test_fit_truncates_by_display_width() {
        assert_eq!(fit("abcdef", 4), "abc…");
        // Wide characters take two columns each.
        assert_eq!(fit("日本語テキスト", 5), "日本…");
        assert_eq!(fit("abc", 0), "");
    }
}
