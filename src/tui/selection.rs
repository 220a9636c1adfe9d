//! Single-list selection style with paging.
//!
//! When the choices do not fit in the viewport, the last slot of every page
//! but the final one is a "next page" entry. Confirming it moves to the next
//! page instead of selecting anything.

use serde::{Deserialize, Serialize};

use super::Action;

/// One selectable choice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionChoice {
    pub name: String,
    pub title: String,
}

impl SelectionChoice {
    pub fn new(name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: title.into(),
        }
    }
}

/// How a selection session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionOutcome {
    /// 1-based index of the confirmed choice
    Selected(usize),
    Cancelled,
}

impl SelectionOutcome {
    /// Numeric form: the 1-based index, or -1 when cancelled.
    pub fn code(self) -> i64 {
        match self {
            Self::Selected(index) => index as i64,
            Self::Cancelled => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Highlight {
    /// Zero-based choice index
    Choice(usize),
    /// The next-page slot of the given zero-based page
    NextPage(usize),
}

/// A row of the current page, ready for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEntry<'a> {
    Choice {
        index: usize,
        choice: &'a SelectionChoice,
        highlighted: bool,
    },
    NextPage {
        highlighted: bool,
    },
}

/// State of one selection prompt.
#[derive(Debug, Clone)]
pub struct SelectionState {
    choices: Vec<SelectionChoice>,
    highlight: Highlight,
    viewport_height: u16,
    header_rows: u16,
}

impl SelectionState {
    pub fn new(choices: Vec<SelectionChoice>, viewport_height: u16, header_rows: u16) -> Self {
        Self {
            choices,
            highlight: Highlight::Choice(0),
            viewport_height,
            header_rows,
        }
    }

    /// Start with the given 1-based choice highlighted (clamped).
    pub fn with_default(mut self, index: usize) -> Self {
        if !self.choices.is_empty() {
            let clamped = index.clamp(1, self.choices.len());
            self.highlight = Highlight::Choice(clamped - 1);
        }
        self
    }

    pub fn choices(&self) -> &[SelectionChoice] {
        &self.choices
    }

    /// Rows available for entries.
    fn slots(&self) -> usize {
        usize::from(self.viewport_height.saturating_sub(self.header_rows)).max(1)
    }

    pub fn is_paged(&self) -> bool {
        self.choices.len() > self.slots()
    }

    /// Choices shown per page.
    ///
    /// A paged list reserves one slot for the next-page entry, unless the
    /// viewport has a single slot; then each page is one choice and no
    /// sentinel is drawn.
    pub fn per_page(&self) -> usize {
        if self.is_paged() {
            (self.slots() - 1).max(1)
        } else {
            self.choices.len().max(1)
        }
    }

    pub fn page_count(&self) -> usize {
        self.choices.len().div_ceil(self.per_page()).max(1)
    }

    /// Zero-based current page.
    pub fn current_page(&self) -> usize {
        match self.highlight {
            Highlight::Choice(index) => index / self.per_page(),
            Highlight::NextPage(page) => page,
        }
    }

    fn last_page(&self) -> usize {
        self.page_count() - 1
    }

    fn page_bounds(&self, page: usize) -> (usize, usize) {
        let start = page * self.per_page();
        let end = (start + self.per_page()).min(self.choices.len());
        (start, end)
    }

    fn has_next_slot(&self, page: usize) -> bool {
        self.is_paged() && self.slots() > 1 && page < self.last_page()
    }

    /// 1-based index of the highlighted choice, if a choice is highlighted.
    pub fn highlighted(&self) -> Option<usize> {
        match self.highlight {
            Highlight::Choice(index) if index < self.choices.len() => Some(index + 1),
            _ => None,
        }
    }

    pub fn is_next_page_highlighted(&self) -> bool {
        matches!(self.highlight, Highlight::NextPage(_))
    }

    /// Rows of the current page.
    pub fn visible(&self) -> Vec<SelectionEntry<'_>> {
        let page = self.current_page();
        let (start, end) = self.page_bounds(page);
        let mut rows: Vec<SelectionEntry<'_>> = self.choices[start..end]
            .iter()
            .enumerate()
            .map(|(offset, choice)| SelectionEntry::Choice {
                index: start + offset + 1,
                choice,
                highlighted: self.highlight == Highlight::Choice(start + offset),
            })
            .collect();
        if self.has_next_slot(page) {
            rows.push(SelectionEntry::NextPage {
                highlighted: self.highlight == Highlight::NextPage(page),
            });
        }
        rows
    }

    pub fn move_down(&mut self) {
        if self.choices.is_empty() {
            return;
        }
        self.highlight = match self.highlight {
            Highlight::NextPage(page) => Highlight::Choice(self.page_bounds(page + 1).0),
            Highlight::Choice(index) => {
                let page = index / self.per_page();
                let (_, end) = self.page_bounds(page);
                if index + 1 < end {
                    Highlight::Choice(index + 1)
                } else if self.has_next_slot(page) {
                    Highlight::NextPage(page)
                } else if index + 1 < self.choices.len() {
                    Highlight::Choice(index + 1)
                } else {
                    Highlight::Choice(0)
                }
            }
        };
    }

    pub fn move_up(&mut self) {
        if self.choices.is_empty() {
            return;
        }
        self.highlight = match self.highlight {
            Highlight::NextPage(page) => Highlight::Choice(self.page_bounds(page).1 - 1),
            Highlight::Choice(index) => {
                let page = index / self.per_page();
                let (start, _) = self.page_bounds(page);
                if index > start {
                    Highlight::Choice(index - 1)
                } else if page > 0 && self.has_next_slot(page - 1) {
                    Highlight::NextPage(page - 1)
                } else if index > 0 {
                    Highlight::Choice(index - 1)
                } else {
                    Highlight::Choice(self.choices.len() - 1)
                }
            }
        };
    }

    /// First choice of the next page, wrapping after the last page.
    pub fn next_page(&mut self) {
        if self.choices.is_empty() {
            return;
        }
        let page = self.current_page();
        let next = if page >= self.last_page() { 0 } else { page + 1 };
        self.highlight = Highlight::Choice(self.page_bounds(next).0);
    }

    /// First choice of the previous page, wrapping before the first page.
    pub fn previous_page(&mut self) {
        if self.choices.is_empty() {
            return;
        }
        let page = self.current_page();
        let previous = if page == 0 { self.last_page() } else { page - 1 };
        self.highlight = Highlight::Choice(self.page_bounds(previous).0);
    }

    /// Confirm the highlighted row. Next-page rows advance instead of selecting.
    pub fn confirm(&mut self) -> Option<SelectionOutcome> {
        match self.highlight {
            Highlight::NextPage(_) => {
                self.next_page();
                None
            }
            Highlight::Choice(index) if index < self.choices.len() => {
                Some(SelectionOutcome::Selected(index + 1))
            }
            Highlight::Choice(_) => None,
        }
    }

    /// Adopt a new viewport height, keeping the highlighted choice.
    pub fn resize(&mut self, viewport_height: u16) {
        let anchor = match self.highlight {
            Highlight::Choice(index) => index,
            Highlight::NextPage(page) => self.page_bounds(page).1.saturating_sub(1),
        };
        self.viewport_height = viewport_height;
        self.highlight = Highlight::Choice(anchor.min(self.choices.len().saturating_sub(1)));
    }

    /// Feed one action; returns the outcome once the prompt is finished.
    pub fn handle(&mut self, action: Action) -> Option<SelectionOutcome> {
        match action {
            Action::Up => self.move_up(),
            Action::Down => self.move_down(),
            Action::PageDown => self.next_page(),
            Action::PageUp => self.previous_page(),
            Action::Home if !self.choices.is_empty() => self.highlight = Highlight::Choice(0),
            Action::End if !self.choices.is_empty() => {
                self.highlight = Highlight::Choice(self.choices.len() - 1)
            }
            Action::Resize(_, height) => self.resize(height),
            Action::Submit => return self.confirm(),
            Action::Cancel => return Some(SelectionOutcome::Cancelled),
            _ => {}
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices(n: usize) -> Vec<SelectionChoice> {
        (1..=n)
            .map(|i| SelectionChoice::new(format!("c{i}"), format!("Choice {i}")))
            .collect()
    }

    #[test]
    fn test_single_page_has_no_next_slot() {
        let state = SelectionState::new(choices(3), 10, 2);
        assert!(!state.is_paged());
        assert_eq!(state.visible().len(), 3);
        assert_eq!(state.page_count(), 1);
    }

    #[test]
    fn test_down_wraps_on_single_page() {
        let mut state = SelectionState::new(choices(3), 10, 2);
        state.move_down();
        state.move_down();
        assert_eq!(state.highlighted(), Some(3));
        state.move_down();
        assert_eq!(state.highlighted(), Some(1));
        state.move_up();
        assert_eq!(state.highlighted(), Some(3));
    }

    #[test]
    fn test_one_row_viewport_shows_one_choice_per_page() {
        let mut state = SelectionState::new(choices(3), 3, 2);
        assert_eq!(state.per_page(), 1);
        assert_eq!(state.page_count(), 3);

        for expected in [2, 3, 1] {
            assert_eq!(state.visible().len(), 1);
            state.move_down();
            assert_eq!(state.highlighted(), Some(expected));
            assert_eq!(state.current_page(), expected - 1);
        }
        state.move_up();
        assert_eq!(state.highlighted(), Some(3));
        assert!(!state.is_next_page_highlighted());
    }

    #[test]
    fn test_next_page_slot_advances_page() {
        // 5 rows available: 4 choices + the next-page row per page.
        let mut state = SelectionState::new(choices(10), 7, 2);
        assert!(state.is_paged());
        assert_eq!(state.per_page(), 4);
        assert_eq!(state.page_count(), 3);

        for _ in 0..4 {
            state.move_down();
        }
        assert!(state.is_next_page_highlighted());
        assert!(matches!(
            state.visible().last(),
            Some(SelectionEntry::NextPage { highlighted: true })
        ));

        assert_eq!(state.handle(Action::Submit), None);
        assert_eq!(state.current_page(), 1);
        assert_eq!(state.highlighted(), Some(5));
    }

    #[test]
    fn test_last_page_has_no_next_slot() {
        let mut state = SelectionState::new(choices(10), 7, 2).with_default(9);
        assert_eq!(state.current_page(), 2);
        let rows = state.visible();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| matches!(r, SelectionEntry::Choice { .. })));

        state.move_down();
        state.move_down();
        assert_eq!(state.highlighted(), Some(1));
    }

    #[test]
    fn test_up_from_page_start_lands_on_previous_next_slot() {
        let mut state = SelectionState::new(choices(10), 7, 2).with_default(5);
        state.move_up();
        assert!(state.is_next_page_highlighted());
        assert_eq!(state.current_page(), 0);
        state.move_up();
        assert_eq!(state.highlighted(), Some(4));
    }

    #[test]
    fn test_enter_selects_one_based() {
        let mut state = SelectionState::new(choices(3), 10, 2);
        state.handle(Action::Down);
        let outcome = state.handle(Action::Submit).unwrap();
        assert_eq!(outcome, SelectionOutcome::Selected(2));
        assert_eq!(outcome.code(), 2);
    }

    #[test]
    fn test_escape_is_minus_one() {
        let mut state = SelectionState::new(choices(3), 10, 2);
        let outcome = state.handle(Action::Cancel).unwrap();
        assert_eq!(outcome, SelectionOutcome::Cancelled);
        assert_eq!(outcome.code(), -1);
    }

    #[test]
    fn test_resize_keeps_highlighted_choice() {
        let mut state = SelectionState::new(choices(10), 20, 2).with_default(8);
        assert!(!state.is_paged());

        state.handle(Action::Resize(80, 7));
        assert!(state.is_paged());
        assert_eq!(state.highlighted(), Some(8));
        assert_eq!(state.current_page(), 1);
    }

    #[test]
    fn test_empty_choices() {
        let mut state = SelectionState::new(Vec::new(), 10, 2);
        state.move_down();
        assert_eq!(state.highlighted(), None);
        assert_eq!(state.handle(Action::Submit), None);
        assert_eq!(state.handle(Action::Cancel), Some(SelectionOutcome::Cancelled));
    }
}
