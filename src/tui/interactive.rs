//! Interactive one/two-pane list browser.
//!
//! [`InteractiveState`] is the pure navigation model: two item lists, a
//! 1-based selection per pane (0 while the pane is empty) and the active
//! pane. [`InteractiveTui`] pairs it with an [`InteractiveDataSource`] that
//! supplies items, renders them and reacts to bound keys.

use std::ops::Range;
use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Action;

/// Pane identifier. The numeric values (1 and 2) are part of the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaneId {
    Primary = 1,
    Secondary = 2,
}

impl PaneId {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn other(self) -> Self {
        match self {
            Self::Primary => Self::Secondary,
            Self::Secondary => Self::Primary,
        }
    }

    fn slot(self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

/// Items of one pane plus its selection.
#[derive(Debug, Clone)]
pub struct PaneList<T> {
    items: Vec<T>,
    selection: usize,
}

impl<T> Default for PaneList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selection: 0,
        }
    }
}

impl<T> PaneList<T> {
    pub fn new(items: Vec<T>) -> Self {
        let mut pane = Self { items, selection: 1 };
        pane.clamp();
        pane
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// 1-based selection, 0 when empty.
    pub fn selection(&self) -> usize {
        self.selection
    }

    pub fn selected(&self) -> Option<&T> {
        self.selection.checked_sub(1).and_then(|i| self.items.get(i))
    }

    /// Keep the selection inside `[1, len]`, or 0 for an empty pane.
    fn clamp(&mut self) {
        self.selection = if self.items.is_empty() {
            0
        } else {
            self.selection.clamp(1, self.items.len())
        };
    }

    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.clamp();
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.clamp();
    }

    /// Remove the item at 1-based `index`.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        if index == 0 || index > self.items.len() {
            return None;
        }
        let item = self.items.remove(index - 1);
        self.clamp();
        Some(item)
    }

    /// Select a 1-based index (clamped).
    pub fn select(&mut self, index: usize) {
        self.selection = index;
        self.clamp();
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selection = self.selection % self.items.len() + 1;
        }
    }

    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            self.selection = if self.selection <= 1 {
                self.items.len()
            } else {
                self.selection - 1
            };
        }
    }
}

/// Navigation model for the interactive browser.
#[derive(Debug, Clone)]
pub struct InteractiveState<T> {
    panes: [PaneList<T>; 2],
    active: PaneId,
    two_panes: bool,
    viewport_height: u16,
    header_rows: u16,
}

impl<T> InteractiveState<T> {
    pub fn new(two_panes: bool, viewport_height: u16, header_rows: u16) -> Self {
        Self {
            panes: [PaneList::default(), PaneList::default()],
            active: PaneId::Primary,
            two_panes,
            viewport_height,
            header_rows,
        }
    }

    pub fn pane(&self, pane: PaneId) -> &PaneList<T> {
        &self.panes[pane.slot()]
    }

    pub fn pane_mut(&mut self, pane: PaneId) -> &mut PaneList<T> {
        &mut self.panes[pane.slot()]
    }

    pub fn active(&self) -> PaneId {
        self.active
    }

    pub fn is_two_pane(&self) -> bool {
        self.two_panes
    }

    pub fn selection(&self, pane: PaneId) -> usize {
        self.pane(pane).selection()
    }

    pub fn selected(&self, pane: PaneId) -> Option<&T> {
        self.pane(pane).selected()
    }

    pub fn set_items(&mut self, pane: PaneId, items: Vec<T>) {
        self.pane_mut(pane).set_items(items);
    }

    pub fn add_item(&mut self, pane: PaneId, item: T) {
        self.pane_mut(pane).push(item);
    }

    pub fn remove_item(&mut self, pane: PaneId, index: usize) -> Option<T> {
        self.pane_mut(pane).remove(index)
    }

    /// Toggle the active pane; a no-op in one-pane mode.
    pub fn switch_pane(&mut self) {
        if self.two_panes {
            self.active = self.active.other();
        }
    }

    /// Rows per page: viewport height minus header rows, at least one.
    pub fn page_size(&self) -> usize {
        usize::from(self.viewport_height.saturating_sub(self.header_rows)).max(1)
    }

    pub fn resize(&mut self, viewport_height: u16) {
        self.viewport_height = viewport_height;
    }

    /// Zero-based range of items shown for `pane` on its current page.
    pub fn visible_range(&self, pane: PaneId) -> Range<usize> {
        let list = self.pane(pane);
        if list.is_empty() {
            return 0..0;
        }
        let size = self.page_size();
        let start = (list.selection() - 1) / size * size;
        start..(start + size).min(list.len())
    }

    /// Zero-based page of `pane`'s selection.
    pub fn page(&self, pane: PaneId) -> usize {
        self.pane(pane).selection().saturating_sub(1) / self.page_size()
    }

    pub fn page_down(&mut self) {
        let size = self.page_size();
        let list = self.pane_mut(self.active);
        if list.is_empty() {
            return;
        }
        let next_start = (list.selection() - 1) / size * size + size;
        list.select(if next_start >= list.len() { 1 } else { next_start + 1 });
    }

    pub fn page_up(&mut self) {
        let size = self.page_size();
        let list = self.pane_mut(self.active);
        if list.is_empty() {
            return;
        }
        let start = (list.selection() - 1) / size * size;
        let target = if start == 0 {
            (list.len() - 1) / size * size
        } else {
            start - size
        };
        list.select(target + 1);
    }

    /// Apply a navigation action. Returns false for actions it does not own.
    pub fn apply(&mut self, action: Action) -> bool {
        let active = self.active;
        match action {
            Action::Up => self.pane_mut(active).move_up(),
            Action::Down => self.pane_mut(active).move_down(),
            Action::PageUp => self.page_up(),
            Action::PageDown => self.page_down(),
            Action::Home => self.pane_mut(active).select(1),
            Action::End => {
                let len = self.pane(active).len();
                self.pane_mut(active).select(len);
            }
            Action::FocusNext => self.switch_pane(),
            Action::Resize(_, height) => self.resize(height),
            _ => return false,
        }
        true
    }
}

/// A key bound to a data-source action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub key: char,
    pub name: String,
}

impl Binding {
    pub fn new(key: char, name: impl Into<String>) -> Self {
        Self { key, name: name.into() }
    }
}

/// What the browser does after a bound action ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingOutcome {
    Continue,
    /// Reload items from the data source
    Refresh,
    /// Show a message in the status line
    Status(String),
    Exit,
}

/// Whether the browser loop should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiFlow {
    Continue,
    Exit,
}

/// Supplies and renders the items of an interactive browser.
pub trait InteractiveDataSource {
    type Item: Clone;

    fn title(&self) -> String;

    fn primary_items(&self) -> Vec<Self::Item>;

    /// Items for the second pane, given the primary pane's selection.
    #[allow(unused_variables)]
    fn secondary_items(&self, selected_primary: Option<&Self::Item>) -> Vec<Self::Item> {
        Vec::new()
    }

    fn second_pane_enabled(&self) -> bool {
        false
    }

    /// Whether the browser may open (and stay open) with no primary items.
    fn accepts_empty_data(&self) -> bool {
        false
    }

    fn render_item(&self, item: &Self::Item) -> String;

    /// Status line for the highlighted item.
    #[allow(unused_variables)]
    fn status(&self, pane: PaneId, item: Option<&Self::Item>) -> String {
        String::new()
    }

    fn bindings(&self) -> Vec<Binding> {
        Vec::new()
    }

    #[allow(unused_variables)]
    fn on_binding(
        &mut self,
        key: char,
        pane: PaneId,
        item: Option<&Self::Item>,
    ) -> Result<BindingOutcome> {
        Ok(BindingOutcome::Continue)
    }

    /// Reload items periodically when set.
    fn refresh_interval(&self) -> Option<Duration> {
        None
    }
}

/// Controller pairing a data source with its navigation state.
pub struct InteractiveTui<S: InteractiveDataSource> {
    source: S,
    state: InteractiveState<S::Item>,
    status_override: Option<String>,
}

impl<S: InteractiveDataSource> InteractiveTui<S> {
    /// Build the browser and load the first batch of items.
    pub fn new(source: S, viewport_height: u16, header_rows: u16) -> Result<Self> {
        let state = InteractiveState::new(source.second_pane_enabled(), viewport_height, header_rows);
        let mut tui = Self {
            source,
            state,
            status_override: None,
        };
        tui.refresh()?;
        Ok(tui)
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn state(&self) -> &InteractiveState<S::Item> {
        &self.state
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Reload both panes from the source, keeping selections where possible.
    pub fn refresh(&mut self) -> Result<()> {
        let primary = self.source.primary_items();
        if primary.is_empty() && !self.source.accepts_empty_data() {
            bail!("{} has no data to show", self.source.title());
        }
        self.state.set_items(PaneId::Primary, primary);
        self.refresh_secondary();
        Ok(())
    }

    fn refresh_secondary(&mut self) {
        if self.state.is_two_pane() {
            let secondary = self
                .source
                .secondary_items(self.state.selected(PaneId::Primary));
            self.state.set_items(PaneId::Secondary, secondary);
        }
    }

    /// Status line text: an action message if one is pending, else the source's.
    pub fn status(&self) -> String {
        if let Some(message) = &self.status_override {
            return message.clone();
        }
        let active = self.state.active();
        self.source.status(active, self.state.selected(active))
    }

    /// Rendered rows of `pane`'s current page with their highlight flag.
    pub fn rows(&self, pane: PaneId) -> Vec<(String, bool)> {
        let list = self.state.pane(pane);
        let range = self.state.visible_range(pane);
        let start = range.start;
        list.items()[range]
            .iter()
            .enumerate()
            .map(|(offset, item)| {
                (self.source.render_item(item), start + offset + 1 == list.selection())
            })
            .collect()
    }

    /// Feed one action through navigation, bindings and refresh.
    pub fn handle(&mut self, action: Action) -> Result<TuiFlow> {
        if !matches!(action, Action::Resize(..) | Action::Refresh | Action::Noop) {
            self.status_override = None;
        }
        match action {
            Action::Cancel => return Ok(TuiFlow::Exit),
            Action::Refresh => self.refresh()?,
            Action::Binding(key) => {
                if !self.source.bindings().iter().any(|b| b.key == key) {
                    return Ok(TuiFlow::Continue);
                }
                let pane = self.state.active();
                let item = self.state.selected(pane).cloned();
                debug!(key = %key, pane = pane.number(), "Interactive binding");
                match self.source.on_binding(key, pane, item.as_ref())? {
                    BindingOutcome::Continue => {}
                    BindingOutcome::Refresh => self.refresh()?,
                    BindingOutcome::Status(message) => {
                        self.status_override = Some(message);
                        self.refresh()?;
                    }
                    BindingOutcome::Exit => return Ok(TuiFlow::Exit),
                }
            }
            other => {
                let before = self.state.selection(PaneId::Primary);
                self.state.apply(other);
                if self.state.selection(PaneId::Primary) != before {
                    self.refresh_secondary();
                }
            }
        }
        Ok(TuiFlow::Continue)
    }
}
