//! Pane framework integration tests: selection prompt and interactive browser.

use nitrocid::tui::{
    Action, Binding, BindingOutcome, InteractiveDataSource, InteractiveState, InteractiveTui,
    PaneId, SelectionChoice, SelectionOutcome, SelectionState, TuiFlow,
};

// ── Interactive state ───────────────────────────────────────────────────────

mod interactive_state {
    use super::*;

    fn filled(n: usize) -> InteractiveState<usize> {
        let mut state = InteractiveState::new(true, 24, 4);
        state.set_items(PaneId::Primary, (1..=n).collect());
        state
    }

    #[test]
    fn test_removing_selected_last_item_clamps() {
        let mut state = filled(3);
        state.apply(Action::End);
        assert_eq!(state.selection(PaneId::Primary), 3);

        state.remove_item(PaneId::Primary, 3);
        assert_eq!(state.selection(PaneId::Primary), 2);
        state.remove_item(PaneId::Primary, 2);
        state.remove_item(PaneId::Primary, 1);
        assert_eq!(state.selection(PaneId::Primary), 0);
    }

    #[test]
    fn test_adding_to_empty_pane_selects_first() {
        let mut state: InteractiveState<usize> = InteractiveState::new(false, 24, 4);
        assert_eq!(state.selection(PaneId::Primary), 0);
        state.add_item(PaneId::Primary, 7);
        assert_eq!(state.selection(PaneId::Primary), 1);
        assert_eq!(state.selected(PaneId::Primary), Some(&7));
    }

    #[test]
    fn test_navigation_only_moves_active_pane() {
        let mut state = filled(5);
        state.set_items(PaneId::Secondary, vec![10, 20, 30]);

        state.apply(Action::FocusNext);
        state.apply(Action::Down);
        assert_eq!(state.selection(PaneId::Secondary), 2);
        assert_eq!(state.selection(PaneId::Primary), 1);

        state.apply(Action::FocusNext);
        assert_eq!(state.active(), PaneId::Primary);
    }

    #[test]
    fn test_resize_changes_page_size() {
        let mut state = filled(30);
        assert_eq!(state.page_size(), 20);
        state.apply(Action::Resize(80, 10));
        assert_eq!(state.page_size(), 6);
        state.apply(Action::Resize(80, 2));
        assert_eq!(state.page_size(), 1);
    }
}

// ── Selection prompt ────────────────────────────────────────────────────────

mod selection {
    use super::*;

    fn prompt(n: usize, height: u16) -> SelectionState {
        let choices = (1..=n)
            .map(|i| SelectionChoice::new(format!("opt{i}"), format!("Option {i}")))
            .collect();
        SelectionState::new(choices, height, 2)
    }

    #[test]
    fn test_sentinel_walks_through_every_page() {
        // 3 rows: 2 choices + the next-page row.
        let mut state = prompt(5, 5);
        assert_eq!(state.page_count(), 3);

        for expected_page in [1, 2, 0] {
            while !state.is_next_page_highlighted() && state.current_page() != 2 {
                state.handle(Action::Down);
            }
            if state.current_page() == 2 {
                state.handle(Action::PageDown);
            } else {
                state.handle(Action::Submit);
            }
            assert_eq!(state.current_page(), expected_page);
        }
    }

    #[test]
    fn test_enter_on_choice_returns_index() {
        let mut state = prompt(5, 5);
        state.handle(Action::PageDown);
        assert_eq!(state.handle(Action::Submit), Some(SelectionOutcome::Selected(3)));
    }

    #[test]
    fn test_escape_returns_minus_one() {
        let mut state = prompt(5, 5);
        assert_eq!(state.handle(Action::Cancel).map(SelectionOutcome::code), Some(-1));
    }
}

// ── Interactive controller ──────────────────────────────────────────────────

mod controller {
    use super::*;

    struct Todo {
        items: Vec<String>,
        done: Vec<String>,
    }

    impl InteractiveDataSource for Todo {
        type Item = String;

        fn title(&self) -> String {
            "Todo".into()
        }

        fn primary_items(&self) -> Vec<String> {
            self.items.clone()
        }

        fn accepts_empty_data(&self) -> bool {
            true
        }

        fn render_item(&self, item: &String) -> String {
            item.clone()
        }

        fn bindings(&self) -> Vec<Binding> {
            vec![Binding::new('x', "Done"), Binding::new('Q', "Quit")]
        }

        fn on_binding(&mut self, key: char, _pane: PaneId, item: Option<&String>) -> anyhow::Result<BindingOutcome> {
            match (key, item) {
                ('x', Some(item)) => {
                    self.items.retain(|i| i != item);
                    self.done.push(item.clone());
                    Ok(BindingOutcome::Refresh)
                }
                ('Q', _) => Ok(BindingOutcome::Exit),
                _ => Ok(BindingOutcome::Continue),
            }
        }
    }

    #[test]
    fn test_binding_mutates_source_and_refreshes() {
        let source = Todo {
            items: vec!["a".into(), "b".into(), "c".into()],
            done: Vec::new(),
        };
        let mut tui = InteractiveTui::new(source, 24, 4).unwrap();
        tui.handle(Action::End).unwrap();
        tui.handle(Action::Binding('x')).unwrap();
        tui.handle(Action::Binding('x')).unwrap();

        assert_eq!(tui.source().done, vec!["c", "b"]);
        assert_eq!(tui.state().selection(PaneId::Primary), 1);
        assert_eq!(tui.state().selected(PaneId::Primary).map(String::as_str), Some("a"));
    }

    #[test]
    fn test_binding_can_exit() {
        let source = Todo {
            items: Vec::new(),
            done: Vec::new(),
        };
        let mut tui = InteractiveTui::new(source, 24, 4).unwrap();
        assert_eq!(tui.handle(Action::Binding('x')).unwrap(), TuiFlow::Continue);
        assert_eq!(tui.handle(Action::Binding('Q')).unwrap(), TuiFlow::Exit);
    }
}
