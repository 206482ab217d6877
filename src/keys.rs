//! Global key bindings, grouped into scopes that are switched on and off with
//! the state they belong to.
//!
//! Installing a scope yields a [`Subscription`]; the scope stays live exactly
//! as long as that value does. Dropping it removes the bindings, so a scope
//! cannot outlive the state that installed it.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Display)]
pub enum Scope {
    /// Up/Down move through rows; only while the highlight is shown
    RowNavigation,
    /// Crop-mode controls: start highlighting, edit the row count
    CropControls,
    /// Reframe while highlighting
    HighlightControls,
    Timer,
    Counter,
    /// Quit, file prompts, layout and viewer
    App,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum Command {
    Quit,
    RowAdvance,
    RowRetreat,
    EnterHighlight,
    Reframe,
    EditRows,
    ClearCrop,
    CounterIncrement,
    CounterDecrement,
    CounterReset,
    TimerToggle,
    TimerReset,
    TimerLonger,
    TimerShorter,
    PromptImage,
    PromptPdf,
    OpenPdf,
    ToggleSplit,
}

/// Edits to a focused text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEdit {
    Char(char),
    Backspace,
    Submit,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    Command(Command),
    Input(InputEdit),
}

type Registry = Rc<RefCell<BTreeMap<u64, Scope>>>;

/// Live installation of one scope.
#[must_use = "dropping a subscription uninstalls its key bindings"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<BTreeMap<u64, Scope>>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().remove(&self.id);
        }
    }
}

#[derive(Debug, Default)]
pub struct KeyRouter {
    registry: Registry,
    next_id: u64,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, scope: Scope) -> Subscription {
        self.next_id += 1;
        self.registry.borrow_mut().insert(self.next_id, scope);
        Subscription {
            id: self.next_id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn is_active(&self, scope: Scope) -> bool {
        self.registry.borrow().values().any(|s| *s == scope)
    }

    /// Number of live subscriptions, for leak checks
    pub fn live(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Resolve a key press. With `text_focus` set every key goes to the
    /// focused field, so typing never triggers shortcuts.
    pub fn route(&self, key: KeyEvent, text_focus: bool) -> Option<Routed> {
        if key.kind == KeyEventKind::Release {
            return None;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Some(Routed::Command(Command::Quit));
        }
        if text_focus {
            return input_edit(key).map(Routed::Input);
        }
        let mut scopes: Vec<Scope> = self.registry.borrow().values().copied().collect();
        scopes.sort();
        scopes.dedup();
        scopes
            .into_iter()
            .find_map(|scope| binding(scope, key.code))
            .map(Routed::Command)
    }
}

fn input_edit(key: KeyEvent) -> Option<InputEdit> {
    match key.code {
        KeyCode::Char(c) => Some(InputEdit::Char(c)),
        KeyCode::Backspace => Some(InputEdit::Backspace),
        KeyCode::Enter => Some(InputEdit::Submit),
        KeyCode::Esc => Some(InputEdit::Cancel),
        _ => None,
    }
}

fn binding(scope: Scope, code: KeyCode) -> Option<Command> {
    use Command::*;
    match (scope, code) {
        (Scope::RowNavigation, KeyCode::Up) => Some(RowAdvance),
        (Scope::RowNavigation, KeyCode::Down) => Some(RowRetreat),

        (Scope::CropControls, KeyCode::Enter) => Some(EnterHighlight),
        (Scope::CropControls, KeyCode::Char('e')) => Some(EditRows),
        (Scope::CropControls, KeyCode::Char('x')) => Some(ClearCrop),

        (Scope::HighlightControls, KeyCode::Char('f')) => Some(Reframe),

        (Scope::Timer, KeyCode::Char(' ')) => Some(TimerToggle),
        (Scope::Timer, KeyCode::Char('r')) => Some(TimerReset),
        (Scope::Timer, KeyCode::Char(']')) => Some(TimerLonger),
        (Scope::Timer, KeyCode::Char('[')) => Some(TimerShorter),

        (Scope::Counter, KeyCode::Char('+') | KeyCode::Char('=')) => Some(CounterIncrement),
        (Scope::Counter, KeyCode::Char('-') | KeyCode::Char('_')) => Some(CounterDecrement),
        (Scope::Counter, KeyCode::Char('0')) => Some(CounterReset),

        (Scope::App, KeyCode::Char('q') | KeyCode::Esc) => Some(Quit),
        (Scope::App, KeyCode::Char('i')) => Some(PromptImage),
        (Scope::App, KeyCode::Char('p')) => Some(PromptPdf),
        (Scope::App, KeyCode::Char('o')) => Some(OpenPdf),
        (Scope::App, KeyCode::Tab) => Some(ToggleSplit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn row_keys_only_while_subscribed() {
        let mut router = KeyRouter::new();
        let _app = router.install(Scope::App);
        assert_eq!(router.route(press(KeyCode::Up), false), None);

        let nav = router.install(Scope::RowNavigation);
        assert_eq!(
            router.route(press(KeyCode::Up), false),
            Some(Routed::Command(Command::RowAdvance))
        );
        assert_eq!(
            router.route(press(KeyCode::Down), false),
            Some(Routed::Command(Command::RowRetreat))
        );
        drop(nav);
        assert!(!router.is_active(Scope::RowNavigation));
        assert_eq!(router.route(press(KeyCode::Up), false), None);
    }

    #[test]
    fn dropping_subscriptions_leaves_nothing_behind() {
        let mut router = KeyRouter::new();
        for _ in 0..100 {
            let _nav = router.install(Scope::RowNavigation);
        }
        assert_eq!(router.live(), 0);
    }

    #[test]
    fn text_focus_swallows_shortcuts() {
        let mut router = KeyRouter::new();
        let _timer = router.install(Scope::Timer);
        let _app = router.install(Scope::App);
        assert_eq!(
            router.route(press(KeyCode::Char(' ')), false),
            Some(Routed::Command(Command::TimerToggle))
        );
        assert_eq!(
            router.route(press(KeyCode::Char(' ')), true),
            Some(Routed::Input(InputEdit::Char(' ')))
        );
        assert_eq!(
            router.route(press(KeyCode::Char('q')), true),
            Some(Routed::Input(InputEdit::Char('q')))
        );
        assert_eq!(
            router.route(press(KeyCode::Esc), true),
            Some(Routed::Input(InputEdit::Cancel))
        );
    }

    #[test]
    fn ctrl_c_always_quits() {
        let router = KeyRouter::new();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(router.route(key, true), Some(Routed::Command(Command::Quit)));
    }

    #[test]
    fn releases_are_ignored() {
        let mut router = KeyRouter::new();
        let _nav = router.install(Scope::RowNavigation);
        let mut key = press(KeyCode::Up);
        key.kind = KeyEventKind::Release;
        assert_eq!(router.route(key, false), None);
    }

    #[test]
    fn counter_and_timer_bindings_do_not_overlap_rows() {
        let mut router = KeyRouter::new();
        let _counter = router.install(Scope::Counter);
        let _timer = router.install(Scope::Timer);
        assert_eq!(router.route(press(KeyCode::Up), false), None);
        assert_eq!(
            router.route(press(KeyCode::Char('+')), false),
            Some(Routed::Command(Command::CounterIncrement))
        );
    }
}
