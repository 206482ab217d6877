//! Input handling: turns terminal events into session operations and keeps
//! the key scopes in step with the chart mode.

use std::path::PathBuf;
use std::time::Instant;

use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use strum_macros::Display;

use crate::intake::{DocumentViewer, ImageAsset, PdfDocument};
use crate::keys::{Command, InputEdit, KeyRouter, Routed, Scope, Subscription};
use crate::navigation::{EnterRefused, Mode};
use crate::runtime::AppEvent;
use crate::session::Session;
use crate::timer::AdjustRefused;
use crate::ui::chart::Thumbnail;
use crate::ui::layout::{self, ScreenLayout};
use crate::ui::panels;
use crate::widget_pos::{HitTarget, Size, WidgetKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PathPrompt {
    #[strum(serialize = "image")]
    Image,
    #[strum(serialize = "pdf")]
    Pdf,
}

/// Which text field, if any, owns the keyboard
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    None,
    Rows(String),
    Path(PathPrompt, String),
}

impl Focus {
    pub fn is_text(&self) -> bool {
        !matches!(self, Focus::None)
    }
}

pub struct App {
    session: Session,
    router: KeyRouter,
    _global_scopes: Vec<Subscription>,
    mode_scopes: Vec<Subscription>,
    scoped_mode: Option<Mode>,
    focus: Focus,
    status: Option<String>,
    viewport: Size,
    should_quit: bool,
    viewer: Box<dyn DocumentViewer>,
    crop_anchor: Option<(u16, u16)>,
    pub(crate) thumbnail: Option<Thumbnail>,
}

impl App {
    pub fn new(session: Session, viewer: Box<dyn DocumentViewer>, viewport: Size) -> Self {
        let mut router = KeyRouter::new();
        let global = vec![
            router.install(Scope::App),
            router.install(Scope::Timer),
            router.install(Scope::Counter),
        ];
        let mut app = Self {
            session,
            router,
            _global_scopes: global,
            mode_scopes: Vec::new(),
            scoped_mode: None,
            focus: Focus::None,
            status: None,
            viewport,
            should_quit: false,
            viewer,
            crop_anchor: None,
            thumbnail: None,
        };
        app.settle();
        app
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn router(&self) -> &KeyRouter {
        &self.router
    }

    pub fn focus(&self) -> &Focus {
        &self.focus
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn viewport(&self) -> Size {
        self.viewport
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn layout(&self) -> ScreenLayout {
        layout::screen(
            Rect::new(0, 0, self.viewport.width, self.viewport.height),
            self.session.split_open(),
            self.session.pdf().is_some(),
            self.session.image().map(|i| i.dimensions()),
        )
    }

    /// Feed one event. Returns whether the screen needs redrawing.
    pub fn handle(&mut self, event: AppEvent, now: Instant) -> bool {
        let redraw = match event {
            AppEvent::Key(key) => {
                match self.router.route(key, self.focus.is_text()) {
                    Some(Routed::Command(cmd)) => self.run(cmd, now),
                    Some(Routed::Input(edit)) => self.edit(edit),
                    None => {}
                }
                true
            }
            AppEvent::Mouse(mouse) => self.mouse(mouse, now),
            AppEvent::Paste(text) => {
                self.paste(&text);
                true
            }
            AppEvent::Resize(width, height) => {
                self.viewport = Size::new(width, height);
                for kind in [WidgetKind::Counter, WidgetKind::Timer] {
                    self.session.widget_mut(kind).reclamp(self.viewport);
                }
                true
            }
            AppEvent::Tick => {
                if self.session.tick(now).is_some() {
                    self.set_status("time's up");
                }
                self.session.timer().is_running() || self.session.cue().is_active()
            }
            AppEvent::Restored(restored) => {
                self.session.apply_restored(restored);
                true
            }
        };
        self.settle();
        redraw
    }

    /// Bring key scopes and panel sizes in line with the session.
    fn settle(&mut self) {
        let mode = self.session.mode();
        if self.scoped_mode != Some(mode) {
            // old scopes go before new ones arrive
            self.mode_scopes.clear();
            self.mode_scopes = match mode {
                Mode::BrowsingCrop => vec![self.router.install(Scope::CropControls)],
                Mode::HighlightActive => vec![
                    self.router.install(Scope::RowNavigation),
                    self.router.install(Scope::HighlightControls),
                ],
            };
            self.scoped_mode = Some(mode);
            if mode == Mode::HighlightActive && matches!(self.focus, Focus::Rows(_)) {
                self.focus = Focus::None;
            }
        }

        let counter = panels::counter_size(self.session.counter().value());
        self.session
            .widget_mut(WidgetKind::Counter)
            .measure(counter, self.viewport);
        self.session
            .widget_mut(WidgetKind::Timer)
            .measure(panels::timer_size(), self.viewport);
    }

    fn set_status(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        log::info!("status: {msg}");
        self.status = Some(msg);
    }

    fn run(&mut self, cmd: Command, now: Instant) {
        log::debug!("command {cmd}");
        self.status = None;
        match cmd {
            Command::Quit => self.should_quit = true,
            Command::RowAdvance => {
                self.session.advance_row();
            }
            Command::RowRetreat => {
                self.session.retreat_row();
            }
            Command::EnterHighlight => {
                if let Err(refused) = self.session.enter_highlight() {
                    self.set_status(match refused {
                        EnterRefused::NoCrop => "drag over the chart to select the rows first",
                        EnterRefused::InvalidTotal => "row count must be a positive number",
                    });
                }
            }
            Command::Reframe => self.session.reframe(),
            Command::EditRows => {
                let current = self
                    .session
                    .rows()
                    .total_rows()
                    .map(|n| n.to_string())
                    .unwrap_or_default();
                self.focus = Focus::Rows(current);
            }
            Command::ClearCrop => self.session.clear_crop(),
            Command::CounterIncrement => self.session.increment_counter(),
            Command::CounterDecrement => {
                self.session.decrement_counter();
            }
            Command::CounterReset => self.session.reset_counter(),
            Command::TimerToggle => self.session.toggle_timer(now),
            Command::TimerReset => self.session.reset_timer(),
            Command::TimerLonger | Command::TimerShorter => {
                let delta = if cmd == Command::TimerLonger { 1 } else { -1 };
                if let Err(AdjustRefused::Running) = self.session.adjust_timer(delta) {
                    self.set_status("pause the timer to change its length");
                }
            }
            Command::PromptImage => self.focus = Focus::Path(PathPrompt::Image, String::new()),
            Command::PromptPdf => self.focus = Focus::Path(PathPrompt::Pdf, String::new()),
            Command::OpenPdf => {
                if let Err(e) = self.session.open_pdf(self.viewer.as_mut()) {
                    self.set_status(format!("cannot open pdf: {e}"));
                }
            }
            Command::ToggleSplit => self.session.toggle_split(),
        }
    }

    fn edit(&mut self, edit: InputEdit) {
        match std::mem::take(&mut self.focus) {
            Focus::None => {}
            Focus::Rows(mut text) => match edit {
                InputEdit::Char(c) if c.is_ascii_digit() || (c == '-' && text.is_empty()) => {
                    text.push(c);
                    self.apply_rows(&text);
                    self.focus = Focus::Rows(text);
                }
                InputEdit::Char(_) => self.focus = Focus::Rows(text),
                InputEdit::Backspace => {
                    text.pop();
                    self.apply_rows(&text);
                    self.focus = Focus::Rows(text);
                }
                InputEdit::Submit | InputEdit::Cancel => {}
            },
            Focus::Path(kind, mut text) => match edit {
                InputEdit::Char(c) => {
                    text.push(c);
                    self.focus = Focus::Path(kind, text);
                }
                InputEdit::Backspace => {
                    text.pop();
                    self.focus = Focus::Path(kind, text);
                }
                InputEdit::Submit => self.load_path(kind, text.trim()),
                InputEdit::Cancel => {}
            },
        }
    }

    /// The rows field updates the count as it is typed; an empty or
    /// unparseable field is stored as empty.
    fn apply_rows(&mut self, text: &str) {
        let total = text.parse::<i64>().ok();
        self.session.set_total_rows(total);
    }

    fn load_path(&mut self, kind: PathPrompt, raw: &str) {
        if raw.is_empty() {
            return;
        }
        let path = PathBuf::from(raw.trim_matches(|c| c == '"' || c == '\''));
        let loaded = match kind {
            PathPrompt::Image => {
                ImageAsset::from_path(&path).map(|a| self.session.replace_image(a))
            }
            PathPrompt::Pdf => PdfDocument::from_path(&path).map(|d| self.session.replace_pdf(d)),
        };
        match loaded {
            Ok(()) => self.set_status(format!("loaded {kind} {}", path.display())),
            Err(e) => self.set_status(format!("could not load {kind}: {e}")),
        }
    }

    fn paste(&mut self, text: &str) {
        if let Focus::Path(_, field) = &mut self.focus {
            field.push_str(text.lines().next().unwrap_or_default());
            return;
        }
        if matches!(self.focus, Focus::Rows(_)) {
            for c in text.chars() {
                self.edit(InputEdit::Char(c));
            }
            return;
        }
        match ImageAsset::from_paste(text) {
            Some(asset) => {
                self.session.replace_image(asset);
                self.set_status("image pasted");
            }
            None => self.set_status("paste did not contain an image file"),
        }
    }

    fn mouse(&mut self, ev: MouseEvent, now: Instant) -> bool {
        let (col, row) = (ev.column, ev.row);
        match ev.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                // timer is drawn on top
                for kind in [WidgetKind::Timer, WidgetKind::Counter] {
                    if self.session.widget(kind).contains(col, row) {
                        self.press_widget(kind, col, row, now);
                        return true;
                    }
                }
                if self.focus.is_text() {
                    return false;
                }
                if let Some(image) = self.layout().image {
                    if layout::contains(image, col, row)
                        && self.session.begin_crop(layout::cell_percent(image, col, row))
                    {
                        self.crop_anchor = Some((col, row));
                        return true;
                    }
                }
                false
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                if let Some(kind) = self.session.dragging_widget() {
                    let viewport = self.viewport;
                    return self.session.widget_mut(kind).pointer_move((col, row), viewport);
                }
                match (self.crop_anchor, self.layout().image) {
                    (Some(anchor), Some(image)) => self
                        .session
                        .drag_crop(layout::drag_percent(image, anchor, col, row)),
                    _ => false,
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(kind) = self.session.dragging_widget() {
                    return self.session.release_widget(kind);
                }
                if self.crop_anchor.take().is_some() {
                    return self.session.complete_crop().is_some();
                }
                false
            }
            _ => false,
        }
    }

    fn press_widget(&mut self, kind: WidgetKind, col: u16, row: u16, now: Instant) {
        let tracker = self.session.widget(kind);
        let (Some(pos), Some(size)) = (tracker.position(), tracker.size()) else {
            return;
        };
        let panel = panels::panel_rect(pos, size);
        let controls = panels::controls_for(kind, panel, self.session.timer().is_running());
        match panels::hit(&controls, col, row) {
            Some(control) => {
                self.session.widget_mut(kind).pointer_down(HitTarget::Control, (col, row));
                // the clock display only toggles while no field holds the keyboard
                if !(control.is_display() && self.focus.is_text()) {
                    self.run(control.command, now);
                }
            }
            None => {
                self.session.widget_mut(kind).pointer_down(HitTarget::Body, (col, row));
            }
        }
    }
}
