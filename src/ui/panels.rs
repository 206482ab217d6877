//! Floating counter and timer panels.
//!
//! Both are a bordered box with a value line and a row of buttons. The button
//! geometry is computed here and used by the renderer and by the mouse
//! hit-test alike, so a click always lands on what is drawn.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, BorderType, Borders, Clear, Widget},
};
use unicode_width::UnicodeWidthStr;

use crate::keys::Command;
use crate::timer::{format_clock, CountdownTimer};
use crate::widget_pos::{Position, Size, WidgetKind};

const BUTTON_GAP: u16 = 1;
const TIMER_INNER_WIDTH: u16 = 19;
const COUNTER_MIN_INNER_WIDTH: u16 = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PanelControl {
    pub area: Rect,
    pub label: &'static str,
    pub command: Command,
}

impl PanelControl {
    /// The timer's clock line, as opposed to a drawn button.
    pub fn is_display(&self) -> bool {
        self.label.is_empty()
    }
}

pub fn counter_size(value: u64) -> Size {
    let digits = value.to_string().width() as u16;
    Size::new(COUNTER_MIN_INNER_WIDTH.max(digits + 2) + 2, 4)
}

pub fn timer_size() -> Size {
    Size::new(TIMER_INNER_WIDTH + 2, 4)
}

pub fn panel_rect(pos: Position, size: Size) -> Rect {
    Rect::new(pos.x.max(0) as u16, pos.y.max(0) as u16, size.width, size.height)
}

fn button_row(panel: Rect, buttons: &[(&'static str, Command)]) -> Vec<PanelControl> {
    let total: u16 = buttons.iter().map(|(l, _)| l.width() as u16).sum::<u16>()
        + BUTTON_GAP * buttons.len().saturating_sub(1) as u16;
    let inner_width = panel.width.saturating_sub(2);
    let mut x = panel.x + 1 + inner_width.saturating_sub(total) / 2;
    let y = panel.y + 2;
    buttons
        .iter()
        .map(|&(label, command)| {
            let w = label.width() as u16;
            let control = PanelControl {
                area: Rect::new(x, y, w, 1),
                label,
                command,
            };
            x += w + BUTTON_GAP;
            control
        })
        .collect()
}

/// Buttons of the timer panel, plus its clock line which toggles too.
pub fn timer_controls(panel: Rect, running: bool) -> Vec<PanelControl> {
    let toggle = if running { "[‖]" } else { "[▶]" };
    let mut controls = button_row(
        panel,
        &[
            ("[-]", Command::TimerShorter),
            (toggle, Command::TimerToggle),
            ("[↺]", Command::TimerReset),
            ("[+]", Command::TimerLonger),
        ],
    );
    controls.push(PanelControl {
        area: Rect::new(panel.x + 1, panel.y + 1, panel.width.saturating_sub(2), 1),
        label: "",
        command: Command::TimerToggle,
    });
    controls
}

pub fn counter_controls(panel: Rect) -> Vec<PanelControl> {
    button_row(
        panel,
        &[
            ("[-]", Command::CounterDecrement),
            ("[0]", Command::CounterReset),
            ("[+]", Command::CounterIncrement),
        ],
    )
}

pub fn controls_for(kind: WidgetKind, panel: Rect, timer_running: bool) -> Vec<PanelControl> {
    match kind {
        WidgetKind::Counter => counter_controls(panel),
        WidgetKind::Timer => timer_controls(panel, timer_running),
    }
}

pub fn hit(controls: &[PanelControl], col: u16, row: u16) -> Option<&PanelControl> {
    controls
        .iter()
        .find(|c| super::layout::contains(c.area, col, row))
}

fn centered(buf: &mut Buffer, line: Rect, text: &str, style: Style) {
    let w = (text.width() as u16).min(line.width);
    let x = line.x + (line.width - w) / 2;
    buf.set_stringn(x, line.y, text, line.width as usize, style);
}

fn frame(area: Rect, buf: &mut Buffer, title: &str, style: Style) {
    Clear.render(area, buf);
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!(" {title} "))
        .style(style)
        .render(area, buf);
}

fn buttons(buf: &mut Buffer, controls: &[PanelControl], style: Style) {
    for c in controls.iter().filter(|c| !c.is_display()) {
        buf.set_string(c.area.x, c.area.y, c.label, style);
    }
}

pub struct CounterPanel {
    pub value: u64,
    pub dragging: bool,
}

impl Widget for CounterPanel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = if self.dragging {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        frame(area, buf, "count", border);
        if area.height < 4 || area.width < 5 {
            return;
        }
        let value_line = Rect::new(area.x + 1, area.y + 1, area.width.saturating_sub(2), 1);
        centered(
            buf,
            value_line,
            &self.value.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        );
        buttons(buf, &counter_controls(area), Style::default().fg(Color::Cyan));
    }
}

pub struct TimerPanel<'a> {
    pub timer: &'a CountdownTimer,
    pub flash: bool,
    pub dragging: bool,
    /// Length buttons are inert while running
    pub locked: bool,
}

impl Widget for TimerPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let border = match (self.flash, self.dragging) {
            (true, _) => Style::default().fg(Color::Black).bg(Color::LightRed),
            (false, true) => Style::default().fg(Color::Yellow),
            _ => Style::default(),
        };
        frame(area, buf, "timer", border);
        if area.height < 4 || area.width < 5 {
            return;
        }

        let clock_line = Rect::new(area.x + 1, area.y + 1, area.width.saturating_sub(2), 1);
        let clock_style = if self.timer.is_running() {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        centered(
            buf,
            clock_line,
            &format_clock(self.timer.remaining_secs()),
            clock_style,
        );

        let active = Style::default().fg(Color::Cyan);
        let inert = Style::default().add_modifier(Modifier::DIM);
        for c in timer_controls(area, self.timer.is_running())
            .iter()
            .filter(|c| !c.is_display())
        {
            let length_button = matches!(c.command, Command::TimerLonger | Command::TimerShorter);
            let style = if length_button && self.locked {
                inert
            } else {
                active
            };
            buf.set_string(c.area.x, c.area.y, c.label, style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};

    #[test]
    fn counter_grows_with_its_value() {
        assert_eq!(counter_size(0), Size::new(15, 4));
        assert_eq!(counter_size(u64::MAX), Size::new(24, 4));
    }

    fn control_at(controls: &[PanelControl], col: u16, row: u16) -> Option<Command> {
        hit(controls, col, row).map(|c| c.command)
    }

    #[test]
    fn timer_buttons_hit_where_drawn() {
        let panel = Rect::new(10, 10, timer_size().width, timer_size().height);
        let controls = timer_controls(panel, false);
        // 4 buttons of 3 cells + 3 gaps = 15, centred in 19
        assert_eq!(controls[0].area, Rect::new(13, 12, 3, 1));
        assert_eq!(control_at(&controls, 13, 12), Some(Command::TimerShorter));
        assert_eq!(control_at(&controls, 17, 12), Some(Command::TimerToggle));
        assert_eq!(control_at(&controls, 16, 12), None);
        // clock line toggles
        assert_eq!(control_at(&controls, 20, 11), Some(Command::TimerToggle));
        assert!(hit(&controls, 20, 11).unwrap().is_display());
        assert!(!hit(&controls, 13, 12).unwrap().is_display());
        // border is not a control
        assert_eq!(control_at(&controls, 10, 10), None);
    }

    #[test]
    fn panels_render_their_values() {
        let mut terminal = Terminal::new(TestBackend::new(40, 10)).unwrap();
        let timer = CountdownTimer::with_minutes(25);
        terminal
            .draw(|f| {
                f.render_widget(
                    CounterPanel {
                        value: 42,
                        dragging: false,
                    },
                    Rect::new(0, 0, 15, 4),
                );
                f.render_widget(
                    TimerPanel {
                        timer: &timer,
                        flash: false,
                        dragging: false,
                        locked: false,
                    },
                    Rect::new(0, 5, 21, 4),
                );
            })
            .unwrap();
        let content: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("42"));
        assert!(content.contains("25:00"));
        assert!(content.contains("[+]"));
    }
}
